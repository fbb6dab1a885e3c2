//! Plugin font sources.
//!
//! A source is either an explicit table of family names to font files, or a
//! directory whose font files are registered under their file stem. Either
//! way each file becomes one record with a `file:` origin.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use fontlib_config::PluginSource;
use fontlib_css::FontFaceRecord;
use std::path::{Path, PathBuf};

/// `format()` hint for a font file, from its extension.
pub fn format_of(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "ttf" => "truetype",
        "otf" => "opentype",
        "woff" => "woff",
        "woff2" => "woff2",
        "svg" => "svg",
        "eot" => "embedded-opentype",
        _ => return None,
    })
}

/// `file:` URL of `path`, made absolute against the working directory.
pub fn file_url(path: &Path) -> Result<String> {
    let raise = || ErrorKind::EntryPoint(path.to_path_buf());
    let path = std::path::absolute(path).or_raise(raise)?;
    match url::Url::from_file_path(&path) {
        Ok(url) => Ok(url.to_string()),
        Err(()) => exn::bail!(raise()),
    }
}

fn record(family: impl Into<String>, path: &Path, source: &str) -> Result<FontFaceRecord> {
    Ok(FontFaceRecord {
        family: family.into(),
        url: file_url(path)?,
        format: format_of(path).map(str::to_string),
        stylesheet: format!("entry-point:{source}"),
        ..FontFaceRecord::default()
    })
}

/// One record per font file of plugin source `name`.
pub async fn records(name: &str, source: &PluginSource) -> Result<Vec<FontFaceRecord>> {
    match source {
        PluginSource::Files { files } => {
            files.iter().map(|(family, path)| record(family.as_str(), path, name)).collect()
        },
        PluginSource::Directory { directory } => {
            let paths = font_files(directory).await?;
            paths
                .iter()
                .filter_map(|path| Some((path.file_stem()?.to_str()?.to_string(), path)))
                .map(|(family, path)| record(family, path, name))
                .collect()
        },
    }
}

/// Font files directly inside `directory`, sorted by path.
async fn font_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let raise = || ErrorKind::EntryPoint(directory.to_path_buf());
    let mut entries = tokio::fs::read_dir(directory).await.or_raise(raise)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.or_raise(raise)? {
        let path = entry.path();
        if format_of(&path).is_none() {
            continue;
        }
        if entry.file_type().await.or_raise(raise)?.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::BTreeMap;

    #[rstest]
    #[case("a.ttf", Some("truetype"))]
    #[case("a.TTF", Some("truetype"))]
    #[case("a.otf", Some("opentype"))]
    #[case("a.woff", Some("woff"))]
    #[case("a.woff2", Some("woff2"))]
    #[case("a.svg", Some("svg"))]
    #[case("a.eot", Some("embedded-opentype"))]
    #[case("a.txt", None)]
    #[case("noext", None)]
    fn test_format_of(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(format_of(Path::new(path)), expected);
    }

    #[tokio::test]
    async fn test_files_source() {
        let files = BTreeMap::from([("Mono".to_string(), PathBuf::from("/usr/share/fonts/mono.ttf"))]);
        let records = records("fonts_ttf", &PluginSource::Files { files }).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].family, "Mono");
        assert_eq!(records[0].url, "file:///usr/share/fonts/mono.ttf");
        assert_eq!(records[0].format.as_deref(), Some("truetype"));
    }

    #[tokio::test]
    async fn test_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.woff2", "a.otf", "readme.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.ttf")).unwrap();
        let source = PluginSource::Directory { directory: dir.path().to_path_buf() };
        let records = records("local", &source).await.unwrap();
        let families: Vec<_> = records.iter().map(|r| r.family.as_str()).collect();
        assert_eq!(families, vec!["a", "b"]);
        assert_eq!(records[1].format.as_deref(), Some("woff2"));
        assert!(records.iter().all(|r| r.url.starts_with("file:///")));
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let source = PluginSource::Directory { directory: PathBuf::from("/definitely/not/here") };
        let err = records("local", &source).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::EntryPoint(_)));
    }
}

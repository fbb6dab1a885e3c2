//! Bundled font stylesheets.
//!
//! Each bundled font lives in its own directory, `<name>/<name>.css`, and is
//! embedded into the binary at compile time using [`rust-embed`](rust_embed).
//! Before loading, the directory is written out to the workspace so its
//! stylesheet has a `file:` URL like any other local stylesheet.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use rust_embed::Embed;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

#[derive(Embed)]
#[folder = "../../assets/fonts/"]
pub struct Builtins;
impl Builtins {
    /// Get the stylesheet of a bundled font by name.
    pub fn load(name: impl AsRef<str>) -> Result<Cow<'static, [u8]>> {
        let name = name.as_ref().trim();
        Self::get(&stylesheet_of(name)).map(|f| f.data).ok_or_raise(|| ErrorKind::UnknownBuiltin(name.to_string()))
    }

    /// List all bundled font names.
    pub fn list() -> Vec<String> {
        let mut names: Vec<String> = Self::iter()
            .filter_map(|f| {
                let (dir, file) = f.split_once('/')?;
                (file == format!("{dir}.css")).then(|| dir.to_string())
            })
            .collect();
        names.sort();
        names
    }

    pub fn exists(name: impl AsRef<str>) -> bool {
        Self::get(&stylesheet_of(name.as_ref().trim())).is_some()
    }

    /// Write every file of bundled font `name` below `root/<name>/`,
    /// overwriting stale copies, and return the stylesheet's path.
    pub async fn materialize(name: &str, root: &Path) -> Result<PathBuf> {
        if !Self::exists(name) {
            exn::bail!(ErrorKind::UnknownBuiltin(name.to_string()));
        }
        let prefix = format!("{name}/");
        for file in Self::iter().filter(|f| f.starts_with(&prefix)) {
            let Some(asset) = Self::get(&file) else {
                continue;
            };
            let dest = root.join(file.as_ref());
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Builtin(root.to_path_buf()))?;
            }
            tokio::fs::write(&dest, asset.data).await.or_raise(|| ErrorKind::Builtin(root.to_path_buf()))?;
        }
        let path = root.join(stylesheet_of(name));
        tracing::debug!(name, path = %path.display(), "materialized bundled font");
        Ok(path)
    }
}

fn stylesheet_of(name: &str) -> String {
    format!("{name}/{name}.css")
}

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default download chunk size (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Keep a copy of every resource in `<workspace>/urlcache`.
    #[default]
    #[display("simple")]
    Simple,
    /// Download (or copy) on every save.
    #[display("none")]
    None,
}

#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[display("trace")]
    Trace,
    #[display("debug")]
    Debug,
    #[default]
    #[display("info")]
    Info,
    #[display("warn")]
    Warn,
    #[display("error")]
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Download {
    pub chunk_size: usize,
    pub timeout_secs: u64,
}
impl Default for Download {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, timeout_secs: 60 }
    }
}

/// Which sources make up the font stack, in bootstrap order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontStack {
    /// Names of bundled stylesheets.
    pub builtins: Vec<String>,
    /// Names of `[plugins.*]` sources.
    pub entry_points: Vec<String>,
    /// Remote stylesheet URLs.
    pub remote: Vec<String>,
}
impl Default for FontStack {
    fn default() -> Self {
        Self { builtins: vec!["cantarell".to_string(), "dejavu".to_string()], entry_points: vec![], remote: vec![] }
    }
}

/// A named set of local font files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginSource {
    /// Explicit family name to file path table.
    Files { files: BTreeMap<String, PathBuf> },
    /// Every font file directly inside `directory`, named by file stem.
    Directory { directory: PathBuf },
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoogleFormat {
    #[display("woff2")]
    Woff2,
    #[display("ttf")]
    Ttf,
    #[display("svg")]
    Svg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Google {
    pub formats: Vec<GoogleFormat>,
}
impl Default for Google {
    fn default() -> Self {
        Self { formats: vec![GoogleFormat::Woff2, GoogleFormat::Ttf, GoogleFormat::Svg] }
    }
}

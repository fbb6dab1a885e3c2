use derive_more::Display;
use fontlib_store::Font;
use std::path::PathBuf;

/// Named notification channel.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    #[display("font-added")]
    FontAdded,
    #[display("alias-added")]
    AliasAdded,
    #[display("download-progress")]
    DownloadProgress,
    #[display("load-css")]
    LoadCss,
    #[display("load-entry-point")]
    LoadEntryPoint,
}

/// Size of a download, as far as it is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Total {
    /// The server did not say.
    Unknown,
    Bytes(u64),
    /// The stream has ended; sent exactly once, after the last chunk.
    Complete,
}

impl Total {
    /// Numeric form: `0` when unknown, `-1` once complete.
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Bytes(n) => i64::try_from(*n).unwrap_or(i64::MAX),
            Self::Complete => -1,
        }
    }
}

/// One chunk of a download has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub origin: String,
    /// Font name, for display only.
    pub name: String,
    /// Font format, for display only.
    pub format: String,
    pub dest: PathBuf,
    /// Bytes written so far.
    pub done: u64,
    pub total: Total,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    FontAdded(Font),
    AliasAdded { alias: String, font: Font },
    DownloadProgress(Progress),
    LoadCss(String),
    LoadEntryPoint(String),
}

impl Event {
    pub fn channel(&self) -> Channel {
        match self {
            Self::FontAdded(_) => Channel::FontAdded,
            Self::AliasAdded { .. } => Channel::AliasAdded,
            Self::DownloadProgress(_) => Channel::DownloadProgress,
            Self::LoadCss(_) => Channel::LoadCss,
            Self::LoadEntryPoint(_) => Channel::LoadEntryPoint,
        }
    }
}

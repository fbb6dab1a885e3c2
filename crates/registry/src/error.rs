//! Registry Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A registry error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No `[plugins.<name>]` table for a requested entry point.
    #[display("unknown font source: {_0}")]
    UnknownSource(#[error(not(source))] String),
    #[display("no bundled stylesheet named {_0}")]
    UnknownBuiltin(#[error(not(source))] String),
    #[display("not a Google Fonts URL: {_0}")]
    NotGoogle(#[error(not(source))] String),
    /// The stylesheet could not be fetched or read.
    #[display("cannot load stylesheet {_0}")]
    Stylesheet(#[error(not(source))] String),
    #[display("cannot list font files in {}", _0.display())]
    EntryPoint(#[error(not(source))] PathBuf),
    #[display("cannot write bundled fonts to {}", _0.display())]
    Builtin(#[error(not(source))] PathBuf),
    #[display("no font with id or name {_0}")]
    FontNotFound(#[error(not(source))] String),
    #[display("cannot save {_0} to {}", _1.display())]
    Save(#[error(not(source))] String, #[error(not(source))] PathBuf),
    #[display("font database error")]
    Store,
    #[display("font cache error")]
    Cache,
    #[display("configuration error")]
    Config,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Stylesheet(_) | Self::Save(..) | Self::Store | Self::Cache)
    }
}

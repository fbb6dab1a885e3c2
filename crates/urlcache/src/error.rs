//! URL Cache Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::{Path, PathBuf};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// The remote end could not be reached or answered with an error status.
    #[display("could not fetch {_0}")]
    Transport(#[error(not(source))] String),
    #[display("invalid URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
    #[display("unsupported URL scheme: {_0}")]
    UnsupportedScheme(#[error(not(source))] String),
    /// Reading or writing blob records failed.
    #[display("cache database error")]
    Store,
    /// A blocking transfer task did not run to completion.
    #[display("transfer task failed")]
    Task,
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    pub(crate) fn io(e: IoError, path: &Path) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(e),
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Transport(_) | Self::Store)
    }
}

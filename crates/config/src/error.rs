//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A configuration source exists but could not be read or deserialized.
    #[display("cannot load configuration: {_0}")]
    Load(#[error(not(source))] String),
    /// A value is well-formed but not allowed.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// The workspace directory could not be created or written to.
    #[display("cannot initialise workspace: {}", _0.display())]
    Workspace(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

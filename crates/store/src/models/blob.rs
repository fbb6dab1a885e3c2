use crate::error::{Error, ErrorKind};
use crate::identity_of;
use derive_more::Display;
use std::str::FromStr;

/// Where the bytes of a resource currently are.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobState {
    /// Bytes have to be downloaded.
    #[display("remote")]
    Remote,
    /// Bytes are on the local filesystem and only need copying.
    #[display("local")]
    Local,
    /// A copy is present in the cache directory.
    #[display("cached")]
    Cached,
}
impl FromStr for BlobState {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            "cached" => Ok(Self::Cached),
            _ => exn::bail!(ErrorKind::UnknownState(s.to_string())),
        }
    }
}

/// Cache bookkeeping for one origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub origin: String,
    /// Identity of `origin`, also the filename of the cached copy.
    pub id: String,
    pub state: BlobState,
}

impl Blob {
    pub fn new(origin: impl Into<String>, state: BlobState) -> Self {
        let origin = origin.into();
        Self { id: identity_of(&origin), origin, state }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BlobRow {
    pub(crate) origin: String,
    pub(crate) id: String,
    pub(crate) state: String,
}
impl From<&Blob> for BlobRow {
    fn from(blob: &Blob) -> Self {
        Self { origin: blob.origin.clone(), id: blob.id.clone(), state: blob.state.to_string() }
    }
}
impl TryFrom<BlobRow> for Blob {
    type Error = Error;
    fn try_from(row: BlobRow) -> Result<Self, Self::Error> {
        Ok(Self { origin: row.origin, id: row.id, state: row.state.parse()? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("remote", BlobState::Remote)]
    #[case("local", BlobState::Local)]
    #[case("cached", BlobState::Cached)]
    fn test_state_round_trip(#[case] text: &str, #[case] state: BlobState) {
        assert_eq!(text.parse::<BlobState>().unwrap(), state);
        assert_eq!(state.to_string(), text);
    }

    #[test]
    fn test_unknown_state() {
        let err = "CACHED".parse::<BlobState>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownState(s) if s == "CACHED"));
    }
}

//! Resource cache implementations.
//!
//! Every origin is in one of three [`BlobState`]s:
//!
//! | state    | meaning                                        | on `ensure_cached`      |
//! |----------|------------------------------------------------|-------------------------|
//! | `remote` | bytes have to be downloaded                    | chunked download        |
//! | `local`  | `file:` origin, bytes only need copying        | filesystem copy         |
//! | `cached` | a copy exists in the cache directory           | nothing                 |
//!
//! The state is never trusted from the database: it is derived from the
//! origin's scheme and the existence of the cache file every time.

mod none;
mod simple;

pub use self::none::NoCache;
pub use self::simple::SimpleCache;
use crate::error::Result;
use crate::fetch::is_local;
use async_trait::async_trait;
use fontlib_store::{BlobState, Font, Session};
use std::path::{Path, PathBuf};

/// A resource URL plus the labels shown in progress notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub url: String,
    pub name: String,
    pub format: String,
}

impl Origin {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), name: String::new(), format: String::new() }
    }

    pub fn with_labels(mut self, name: impl Into<String>, format: impl Into<String>) -> Self {
        self.name = name.into();
        self.format = format.into();
        self
    }
}
impl From<&str> for Origin {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}
impl From<&Font> for Origin {
    fn from(font: &Font) -> Self {
        let format = font.src_formats.iter().next().cloned().unwrap_or_default();
        Self::new(&font.origin).with_labels(&font.name, format)
    }
}

/// State an origin starts out in, before looking at the cache directory.
pub fn initial_state(origin: &str) -> BlobState {
    if is_local(origin) { BlobState::Local } else { BlobState::Remote }
}

/// Download-once storage for resource bytes.
///
/// # Examples
///
/// ```no_run
/// use fontlib_urlcache::{CacheHandle, Origin};
/// use std::path::Path;
/// # async fn example(cache: CacheHandle) -> fontlib_urlcache::error::Result<()> {
/// let origin = Origin::new("https://fonts.gstatic.com/s/roboto/v30/font.woff2").with_labels("Roboto", "woff2");
/// // Downloads on the first call only.
/// cache.save_to(&origin, Path::new("/tmp/roboto.woff2")).await?;
/// cache.save_to(&origin, Path::new("/tmp/roboto-again.woff2")).await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ResourceCache: Send + Sync {
    /// Track `origin` inside the caller's unit of work. Idempotent.
    async fn register(&self, session: &mut Session, origin: &str) -> Result<()>;

    /// Current state of `origin`, re-derived on every call.
    async fn state_of(&self, origin: &str) -> Result<BlobState>;

    /// Make sure a full local copy of `origin` exists and return its path.
    /// Returns `None` for caches that keep no copies.
    async fn ensure_cached(&self, origin: &Origin) -> Result<Option<PathBuf>>;

    /// Write the bytes of `origin` to `dest`, creating parent directories.
    async fn save_to(&self, origin: &Origin, dest: &Path) -> Result<()>;
}

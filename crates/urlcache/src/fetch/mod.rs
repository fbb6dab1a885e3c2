//! Byte stream sources.
//!
//! A [`Fetcher`] turns a URL into a blocking reader. Readers are consumed on
//! tokio's blocking pool, one chunk at a time, so downloads never buffer the
//! whole resource in memory.

mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::http::HttpFetcher;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockFetcher;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) type BoxSyncRead = Box<dyn Read + Send + 'static>;
pub type FetcherHandle = Arc<dyn Fetcher + Send + Sync>;

/// What to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    /// Overrides the fetcher's default `User-Agent` header.
    pub user_agent: Option<String>,
}

impl Request {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), user_agent: None }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// An open byte stream.
pub struct Response {
    pub reader: BoxSyncRead,
    /// Content length, when the source knows it up front.
    pub length: Option<u64>,
}

/// Source of resource bytes.
///
/// # Examples
///
/// ```no_run
/// use fontlib_urlcache::{Fetcher, HttpFetcher, Request};
/// # async fn example() -> fontlib_urlcache::error::Result<()> {
/// let fetcher = HttpFetcher::default();
/// let css = fetcher.read_all(&Request::new("https://fonts.googleapis.com/css?family=Roboto")).await?;
/// println!("{} bytes of stylesheet", css.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Open a stream for `request`. `file:` URLs are always supported.
    async fn open(&self, request: &Request) -> Result<Response>;

    /// Read the complete body for `request`.
    async fn read_all(&self, request: &Request) -> Result<Vec<u8>> {
        let Response { mut reader, length, .. } = self.open(request).await?;
        let url = request.url.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
            let mut buffer = Vec::with_capacity(length.and_then(|l| usize::try_from(l).ok()).unwrap_or(0));
            reader.read_to_end(&mut buffer).or_raise(|| ErrorKind::Transport(url))?;
            Ok(buffer)
        })
        .await
        .or_raise(|| ErrorKind::Task)?
    }
}

/// Local filesystem path of a `file:` URL.
pub fn file_path(url: &str) -> Result<PathBuf> {
    let parsed = url::Url::parse(url).or_raise(|| ErrorKind::InvalidUrl(url.to_string()))?;
    if parsed.scheme() != "file" {
        exn::bail!(ErrorKind::UnsupportedScheme(parsed.scheme().to_string()));
    }
    match parsed.to_file_path() {
        Ok(path) => Ok(path),
        Err(()) => exn::bail!(ErrorKind::InvalidUrl(url.to_string())),
    }
}

/// Is `url` served from the local filesystem?
pub fn is_local(url: &str) -> bool {
    url::Url::parse(url).is_ok_and(|u| u.scheme() == "file")
}

fn open_file(url: &str) -> Result<Response> {
    let path = file_path(url)?;
    let file = std::fs::File::open(&path).map_err(|e| ErrorKind::io(e, &path))?;
    let length = file.metadata().ok().map(|m| m.len());
    Ok(Response { reader: Box::new(file), length })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("file:/x/y.css", true)]
    #[case("file:///x/y.css", true)]
    #[case("https://example.org/a.woff2", false)]
    #[case("relative/path.ttf", false)]
    fn test_is_local(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(is_local(url), expected);
    }

    #[test]
    fn test_file_path() {
        assert_eq!(file_path("file:/x/y.css").unwrap(), PathBuf::from("/x/y.css"));
        assert_eq!(file_path("file:///x/a%20b.css").unwrap(), PathBuf::from("/x/a b.css"));
        let err = file_path("https://example.org/a.ttf").unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedScheme(s) if s == "https"));
        let err = file_path("no scheme").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file:{}", dir.path().join("missing.ttf").display());
        let err = HttpFetcher::default().open(&Request::new(url)).await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_all_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.css");
        std::fs::write(&path, b"@font-face {}").unwrap();
        let url = format!("file:{}", path.display());
        let bytes = HttpFetcher::default().read_all(&Request::new(url)).await.unwrap();
        assert_eq!(bytes, b"@font-face {}");
    }
}

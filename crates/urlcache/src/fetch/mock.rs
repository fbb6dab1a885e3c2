//! In-memory fetcher for testing.

use super::{Fetcher, Request, Response, open_file};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Mutex, PoisonError};

/// In-memory fetcher for testing.
///
/// Serves pre-registered bytes for non-`file:` URLs and records every
/// request it receives, so tests can assert how often a resource was really
/// downloaded. `file:` URLs are read from disk like [`HttpFetcher`](super::HttpFetcher) does.
///
/// # Examples
///
/// ```ignore
/// use fontlib_urlcache::{Fetcher, MockFetcher, Request};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = MockFetcher::with_resources([("https://example.org/a.woff2", b"wOF2")]);
/// let bytes = fetcher.read_all(&Request::new("https://example.org/a.woff2")).await.unwrap();
/// assert_eq!(bytes, b"wOF2");
/// assert_eq!(fetcher.fetch_count("https://example.org/a.woff2"), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MockFetcher {
    resources: HashMap<String, Vec<u8>>,
    /// Whether responses advertise their length.
    hide_length: bool,
    requests: Mutex<Vec<Request>>,
}

impl MockFetcher {
    pub fn with_resources(resources: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        Self {
            resources: resources.into_iter().map(|(url, data)| (url.into(), data.into())).collect(),
            ..Self::default()
        }
    }

    /// Respond without a content length, like a chunked HTTP response.
    pub fn without_length(mut self) -> Self {
        self.hide_length = true;
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of times `url` was opened.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).iter().filter(|r| r.url == url).count()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn open(&self, request: &Request) -> Result<Response> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request.clone());
        if request.url.starts_with("file:") {
            return open_file(&request.url);
        }
        let Some(data) = self.resources.get(&request.url) else {
            exn::bail!(ErrorKind::Transport(request.url.clone()));
        };
        let length = (!self.hide_length).then_some(data.len() as u64);
        Ok(Response { reader: Box::new(Cursor::new(data.clone())), length })
    }
}

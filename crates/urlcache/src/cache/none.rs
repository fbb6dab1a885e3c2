use super::{Origin, ResourceCache, initial_state};
use crate::error::Result;
use crate::fetch::FetcherHandle;
use crate::transfer::{copy_local, download};
use async_trait::async_trait;
use fontlib_config::DEFAULT_CHUNK_SIZE;
use fontlib_event::DispatcherHandle;
use fontlib_store::{BlobState, Session};
use std::path::{Path, PathBuf};

/// A cache that keeps nothing.
///
/// Every save copies or downloads straight to the destination. No blob
/// records are written, and nothing is ever in the `cached` state.
pub struct NoCache {
    fetcher: FetcherHandle,
    dispatcher: DispatcherHandle,
    chunk_size: usize,
}

impl NoCache {
    pub fn new(fetcher: FetcherHandle, dispatcher: DispatcherHandle) -> Self {
        Self { fetcher, dispatcher, chunk_size: DEFAULT_CHUNK_SIZE }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl ResourceCache for NoCache {
    async fn register(&self, _session: &mut Session, _origin: &str) -> Result<()> {
        Ok(())
    }

    async fn state_of(&self, origin: &str) -> Result<BlobState> {
        Ok(initial_state(origin))
    }

    async fn ensure_cached(&self, _origin: &Origin) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    async fn save_to(&self, origin: &Origin, dest: &Path) -> Result<()> {
        match initial_state(&origin.url) {
            BlobState::Local => {
                tracing::debug!(origin = %origin.url, "copying from local filesystem");
                copy_local(&origin.url, dest).await?;
            },
            _ => {
                tracing::debug!(origin = %origin.url, "downloading from remote");
                download(&self.fetcher, &self.dispatcher, origin, dest, self.chunk_size).await?;
            },
        }
        tracing::info!(origin = %origin.url, dest = %dest.display(), "saved");
        Ok(())
    }
}

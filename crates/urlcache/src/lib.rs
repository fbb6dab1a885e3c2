//! Download-once cache for font resources.
//!
//! Resources are addressed by their origin URL. [`SimpleCache`] keeps one
//! copy per origin in a flat directory, named after the origin's identity;
//! [`NoCache`] writes straight to wherever the caller wants the bytes.
//! Either way, remote downloads are streamed in chunks and announce their
//! progress through the event dispatcher.

mod cache;
pub mod error;
mod fetch;
mod transfer;

pub use crate::cache::{NoCache, Origin, ResourceCache, SimpleCache, initial_state};
#[cfg(any(test, feature = "mock"))]
pub use crate::fetch::MockFetcher;
pub use crate::fetch::{Fetcher, FetcherHandle, HttpFetcher, Request, Response, file_path, is_local};
use std::sync::Arc;

pub type CacheHandle = Arc<dyn ResourceCache + Send + Sync>;

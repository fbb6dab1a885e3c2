//! Persistence for fonts and cached blobs.
//!
//! A single SQLite database holds two tables:
//! - **fonts**: one row per font origin, with its primary name, aliases,
//!   format tags and unicode range.
//! - **urlcache_blob**: one row per origin known to the URL cache. The state
//!   column is informational; the cache re-derives the real state from the
//!   filesystem every time it is asked.
//!
//! Writes go through a [`Session`] (one transaction per top-level
//! operation). [`Database`] offers read-only shortcuts outside a session.

mod db;
pub mod error;
mod identity;
mod models;
mod queries;
mod session;

pub use crate::db::Database;
pub use crate::identity::{IDENTITY_LEN, identity_of};
pub use crate::models::{Blob, BlobState, Font};
pub use crate::session::Session;

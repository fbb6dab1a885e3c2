use crate::error::{ErrorKind, Result};
use crate::models::{Blob, Font};
use crate::queries;
use exn::ResultExt;
use sqlx::{Sqlite, Transaction};

/// Unit of work spanning one top-level operation.
///
/// Wraps a database transaction: nothing written through a session is
/// visible to other connections until [`commit`](Self::commit). Dropping a
/// session without committing rolls it back, so returning early with `?`
/// discards everything written so far.
pub struct Session {
    tx: Transaction<'static, Sqlite>,
}

impl Session {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }

    pub async fn font(&mut self, id: &str) -> Result<Option<Font>> {
        queries::get_font(&mut *self.tx, id).await
    }

    pub async fn fonts(&mut self) -> Result<Vec<Font>> {
        queries::list_fonts(&mut *self.tx).await
    }

    pub async fn fonts_named(&mut self, name: &str) -> Result<Vec<Font>> {
        queries::find_fonts_by_name(&mut *self.tx, name).await
    }

    /// Insert the font, or overwrite the stored one with the same id.
    pub async fn save_font(&mut self, font: &Font) -> Result<()> {
        queries::upsert_font(&mut *self.tx, font).await
    }

    pub async fn blob(&mut self, origin: &str) -> Result<Option<Blob>> {
        queries::get_blob(&mut *self.tx, origin).await
    }

    /// Insert the blob, or update the state of the stored one.
    pub async fn save_blob(&mut self, blob: &Blob) -> Result<()> {
        queries::upsert_blob(&mut *self.tx, blob).await
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await.or_raise(|| ErrorKind::Database)
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.or_raise(|| ErrorKind::Database)
    }
}

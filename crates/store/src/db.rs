//! Database connection and pool management.

use crate::error::{ErrorKind, Result};
use crate::models::{Blob, Font};
use crate::queries;
use crate::session::Session;
use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use tracing::instrument;

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// Every top-level operation holds one connection for its session; reads
// outside a session can use the rest.
const MAX_CONNECTIONS: u32 = 4;

/// Database connection pool for the font registry and the URL cache.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: Option<u32>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Query-based PRAGMAs have to be applied to every connection the
            // pool opens, not just the first one.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Connect to the database at the given path.
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "opening database");
        let options = Self::base_options().filename(path).create_if_missing(true);
        Self::new(options, None).await
    }

    /// Connect to an in-memory database.
    ///
    /// Not `#[cfg(test)]`, so other crates can use it in their tests. The data
    /// is gone once the pool is closed.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // Every connection to ":memory:" is its own database, so stick to one.
        Self::new(options, Some(1)).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA cache_size = -2048;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument("performing database migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Begin a unit of work.
    ///
    /// See [`Session`] for commit and rollback semantics.
    pub async fn session(&self) -> Result<Session> {
        let tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        Ok(Session::new(tx))
    }

    /// All fonts, in the order they were first registered.
    pub async fn fonts(&self) -> Result<Vec<Font>> {
        queries::list_fonts(&self.pool).await
    }

    /// Fonts whose primary name or one of whose aliases is exactly `name`.
    pub async fn fonts_named(&self, name: &str) -> Result<Vec<Font>> {
        queries::find_fonts_by_name(&self.pool, name).await
    }

    pub async fn font(&self, id: &str) -> Result<Option<Font>> {
        queries::get_font(&self.pool, id).await
    }

    pub async fn blobs(&self) -> Result<Vec<Blob>> {
        queries::list_blobs(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool, waiting for checked-out connections to
    /// be returned first.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

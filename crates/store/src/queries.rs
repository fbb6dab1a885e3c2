//! SQL shared between [`Database`](crate::Database) (pool) and
//! [`Session`](crate::Session) (transaction).

use crate::error::{ErrorKind, Result};
use crate::models::{Blob, BlobRow, Font, FontRow};
use exn::ResultExt;
use sqlx::SqliteExecutor;

pub(crate) async fn get_font<'e>(exec: impl SqliteExecutor<'e>, id: &str) -> Result<Option<Font>> {
    let row: Option<FontRow> = sqlx::query_as(include_str!("../queries/get_font.sql"))
        .bind(id)
        .fetch_optional(exec)
        .await
        .or_raise(|| ErrorKind::Database)?;
    row.map(Font::try_from).transpose()
}

pub(crate) async fn list_fonts<'e>(exec: impl SqliteExecutor<'e>) -> Result<Vec<Font>> {
    let rows: Vec<FontRow> = sqlx::query_as(include_str!("../queries/list_fonts.sql"))
        .fetch_all(exec)
        .await
        .or_raise(|| ErrorKind::Database)?;
    rows.into_iter().map(Font::try_from).collect()
}

pub(crate) async fn find_fonts_by_name<'e>(exec: impl SqliteExecutor<'e>, name: &str) -> Result<Vec<Font>> {
    let rows: Vec<FontRow> = sqlx::query_as(include_str!("../queries/find_fonts_by_name.sql"))
        .bind(name)
        .fetch_all(exec)
        .await
        .or_raise(|| ErrorKind::Database)?;
    rows.into_iter().map(Font::try_from).collect()
}

pub(crate) async fn upsert_font<'e>(exec: impl SqliteExecutor<'e>, font: &Font) -> Result<()> {
    let row = FontRow::try_from(font)?;
    sqlx::query(include_str!("../queries/upsert_font.sql"))
        .bind(row.id)
        .bind(row.origin)
        .bind(row.name)
        .bind(row.aliases)
        .bind(row.src_formats)
        .bind(row.unicode_range)
        .execute(exec)
        .await
        .or_raise(|| ErrorKind::Database)?;
    Ok(())
}

pub(crate) async fn get_blob<'e>(exec: impl SqliteExecutor<'e>, origin: &str) -> Result<Option<Blob>> {
    let row: Option<BlobRow> = sqlx::query_as(include_str!("../queries/get_blob.sql"))
        .bind(origin)
        .fetch_optional(exec)
        .await
        .or_raise(|| ErrorKind::Database)?;
    row.map(Blob::try_from).transpose()
}

pub(crate) async fn list_blobs<'e>(exec: impl SqliteExecutor<'e>) -> Result<Vec<Blob>> {
    let rows: Vec<BlobRow> = sqlx::query_as(include_str!("../queries/list_blobs.sql"))
        .fetch_all(exec)
        .await
        .or_raise(|| ErrorKind::Database)?;
    rows.into_iter().map(Blob::try_from).collect()
}

pub(crate) async fn upsert_blob<'e>(exec: impl SqliteExecutor<'e>, blob: &Blob) -> Result<()> {
    let row = BlobRow::from(blob);
    sqlx::query(include_str!("../queries/upsert_blob.sql"))
        .bind(row.origin)
        .bind(row.id)
        .bind(row.state)
        .execute(exec)
        .await
        .or_raise(|| ErrorKind::Database)?;
    Ok(())
}

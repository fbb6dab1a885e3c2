//! Moving resource bytes onto the local filesystem.
//!
//! Everything is written to a uniquely named `.part` sibling first and
//! persisted into place once complete, so a file at the final path is always
//! a full copy, even with several writers for the same destination.

use crate::Origin;
use crate::error::{ErrorKind, Result};
use crate::fetch::{FetcherHandle, Request, Response, file_path};
use exn::ResultExt;
use fontlib_event::{DispatcherHandle, Event, Progress, Total};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Create the parent directory of `dest` and a fresh temporary file next to it.
fn part_file(dest: &Path) -> Result<NamedTempFile> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| ErrorKind::io(e, parent))?;
    let mut builder = tempfile::Builder::new();
    builder.prefix(".fontlib-").suffix(".part");
    // Temporary files default to owner-only; saved fonts are ordinary files.
    #[cfg(unix)]
    builder.permissions(std::os::unix::fs::PermissionsExt::from_mode(0o666));
    let part = builder.tempfile_in(parent).map_err(|e| ErrorKind::io(e, parent))?;
    Ok(part)
}

/// Copy a `file:` origin to `dest`.
pub(crate) async fn copy_local(origin: &str, dest: &Path) -> Result<u64> {
    let source = file_path(origin)?;
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<u64> {
        let mut input = File::open(&source).map_err(|e| ErrorKind::io(e, &source))?;
        let mut part = part_file(&dest)?;
        let copied = std::io::copy(&mut input, part.as_file_mut()).map_err(|e| ErrorKind::io(e, &source))?;
        finish(part, &dest)?;
        Ok(copied)
    })
    .await
    .or_raise(|| ErrorKind::Task)?
}

/// Download `origin` to `dest` in `chunk_size` pieces.
///
/// A [`Progress`] event goes out after every chunk and once more, with
/// [`Total::Complete`], after the file is in place.
pub(crate) async fn download(
    fetcher: &FetcherHandle,
    dispatcher: &DispatcherHandle,
    origin: &Origin,
    dest: &Path,
    chunk_size: usize,
) -> Result<u64> {
    let Response { reader, length, .. } = fetcher.open(&Request::new(&origin.url)).await?;
    let dispatcher = DispatcherHandle::clone(dispatcher);
    let origin = origin.clone();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<u64> {
        let mut part = part_file(&dest)?;
        let total = length.map_or(Total::Unknown, Total::Bytes);
        let progress = |done, total| {
            dispatcher.emit(Event::DownloadProgress(Progress {
                origin: origin.url.clone(),
                name: origin.name.clone(),
                format: origin.format.clone(),
                dest: dest.clone(),
                done,
                total,
            }))
        };
        let done = stream_chunks(reader, part.as_file_mut(), chunk_size.max(1), &origin.url, &dest, |done| {
            progress(done, total)
        })?;
        finish(part, &dest)?;
        progress(done, Total::Complete);
        Ok(done)
    })
    .await
    .or_raise(|| ErrorKind::Task)?
}

fn stream_chunks(
    mut reader: impl Read,
    file: &mut File,
    chunk_size: usize,
    url: &str,
    dest: &Path,
    mut on_chunk: impl FnMut(u64),
) -> Result<u64> {
    let mut buffer = Vec::with_capacity(chunk_size);
    let mut done = 0u64;
    loop {
        buffer.clear();
        let read = reader
            .by_ref()
            .take(chunk_size as u64)
            .read_to_end(&mut buffer)
            .or_raise(|| ErrorKind::Transport(url.to_string()))?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer).map_err(|e| ErrorKind::io(e, dest))?;
        done += read as u64;
        on_chunk(done);
    }
    file.flush().map_err(|e| ErrorKind::io(e, dest))?;
    Ok(done)
}

/// Move a complete `.part` file into place. An unfinished one is removed
/// when dropped.
fn finish(part: NamedTempFile, dest: &Path) -> Result<()> {
    part.persist(dest).map_err(|e| ErrorKind::io(e.error, dest))?;
    Ok(())
}

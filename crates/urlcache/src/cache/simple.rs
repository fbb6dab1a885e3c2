use super::{Origin, ResourceCache, initial_state};
use crate::error::{ErrorKind, Result};
use crate::fetch::FetcherHandle;
use crate::transfer::{copy_local, download};
use async_trait::async_trait;
use exn::ResultExt;
use fontlib_config::DEFAULT_CHUNK_SIZE;
use fontlib_event::DispatcherHandle;
use fontlib_store::{Blob, BlobState, Database, Session, identity_of};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Flat directory of cached copies, one file per origin named after its
/// identity, with blob records kept in the database.
pub struct SimpleCache {
    root: PathBuf,
    db: Database,
    fetcher: FetcherHandle,
    dispatcher: DispatcherHandle,
    chunk_size: usize,
}

impl SimpleCache {
    /// Create a cache rooted at `root` (usually `<workspace>/urlcache`).
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(
        root: impl AsRef<Path>,
        db: Database,
        fetcher: FetcherHandle,
        dispatcher: DispatcherHandle,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        // Only happens once per process, not worth an async constructor.
        std::fs::create_dir_all(&root).map_err(|e| ErrorKind::io(e, &root))?;
        tracing::info!(root = %root.display(), "using simple URL cache");
        Ok(Self { root, db, fetcher, dispatcher, chunk_size: DEFAULT_CHUNK_SIZE })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the cached copy of `origin` lives (whether or not it exists).
    pub fn path_of(&self, origin: &str) -> PathBuf {
        self.root.join(identity_of(origin))
    }

    /// Store the state of `origin` in its own unit of work.
    async fn record(&self, origin: &str, state: BlobState) -> Result<()> {
        let mut session = self.db.session().await.or_raise(|| ErrorKind::Store)?;
        session.save_blob(&Blob::new(origin, state)).await.or_raise(|| ErrorKind::Store)?;
        session.commit().await.or_raise(|| ErrorKind::Store)
    }
}

#[async_trait]
impl ResourceCache for SimpleCache {
    async fn register(&self, session: &mut Session, origin: &str) -> Result<()> {
        let state = self.state_of(origin).await?;
        match session.blob(origin).await.or_raise(|| ErrorKind::Store)? {
            Some(blob) if blob.state == state => Ok(()),
            existing => {
                if existing.is_none() {
                    tracing::debug!(origin, %state, "tracking new blob");
                }
                session.save_blob(&Blob::new(origin, state)).await.or_raise(|| ErrorKind::Store)
            },
        }
    }

    async fn state_of(&self, origin: &str) -> Result<BlobState> {
        let path = self.path_of(origin);
        if tokio::fs::try_exists(&path).await.map_err(|e| ErrorKind::io(e, &path))? {
            return Ok(BlobState::Cached);
        }
        Ok(initial_state(origin))
    }

    #[instrument(skip(self), fields(origin = %origin.url))]
    async fn ensure_cached(&self, origin: &Origin) -> Result<Option<PathBuf>> {
        let path = self.path_of(&origin.url);
        match self.state_of(&origin.url).await? {
            BlobState::Cached => {
                tracing::debug!("already cached");
                return Ok(Some(path));
            },
            BlobState::Local => {
                tracing::debug!("caching from local filesystem");
                copy_local(&origin.url, &path).await?;
            },
            BlobState::Remote => {
                tracing::debug!("caching from remote");
                download(&self.fetcher, &self.dispatcher, origin, &path, self.chunk_size).await?;
            },
        }
        self.record(&origin.url, BlobState::Cached).await?;
        Ok(Some(path))
    }

    async fn save_to(&self, origin: &Origin, dest: &Path) -> Result<()> {
        let path = self.path_of(&origin.url);
        self.ensure_cached(origin).await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| ErrorKind::io(e, parent))?;
        }
        tokio::fs::copy(&path, dest).await.map_err(|e| ErrorKind::io(e, &path))?;
        tracing::info!(origin = %origin.url, dest = %dest.display(), "saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Fetcher, MockFetcher, Request, Response};
    use fontlib_event::{Channel, Dispatcher, Event};
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier, Mutex};

    const REMOTE: &str = "https://fonts.gstatic.com/s/foo/v1/foo.woff2";

    struct Fixture {
        _dir: tempfile::TempDir,
        workspace: PathBuf,
        db: Database,
        fetcher: Arc<MockFetcher>,
        cache: SimpleCache,
        completed: Arc<AtomicUsize>,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().to_path_buf();
        let db = Database::connect_in_memory().await.unwrap();
        let fetcher = Arc::new(MockFetcher::with_resources([(REMOTE, vec![7u8; 3000])]));
        let dispatcher = Arc::new(Dispatcher::default());
        let completed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&completed);
        dispatcher.subscribe(Channel::DownloadProgress, move |event| {
            if let Event::DownloadProgress(p) = event
                && p.total.as_i64() == -1
            {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        let cache = SimpleCache::new(workspace.join("urlcache"), db.clone(), fetcher.clone(), dispatcher)
            .unwrap()
            .with_chunk_size(1024);
        Fixture { _dir: dir, workspace, db, fetcher, cache, completed }
    }

    #[tokio::test]
    async fn test_local_origin_becomes_cached() {
        let f = fixture().await;
        let source = f.workspace.join("dejavu.woff2");
        std::fs::write(&source, b"local font bytes").unwrap();
        let origin = format!("file:{}", source.display());

        assert_eq!(f.cache.state_of(&origin).await.unwrap(), BlobState::Local);
        let path = f.cache.ensure_cached(&Origin::new(&origin)).await.unwrap().unwrap();
        assert_eq!(path, f.workspace.join("urlcache").join(identity_of(&origin)));
        assert_eq!(std::fs::read(&path).unwrap(), b"local font bytes");
        assert_eq!(f.cache.state_of(&origin).await.unwrap(), BlobState::Cached);
        assert_eq!(f.db.blobs().await.unwrap(), vec![Blob::new(&origin, BlobState::Cached)]);
    }

    #[tokio::test]
    async fn test_remote_origin_is_fetched_once() {
        let f = fixture().await;
        let origin = Origin::new(REMOTE);
        f.cache.ensure_cached(&origin).await.unwrap();
        f.cache.ensure_cached(&origin).await.unwrap();
        let dest = f.workspace.join("out/foo.woff2");
        f.cache.save_to(&origin, &dest).await.unwrap();
        f.cache.save_to(&origin, &dest).await.unwrap();
        assert_eq!(f.fetcher.fetch_count(REMOTE), 1);
        assert_eq!(f.completed.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read(&dest).unwrap(), vec![7u8; 3000]);
    }

    #[tokio::test]
    async fn test_deleted_cache_file_is_downloaded_again() {
        let f = fixture().await;
        let origin = Origin::new(REMOTE);
        let path = f.cache.ensure_cached(&origin).await.unwrap().unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(f.cache.state_of(REMOTE).await.unwrap(), BlobState::Remote);
        f.cache.ensure_cached(&origin).await.unwrap();
        assert_eq!(f.fetcher.fetch_count(REMOTE), 2);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let f = fixture().await;
        let mut session = f.db.session().await.unwrap();
        f.cache.register(&mut session, REMOTE).await.unwrap();
        f.cache.register(&mut session, REMOTE).await.unwrap();
        session.commit().await.unwrap();
        assert_eq!(f.db.blobs().await.unwrap(), vec![Blob::new(REMOTE, BlobState::Remote)]);
        assert_eq!(f.fetcher.fetch_count(REMOTE), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let f = fixture().await;
        let err = f.cache.ensure_cached(&Origin::new("https://example.org/missing.ttf")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Transport(_)));
        assert!(f.db.blobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_progress_labels_come_from_origin() {
        let f = fixture().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        f.cache.dispatcher.subscribe(Channel::DownloadProgress, move |event| {
            if let Event::DownloadProgress(p) = event {
                sink.lock().unwrap().push((p.name.clone(), p.format.clone()));
            }
        });
        f.cache.ensure_cached(&Origin::new(REMOTE).with_labels("Foo", "woff2")).await.unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|(name, format)| name == "Foo" && format == "woff2"));
    }

    /// Hands out readers that return their bytes, then block on a shared
    /// barrier before reporting end of stream.
    struct GatedFetcher {
        barrier: Arc<Barrier>,
    }

    struct GatedReader {
        data: Option<&'static [u8]>,
        barrier: Arc<Barrier>,
    }

    impl Read for GatedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.data.take() {
                Some(data) => {
                    buf[..data.len()].copy_from_slice(data);
                    Ok(data.len())
                },
                None => {
                    self.barrier.wait();
                    Ok(0)
                },
            }
        }
    }

    #[async_trait]
    impl Fetcher for GatedFetcher {
        async fn open(&self, _request: &Request) -> crate::error::Result<Response> {
            let reader = GatedReader { data: Some(b"wOF2"), barrier: Arc::clone(&self.barrier) };
            Ok(Response { reader: Box::new(reader), length: Some(4) })
        }
    }

    #[tokio::test]
    async fn test_concurrent_downloads_of_one_origin() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect_in_memory().await.unwrap();
        let fetcher = Arc::new(GatedFetcher { barrier: Arc::new(Barrier::new(2)) });
        let cache = SimpleCache::new(dir.path().join("urlcache"), db.clone(), fetcher, Arc::new(Dispatcher::default()))
            .unwrap()
            .with_chunk_size(4);
        let origin = Origin::new(REMOTE);

        let (first, second) = tokio::join!(cache.ensure_cached(&origin), cache.ensure_cached(&origin));
        let path = first.unwrap().unwrap();
        assert_eq!(second.unwrap().unwrap(), path);
        assert_eq!(std::fs::read(&path).unwrap(), b"wOF2");
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("urlcache")).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(db.blobs().await.unwrap(), vec![Blob::new(REMOTE, BlobState::Cached)]);
    }
}

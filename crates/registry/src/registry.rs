use crate::builtins::Builtins;
use crate::entry_point;
use crate::error::{ErrorKind, Result};
use crate::google::{is_google_font_url, read_google_css};
use exn::ResultExt;
use fontlib_config::{CacheBackend, Config};
use fontlib_css::FontFaceRecord;
use fontlib_event::{DispatcherHandle, Event};
use fontlib_store::{Database, Font, Session, identity_of};
use fontlib_urlcache::{CacheHandle, FetcherHandle, HttpFetcher, NoCache, Origin, Request, SimpleCache};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// The set of known fonts, deduplicated by origin.
///
/// Owns everything it works with: the database, the resource cache, the
/// fetcher used for stylesheets and the dispatcher notifications go to.
pub struct Registry {
    config: Config,
    db: Database,
    cache: CacheHandle,
    fetcher: FetcherHandle,
    dispatcher: DispatcherHandle,
}

impl Registry {
    pub fn new(
        config: Config,
        db: Database,
        cache: CacheHandle,
        fetcher: FetcherHandle,
        dispatcher: DispatcherHandle,
    ) -> Self {
        Self { config, db, cache, fetcher, dispatcher }
    }

    /// Build the cache backend named by `config.cache` on top of `db`.
    pub fn with_configured_cache(
        config: Config,
        db: Database,
        fetcher: FetcherHandle,
        dispatcher: DispatcherHandle,
    ) -> Result<Self> {
        let chunk_size = config.download.chunk_size;
        let cache: CacheHandle = match config.cache {
            CacheBackend::Simple => Arc::new(
                SimpleCache::new(config.cache_root(), db.clone(), fetcher.clone(), dispatcher.clone())
                    .or_raise(|| ErrorKind::Cache)?
                    .with_chunk_size(chunk_size),
            ),
            CacheBackend::None => {
                Arc::new(NoCache::new(fetcher.clone(), dispatcher.clone()).with_chunk_size(chunk_size))
            },
        };
        Ok(Self::new(config, db, cache, fetcher, dispatcher))
    }

    /// Open the workspace database and wire up an HTTP fetcher and the
    /// configured cache.
    pub async fn open(config: Config, dispatcher: DispatcherHandle) -> Result<Self> {
        let path = config.database_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Store)?;
        }
        let db = Database::connect(&path).await.or_raise(|| ErrorKind::Store)?;
        let fetcher: FetcherHandle = Arc::new(HttpFetcher::new(Duration::from_secs(config.download.timeout_secs)));
        Self::with_configured_cache(config, db, fetcher, dispatcher)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn cache(&self) -> &CacheHandle {
        &self.cache
    }

    pub fn dispatcher(&self) -> &DispatcherHandle {
        &self.dispatcher
    }

    /// Merge one record into the registry inside `session`.
    ///
    /// A new origin becomes a new font. A known origin seen under a new name
    /// gains that name as an alias; under a known name nothing changes. The
    /// origin is registered with the cache either way. Records without a URL
    /// are skipped and return `None`.
    pub async fn add_font(&self, session: &mut Session, record: &FontFaceRecord) -> Result<Option<Font>> {
        if record.url.is_empty() {
            tracing::warn!(family = %record.family, stylesheet = %record.stylesheet, "skipping font without url");
            return Ok(None);
        }
        let id = identity_of(&record.url);
        let font = match session.font(&id).await.or_raise(|| ErrorKind::Store)? {
            None => {
                let font = Font::new(&record.url, &record.family)
                    .with_format(record.format.as_deref())
                    .with_unicode_range(record.unicode_range.as_deref());
                session.save_font(&font).await.or_raise(|| ErrorKind::Store)?;
                tracing::debug!(id = %font.id, name = %font.name, origin = %font.origin, "font added");
                self.dispatcher.emit(Event::FontAdded(font.clone()));
                font
            },
            Some(mut font) => {
                let formats_changed = font.merge_formats(record.format.iter());
                let alias_added = !record.family.is_empty() && font.add_alias(&record.family);
                if formats_changed || alias_added {
                    session.save_font(&font).await.or_raise(|| ErrorKind::Store)?;
                }
                if alias_added {
                    tracing::debug!(id = %font.id, name = %font.name, alias = %record.family, "alias added");
                    self.dispatcher.emit(Event::AliasAdded { alias: record.family.clone(), font: font.clone() });
                } else {
                    tracing::info!(id = %font.id, name = %record.family, "font already known");
                }
                font
            },
        };
        self.cache.register(session, &font.origin).await.or_raise(|| ErrorKind::Cache)?;
        Ok(Some(font))
    }

    /// Add every record in one unit of work. Returns how many records were
    /// merged (skipped records don't count).
    async fn add_all(&self, records: &[FontFaceRecord]) -> Result<usize> {
        let mut session = self.db.session().await.or_raise(|| ErrorKind::Store)?;
        let mut count = 0;
        for record in records {
            if self.add_font(&mut session, record).await?.is_some() {
                count += 1;
            }
        }
        session.commit().await.or_raise(|| ErrorKind::Store)?;
        Ok(count)
    }

    /// Fetch the stylesheet at `url` (local or remote) and add the fonts of
    /// its `@font-face` rules.
    #[instrument(skip(self))]
    pub async fn from_css(&self, url: &str) -> Result<usize> {
        let css = self
            .fetcher
            .read_all(&Request::new(url))
            .await
            .or_raise(|| ErrorKind::Stylesheet(url.to_string()))?;
        self.load_stylesheet(url, &css).await
    }

    /// Like [`from_css`](Self::from_css) for the Google Fonts stylesheet API,
    /// requesting every configured format.
    #[instrument(skip(self))]
    pub async fn from_google_css(&self, url: &str) -> Result<usize> {
        let css = read_google_css(&self.fetcher, url, &self.config.google.formats).await?;
        self.load_stylesheet(url, &css).await
    }

    /// Load any stylesheet URL, picking the Google loader when it applies.
    pub async fn load(&self, url: &str) -> Result<usize> {
        if is_google_font_url(url) { self.from_google_css(url).await } else { self.from_css(url).await }
    }

    async fn load_stylesheet(&self, url: &str, css: &[u8]) -> Result<usize> {
        let records = fontlib_css::font_faces(css, url);
        let count = self.add_all(&records).await?;
        tracing::info!(url, rules = records.len(), fonts = count, "loaded stylesheet");
        self.dispatcher.emit(Event::LoadCss(url.to_string()));
        Ok(count)
    }

    /// Add every font file of the plugin source `name`.
    #[instrument(skip(self))]
    pub async fn from_entry_points(&self, name: &str) -> Result<usize> {
        let source = self.config.plugin(name).or_raise(|| ErrorKind::UnknownSource(name.to_string()))?;
        let records = entry_point::records(name, source).await?;
        let count = self.add_all(&records).await?;
        tracing::info!(source = name, fonts = count, "loaded entry point");
        self.dispatcher.emit(Event::LoadEntryPoint(name.to_string()));
        Ok(count)
    }

    /// Write bundled font `name` to the workspace and load its stylesheet.
    pub async fn from_builtin(&self, name: &str) -> Result<usize> {
        let path = Builtins::materialize(name, &self.config.builtin_root()).await?;
        let url = entry_point::file_url(&path)?;
        self.from_css(&url).await
    }

    /// Load every configured source: bundled fonts first, then plugin
    /// sources, then remote stylesheets. A font seen in more than one keeps
    /// the name it was first seen with.
    #[instrument(skip(self))]
    pub async fn init_stack(&self) -> Result<()> {
        let stack = &self.config.fontstack;
        for name in &stack.builtins {
            self.from_builtin(name).await?;
        }
        for name in &stack.entry_points {
            self.from_entry_points(name).await?;
        }
        for url in &stack.remote {
            self.load(url).await?;
        }
        tracing::info!(
            builtins = stack.builtins.len(),
            entry_points = stack.entry_points.len(),
            remote = stack.remote.len(),
            "font stack initialised"
        );
        Ok(())
    }

    /// All fonts, or those answering to `name` (primary name or alias).
    pub async fn list_fonts(&self, name: Option<&str>) -> Result<Vec<Font>> {
        let fonts = match name {
            Some(name) => self.db.fonts_named(name).await,
            None => self.db.fonts().await,
        };
        fonts.or_raise(|| ErrorKind::Store)
    }

    pub async fn get_font(&self, id: &str) -> Result<Option<Font>> {
        self.db.font(id).await.or_raise(|| ErrorKind::Store)
    }

    /// Look up by identity first, then by name. When several fonts share a
    /// name the first registered one wins.
    pub async fn find_font(&self, id_or_name: &str) -> Result<Font> {
        if let Some(font) = self.get_font(id_or_name).await? {
            return Ok(font);
        }
        let fonts = self.list_fonts(Some(id_or_name)).await?;
        if fonts.len() > 1 {
            tracing::warn!(name = id_or_name, count = fonts.len(), "name is ambiguous, using first font");
        }
        match fonts.into_iter().next() {
            Some(font) => Ok(font),
            None => exn::bail!(ErrorKind::FontNotFound(id_or_name.to_string())),
        }
    }

    /// Write the bytes of `font` to `dest`, through the cache.
    #[instrument(skip(self, font), fields(id = %font.id))]
    pub async fn save_font(&self, font: &Font, dest: &Path) -> Result<()> {
        self.cache
            .save_to(&Origin::from(font), dest)
            .await
            .or_raise(|| ErrorKind::Save(font.name.clone(), dest.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fontlib_config::{PluginSource, Sources};
    use fontlib_event::{Channel, Dispatcher};
    use fontlib_store::BlobState;
    use fontlib_urlcache::MockFetcher;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct Fixture {
        _dir: tempfile::TempDir,
        workspace: std::path::PathBuf,
        fetcher: Arc<MockFetcher>,
        registry: Registry,
        events: Arc<Mutex<Vec<Event>>>,
    }

    async fn fixture_with(resources: Vec<(&str, Vec<u8>)>, configure: impl FnOnce(&mut Config)) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().to_path_buf();
        let mut config = Sources::default().with_workspace(Some(&workspace)).load().unwrap();
        configure(&mut config);
        let db = Database::connect_in_memory().await.unwrap();
        let fetcher = Arc::new(MockFetcher::with_resources(resources));
        let dispatcher = Arc::new(Dispatcher::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        for channel in [Channel::FontAdded, Channel::AliasAdded, Channel::LoadCss, Channel::LoadEntryPoint] {
            let events = Arc::clone(&events);
            dispatcher.subscribe(channel, move |event| events.lock().unwrap().push(event.clone()));
        }
        let registry = Registry::with_configured_cache(config, db, fetcher.clone(), dispatcher).unwrap();
        Fixture { _dir: dir, workspace, fetcher, registry, events }
    }

    async fn fixture() -> Fixture {
        fixture_with(vec![], |_| {}).await
    }

    fn record(url: &str, family: &str) -> FontFaceRecord {
        FontFaceRecord { family: family.to_string(), url: url.to_string(), ..FontFaceRecord::default() }
    }

    async fn add(registry: &Registry, record: &FontFaceRecord) -> Option<Font> {
        let mut session = registry.database().session().await.unwrap();
        let font = registry.add_font(&mut session, record).await.unwrap();
        session.commit().await.unwrap();
        font
    }

    #[tokio::test]
    async fn test_same_origin_becomes_alias() {
        let f = fixture().await;
        add(&f.registry, &record("file:/a/dejavu.woff2", "DejaVu Sans")).await;
        add(&f.registry, &record("file:/a/dejavu.woff2", "DejaVu")).await;
        add(&f.registry, &record("file:/a/dejavu.woff2", "DejaVu")).await;
        add(&f.registry, &record("file:/a/dejavu.woff2", "DejaVu Sans")).await;

        let fonts = f.registry.list_fonts(None).await.unwrap();
        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].name, "DejaVu Sans");
        assert_eq!(fonts[0].aliases, vec!["DejaVu"]);
        assert_eq!(fonts[0].id, identity_of("file:/a/dejavu.woff2"));

        let events = f.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Event::FontAdded(font) if font.name == "DejaVu Sans"));
        assert!(matches!(&events[1], Event::AliasAdded { alias, font } if alias == "DejaVu" && font.aliases.len() == 1));
    }

    #[tokio::test]
    async fn test_formats_are_merged() {
        let f = fixture().await;
        let mut first = record("https://cdn/a.font", "A");
        first.format = Some("woff2".to_string());
        let mut second = record("https://cdn/a.font", "A");
        second.format = Some("woff".to_string());
        add(&f.registry, &first).await;
        let font = add(&f.registry, &second).await.unwrap();
        assert_eq!(font.src_formats.into_iter().collect::<Vec<_>>(), vec!["woff", "woff2"]);
    }

    #[tokio::test]
    async fn test_record_without_url_is_skipped() {
        let f = fixture().await;
        assert_eq!(add(&f.registry, &record("", "Nowhere")).await, None);
        assert!(f.registry.list_fonts(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_font_registers_blob() {
        let f = fixture().await;
        add(&f.registry, &record("https://cdn/a.woff2", "A")).await;
        add(&f.registry, &record("file:/a/b.ttf", "B")).await;
        let states: BTreeMap<_, _> =
            f.registry.database().blobs().await.unwrap().into_iter().map(|b| (b.origin, b.state)).collect();
        assert_eq!(states.get("https://cdn/a.woff2"), Some(&BlobState::Remote));
        assert_eq!(states.get("file:/a/b.ttf"), Some(&BlobState::Local));
    }

    #[tokio::test]
    async fn test_panicking_observer_does_not_abort() {
        let f = fixture().await;
        f.registry.dispatcher().subscribe(Channel::FontAdded, |_| panic!("observer failure"));
        add(&f.registry, &record("file:/a/x.ttf", "X")).await;
        add(&f.registry, &record("file:/a/y.ttf", "Y")).await;
        assert_eq!(f.registry.list_fonts(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_from_css() {
        let css = br#"
            @font-face { font-family: "Foo"; src: url(foo.woff2) format("woff2"); unicode-range: U+0-FF; }
            @font-face { font-family: "Broken"; }
            @font-face { font-family: "Foo Alt"; src: url(foo.woff2); }
        "#;
        let f = fixture_with(vec![("https://example.org/css/fonts.css", css.to_vec())], |_| {}).await;
        let count = f.registry.from_css("https://example.org/css/fonts.css").await.unwrap();
        assert_eq!(count, 2);

        let fonts = f.registry.list_fonts(Some("Foo Alt")).await.unwrap();
        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].origin, "https://example.org/css/foo.woff2");
        assert_eq!(fonts[0].name, "Foo");
        assert_eq!(fonts[0].unicode_range.as_deref(), Some("U+0-FF"));
        assert!(matches!(f.events.lock().unwrap().last(), Some(Event::LoadCss(url)) if url.ends_with("fonts.css")));
    }

    #[tokio::test]
    async fn test_from_css_missing_stylesheet() {
        let f = fixture().await;
        let err = f.registry.from_css("https://example.org/missing.css").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Stylesheet(_)));
        assert!(f.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_dispatches_google_urls() {
        let url = "https://fonts.googleapis.com/css?family=Roboto";
        let css = b"@font-face { font-family: 'Roboto'; src: url(https://fonts.gstatic.com/s/roboto/v30/r.woff2) format('woff2'); }";
        let f = fixture_with(vec![(url, css.to_vec())], |_| {}).await;
        assert_eq!(f.registry.load(url).await.unwrap(), 3);
        assert_eq!(f.fetcher.fetch_count(url), 3);
        let fonts = f.registry.list_fonts(Some("Roboto")).await.unwrap();
        assert_eq!(fonts.len(), 1);
        assert!(fonts[0].aliases.is_empty());
    }

    #[tokio::test]
    async fn test_from_entry_points() {
        let f = fixture_with(vec![], |config| {
            let files = BTreeMap::from([
                ("Mono".to_string(), "/fonts/mono.ttf".into()),
                ("Mono Regular".to_string(), "/fonts/mono.ttf".into()),
            ]);
            config.plugins.insert("fonts_ttf".to_string(), PluginSource::Files { files });
        })
        .await;
        assert_eq!(f.registry.from_entry_points("fonts_ttf").await.unwrap(), 2);
        let fonts = f.registry.list_fonts(None).await.unwrap();
        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].origin, "file:///fonts/mono.ttf");
        assert_eq!(fonts[0].name, "Mono");
        assert_eq!(fonts[0].aliases, vec!["Mono Regular"]);
        assert!(fonts[0].src_formats.contains("truetype"));
        assert!(matches!(f.events.lock().unwrap().last(), Some(Event::LoadEntryPoint(name)) if name == "fonts_ttf"));

        let err = f.registry.from_entry_points("fonts_otf").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownSource(name) if name == "fonts_otf"));
    }

    #[tokio::test]
    async fn test_init_stack_bundled_name_wins() {
        let remote = "https://example.org/dejavu.css";
        let css = b"@font-face { font-family: 'DejaVu'; src: url(https://cdn.jsdelivr.net/npm/dejavu-fonts-ttf@2.37.3/ttf/DejaVuSans.ttf); }";
        let f = fixture_with(vec![(remote, css.to_vec())], |config| {
            config.fontstack.builtins = vec!["dejavu".to_string()];
            config.fontstack.remote = vec![remote.to_string()];
        })
        .await;
        f.registry.init_stack().await.unwrap();

        assert!(f.workspace.join("builtin/dejavu/dejavu.css").is_file());
        let fonts = f.registry.list_fonts(Some("DejaVu")).await.unwrap();
        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].name, "DejaVu Sans");
        assert_eq!(fonts[0].aliases, vec!["DejaVu"]);
    }

    #[tokio::test]
    async fn test_init_stack_plugin_before_remote() {
        let remote = "https://example.org/mono.css";
        let css = b"@font-face { font-family: 'Remote Mono'; src: url(file:///fonts/mono.ttf) format('truetype'); }";
        let f = fixture_with(vec![(remote, css.to_vec())], |config| {
            let files = BTreeMap::from([("Plugin Mono".to_string(), "/fonts/mono.ttf".into())]);
            config.plugins.insert("fonts_ttf".to_string(), PluginSource::Files { files });
            config.fontstack.builtins = vec!["cantarell".to_string()];
            config.fontstack.entry_points = vec!["fonts_ttf".to_string()];
            config.fontstack.remote = vec![remote.to_string()];
        })
        .await;
        f.registry.init_stack().await.unwrap();

        let fonts = f.registry.list_fonts(Some("Remote Mono")).await.unwrap();
        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].origin, "file:///fonts/mono.ttf");
        assert_eq!(fonts[0].name, "Plugin Mono");
        assert_eq!(fonts[0].aliases, vec!["Remote Mono"]);

        let loads: Vec<String> = f
            .events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                Event::LoadCss(url) => Some(url.clone()),
                Event::LoadEntryPoint(name) => Some(format!("entry-point:{name}")),
                _ => None,
            })
            .collect();
        assert_eq!(loads.len(), 3);
        assert!(loads[0].ends_with("builtin/cantarell/cantarell.css"));
        assert_eq!(loads[1..], ["entry-point:fonts_ttf".to_string(), remote.to_string()]);
    }

    #[tokio::test]
    async fn test_find_and_save_font() {
        let origin = "https://cdn/foo.woff2";
        let f = fixture_with(vec![(origin, b"font bytes".to_vec())], |_| {}).await;
        add(&f.registry, &record(origin, "Foo")).await;

        let font = f.registry.find_font("Foo").await.unwrap();
        assert_eq!(f.registry.find_font(&font.id).await.unwrap(), font);
        let err = f.registry.find_font("Bar").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::FontNotFound(_)));

        let dest = f.workspace.join("out/foo.woff2");
        f.registry.save_font(&font, &dest).await.unwrap();
        f.registry.save_font(&font, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"font bytes");
        assert_eq!(f.fetcher.fetch_count(origin), 1);
    }

    #[tokio::test]
    async fn test_no_cache_backend() {
        let origin = "https://cdn/foo.woff2";
        let f = fixture_with(vec![(origin, b"font bytes".to_vec())], |config| config.cache = CacheBackend::None).await;
        add(&f.registry, &record(origin, "Foo")).await;
        let font = f.registry.find_font("Foo").await.unwrap();
        let dest = f.workspace.join("foo.woff2");
        f.registry.save_font(&font, &dest).await.unwrap();
        f.registry.save_font(&font, &dest).await.unwrap();
        assert_eq!(f.fetcher.fetch_count(origin), 2);
        assert!(!f.workspace.join("urlcache").exists());
        assert!(f.registry.database().blobs().await.unwrap().is_empty());
    }
}

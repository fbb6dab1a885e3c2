//! Layered configuration for fontlib.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. `<workspace>/fontlib.toml`, when present,
//! 3. an explicit configuration file (TOML, YAML or JSON by extension),
//! 4. `FONTLIB_*` environment variables, nested keys split on `__`,
//! 5. a workspace given on the command line.
//!
//! The workspace is resolved first from every source but the workspace file
//! itself, then the full stack is extracted.

pub mod error;
mod models;

pub use crate::models::*;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the configuration file inside a workspace.
pub const CONFIG_FILE: &str = "fontlib.toml";
/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "FONTLIB_";

const DEFAULT_TEMPLATE: &str = include_str!("../fontlib.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the database, the resource cache and bundled fonts.
    pub workspace: PathBuf,
    /// Database file; relative paths are taken from the workspace.
    pub database: Option<PathBuf>,
    pub cache: CacheBackend,
    pub logging: Logging,
    pub download: Download,
    pub fontstack: FontStack,
    pub plugins: BTreeMap<String, PluginSource>,
    pub google: Google,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            database: None,
            cache: CacheBackend::default(),
            logging: Logging::default(),
            download: Download::default(),
            fontstack: FontStack::default(),
            plugins: BTreeMap::new(),
            google: Google::default(),
        }
    }
}

fn default_workspace() -> PathBuf {
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(".fontlib"),
        None => PathBuf::from(".fontlib"),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

fn raise_figment(err: figment::Error) -> ErrorKind {
    use figment::error::Kind;
    match err.kind {
        Kind::UnknownVariant(..) | Kind::InvalidType(..) | Kind::InvalidValue(..) | Kind::InvalidLength(..) => {
            ErrorKind::Invalid(err.to_string())
        },
        _ => ErrorKind::Load(err.to_string()),
    }
}

/// Where configuration comes from, beyond the defaults and the environment.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    /// Explicit configuration file.
    pub file: Option<PathBuf>,
    /// Workspace override, taking precedence over every other source.
    pub workspace: Option<PathBuf>,
    /// Read `FONTLIB_*` environment variables.
    pub env: bool,
}

impl Sources {
    pub fn new() -> Self {
        Self { env: true, ..Self::default() }
    }

    pub fn with_file(mut self, file: Option<impl Into<PathBuf>>) -> Self {
        self.file = file.map(Into::into);
        self
    }

    pub fn with_workspace(mut self, workspace: Option<impl Into<PathBuf>>) -> Self {
        self.workspace = workspace.map(Into::into);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    fn figment(&self, workspace_file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = workspace_file {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(file) = &self.file {
            if !file.is_file() {
                exn::bail!(ErrorKind::Load(format!("{} is not a file", file.display())));
            }
            figment = match file.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
                Some("toml") => figment.merge(Toml::file(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => exn::bail!(ErrorKind::Load(format!("unknown configuration format: {}", file.display()))),
            };
        }
        if self.env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }
        if let Some(workspace) = &self.workspace {
            figment = figment.merge(Serialized::default("workspace", workspace));
        }
        Ok(figment)
    }

    /// Resolve the workspace, then extract and validate the full configuration.
    pub fn load(&self) -> Result<Config> {
        let workspace: PathBuf =
            self.figment(None)?.extract_inner("workspace").map_err(|e| exn::Exn::from(raise_figment(e)))?;
        let workspace = expand_home(&workspace);
        let workspace_file = workspace.join(CONFIG_FILE);
        let workspace_file = workspace_file.is_file().then_some(workspace_file);
        let mut config: Config = self
            .figment(workspace_file.as_deref())?
            // The workspace file may not move the workspace it was found in.
            .merge(Serialized::default("workspace", &workspace))
            .extract()
            .map_err(|e| exn::Exn::from(raise_figment(e)))?;
        config.workspace = workspace;
        config.database = config.database.map(|p| expand_home(&p));
        config.validate()?;
        tracing::debug!(workspace = %config.workspace.display(), file = ?workspace_file, "configuration loaded");
        Ok(config)
    }
}

impl Config {
    /// Load from the defaults and `FONTLIB_*` environment variables only.
    pub fn load() -> Result<Self> {
        Sources::new().load()
    }

    /// Reject values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.download.chunk_size == 0 {
            exn::bail!(ErrorKind::Invalid("download.chunk_size must be greater than zero".to_string()));
        }
        if self.download.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("download.timeout_secs must be greater than zero".to_string()));
        }
        if self.google.formats.is_empty() {
            exn::bail!(ErrorKind::Invalid("google.formats must not be empty".to_string()));
        }
        for name in &self.fontstack.entry_points {
            if !self.plugins.contains_key(name) {
                tracing::warn!(source = %name, "fontstack entry point has no [plugins] table");
            }
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        match &self.database {
            Some(path) => self.workspace.join(path),
            None => self.workspace.join("fontlib.db"),
        }
    }

    /// Root directory of the resource cache.
    pub fn cache_root(&self) -> PathBuf {
        self.workspace.join("urlcache")
    }

    /// Directory bundled stylesheets are materialized into.
    pub fn builtin_root(&self) -> PathBuf {
        self.workspace.join("builtin")
    }

    /// Look up a plugin source by name.
    pub fn plugin(&self, name: &str) -> Result<&PluginSource> {
        self.plugins
            .get(name)
            .ok_or_raise(|| ErrorKind::Invalid(format!("no plugin source named {name:?}")))
    }

    /// Create the workspace directory and write the default configuration
    /// file unless one already exists. Returns the configuration file path.
    pub fn init_workspace(&self) -> Result<PathBuf> {
        let raise = || ErrorKind::Workspace(self.workspace.clone());
        std::fs::create_dir_all(&self.workspace).or_raise(raise)?;
        let path = self.workspace.join(CONFIG_FILE);
        if path.exists() {
            tracing::info!(path = %path.display(), "workspace configuration already present");
        } else {
            std::fs::write(&path, DEFAULT_TEMPLATE).or_raise(raise)?;
            tracing::info!(path = %path.display(), "wrote default workspace configuration");
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sources(workspace: &Path) -> Sources {
        Sources::new().without_env().with_workspace(Some(workspace))
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = sources(dir.path()).load().unwrap();
        assert_eq!(config.workspace, dir.path());
        assert_eq!(config.cache, CacheBackend::Simple);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.download.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.fontstack.builtins, vec!["cantarell", "dejavu"]);
        assert_eq!(config.google.formats, vec![GoogleFormat::Woff2, GoogleFormat::Ttf, GoogleFormat::Svg]);
        assert_eq!(config.database_path(), dir.path().join("fontlib.db"));
        assert_eq!(config.cache_root(), dir.path().join("urlcache"));
    }

    #[test]
    fn test_default_template_matches_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = sources(dir.path()).load().unwrap();
        config.init_workspace().unwrap();
        assert_eq!(sources(dir.path()).load().unwrap(), config);
    }

    #[test]
    fn test_init_workspace_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "cache = \"none\"\n").unwrap();
        let config = sources(dir.path()).load().unwrap();
        assert_eq!(config.cache, CacheBackend::None);
        let path = config.init_workspace().unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "cache = \"none\"\n");
    }

    #[test]
    fn test_explicit_file_overrides_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[download]\nchunk_size = 10\ntimeout_secs = 5\n").unwrap();
        let file = dir.path().join("extra.yaml");
        std::fs::write(
            &file,
            "download:\n  chunk_size: 20\nplugins:\n  mine:\n    directory: /usr/share/fonts\n  listed:\n    files:\n      Foo: /tmp/foo.ttf\n",
        )
        .unwrap();
        let config = sources(dir.path()).with_file(Some(&file)).load().unwrap();
        assert_eq!(config.download.chunk_size, 20);
        assert_eq!(config.download.timeout_secs, 5);
        assert_eq!(config.plugin("mine").unwrap(), &PluginSource::Directory { directory: "/usr/share/fonts".into() });
        let PluginSource::Files { files } = config.plugin("listed").unwrap() else {
            panic!("expected a files table");
        };
        assert_eq!(files.get("Foo"), Some(&PathBuf::from("/tmp/foo.ttf")));
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.json");
        std::fs::write(&file, r#"{"google": {"formats": ["ttf"]}, "database": "other.sqlite"}"#).unwrap();
        let config = sources(dir.path()).with_file(Some(&file)).load().unwrap();
        assert_eq!(config.google.formats, vec![GoogleFormat::Ttf]);
        assert_eq!(config.database_path(), dir.path().join("other.sqlite"));
    }

    #[rstest]
    #[case("cache = \"s3\"\n")]
    #[case("[logging]\nlevel = \"loud\"\n")]
    #[case("[google]\nformats = [\"woff\"]\n")]
    #[case("[download]\nchunk_size = 0\n")]
    fn test_invalid_values(#[case] toml: &str) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), toml).unwrap();
        let err = sources(dir.path()).load().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)), "{err:?}");
    }

    #[rstest]
    #[case("config.ini")]
    #[case("missing.toml")]
    fn test_unusable_file(#[case] name: &str) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(name);
        if name.ends_with(".ini") {
            std::fs::write(&file, "cache=none").unwrap();
        }
        let err = sources(dir.path()).with_file(Some(&file)).load().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load(_)));
    }

    #[test]
    fn test_unknown_plugin() {
        let err = Config::default().plugin("nope").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("/abs/path")), PathBuf::from("/abs/path"));
        if let Some(dirs) = directories::BaseDirs::new() {
            assert_eq!(expand_home(Path::new("~/.fontlib")), dirs.home_dir().join(".fontlib"));
        }
    }
}

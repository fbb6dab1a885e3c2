mod cli;
mod error;

/// `println!` that stops quietly when stdout is a closed pipe.
macro_rules! outln {
    ($($arg:tt)*) => {
        $crate::write_line(&mut std::io::stdout().lock(), format_args!($($arg)*))
    };
}

use crate::cli::{Cli, Command, WorkspaceCommand};
use crate::error::{ErrorKind, Result, one_line};
use clap::Parser;
use exn::ResultExt;
use fontlib_config::{CONFIG_FILE, CacheBackend, Config, LogLevel, Sources};
use fontlib_event::{Channel, Dispatcher, Event, Total};
use fontlib_registry::Registry;
use fontlib_store::Font;
use std::fmt;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let debug = cli.debug;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if debug {
                eprintln!("error: {err:?}");
            } else {
                eprintln!("error: {}", one_line(&err));
            }
            ExitCode::FAILURE
        },
    }
}

/// Write one line to `out`. A reader that went away early is not an error.
fn write_line(out: &mut impl Write, args: fmt::Arguments<'_>) {
    if let Err(err) = writeln!(out, "{args}")
        && err.kind() != io::ErrorKind::BrokenPipe
    {
        tracing::warn!(%err, "cannot write to stdout");
    }
}

fn init_logging(level: LogLevel, debug: bool) {
    let default = if debug { LogLevel::Debug } else { level };
    let filter = if debug {
        EnvFilter::new(default.to_string())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default.to_string()))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Sources::new()
        .with_file(cli.config.as_ref())
        .with_workspace(cli.workspace.as_ref())
        .load()
        .or_raise(|| ErrorKind::Config)?;
    init_logging(config.logging.level, cli.debug);
    tracing::debug!(workspace = %config.workspace.display(), command = ?cli.command, "starting");

    match cli.command {
        Command::Version => {
            outln!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(())
        },
        Command::Workspace(WorkspaceCommand::Info) => {
            workspace_info(&config);
            Ok(())
        },
        Command::Workspace(WorkspaceCommand::Init) => {
            let path = config.init_workspace().or_raise(|| ErrorKind::Command("workspace init"))?;
            outln!("{}", path.display());
            Ok(())
        },
        Command::InitStack => {
            let registry = open(config).await?;
            registry.init_stack().await.or_raise(|| ErrorKind::Command("init-stack"))
        },
        Command::Load { url } => {
            let registry = open(config).await?;
            let count = registry.load(&url).await.or_raise(|| ErrorKind::Command("load"))?;
            outln!("{count} font(s) from {url}");
            Ok(())
        },
        Command::EntryPoint { name } => {
            let registry = open(config).await?;
            let count = registry.from_entry_points(&name).await.or_raise(|| ErrorKind::Command("entry-point"))?;
            outln!("{count} font(s) from {name}");
            Ok(())
        },
        Command::List { name } => {
            let registry = open(config).await?;
            let fonts = registry.list_fonts(name.as_deref()).await.or_raise(|| ErrorKind::Command("list"))?;
            for font in &fonts {
                outln!("{}", describe(font));
            }
            Ok(())
        },
        Command::Save { font, dest, no_cache } => {
            if no_cache {
                config.cache = CacheBackend::None;
            }
            let registry = open(config).await?;
            let font = registry.find_font(&font).await.or_raise(|| ErrorKind::Command("save"))?;
            registry.save_font(&font, &dest).await.or_raise(|| ErrorKind::Command("save"))?;
            outln!("{} -> {}", font.name, dest.display());
            Ok(())
        },
    }
}

async fn open(config: Config) -> Result<Registry> {
    let dispatcher = Arc::new(Dispatcher::default());
    subscribe(&dispatcher);
    Registry::open(config, dispatcher).await.or_raise(|| ErrorKind::Open)
}

/// Echo registry notifications to stdout and download progress to stderr.
fn subscribe(dispatcher: &Dispatcher) {
    dispatcher.subscribe(Channel::FontAdded, |event| {
        if let Event::FontAdded(font) = event {
            outln!("added {} ({})", font.name, font.id);
        }
    });
    dispatcher.subscribe(Channel::AliasAdded, |event| {
        if let Event::AliasAdded { alias, font } = event {
            outln!("alias {alias} for {} ({})", font.name, font.id);
        }
    });
    dispatcher.subscribe(Channel::LoadCss, |event| {
        if let Event::LoadCss(url) = event {
            outln!("loaded {url}");
        }
    });
    dispatcher.subscribe(Channel::LoadEntryPoint, |event| {
        if let Event::LoadEntryPoint(name) = event {
            outln!("loaded entry point {name}");
        }
    });
    dispatcher.subscribe(Channel::DownloadProgress, |event| {
        let Event::DownloadProgress(progress) = event else {
            return;
        };
        let label = if progress.name.is_empty() { progress.origin.as_str() } else { progress.name.as_str() };
        let mut stderr = std::io::stderr().lock();
        let _ = match progress.total {
            Total::Bytes(total) => write!(stderr, "\r{label} [{}]: {}/{total} bytes", progress.format, progress.done),
            Total::Unknown => write!(stderr, "\r{label} [{}]: {} bytes", progress.format, progress.done),
            Total::Complete => writeln!(stderr, "\r{label} [{}]: {} bytes, done", progress.format, progress.done),
        };
    });
}

fn workspace_info(config: &Config) {
    let config_file = config.workspace.join(CONFIG_FILE);
    outln!("workspace: {}", config.workspace.display());
    outln!(
        "config:    {}{}",
        config_file.display(),
        if config_file.is_file() { "" } else { " (missing, using defaults)" }
    );
    outln!("database:  {}", config.database_path().display());
    outln!("cache:     {} ({})", config.cache_root().display(), config.cache);
    outln!("builtins:  {}", config.builtin_root().display());
}

fn describe(font: &Font) -> String {
    let mut line = format!("{}  {}", font.id, font.name);
    if !font.aliases.is_empty() {
        line.push_str(&format!(" (aka {})", font.aliases.join(", ")));
    }
    if !font.src_formats.is_empty() {
        let formats: Vec<&str> = font.src_formats.iter().map(String::as_str).collect();
        line.push_str(&format!(" [{}]", formats.join(", ")));
    }
    line.push_str(&format!("  {}", font.origin));
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_line() {
        let mut out = Vec::new();
        write_line(&mut out, format_args!("{} font(s)", 3));
        assert_eq!(out, b"3 font(s)\n");
        // Must not panic the way `println!` does.
        write_line(&mut ClosedPipe, format_args!("ignored"));
    }

    #[test]
    fn test_describe() {
        let mut font = Font::new("file:/a/dejavu.woff2", "DejaVu Sans").with_format(Some("woff2"));
        assert_eq!(describe(&font), format!("{}  DejaVu Sans [woff2]  file:/a/dejavu.woff2", font.id));
        font.add_alias("DejaVu");
        assert!(describe(&font).contains("(aka DejaVu)"));
    }
}

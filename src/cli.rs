use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fontlib", version, about = "Collect, deduplicate and cache web fonts")]
pub struct Cli {
    /// Log at debug level, regardless of configuration.
    #[arg(long, global = true)]
    pub debug: bool,
    /// Configuration file (TOML, YAML or JSON).
    #[arg(long, global = true, env = "FONTLIB_CONFIG")]
    pub config: Option<PathBuf>,
    /// Workspace directory [default: ~/.fontlib]
    #[arg(long, global = true, env = "FONTLIB_WORKSPACE")]
    pub workspace: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print version information.
    Version,
    /// Inspect or create the workspace.
    #[command(subcommand)]
    Workspace(WorkspaceCommand),
    /// Load bundled fonts, plugin sources and remote stylesheets.
    InitStack,
    /// Load the @font-face rules of a stylesheet (file or URL).
    Load { url: String },
    /// Load the font files of a plugin source.
    EntryPoint { name: String },
    /// List known fonts, optionally only those answering to NAME.
    List { name: Option<String> },
    /// Save a font, looked up by id or name, to DEST.
    Save {
        font: String,
        dest: PathBuf,
        /// Download straight to DEST instead of going through the cache.
        #[arg(long)]
        no_cache: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum WorkspaceCommand {
    /// Show where things are kept.
    Info,
    /// Create the workspace and its default configuration file.
    Init,
}

//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shellkeep - offline shell cache for the options calculator
///
/// Precaches the application shell into a versioned namespace and answers
/// requests cache-first for static assets and network-first for the API.
#[derive(Parser, Debug)]
#[command(name = "shellkeep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SHELLKEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .shellkeep.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Precache the configured build and make it current
    Install(InstallArgs),

    /// Activate an installed build, removing stale namespaces
    Activate,

    /// Route one request through the worker
    Fetch(FetchArgs),

    /// Inspect or clear cache namespaces
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Show the configured build and what the store holds
    Status,
}

/// Arguments for the install command
#[derive(Parser, Debug)]
pub struct InstallArgs {
    /// Fail every network request (exercises the failure path)
    #[arg(long)]
    pub offline: bool,

    /// Stop after install; leave older namespaces in place
    #[arg(long)]
    pub no_activate: bool,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Absolute URL, or a path resolved against the configured origin
    pub target: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Treat the network as unreachable
    #[arg(long)]
    pub offline: bool,

    /// Print the response body
    #[arg(short, long)]
    pub include_body: bool,
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List namespaces
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List the entries of one namespace
    Show {
        /// Namespace to show (defaults to the configured one)
        namespace: Option<String>,
    },

    /// Delete every namespace
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

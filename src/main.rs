//! Shellkeep - offline shell cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use shellkeep::cli::{Cli, Commands};
use shellkeep::config::ConfigManager;
use shellkeep::error::{ShellkeepError, ShellkeepResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ShellkeepResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| ShellkeepError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    init_logging(cli.verbose, &config.general.log_format);
    if let Some(ref path) = local_config_path {
        debug!("Merged local config: {}", path.display());
    }

    ConfigManager::ensure_state_dirs(&config).await?;

    match cli.command {
        Commands::Install(args) => shellkeep::cli::commands::install(args, &config).await,
        Commands::Activate => shellkeep::cli::commands::activate(&config).await,
        Commands::Fetch(args) => shellkeep::cli::commands::fetch(args, &config).await,
        Commands::Cache(args) => shellkeep::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            shellkeep::cli::commands::config(args, &config, &config_manager).await
        }
        Commands::Status => shellkeep::cli::commands::status(&config).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `json` switches to structured output
fn init_logging(verbose: u8, format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("shellkeep=warn"),
        1 => EnvFilter::new("shellkeep=info"),
        _ => EnvFilter::new("shellkeep=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

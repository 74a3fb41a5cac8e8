use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hb_cli::commands::{ingest, languages, status, summary};
use hb_cli::{Cli, Commands, Config};

/// Load config, ensuring the database's parent directory exists.
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so command output stays machine-readable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::Ingest(args)) => {
            let config = load_config(cli.config.as_deref())?;
            let report = ingest::run(&mut stdout, args, &config)?;
            tracing::debug!(?report, "ingest finished");
        }
        Some(Commands::Summary(args)) => {
            let config = load_config(cli.config.as_deref())?;
            summary::run(&mut stdout, args, &config)?;
        }
        Some(Commands::Status(args)) => {
            let config = load_config(cli.config.as_deref())?;
            status::run(&mut stdout, args, &config)?;
        }
        Some(Commands::Languages) => {
            let config = Config::load_from(cli.config.as_deref())
                .context("failed to load configuration")?;
            languages::run(&mut stdout, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}

//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::ingest::IngestArgs;
use crate::commands::status::StatusArgs;
use crate::commands::summary::SummaryArgs;

/// Heartbeat ingestion and summaries.
///
/// Normalizes, deduplicates and stores activity heartbeats reported by
/// editor and browser plugins.
#[derive(Debug, Parser)]
#[command(name = "hb", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest heartbeats from JSON lines.
    Ingest(IngestArgs),

    /// Count heartbeats per project, language, editor, etc.
    Summary(SummaryArgs),

    /// Show stored heartbeat totals for a user.
    Status(StatusArgs),

    /// Print the effective language mapping table.
    Languages,
}

//! Summary command for counting heartbeats per grouping key.
//!
//! Implements `hb summary --by <dimension>` over a half-open time range,
//! with human-readable and JSON output.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use hb_core::{CustomTime, SummaryDimension, tally_keys};
use hb_db::Database;
use serde::Serialize;

use super::util::parse_time;
use crate::Config;

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// ID of the user to summarize.
    #[arg(long)]
    pub user: String,

    /// Dimension to group by (project, language, editor, os, machine, branch, entity, category).
    #[arg(long, default_value = "project")]
    pub by: SummaryDimension,

    /// Start of the range (ISO 8601 or relative like "2 days ago").
    #[arg(long, default_value = "7 days ago")]
    pub since: String,

    /// End of the range, exclusive.
    #[arg(long, default_value = "now")]
    pub until: String,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Heartbeat counts for one user, dimension and time range.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub user: String,
    pub dimension: SummaryDimension,
    pub start: CustomTime,
    pub end: CustomTime,
    pub total: usize,
    pub keys: Vec<KeyTotal>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct KeyTotal {
    pub key: String,
    pub count: usize,
}

/// Builds a summary from stored heartbeats.
///
/// Keys are ordered by count descending, then key.
pub fn build_summary(
    db: &Database,
    user: &str,
    dimension: SummaryDimension,
    start: CustomTime,
    end: CustomTime,
) -> Result<Summary> {
    let heartbeats = db.list_heartbeats(user, start, end)?;
    let mut keys: Vec<KeyTotal> = tally_keys(&heartbeats, dimension)
        .into_iter()
        .map(|(key, count)| KeyTotal { key, count })
        .collect();
    // BTreeMap iteration is already key-ordered; a stable sort keeps that for ties.
    keys.sort_by(|a, b| b.count.cmp(&a.count));

    Ok(Summary {
        user: user.to_string(),
        dimension,
        start,
        end,
        total: heartbeats.len(),
        keys,
    })
}

/// Renders a summary for the terminal.
pub fn format_summary(summary: &Summary) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Heartbeats by {} ({} to {})",
        summary.dimension,
        summary.start.to_rfc3339(),
        summary.end.to_rfc3339()
    );
    if summary.keys.is_empty() {
        let _ = writeln!(output, "No heartbeats in range.");
        return output;
    }
    for entry in &summary.keys {
        let _ = writeln!(output, "- {}: {}", entry.key, entry.count);
    }
    let _ = writeln!(output, "Total: {}", summary.total);
    output
}

pub fn run<W: Write>(writer: &mut W, args: &SummaryArgs, config: &Config) -> Result<()> {
    let now = Utc::now();
    let start = parse_time(&args.since, now).context("invalid --since")?;
    let end = parse_time(&args.until, now).context("invalid --until")?;
    if end < start {
        anyhow::bail!("--until ({end}) is before --since ({start})");
    }

    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let summary = build_summary(&db, &args.user, args.by, start, end)?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&summary)?)?;
    } else {
        write!(writer, "{}", format_summary(&summary))?;
    }
    Ok(())
}

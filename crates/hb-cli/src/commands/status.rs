//! Status command for showing stored heartbeat totals.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use hb_core::SummaryDimension;
use hb_db::Database;

use crate::Config;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// ID of the user to report on.
    #[arg(long)]
    pub user: String,

    /// Number of projects to list.
    #[arg(long, default_value_t = 5)]
    pub top: usize,
}

pub fn run<W: Write>(writer: &mut W, args: &StatusArgs, config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;

    writeln!(writer, "Heartbeat status for {}", args.user)?;
    writeln!(writer, "Database: {}", config.database_path.display())?;

    let Some(last) = db.last_heartbeat_time(&args.user)? else {
        writeln!(writer, "No heartbeats recorded.")?;
        return Ok(());
    };

    writeln!(writer, "Heartbeats: {}", db.count_heartbeats(&args.user)?)?;
    writeln!(writer, "Last heartbeat: {}", last.to_rfc3339())?;

    let projects = db.count_by_dimension(&args.user, SummaryDimension::Project)?;
    writeln!(writer, "Top projects:")?;
    for project in projects.iter().take(args.top) {
        writeln!(writer, "- {}: {}", project.key, project.count)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use hb_core::{CustomTime, Heartbeat};
    use insta::assert_snapshot;

    fn heartbeat(entity: &str, project: &str, minute: u32) -> Heartbeat {
        let mut heartbeat = Heartbeat {
            user_id: "alice".to_string(),
            entity: entity.to_string(),
            project: project.to_string(),
            time: CustomTime::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, minute, 0).unwrap()),
            ..Heartbeat::default()
        };
        heartbeat.hashed();
        heartbeat
    }

    fn config(temp: &tempfile::TempDir) -> Config {
        Config {
            database_path: temp.path().join("hb.db"),
            heartbeat_max_age_hours: 4320,
            language_mappings: BTreeMap::new(),
        }
    }

    #[test]
    fn status_lists_totals_and_top_projects() {
        let temp = tempfile::tempdir().unwrap();
        let config = config(&temp);
        let mut db = Database::open(&config.database_path).unwrap();
        db.insert_heartbeats(&[
            heartbeat("a.rs", "hb", 0),
            heartbeat("b.rs", "hb", 1),
            heartbeat("c.go", "wakapi", 2),
            heartbeat("d.py", "scripts", 3),
        ])
        .unwrap();

        let args = StatusArgs {
            user: "alice".to_string(),
            top: 2,
        };
        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&config.database_path.display().to_string(), "[TEMP]/hb.db");
        assert_snapshot!(output, @r"
        Heartbeat status for alice
        Database: [TEMP]/hb.db
        Heartbeats: 4
        Last heartbeat: 2025-01-01T00:03:00.000Z
        Top projects:
        - hb: 2
        - scripts: 1
        ");
    }

    #[test]
    fn status_without_heartbeats() {
        let temp = tempfile::tempdir().unwrap();
        let config = config(&temp);
        let args = StatusArgs {
            user: "alice".to_string(),
            top: 5,
        };

        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.ends_with("No heartbeats recorded.\n"));
    }
}

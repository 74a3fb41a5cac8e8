//! Ingest command for storing plugin heartbeats.
//!
//! Reads one heartbeat per line (JSON, plugin field names), attaches the
//! user, runs the normalization pipeline and inserts what survives.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hb_core::{CustomTime, Heartbeat, IngestReport, User, UserId};
use hb_db::Database;
use serde::Deserialize;

use crate::Config;

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// ID of the user the heartbeats belong to.
    #[arg(long)]
    pub user: String,

    /// Read heartbeats from this file instead of stdin.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Mark heartbeats as imported from another service (e.g. "wakatime").
    ///
    /// A per-line `id` is then kept as the heartbeat's origin ID.
    #[arg(long)]
    pub origin: Option<String>,

    /// Machine name for heartbeats that omit one. Defaults to the host name.
    #[arg(long)]
    pub machine: Option<String>,

    /// User agent for heartbeats that omit one.
    #[arg(long)]
    pub user_agent: Option<String>,
}

pub fn run<W: Write>(writer: &mut W, args: &IngestArgs, config: &Config) -> Result<IngestReport> {
    let user = User::new(UserId::new(args.user.clone()).context("invalid --user")?);

    let submissions = match &args.input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            parse_submissions(BufReader::new(file))?
        }
        None => parse_submissions(io::stdin().lock())?,
    };

    let defaults = SubmissionDefaults {
        machine: args.machine.clone().or_else(host_name).unwrap_or_default(),
        user_agent: args.user_agent.clone().unwrap_or_default(),
        origin: args.origin.clone(),
    };
    let heartbeats: Vec<Heartbeat> = submissions
        .into_iter()
        .map(|submission| submission.into_heartbeat(&user, &defaults))
        .collect();
    tracing::debug!(count = heartbeats.len(), user = %user.id, "parsed heartbeats");

    let mut db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let report = hb_core::ingest(
        &mut db,
        heartbeats,
        &config.language_mappings(),
        &config.pipeline_config(),
        CustomTime::now(),
    )?;

    writeln!(
        writer,
        "Accepted {} heartbeats ({} duplicates, {} rejected: {} invalid, {} untimely)",
        report.accepted,
        report.duplicates,
        report.rejected(),
        report.invalid,
        report.untimely
    )?;
    Ok(report)
}

fn host_name() -> Option<String> {
    hostname::get().ok().and_then(|name| name.into_string().ok())
}

/// Values applied to every heartbeat in one ingest run.
struct SubmissionDefaults {
    machine: String,
    user_agent: String,
    origin: Option<String>,
}

/// One input line: a plugin heartbeat plus an optional upstream ID.
#[derive(Debug, Deserialize)]
struct Submission {
    #[serde(default)]
    id: Option<String>,
    #[serde(flatten)]
    heartbeat: Heartbeat,
}

impl Submission {
    fn into_heartbeat(self, user: &User, defaults: &SubmissionDefaults) -> Heartbeat {
        let mut heartbeat = self.heartbeat.with_user(user.clone());
        if heartbeat.machine.is_empty() {
            heartbeat.machine.clone_from(&defaults.machine);
        }
        if heartbeat.user_agent.is_empty() {
            heartbeat.user_agent.clone_from(&defaults.user_agent);
        }
        if let Some(origin) = &defaults.origin {
            heartbeat.origin.clone_from(origin);
            heartbeat.origin_id = self.id.unwrap_or_default();
        }
        heartbeat
    }
}

fn parse_submissions<R: BufRead>(reader: R) -> Result<Vec<Submission>> {
    let mut submissions = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let submission: Submission = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid heartbeat on line {}", idx + 1))?;
        submissions.push(submission);
    }
    Ok(submissions)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;
    use std::io::Cursor;

    use chrono::{TimeDelta, Utc};
    use hb_core::SummaryDimension;

    fn alice() -> User {
        User::new(UserId::new("alice").unwrap())
    }

    fn defaults(origin: Option<&str>) -> SubmissionDefaults {
        SubmissionDefaults {
            machine: "devbox".to_string(),
            user_agent: "wakatime/v1.90.0".to_string(),
            origin: origin.map(str::to_string),
        }
    }

    fn seconds_ago(seconds: i64) -> f64 {
        CustomTime::new(Utc::now() - TimeDelta::seconds(seconds)).unix_seconds()
    }

    fn test_config(temp: &tempfile::TempDir) -> Config {
        Config {
            database_path: temp.path().join("hb.db"),
            heartbeat_max_age_hours: 4320,
            language_mappings: BTreeMap::from([("rs".to_string(), "Rust".to_string())]),
        }
    }

    #[test]
    fn parse_skips_blank_lines() {
        let input = "{\"entity\":\"a.rs\",\"time\":1700000000}\n\n   \n{\"entity\":\"b.rs\",\"time\":1700000001}\n";
        let submissions = parse_submissions(Cursor::new(input)).unwrap();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[1].heartbeat.entity, "b.rs");
    }

    #[test]
    fn parse_reports_line_number() {
        let input = "{\"entity\":\"a.rs\"}\nnot json\n";
        let err = parse_submissions(Cursor::new(input)).unwrap_err();
        assert!(err.to_string().contains("invalid heartbeat on line 2"));
    }

    #[test]
    fn defaults_fill_missing_client_fields() {
        let input = r#"{"id":"up-1","entity":"a.rs","machine":"laptop","time":1700000000}"#;
        let submission = parse_submissions(Cursor::new(input)).unwrap().remove(0);
        let heartbeat = submission.into_heartbeat(&alice(), &defaults(None));

        assert_eq!(heartbeat.user_id, "alice");
        assert!(heartbeat.valid());
        assert_eq!(heartbeat.machine, "laptop");
        assert_eq!(heartbeat.user_agent, "wakatime/v1.90.0");
        assert_eq!(heartbeat.origin, "");
        assert_eq!(heartbeat.origin_id, "");
    }

    #[test]
    fn origin_keeps_upstream_id() {
        let input = r#"{"id":"up-1","entity":"a.rs","time":1700000000}"#;
        let submission = parse_submissions(Cursor::new(input)).unwrap().remove(0);
        let heartbeat = submission.into_heartbeat(&alice(), &defaults(Some("wakatime")));

        assert_eq!(heartbeat.machine, "devbox");
        assert_eq!(heartbeat.origin, "wakatime");
        assert_eq!(heartbeat.origin_id, "up-1");
    }

    #[test]
    fn run_stores_accepted_heartbeats_once() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(&temp);
        let input_path = temp.path().join("heartbeats.jsonl");
        let lines = [
            serde_json::json!({
                "entity": "src/main.rs",
                "type": "file",
                "project": "hb",
                "editor": "vscode",
                "time": seconds_ago(120),
            }),
            serde_json::json!({
                "entity": "https://example.com",
                "type": "url",
                "project": "<<LAST_PROJECT>>",
                "time": seconds_ago(60),
            }),
            serde_json::json!({
                "entity": "src/lib.rs",
                "time": 0,
            }),
        ];
        let content: String = lines.iter().map(|line| format!("{line}\n")).collect();
        std::fs::write(&input_path, content).unwrap();

        let args = IngestArgs {
            user: "alice".to_string(),
            input: Some(input_path),
            origin: None,
            machine: Some("devbox".to_string()),
            user_agent: None,
        };

        let mut output = Vec::new();
        let report = run(&mut output, &args, &config).unwrap();
        assert_eq!(report.accepted, 2);
        assert_eq!(report.invalid, 1);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Accepted 2 heartbeats (0 duplicates, 1 rejected: 1 invalid, 0 untimely)\n"
        );

        let mut output = Vec::new();
        let report = run(&mut output, &args, &config).unwrap();
        assert_eq!(report.accepted, 0);
        assert_eq!(report.duplicates, 2);

        let db = Database::open(&config.database_path).unwrap();
        let projects = db
            .count_by_dimension("alice", SummaryDimension::Project)
            .unwrap();
        let keys: Vec<_> = projects.iter().map(|c| (c.key.as_str(), c.count)).collect();
        assert_eq!(keys, vec![("hb", 1), ("unknown", 1)]);

        let editors = db
            .count_by_dimension("alice", SummaryDimension::Editor)
            .unwrap();
        assert!(editors.iter().any(|c| c.key == "Vscode"));
    }

    #[test]
    fn run_accepts_null_plugin_fields() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(&temp);
        let input_path = temp.path().join("heartbeats.jsonl");
        let line = serde_json::json!({
            "id": null,
            "entity": "src/main.rs",
            "type": "file",
            "project": "hb",
            "branch": null,
            "language": null,
            "lineno": null,
            "dependencies": null,
            "time": seconds_ago(30),
        });
        std::fs::write(&input_path, format!("{line}\n")).unwrap();

        let args = IngestArgs {
            user: "alice".to_string(),
            input: Some(input_path),
            origin: Some("wakatime".to_string()),
            machine: Some("devbox".to_string()),
            user_agent: None,
        };
        let report = run(&mut Vec::new(), &args, &config).unwrap();
        assert_eq!(report.accepted, 1);

        let db = Database::open(&config.database_path).unwrap();
        let languages = db
            .count_by_dimension("alice", SummaryDimension::Language)
            .unwrap();
        assert_eq!(languages[0].key, "Rust");
        let branches = db
            .count_by_dimension("alice", SummaryDimension::Branch)
            .unwrap();
        assert_eq!(branches[0].key, "unknown");
    }

    #[test]
    fn run_rejects_empty_user() {
        let temp = tempfile::tempdir().unwrap();
        let args = IngestArgs {
            user: String::new(),
            input: None,
            origin: None,
            machine: None,
            user_agent: None,
        };
        let err = run(&mut Vec::new(), &args, &test_config(&temp)).unwrap_err();
        assert!(err.to_string().contains("invalid --user"));
    }
}

//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use hb_core::CustomTime;
use regex::Regex;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Parse a time argument relative to `now`.
///
/// Supports:
/// - `now`
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_time(s: &str, now: DateTime<Utc>) -> anyhow::Result<CustomTime> {
    let s = s.trim();
    if s == "now" {
        return Ok(CustomTime::new(now));
    }

    if let Ok(time) = CustomTime::parse_rfc3339(s) {
        return Ok(time);
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid time: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let offset = match &caps[2] {
        "minute" => TimeDelta::try_minutes(n),
        "hour" => TimeDelta::try_hours(n),
        "day" => TimeDelta::try_days(n),
        "week" => TimeDelta::try_weeks(n),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    let time = offset
        .and_then(|offset| now.checked_sub_signed(offset))
        .with_context(|| format!("Relative time value too large: {n} {}", &caps[2]))?;
    Ok(CustomTime::new(time))
}

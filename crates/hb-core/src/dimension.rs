//! Summary dimensions and grouping-key extraction.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::heartbeat::Heartbeat;
use crate::types::ValidationError;

/// Grouping key used when a heartbeat's value for a dimension is empty.
pub const UNKNOWN_SUMMARY_KEY: &str = "unknown";

/// An axis along which heartbeats are grouped into summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryDimension {
    Project,
    Editor,
    Language,
    OperatingSystem,
    Machine,
    Branch,
    Entity,
    Category,
}

impl SummaryDimension {
    pub const ALL: [Self; 8] = [
        Self::Project,
        Self::Editor,
        Self::Language,
        Self::OperatingSystem,
        Self::Machine,
        Self::Branch,
        Self::Entity,
        Self::Category,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Editor => "editor",
            Self::Language => "language",
            Self::OperatingSystem => "operating_system",
            Self::Machine => "machine",
            Self::Branch => "branch",
            Self::Entity => "entity",
            Self::Category => "category",
        }
    }

    /// Storage column holding this dimension's value.
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Editor => "editor",
            Self::Language => "language",
            Self::OperatingSystem => "operating_system",
            Self::Machine => "machine",
            Self::Branch => "branch",
            Self::Entity => "entity",
            Self::Category => "category",
        }
    }
}

impl fmt::Display for SummaryDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryDimension {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(Self::Project),
            "editor" => Ok(Self::Editor),
            "language" => Ok(Self::Language),
            "operating_system" | "os" => Ok(Self::OperatingSystem),
            "machine" => Ok(Self::Machine),
            "branch" => Ok(Self::Branch),
            "entity" => Ok(Self::Entity),
            "category" => Ok(Self::Category),
            _ => Err(ValidationError::InvalidDimension {
                value: s.to_string(),
            }),
        }
    }
}

/// Legacy numeric summary-type codes.
///
/// Code 5 denotes labels, which are derived from projects rather than read
/// from a heartbeat, so it is rejected like any unknown code.
impl TryFrom<u8> for SummaryDimension {
    type Error = ValidationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Project),
            1 => Ok(Self::Language),
            2 => Ok(Self::Editor),
            3 => Ok(Self::OperatingSystem),
            4 => Ok(Self::Machine),
            6 => Ok(Self::Branch),
            7 => Ok(Self::Entity),
            8 => Ok(Self::Category),
            _ => Err(ValidationError::InvalidDimension {
                value: code.to_string(),
            }),
        }
    }
}

impl Heartbeat {
    /// Returns the grouping key for `dimension`, never an empty string.
    pub fn key(&self, dimension: SummaryDimension) -> &str {
        let value: &str = match dimension {
            SummaryDimension::Project => &self.project,
            SummaryDimension::Editor => &self.editor,
            SummaryDimension::Language => &self.language,
            SummaryDimension::OperatingSystem => &self.operating_system,
            SummaryDimension::Machine => &self.machine,
            SummaryDimension::Branch => &self.branch,
            SummaryDimension::Entity => &self.entity,
            SummaryDimension::Category => &self.category,
        };
        if value.is_empty() {
            UNKNOWN_SUMMARY_KEY
        } else {
            value
        }
    }
}

/// Counts heartbeats per grouping key.
pub fn tally_keys<'a, I>(heartbeats: I, dimension: SummaryDimension) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a Heartbeat>,
{
    let mut counts = BTreeMap::new();
    for heartbeat in heartbeats {
        *counts
            .entry(heartbeat.key(dimension).to_string())
            .or_insert(0) += 1;
    }
    counts
}

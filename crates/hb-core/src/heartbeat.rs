//! The heartbeat entity: one reported snapshot of user activity.

use std::fmt;

use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::time::CustomTime;
use crate::user::User;

/// How far into the future a heartbeat may be stamped before it is rejected.
pub const FUTURE_TOLERANCE: TimeDelta = TimeDelta::hours(1);

/// A single activity snapshot submitted by an editor or browser plugin.
///
/// Fields marked `#[serde(skip)]` are never accepted from clients: they are
/// either assigned by storage or derived during ingestion. Client fields
/// sent as `null` take their default value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heartbeat {
    /// Storage-assigned identifier; 0 until persisted.
    #[serde(skip)]
    pub id: u64,
    /// The resolved owner, supplied by the caller.
    #[serde(skip)]
    pub user: Option<User>,
    #[serde(skip)]
    pub user_id: String,

    /// File path, URL, domain or app name being acted on.
    #[serde(deserialize_with = "null_as_default")]
    pub entity: String,
    /// Category of `entity`: `file`, `url`, `domain` or `app`.
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub entity_type: String,
    /// Activity kind, e.g. `coding` or `debugging`.
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub project: String,
    #[serde(skip_serializing_if = "is_zero", deserialize_with = "null_as_default")]
    pub project_root_count: u32,
    #[serde(skip_serializing_if = "is_zero", deserialize_with = "null_as_default")]
    pub line_additions: u32,
    #[serde(skip_serializing_if = "is_zero", deserialize_with = "null_as_default")]
    pub line_deletions: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub lines: u32,
    #[serde(
        rename = "lineno",
        skip_serializing_if = "is_zero",
        deserialize_with = "null_as_default"
    )]
    pub line_number: u32,
    #[serde(
        rename = "cursorpos",
        skip_serializing_if = "is_zero",
        deserialize_with = "null_as_default"
    )]
    pub cursor_position: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub branch: String,
    #[serde(deserialize_with = "null_as_default")]
    pub language: String,
    /// Dependency names; order carries no meaning.
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not", deserialize_with = "null_as_default")]
    pub is_write: bool,

    #[serde(deserialize_with = "null_as_default")]
    pub editor: String,
    #[serde(deserialize_with = "null_as_default")]
    pub operating_system: String,
    #[serde(deserialize_with = "null_as_default")]
    pub machine: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_agent: String,

    #[serde(deserialize_with = "null_as_default")]
    pub time: CustomTime,

    /// Content fingerprint, see [`crate::fingerprint`].
    #[serde(skip)]
    pub hash: String,
    /// Provenance, e.g. the service a heartbeat was imported from.
    #[serde(skip)]
    pub origin: String,
    #[serde(skip)]
    pub origin_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: CustomTime,
}

/// Treats an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// Signature dictated by `skip_serializing_if`.
const fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl Heartbeat {
    /// Attaches the resolved owner, keeping `user_id` consistent with it.
    pub fn with_user(mut self, user: User) -> Self {
        self.user_id = user.id.to_string();
        self.user = Some(user);
        self
    }

    /// Structural acceptance check.
    ///
    /// Requires an owner whose ID matches `user_id` and a non-zero timestamp.
    pub fn valid(&self) -> bool {
        self.user
            .as_ref()
            .is_some_and(|user| !self.user_id.is_empty() && user.id.as_str() == self.user_id)
            && !self.time.is_zero()
    }

    /// Temporal acceptance check against the current time.
    pub fn timely(&self, max_age: TimeDelta) -> bool {
        self.timely_at(CustomTime::new(Utc::now()), max_age)
    }

    /// Temporal acceptance check against `now`.
    ///
    /// Accepts heartbeats at most `max_age` old and strictly less than
    /// [`FUTURE_TOLERANCE`] ahead of `now`.
    pub fn timely_at(&self, now: CustomTime, max_age: TimeDelta) -> bool {
        now - self.time <= max_age && self.time - now < FUTURE_TOLERANCE
    }
}

impl fmt::Display for Heartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self
            .time
            .as_datetime()
            .timestamp_nanos_opt()
            .unwrap_or_default();
        write!(
            f,
            "Heartbeat {{user={}, entity={}, type={}, category={}, project={}, \
             project_root_count={}, line_additions={}, line_deletions={}, lines={}, \
             lineno={}, cursorpos={}, branch={}, language={}, dependencies={:?}, \
             is_write={}, editor={}, os={}, machine={}, time={nanos}}}",
            self.user_id,
            self.entity,
            self.entity_type,
            self.category,
            self.project,
            self.project_root_count,
            self.line_additions,
            self.line_deletions,
            self.lines,
            self.line_number,
            self.cursor_position,
            self.branch,
            self.language,
            self.dependencies,
            self.is_write,
            self.editor,
            self.operating_system,
            self.machine,
        )
    }
}

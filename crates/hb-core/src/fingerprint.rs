//! Content fingerprints for duplicate suppression.
//!
//! Storage keeps a unique index on the fingerprint instead of on every
//! relevant column, which would roughly double the size of the heartbeat
//! table. The field list below is the dedup contract: changing it (or the
//! encoding) makes every stored fingerprint unrecognizable, so any change
//! must bump [`FINGERPRINT_VERSION`].
//!
//! Excluded on purpose: storage identity (`id`, `created_at`), the user
//! reference (only `user_id` counts), provenance (`origin`, `origin_id`) and
//! the client-environment fields (`editor`, `operating_system`, `machine`,
//! `user_agent`), which plugins report inconsistently for the same activity.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::heartbeat::Heartbeat;

/// Version of the canonical field list, mixed into every digest.
pub const FINGERPRINT_VERSION: u8 = 1;

/// Number of digest bytes kept; hex-encoded this is 16 characters.
const FINGERPRINT_BYTES: usize = 8;

/// The fingerprinted fields, serialized in declaration order.
#[derive(Serialize)]
struct CanonicalFields<'a> {
    version: u8,
    user_id: &'a str,
    entity: &'a str,
    entity_type: &'a str,
    category: &'a str,
    project: &'a str,
    project_root_count: u32,
    line_additions: u32,
    line_deletions: u32,
    lines: u32,
    line_number: u32,
    cursor_position: u32,
    branch: &'a str,
    language: &'a str,
    dependencies: Vec<&'a str>,
    is_write: bool,
    time_ms: i64,
}

impl<'a> CanonicalFields<'a> {
    fn of(heartbeat: &'a Heartbeat) -> Self {
        let mut dependencies: Vec<&str> = heartbeat.dependencies.iter().map(String::as_str).collect();
        dependencies.sort_unstable();

        Self {
            version: FINGERPRINT_VERSION,
            user_id: &heartbeat.user_id,
            entity: &heartbeat.entity,
            entity_type: &heartbeat.entity_type,
            category: &heartbeat.category,
            project: &heartbeat.project,
            project_root_count: heartbeat.project_root_count,
            line_additions: heartbeat.line_additions,
            line_deletions: heartbeat.line_deletions,
            lines: heartbeat.lines,
            line_number: heartbeat.line_number,
            cursor_position: heartbeat.cursor_position,
            branch: &heartbeat.branch,
            language: &heartbeat.language,
            dependencies,
            is_write: heartbeat.is_write,
            time_ms: heartbeat.time.unix_millis(),
        }
    }
}

/// Computes the fingerprint of `heartbeat` as lowercase hex.
///
/// Never fails: if the canonical encoding cannot be produced, the error is
/// logged and the digest is taken over the heartbeat's display form instead.
pub fn fingerprint(heartbeat: &Heartbeat) -> String {
    let encoded = serde_json::to_vec(&CanonicalFields::of(heartbeat)).unwrap_or_else(|err| {
        tracing::error!(error = %err, %heartbeat, "failed to encode heartbeat fingerprint");
        heartbeat.to_string().into_bytes()
    });

    let digest = Sha256::digest(&encoded);
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

impl Heartbeat {
    /// Stores the content fingerprint in `hash`.
    pub fn hashed(&mut self) -> &mut Self {
        self.hash = fingerprint(self);
        self
    }
}

//! Ingestion pipeline: sanitize, augment, validate, fingerprint, store.
//!
//! Every step works on a single heartbeat with no shared mutable state, so
//! batches are processed in parallel. The only shared input is the language
//! table, which is read-only for the duration of a batch.

use chrono::TimeDelta;
use rayon::prelude::*;
use thiserror::Error;

use crate::heartbeat::Heartbeat;
use crate::language::LanguageMappings;
use crate::store::HeartbeatStore;
use crate::time::CustomTime;

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Oldest accepted heartbeat, relative to evaluation time.
    /// Default: 180 days.
    pub max_age: TimeDelta,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_age: TimeDelta::days(180),
        }
    }
}

/// Why a heartbeat was dropped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Missing or mismatched owner, or a zero timestamp.
    #[error("heartbeat is invalid")]
    Invalid,
    /// Too old, or too far in the future.
    #[error("heartbeat is outside the accepted time window")]
    Untimely,
}

/// Outcome counts for one ingested batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub untimely: usize,
}

impl IngestReport {
    pub const fn rejected(&self) -> usize {
        self.invalid + self.untimely
    }
}

/// Runs one heartbeat through the pipeline, evaluated at `now`.
///
/// The returned heartbeat carries its fingerprint and is ready for storage.
pub fn process(
    mut heartbeat: Heartbeat,
    mappings: &LanguageMappings,
    config: &PipelineConfig,
    now: CustomTime,
) -> Result<Heartbeat, Rejection> {
    heartbeat.sanitize().augment(mappings);

    if !heartbeat.valid() {
        tracing::debug!(%heartbeat, "rejecting invalid heartbeat");
        return Err(Rejection::Invalid);
    }
    if !heartbeat.timely_at(now, config.max_age) {
        tracing::debug!(%heartbeat, "rejecting untimely heartbeat");
        return Err(Rejection::Untimely);
    }

    heartbeat.hashed();
    Ok(heartbeat)
}

/// Runs a batch through [`process`] in parallel, preserving input order.
pub fn process_batch(
    heartbeats: Vec<Heartbeat>,
    mappings: &LanguageMappings,
    config: &PipelineConfig,
    now: CustomTime,
) -> Vec<Result<Heartbeat, Rejection>> {
    heartbeats
        .into_par_iter()
        .map(|heartbeat| process(heartbeat, mappings, config, now))
        .collect()
}

/// Processes a batch and inserts every accepted heartbeat into `store`
/// with a single [`HeartbeatStore::insert_all`] call.
pub fn ingest<S: HeartbeatStore>(
    store: &mut S,
    heartbeats: Vec<Heartbeat>,
    mappings: &LanguageMappings,
    config: &PipelineConfig,
    now: CustomTime,
) -> Result<IngestReport, S::Error> {
    let mut report = IngestReport::default();
    let mut accepted = Vec::new();

    for outcome in process_batch(heartbeats, mappings, config, now) {
        match outcome {
            Ok(heartbeat) => accepted.push(heartbeat),
            Err(Rejection::Invalid) => report.invalid += 1,
            Err(Rejection::Untimely) => report.untimely += 1,
        }
    }

    if !accepted.is_empty() {
        report.accepted = store.insert_all(&accepted)?;
        report.duplicates = accepted.len().saturating_sub(report.accepted);
    }

    tracing::info!(
        accepted = report.accepted,
        duplicates = report.duplicates,
        rejected = report.rejected(),
        "ingested heartbeat batch"
    );
    Ok(report)
}

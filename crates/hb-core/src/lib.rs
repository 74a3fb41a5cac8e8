//! Core domain logic for heartbeat ingestion.
//!
//! This crate contains the fundamental types and logic for:
//! - Sanitizing client-reported heartbeat fields
//! - Inferring the language of an entity from its file suffix
//! - Validity and timeliness checks
//! - Content fingerprinting for duplicate suppression
//! - Extracting grouping keys for summary aggregation

pub mod dimension;
pub mod fingerprint;
pub mod heartbeat;
pub mod language;
pub mod pipeline;
mod sanitize;
pub mod store;
pub mod time;
pub mod types;
pub mod user;

pub use dimension::{SummaryDimension, UNKNOWN_SUMMARY_KEY, tally_keys};
pub use fingerprint::{FINGERPRINT_VERSION, fingerprint};
pub use heartbeat::{FUTURE_TOLERANCE, Heartbeat};
pub use language::{LanguageMappings, SharedLanguageMappings};
pub use pipeline::{IngestReport, PipelineConfig, Rejection, ingest, process, process_batch};
pub use sanitize::LAST_PROJECT_PLACEHOLDER;
pub use store::HeartbeatStore;
pub use time::CustomTime;
pub use types::{UserId, ValidationError};
pub use user::User;

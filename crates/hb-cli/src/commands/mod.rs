//! CLI subcommand implementations.

pub mod ingest;
pub mod languages;
pub mod status;
pub mod summary;
mod util;

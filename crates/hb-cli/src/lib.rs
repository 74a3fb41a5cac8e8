//! Heartbeat CLI library.
//!
//! This crate provides the CLI interface for heartbeat ingestion and summaries.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;

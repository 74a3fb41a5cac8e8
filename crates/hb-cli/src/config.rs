//! Configuration loading and management.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use hb_core::{LanguageMappings, PipelineConfig};
use serde::{Deserialize, Serialize};

/// Suffix mappings shipped by default; user entries are merged on top.
const DEFAULT_LANGUAGE_MAPPINGS: [(&str, &str); 7] = [
    ("vue", "Vue"),
    ("jsx", "JSX"),
    ("tsx", "TSX"),
    ("cjs", "JavaScript"),
    ("ipynb", "Python"),
    ("svelte", "Svelte"),
    ("astro", "Astro"),
];

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Oldest accepted heartbeat, in hours. Default: 4320 (180 days).
    pub heartbeat_max_age_hours: u64,
    /// File suffix → language name.
    pub language_mappings: BTreeMap<String, String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("heartbeat_max_age_hours", &self.heartbeat_max_age_hours)
            .field("language_mappings", &self.language_mappings.len())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("hb.db"),
            heartbeat_max_age_hours: 4320,
            language_mappings: DEFAULT_LANGUAGE_MAPPINGS
                .iter()
                .map(|(suffix, language)| ((*suffix).to_string(), (*language).to_string()))
                .collect(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // HB_DATABASE_PATH, HB_HEARTBEAT_MAX_AGE_HOURS, ...
        figment = figment.merge(Env::prefixed("HB_"));

        figment.extract()
    }

    /// Pipeline settings derived from this configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let max_age = i64::try_from(self.heartbeat_max_age_hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .unwrap_or(TimeDelta::MAX);
        PipelineConfig { max_age }
    }

    /// The language table in resolution order.
    pub fn language_mappings(&self) -> LanguageMappings {
        LanguageMappings::from(self.language_mappings.clone())
    }
}

/// Returns the platform-specific config directory for hb.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hb"))
}

/// Returns the platform-specific data directory for hb.
///
/// On Linux: `~/.local/share/hb`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("hb"))
}

// ⚙️ Configuration - TOML file with defaults for every section
//
// [storage]
// database = "turnout.db"
//
// [scoring]
// window_years = 10
//
// [logging]
// filter = "info"

use crate::error::ConfigError;
use crate::scoring::{ScoringConfig, DEFAULT_WINDOW_YEARS, MAX_WINDOW_YEARS};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scoring: ScoringSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            database: default_database(),
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("turnout.db")
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringSection {
    #[serde(default = "default_window_years")]
    pub window_years: u32,
}

impl Default for ScoringSection {
    fn default() -> Self {
        ScoringSection {
            window_years: DEFAULT_WINDOW_YEARS,
        }
    }
}

fn default_window_years() -> u32 {
    DEFAULT_WINDOW_YEARS
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` env-filter directive, overridden by RUST_LOG
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_WINDOW_YEARS).contains(&self.scoring.window_years) {
            return Err(ConfigError::Validation(format!(
                "scoring.window_years must be between 1 and {}, got {}",
                MAX_WINDOW_YEARS, self.scoring.window_years
            )));
        }
        if self.storage.database.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.database must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn scoring_config(&self) -> ScoringConfig {
        ScoringConfig {
            window_years: self.scoring.window_years,
        }
    }
}

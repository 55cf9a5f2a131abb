//! Configuration management for the daemon.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default bind address for both station listeners.
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";

/// Default TCP port for station 1.
pub const DEFAULT_PORT1: u16 = 9001;

/// Default TCP port for station 2.
pub const DEFAULT_PORT2: u16 = 9002;

/// Auxiliary code count used when `expected_aux_count` is unset or non-positive.
pub const DEFAULT_EXPECTED_AUX_COUNT: usize = 6;

/// Main daemon configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Address both station listeners bind to.
    pub listen_host: String,
    /// TCP port for station 1.
    pub port1: u16,
    /// TCP port for station 2.
    pub port2: u16,
    /// Required number of distinct auxiliary codes per item.
    /// Unset or non-positive values fall back to `default_expected_aux_count`.
    pub expected_aux_count: Option<i64>,
    /// Fallback for `expected_aux_count`.
    pub default_expected_aux_count: usize,
    /// Write every accepted record to its own file as soon as it is accepted.
    pub save_each_record: bool,
    /// Directory for flushed record batches. Defaults to `<base_dir>/records`.
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            listen_host: DEFAULT_LISTEN_HOST.to_string(),
            port1: DEFAULT_PORT1,
            port2: DEFAULT_PORT2,
            expected_aux_count: None,
            default_expected_aux_count: DEFAULT_EXPECTED_AUX_COUNT,
            save_each_record: false,
            output_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        std::fs::create_dir_all(paths.base_dir())?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Reject configurations the listeners cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.port1 != 0 && self.port1 == self.port2 {
            return Err(CoreError::Config(format!(
                "port1 and port2 must differ (both are {})",
                self.port1
            )));
        }
        if self.default_expected_aux_count == 0 {
            return Err(CoreError::Config(
                "default_expected_aux_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory flushed batches are written to.
    pub fn output_dir(&self, paths: &Paths) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| paths.records_dir())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `DUALSCAN_*` overrides from the given lookup. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("DUALSCAN_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(port) = lookup("DUALSCAN_PORT1").and_then(|v| v.trim().parse().ok()) {
            self.port1 = port;
        }
        if let Some(port) = lookup("DUALSCAN_PORT2").and_then(|v| v.trim().parse().ok()) {
            self.port2 = port;
        }
        if let Some(count) =
            lookup("DUALSCAN_EXPECTED_AUX_COUNT").and_then(|v| v.trim().parse().ok())
        {
            self.expected_aux_count = Some(count);
        }
    }
}

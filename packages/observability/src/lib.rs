//! Tracing setup shared by the dualscan binaries.
//!
//! Call [`init_with_config`] once at startup, then log with the plain
//! `tracing` macros. Events become JSON lines in a rotating file
//! (`~/.dualscan/logs/dualscan.jsonl` unless overridden, rolled over to
//! `dualscan.jsonl.1` at [`LogConfig::max_bytes`]). A compact copy can also
//! go to stderr.
//!
//! ```rust,ignore
//! observability::init_with_config(
//!     observability::LogConfig::for_service("dualscan")
//!         .level("debug")
//!         .with_stderr(),
//! );
//! tracing::info!(channel = "channel 1", "listener bound");
//! ```

mod file_sink;
mod json_layer;

use std::path::PathBuf;

pub use file_sink::{rotated_path, RotatingLogFile};
pub use json_layer::{JsonLayer, LogEntry, ACTIVITY_TARGET};

/// Default cap on the JSONL file before it is rotated.
pub const DEFAULT_MAX_LOG_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Written as `service` on every line.
    pub service_name: String,
    /// Filter used when `RUST_LOG` is unset.
    pub default_level: String,
    /// `None` uses [`default_log_path`].
    pub log_path: Option<PathBuf>,
    pub also_stderr: bool,
    /// Rotate the log file once it reaches this many bytes. 0 disables.
    pub max_bytes: u64,
}

impl LogConfig {
    pub fn for_service(name: &str) -> Self {
        Self {
            service_name: name.to_string(),
            default_level: "info".to_string(),
            log_path: None,
            also_stderr: false,
            max_bytes: DEFAULT_MAX_LOG_BYTES,
        }
    }

    pub fn level(mut self, level: &str) -> Self {
        self.default_level = level.to_string();
        self
    }

    pub fn log_path(mut self, path: PathBuf) -> Self {
        self.log_path = Some(path);
        self
    }

    pub fn with_stderr(mut self) -> Self {
        self.also_stderr = true;
        self
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::for_service("dualscan")
    }
}

/// File logging with default settings for `service_name`.
pub fn init(service_name: &str) {
    init_with_config(LogConfig::for_service(service_name));
}

/// Install the global subscriber.
///
/// If the log file cannot be opened, logging goes to stderr only. A second
/// call is ignored.
pub fn init_with_config(config: LogConfig) {
    file_sink::init_subscriber(&config);
}

/// `~/.dualscan/logs/dualscan.jsonl`, or `None` without a home directory.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".dualscan").join("logs").join("dualscan.jsonl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let config = LogConfig::for_service("dualscan-test")
            .level("debug")
            .log_path(PathBuf::from("/tmp/x.jsonl"))
            .with_stderr();

        assert_eq!(config.service_name, "dualscan-test");
        assert_eq!(config.default_level, "debug");
        assert_eq!(config.log_path, Some(PathBuf::from("/tmp/x.jsonl")));
        assert!(config.also_stderr);
        assert_eq!(config.max_bytes, DEFAULT_MAX_LOG_BYTES);
    }

    #[test]
    fn test_default_is_quiet_file_logging() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "dualscan");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(!config.also_stderr);
    }

    #[test]
    fn test_default_log_path_file_name() {
        if let Some(path) = default_log_path() {
            assert!(path.ends_with(".dualscan/logs/dualscan.jsonl"));
        }
    }
}

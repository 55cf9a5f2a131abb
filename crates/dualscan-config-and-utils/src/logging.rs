//! Logging initialization for the daemon.
//!
//! Thin wrapper over the observability crate: structured JSONL goes to
//! `<base_dir>/logs/dualscan.jsonl`, with a compact copy on stderr.

use crate::Paths;

/// Initialize the logging system for the daemon.
///
/// `level` is the default filter; `RUST_LOG` takes precedence when set.
pub fn init_logging(level: &str, paths: &Paths) {
    observability::init_with_config(
        observability::LogConfig::for_service("dualscan")
            .level(level)
            .log_path(paths.log_file())
            .with_stderr(),
    );
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

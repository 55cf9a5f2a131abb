//! File system paths for the daemon.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Control socket filename under the base directory.
const SOCKET_NAME: &str = "dualscan.sock";
/// Central JSONL log filename under the logs directory.
const LOG_FILE_NAME: &str = "dualscan.jsonl";

/// Manages file system paths for the daemon.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for runtime files (~/.dualscan)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.dualscan`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".dualscan"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.dualscan).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.dualscan/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the control socket path (~/.dualscan/dualscan.sock).
    pub fn socket_file(&self) -> PathBuf {
        self.base_dir.join(SOCKET_NAME)
    }

    /// Get the PID file path (~/.dualscan/dualscan.pid).
    pub fn pid_file(&self) -> PathBuf {
        self.base_dir.join("dualscan.pid")
    }

    /// Get the logs directory (~/.dualscan/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the central log file path (~/.dualscan/logs/dualscan.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join(LOG_FILE_NAME)
    }

    /// Get the default output directory for flushed records (~/.dualscan/records).
    pub fn records_dir(&self) -> PathBuf {
        self.base_dir.join("records")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.records_dir())?;
        Ok(())
    }
}

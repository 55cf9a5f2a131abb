//! Rotating JSONL log file and subscriber installation.
//!
//! The daemon runs unattended for whole shifts, so the log file is capped:
//! once it passes `max_bytes` it is renamed to `<name>.1` (replacing any
//! older one) and a fresh file is started.

use crate::json_layer::JsonLayer;
use crate::LogConfig;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

struct Current {
    out: LineWriter<File>,
    len: u64,
}

/// Append-only JSONL file, shared by every clone.
#[derive(Clone)]
pub struct RotatingLogFile {
    path: Arc<PathBuf>,
    max_bytes: u64,
    current: Arc<Mutex<Current>>,
}

impl RotatingLogFile {
    /// Open `path` for appending, creating parent directories. A file that
    /// is already over `max_bytes` is rotated first. `max_bytes == 0`
    /// disables rotation.
    pub fn open(path: &Path, max_bytes: u64) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let existing = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if max_bytes > 0 && existing >= max_bytes {
            fs::rename(path, rotated_path(path))?;
        }
        let current = open_current(path)?;

        Ok(Self {
            path: Arc::new(path.to_path_buf()),
            max_bytes,
            current: Arc::new(Mutex::new(current)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotate(&self, current: &mut Current) -> io::Result<()> {
        current.out.flush()?;
        fs::rename(self.path.as_path(), rotated_path(&self.path))?;
        *current = open_current(&self.path)?;
        Ok(())
    }
}

fn open_current(path: &Path) -> io::Result<Current> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let len = file.metadata()?.len();
    Ok(Current {
        out: LineWriter::new(file),
        len,
    })
}

/// `dualscan.jsonl` -> `dualscan.jsonl.1`
pub fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".1");
    path.with_file_name(name)
}

impl Write for RotatingLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut current = self.current.lock();
        if self.max_bytes > 0 && current.len > 0 && current.len + buf.len() as u64 > self.max_bytes
        {
            self.rotate(&mut current)?;
        }
        current.out.write_all(buf)?;
        current.len += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.current.lock().out.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingLogFile {
    type Writer = RotatingLogFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn open_log(config: &LogConfig) -> Result<RotatingLogFile, String> {
    let path = config
        .log_path
        .clone()
        .or_else(crate::default_log_path)
        .ok_or_else(|| "home directory not found".to_string())?;
    RotatingLogFile::open(&path, config.max_bytes)
        .map_err(|e| format!("{}: {}", path.display(), e))
}

/// Install the global subscriber. Falls back to stderr when the file
/// cannot be opened.
pub(crate) fn init_subscriber(config: &LogConfig) {
    let file = open_log(config);

    let json = file
        .as_ref()
        .ok()
        .map(|f| JsonLayer::new(config.service_name.clone(), f.clone()));
    let stderr = (config.also_stderr || file.is_err()).then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(io::stderr)
    });

    let installed = tracing_subscriber::registry()
        .with(json.map(|l| l.with_filter(filter(&config.default_level))))
        .with(stderr.map(|l| l.with_filter(filter(&config.default_level))))
        .try_init();
    if installed.is_err() {
        return;
    }

    match file {
        Ok(f) => tracing::info!(log_path = %f.path().display(), "observability initialized"),
        Err(error) => tracing::warn!(%error, "log file unavailable, logging to stderr only"),
    }
}

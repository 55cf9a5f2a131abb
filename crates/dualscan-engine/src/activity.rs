//! Activity log and notifier implementations.

use crate::error::ValidationErrorKind;
use crate::ports::{ActivityLog, OperatorNotifier};
use chrono::Local;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::{info, warn};

/// Lines kept by [`MemoryActivityLog`] by default.
pub const DEFAULT_ACTIVITY_CAPACITY: usize = 500;

/// Forwards activity messages to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActivityLog;

impl ActivityLog for TracingActivityLog {
    fn log(&self, message: &str) {
        info!(target: "dualscan::activity", "{}", message);
    }
}

/// Keeps the most recent activity lines as `[HH:MM:SS] message`.
#[derive(Debug)]
pub struct MemoryActivityLog {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ACTIVITY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of retained lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    /// Retained lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines().join("\n")
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl Default for MemoryActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityLog for MemoryActivityLog {
    fn log(&self, message: &str) {
        let line = format!("[{}] {}", Local::now().format("%H:%M:%S"), message);
        let mut lines = self.lines.lock();
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }
}

/// Fans one activity message out to several logs.
impl<A: ActivityLog, B: ActivityLog> ActivityLog for (A, B) {
    fn log(&self, message: &str) {
        self.0.log(message);
        self.1.log(message);
    }
}

impl<T: ActivityLog + ?Sized> ActivityLog for std::sync::Arc<T> {
    fn log(&self, message: &str) {
        (**self).log(message);
    }
}

/// Reports rejections as warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl OperatorNotifier for TracingNotifier {
    fn notify(&self, message: &str, kind: ValidationErrorKind) {
        warn!(kind = ?kind, "{}", message);
    }
}

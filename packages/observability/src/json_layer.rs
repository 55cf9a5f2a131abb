//! JSONL rendering of tracing events.
//!
//! Scan events carry the same few keys over and over (which station, which
//! primary code, which peer address, what went wrong). Those are lifted to
//! the top level of each line so a tail can be filtered with a plain
//! `jq 'select(.channel == "channel 2")'`. Everything else lands in
//! `fields`, sorted by name.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Target used by the engine's operator activity stream.
pub const ACTIVITY_TARGET: &str = "dualscan::activity";

/// One rendered line.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogEntry {
    pub ts: String,
    pub level: &'static str,
    pub service: String,
    pub pid: u32,
    pub target: String,
    pub msg: String,
    /// Set for lines from the operator activity stream.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub activity: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
}

impl LogEntry {
    fn put(&mut self, name: &str, value: Value) {
        let slot = match name {
            "message" => {
                self.msg = text_of(value);
                return;
            }
            "channel" => &mut self.channel,
            "primary_code" => &mut self.primary_code,
            "peer" => &mut self.peer,
            "error" => &mut self.error,
            other => {
                self.fields.insert(other.to_string(), value);
                return;
            }
        };
        *slot = Some(text_of(value));
    }
}

fn text_of(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl Visit for LogEntry {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field.name(), Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field.name(), Value::String(value.to_string()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field.name(), value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field.name(), value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field.name(), value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field.name(), Value::String(value.to_string()));
    }
}

/// Layer writing one [`LogEntry`] per event to `make_writer`.
pub struct JsonLayer<W> {
    service: String,
    pid: u32,
    make_writer: W,
}

impl<W> JsonLayer<W> {
    pub fn new(service: String, make_writer: W) -> Self {
        Self {
            service,
            pid: std::process::id(),
            make_writer,
        }
    }

    fn entry_for(&self, event: &Event<'_>) -> LogEntry {
        let meta = event.metadata();
        let mut entry = LogEntry {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: meta.level().as_str(),
            service: self.service.clone(),
            pid: self.pid,
            target: meta.target().to_string(),
            activity: meta.target() == ACTIVITY_TARGET,
            ..LogEntry::default()
        };
        event.record(&mut entry);
        entry
    }
}

impl<S, W> Layer<S> for JsonLayer<W>
where
    S: Subscriber,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let Ok(mut line) = serde_json::to_vec(&self.entry_for(event)) else {
            return;
        };
        line.push(b'\n');
        // One write per line.
        let _ = self.make_writer.make_writer().write_all(&line);
    }
}

//! Station identity and inbound payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two scanning stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    Channel1,
    Channel2,
}

impl ChannelId {
    /// Both channels, in concatenation order.
    pub const ALL: [ChannelId; 2] = [ChannelId::Channel1, ChannelId::Channel2];

    /// The other station.
    pub fn peer(self) -> Self {
        match self {
            Self::Channel1 => Self::Channel2,
            Self::Channel2 => Self::Channel1,
        }
    }

    /// Zero-based slot index.
    pub fn index(self) -> usize {
        match self {
            Self::Channel1 => 0,
            Self::Channel2 => 1,
        }
    }

    /// Station number as operators see it (1 or 2).
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}", self.number())
    }
}

/// A decoded, trimmed text chunk received from one station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPayload {
    pub channel: ChannelId,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl ScanPayload {
    /// Create a payload stamped with the current time.
    pub fn new(channel: ChannelId, text: impl Into<String>) -> Self {
        Self {
            channel,
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

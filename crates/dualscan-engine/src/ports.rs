//! Collaborator interfaces the engine calls out to.
//!
//! All callbacks are synchronous and are invoked outside the engine lock.

use crate::acceptance_log::AcceptedRecord;
use crate::channel::ChannelId;
use crate::error::{SinkError, ValidationErrorKind};
use dualscan_config_and_utils::Config;

/// Durable storage for drained record batches.
pub trait PersistenceSink: Send + Sync {
    /// Persist serialized records in order.
    fn save_batch(&self, records: &[String]) -> Result<(), SinkError>;
}

/// Operator-visible alerts for rejected candidates.
pub trait OperatorNotifier: Send + Sync {
    fn notify(&self, message: &str, kind: ValidationErrorKind);
}

/// Human-readable activity trail.
pub trait ActivityLog: Send + Sync {
    fn log(&self, message: &str);
}

/// Hook called after a record is appended to the acceptance log.
pub trait RecordObserver: Send + Sync {
    fn on_accepted(&self, record: &AcceptedRecord);
}

/// Runtime settings read once when the engine is built.
pub trait ConfigProvider {
    /// Raw configured aux count; may be unset or non-positive.
    fn expected_aux_count(&self) -> Option<i64>;
    fn default_expected_aux_count(&self) -> usize;
    fn port(&self, channel: ChannelId) -> u16;
    fn listen_host(&self) -> &str;
}

impl ConfigProvider for Config {
    fn expected_aux_count(&self) -> Option<i64> {
        self.expected_aux_count
    }

    fn default_expected_aux_count(&self) -> usize {
        self.default_expected_aux_count
    }

    fn port(&self, channel: ChannelId) -> u16 {
        match channel {
            ChannelId::Channel1 => self.port1,
            ChannelId::Channel2 => self.port2,
        }
    }

    fn listen_host(&self) -> &str {
        &self.listen_host
    }
}

//! Dualscan engine: pairs the reports of two scanning stations.
//!
//! Two TCP listeners (one per station) feed text chunks into a single
//! reconciliation point. The latest unconsumed chunk from each station is
//! combined into one candidate, validated against the code shape contract,
//! deduplicated against everything accepted since the last flush, and kept
//! in an in-memory acceptance log until it is handed to a persistence sink.
//!
//! # Invariants
//!
//! 1. **One pending value per channel**: a new chunk overwrites the old one.
//! 2. **Fixed order**: station 1's text always precedes station 2's.
//! 3. **Unique primary codes**: the acceptance log never holds two records
//!    with the same primary code.
//! 4. **Atomic steps**: pairing and check-then-append both happen under the
//!    single engine lock.
//!
//! ```text
//! station 1 ──► listener ─┐
//!                         ├─► reconciler ─► validator ─► acceptance log ─► sink
//! station 2 ──► listener ─┘
//! ```

pub mod acceptance_log;
pub mod activity;
pub mod channel;
pub mod engine;
pub mod error;
pub mod listener;
pub mod ports;
pub mod reconciler;
pub mod validator;

#[cfg(test)]
mod tests;

pub use acceptance_log::{AcceptanceLog, AcceptedRecord};
pub use activity::{MemoryActivityLog, TracingActivityLog, TracingNotifier};
pub use channel::{ChannelId, ScanPayload};
pub use engine::{
    Collaborators, EngineSettings, EngineStatus, ListenAddrs, ScanEngine, SubmitOutcome,
};
pub use error::{EngineError, EngineResult, SinkError, ValidationError, ValidationErrorKind};
pub use listener::{ChannelListener, ListenerExit};
pub use ports::{ActivityLog, ConfigProvider, OperatorNotifier, PersistenceSink, RecordObserver};
pub use reconciler::{CandidateRecord, PairingState, Reconciler};
pub use validator::{
    classify_token, is_primary_code, resolve_expected_aux_count, validate, CodeClass, Verdict,
    PRIMARY_CODE_LEN,
};

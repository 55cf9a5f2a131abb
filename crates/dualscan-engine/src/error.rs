//! Error types for the engine.

use crate::channel::ChannelId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine lifecycle and handoff errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A station listener could not bind its port
    #[error("Failed to bind {channel} listener on {addr}: {source}")]
    Bind {
        channel: ChannelId,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// `start` called while the listeners are already running
    #[error("Engine is already running")]
    AlreadyRunning,

    /// `stop` called while the listeners are not running
    #[error("Engine is not running")]
    NotRunning,

    /// The persistence sink rejected a drained batch
    #[error("Persistence error: {0}")]
    Persistence(#[from] SinkError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failure reported by a persistence sink.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct SinkError(pub String);

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        Self(err.to_string())
    }
}

/// Reasons a paired candidate is rejected.
///
/// A repeated primary code is not in this list: duplicates are dropped
/// silently and reported as [`crate::Verdict::Duplicate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No token has the primary code shape
    #[error("Primary code not found")]
    NoPrimaryCode,

    /// More than one distinct primary code in the same candidate
    #[error("Multiple different primary codes found: {}", codes.join(", "))]
    AmbiguousPrimaryCode { codes: Vec<String> },

    /// Fewer distinct auxiliary codes than required
    #[error("Insufficient auxiliary codes (found: {found}, expected: {expected})")]
    InsufficientAuxCodes { found: usize, expected: usize },
}

impl ValidationError {
    /// The error's kind, without payload.
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            Self::NoPrimaryCode => ValidationErrorKind::NoPrimaryCode,
            Self::AmbiguousPrimaryCode { .. } => ValidationErrorKind::AmbiguousPrimaryCode,
            Self::InsufficientAuxCodes { .. } => ValidationErrorKind::InsufficientAuxCodes,
        }
    }
}

/// Operator-facing classification of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    NoPrimaryCode,
    AmbiguousPrimaryCode,
    InsufficientAuxCodes,
}

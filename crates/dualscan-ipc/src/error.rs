//! IPC error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The peer answered with something other than a valid response.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("No response within {0:?}")]
    Timeout(std::time::Duration),
}

pub type IpcResult<T> = Result<T, IpcError>;

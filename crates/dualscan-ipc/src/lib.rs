//! Control socket for the dualscan daemon.
//!
//! One JSON object per line in each direction over a Unix domain socket.
//! [`IpcServer`] dispatches requests to registered handlers;
//! [`IpcClient`] is what the CLI subcommands use to reach a running daemon.

mod client;
mod error;
mod framing;
mod protocol;
mod server;

pub use client::IpcClient;
pub use error::{IpcError, IpcResult};
pub use framing::MAX_FRAME_LEN;
pub use protocol::{error_codes, ErrorInfo, Method, Request, Response};
pub use server::{HandlerFn, IpcServer};

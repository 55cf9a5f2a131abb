//! Control socket client used by the CLI.

use crate::framing::{read_frame, write_frame};
use crate::{IpcError, IpcResult, Method, Request, Response};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::UnixStream;

/// Default bound on one request/response exchange.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// One-shot client: every call opens its own connection.
#[derive(Debug, Clone)]
pub struct IpcClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl IpcClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send one request and wait for its response.
    pub async fn call(&self, request: Request) -> IpcResult<Response> {
        tokio::time::timeout(self.timeout, self.exchange(&request))
            .await
            .map_err(|_| IpcError::Timeout(self.timeout))?
    }

    async fn exchange(&self, request: &Request) -> IpcResult<Response> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| IpcError::Socket(format!("{}: {}", self.socket_path.display(), e)))?;
        let (reader, mut writer) = stream.into_split();

        write_frame(&mut writer, request).await?;

        let mut buf = String::new();
        let line = read_frame(&mut BufReader::new(reader), &mut buf)
            .await?
            .ok_or(IpcError::ConnectionClosed)?;
        let response: Response = serde_json::from_str(line)?;

        if response.id != request.id {
            return Err(IpcError::Protocol(format!(
                "response id {} does not match request {}",
                response.id, request.id
            )));
        }
        Ok(response)
    }

    pub async fn call_method(&self, method: Method) -> IpcResult<Response> {
        self.call(Request::new(method)).await
    }

    pub async fn call_method_with_params(
        &self,
        method: Method,
        params: serde_json::Value,
    ) -> IpcResult<Response> {
        self.call(Request::with_params(method, params)).await
    }

    /// True when a daemon answers `health` on the socket.
    pub async fn is_daemon_running(&self) -> bool {
        self.call_method(Method::Health)
            .await
            .is_ok_and(|r| r.is_success())
    }
}

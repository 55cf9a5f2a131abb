//! Per-station TCP listener.
//!
//! Accepts any number of connections until shutdown. Every successful read
//! on a connection becomes one [`ScanPayload`]: the bytes are decoded as
//! UTF-8 (lossy), trimmed, and handed to the payload callback.

use crate::channel::{ChannelId, ScanPayload};
use crate::error::{EngineError, EngineResult};
use crate::ports::ActivityLog;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Size of one read; each read is one payload.
pub const READ_BUF_SIZE: usize = 1024;

/// Pause before accepting again after running out of descriptors or memory.
const RESOURCE_BACKOFF: Duration = Duration::from_millis(50);

/// Callback receiving every decoded chunk.
pub type PayloadHandler = Arc<dyn Fn(ScanPayload) + Send + Sync>;

/// Why a listener loop returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerExit {
    /// Shutdown was signalled.
    Cancelled,
    /// The accept call failed irrecoverably.
    Failed(String),
}

/// A bound listener for one station.
pub struct ChannelListener {
    listener: TcpListener,
    channel: ChannelId,
    local_addr: SocketAddr,
    activity: Option<Arc<dyn ActivityLog>>,
}

impl ChannelListener {
    /// Bind `addr` (`host:port`) for `channel`.
    pub async fn bind(addr: &str, channel: ChannelId) -> EngineResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| EngineError::Bind {
                channel,
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            channel,
            local_addr,
            activity: None,
        })
    }

    /// Report connection events to an activity log.
    pub fn with_activity(mut self, activity: Arc<dyn ActivityLog>) -> Self {
        self.activity = Some(activity);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Accept connections until `shutdown` fires or accept fails for good.
    ///
    /// Connections still open when the loop ends are aborted.
    pub async fn run(
        self,
        on_payload: PayloadHandler,
        mut shutdown: broadcast::Receiver<()>,
    ) -> ListenerExit {
        let channel = self.channel;
        let mut connections = JoinSet::new();

        info!(%channel, addr = %self.local_addr, "Listener started");
        self.note(format!("{}: listening on {}", channel, self.local_addr));

        let exit = loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            self.note(format!("{}: station connected from {}", channel, peer));
                            let conn = Connection {
                                channel,
                                peer,
                                on_payload: on_payload.clone(),
                                activity: self.activity.clone(),
                            };
                            connections.spawn(conn.serve(stream, shutdown.resubscribe()));
                        }
                        Err(e) if is_transient_accept_error(&e) => {
                            warn!(%channel, error = %e, "Accept error, continuing");
                            if is_resource_exhaustion(&e) {
                                tokio::time::sleep(RESOURCE_BACKOFF).await;
                            }
                        }
                        Err(e) => {
                            error!(%channel, error = %e, "Accept failed, listener stopping");
                            break ListenerExit::Failed(e.to_string());
                        }
                    }
                }
                _ = shutdown.recv() => {
                    debug!(%channel, "Listener cancelled");
                    break ListenerExit::Cancelled;
                }
                // Reap finished connection tasks so the set does not grow.
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        };

        connections.shutdown().await;
        self.note(format!("{}: listener stopped", channel));
        exit
    }

    fn note(&self, message: String) {
        if let Some(activity) = &self.activity {
            activity.log(&message);
        }
    }
}

struct Connection {
    channel: ChannelId,
    peer: SocketAddr,
    on_payload: PayloadHandler,
    activity: Option<Arc<dyn ActivityLog>>,
}

impl Connection {
    async fn serve(self, mut stream: TcpStream, mut shutdown: broadcast::Receiver<()>) {
        let channel = self.channel;
        let mut buf = [0u8; READ_BUF_SIZE];

        debug!(%channel, peer = %self.peer, "Connection opened");

        loop {
            tokio::select! {
                read = stream.read(&mut buf) => {
                    match read {
                        Ok(0) => {
                            self.note(format!("{}: station disconnected", channel));
                            break;
                        }
                        Ok(n) => {
                            let text = String::from_utf8_lossy(&buf[..n]).trim().to_string();
                            debug!(%channel, bytes = n, "Chunk received");
                            (self.on_payload)(ScanPayload::new(channel, text));
                        }
                        Err(e) if e.kind() == ErrorKind::ConnectionReset => {
                            self.note(format!("{}: connection closed by station", channel));
                            break;
                        }
                        Err(e) => {
                            warn!(%channel, peer = %self.peer, error = %e, "Read error");
                            self.note(format!("{}: read error: {}", channel, e));
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    debug!(%channel, peer = %self.peer, "Connection cancelled");
                    break;
                }
            }
        }
    }

    fn note(&self, message: String) {
        if let Some(activity) = &self.activity {
            activity.log(&message);
        }
    }
}

/// Accept errors that concern a single connection attempt or a passing
/// resource shortage rather than the listening socket itself.
fn is_transient_accept_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionRefused
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    ) || is_resource_exhaustion(e)
}

/// Errno values for descriptor and buffer exhaustion. EMFILE, ENFILE and
/// ENOMEM agree across Unix targets; ENOBUFS is 105 on Linux and 55 on the
/// BSD family, macOS included.
#[cfg(unix)]
mod errno {
    pub const EMFILE: i32 = 24;
    pub const ENFILE: i32 = 23;
    pub const ENOMEM: i32 = 12;
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub const ENOBUFS: i32 = 105;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    pub const ENOBUFS: i32 = 55;

    pub const EXHAUSTION: [i32; 4] = [EMFILE, ENFILE, ENOMEM, ENOBUFS];
}

/// WSAEMFILE and WSAENOBUFS.
#[cfg(windows)]
mod errno {
    pub const EXHAUSTION: [i32; 2] = [10024, 10055];
}

#[cfg(not(any(unix, windows)))]
mod errno {
    pub const EXHAUSTION: [i32; 0] = [];
}

fn is_resource_exhaustion(e: &std::io::Error) -> bool {
    e.kind() == ErrorKind::OutOfMemory
        || e.raw_os_error()
            .is_some_and(|code| errno::EXHAUSTION.contains(&code))
}

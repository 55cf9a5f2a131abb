//! Control socket server.

use crate::framing::{read_frame, write_frame};
use crate::{error_codes, IpcResult, Method, Request, Response};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Boxed async handler for one method.
pub type HandlerFn =
    Box<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync>;

type Handlers = Arc<RwLock<HashMap<Method, HandlerFn>>>;

/// How long open control connections get to finish after shutdown.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Pause after a failed `accept`, doubling per consecutive failure.
#[derive(Debug, Default)]
struct AcceptBackoff {
    failures: u32,
}

impl AcceptBackoff {
    const FIRST: Duration = Duration::from_millis(10);
    const CAP: Duration = Duration::from_secs(1);

    fn failed(&mut self) -> Duration {
        let delay = Self::FIRST
            .saturating_mul(1 << self.failures.min(7))
            .min(Self::CAP);
        self.failures = self.failures.saturating_add(1);
        delay
    }

    fn succeeded(&mut self) {
        self.failures = 0;
    }
}

/// Control server listening on a Unix domain socket.
pub struct IpcServer {
    socket_path: PathBuf,
    handlers: Handlers,
    shutdown_tx: broadcast::Sender<()>,
}

impl IpcServer {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            handlers: Handlers::default(),
            shutdown_tx: broadcast::channel(1).0,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Register a handler for a method, replacing any previous one.
    pub async fn register_handler<F, Fut>(&self, method: Method, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let boxed: HandlerFn = Box::new(move |req| Box::pin(handler(req)));
        self.handlers.write().await.insert(method, boxed);
    }

    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Sender for handlers that need to stop the server.
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    fn bind(&self) -> IpcResult<UnixListener> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(UnixListener::bind(&self.socket_path)?)
    }

    /// Serve until shutdown. The socket file is removed on exit.
    ///
    /// Connections still open at shutdown get [`DRAIN_GRACE`] to write
    /// their last response before they are aborted.
    pub async fn run(&self) -> IpcResult<()> {
        let listener = self.bind()?;
        info!(path = %self.socket_path.display(), "Control socket listening");

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut connections = JoinSet::new();
        let mut backoff = AcceptBackoff::default();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        backoff.succeeded();
                        connections.spawn(serve_connection(stream, self.handlers.clone()));
                    }
                    Err(e) => {
                        let delay = backoff.failed();
                        error!(error = %e, retry_in = ?delay, "Control socket accept error");
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = shutdown_rx.recv() => break,
                        }
                    }
                },
                _ = shutdown_rx.recv() => break,
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!("Control socket shutting down");
        let drained = tokio::time::timeout(DRAIN_GRACE, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            debug!(open = connections.len(), "Aborting idle control connections");
            connections.shutdown().await;
        }

        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }
}

async fn serve_connection(stream: UnixStream, handlers: Handlers) {
    if let Err(e) = answer_requests(stream, &handlers).await {
        warn!(error = %e, "Control connection error");
    }
}

async fn answer_requests(stream: UnixStream, handlers: &Handlers) -> IpcResult<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = String::new();

    while let Some(line) = read_frame(&mut reader, &mut buf).await? {
        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => dispatch(handlers, request).await,
            Err(e) => {
                warn!(error = %e, "Unparseable control request");
                Response::error("", error_codes::PARSE_ERROR, &format!("Parse error: {e}"))
            }
        };
        write_frame(&mut writer, &response).await?;
    }

    debug!("Control client disconnected");
    Ok(())
}

async fn dispatch(handlers: &Handlers, request: Request) -> Response {
    debug!(method = ?request.method, id = %request.id, "Control request");
    let handlers = handlers.read().await;
    let Some(handler) = handlers.get(&request.method) else {
        return Response::error(
            &request.id,
            error_codes::METHOD_NOT_FOUND,
            &format!("Method not found: {:?}", request.method),
        );
    };
    handler(request).await
}

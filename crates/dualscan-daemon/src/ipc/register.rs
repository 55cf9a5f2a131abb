//! Handler registration for the control socket.

use crate::app::DaemonState;
use crate::ipc::handlers;
use dualscan_ipc::IpcServer;
use tracing::info;

/// Register all control handlers.
pub async fn register_handlers(server: &IpcServer, state: DaemonState) {
    handlers::health::register(server).await;
    handlers::engine::register(server, state).await;

    info!("All control handlers registered");
}

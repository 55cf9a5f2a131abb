//! Daemon initialization.

use crate::app::DaemonState;
use crate::ipc::register_handlers;
use dualscan_config_and_utils::{Config, Paths};
use dualscan_ipc::{IpcClient, IpcServer, Method};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Run the daemon until a signal or a `shutdown` request arrives.
pub async fn run_daemon(config: Config, paths: Paths) -> Result<(), Box<dyn std::error::Error>> {
    // Singleton enforcement
    let socket_path = paths.socket_file();
    if socket_path.exists() {
        let client = IpcClient::new(&socket_path);
        if client.call_method(Method::Health).await.is_ok() {
            eprintln!("Error: dualscan is already running. Use 'dualscan stop' to stop it first.");
            std::process::exit(1);
        }
        eprintln!("Removing stale socket file");
        let _ = std::fs::remove_file(&socket_path);
    }

    let pid_file = paths.pid_file();
    if pid_file.exists() {
        let _ = std::fs::remove_file(&pid_file);
    }

    paths.ensure_dirs()?;

    let output_dir = config.output_dir(&paths);
    let state = DaemonState::new(&config, output_dir);
    let settings = state.engine.settings().clone();
    info!(
        host = %settings.listen_host,
        port1 = settings.port1,
        port2 = settings.port2,
        expected_aux_count = settings.expected_aux_count,
        output_dir = %state.output_dir.display(),
        save_each_record = config.save_each_record,
        "Configuration loaded"
    );

    let addrs = state.engine.start_configured().await?;

    let pid = std::process::id();
    std::fs::write(&pid_file, pid.to_string())?;
    info!(pid, channel1 = %addrs.channel1, channel2 = %addrs.channel2, "Daemon started");

    let ipc_server = IpcServer::new(&socket_path);
    register_handlers(&ipc_server, state.clone()).await;
    tokio::spawn(forward_signals(ipc_server.shutdown_sender()));

    let server_result = ipc_server.run().await;

    match state.engine.stop().await {
        Ok(saved) => info!(saved, "Accepted records saved"),
        Err(e) => error!(error = %e, "Failed to save accepted records on shutdown"),
    }

    let _ = std::fs::remove_file(&pid_file);
    let _ = std::fs::remove_file(&socket_path);
    info!("Daemon stopped");

    server_result.map_err(|e| e.into())
}

/// Turn SIGINT / SIGTERM into a control-socket shutdown.
async fn forward_signals(shutdown_tx: broadcast::Sender<()>) {
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM");
            None
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Cannot listen for Ctrl-C");
                return;
            }
            info!("Received Ctrl-C");
        }
        Some(_) = async { terminate.as_mut()?.recv().await } => {
            info!("Received SIGTERM");
        }
    }

    let _ = shutdown_tx.send(());
}

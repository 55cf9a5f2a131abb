//! Control-socket clients for stop, status, flush and reset.

use dualscan_config_and_utils::Paths;
use dualscan_ipc::{IpcClient, Method, Response};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Connect to the running daemon, or print why not.
fn client_for(paths: &Paths) -> Option<IpcClient> {
    let socket_path = paths.socket_file();
    if !socket_path.exists() {
        println!("Daemon is not running (socket not found)");
        return None;
    }
    Some(IpcClient::new(socket_path))
}

fn print_error(response: &Response) {
    match &response.error {
        Some(e) => println!("Daemon returned {}", e),
        None => println!("Daemon returned an empty response"),
    }
}

/// Stop the daemon.
pub async fn stop_daemon(paths: &Paths) -> CliResult {
    let socket_path = paths.socket_file();
    let pid_path = paths.pid_file();

    let Some(client) = client_for(paths) else {
        if pid_path.exists() {
            let _ = std::fs::remove_file(&pid_path);
        }
        return Ok(());
    };

    match client.call_method(Method::Shutdown).await {
        Ok(response) if response.is_success() => println!("Daemon shutdown initiated"),
        Ok(response) => print_error(&response),
        Err(e) => println!("Failed to connect to daemon: {}", e),
    }

    // Wait up to 5 seconds; the daemon removes its socket after saving records
    for _ in 0..50 {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        if !socket_path.exists() {
            println!("Daemon stopped");
            return Ok(());
        }
    }

    if !client.is_daemon_running().await {
        let _ = std::fs::remove_file(&socket_path);
        let _ = std::fs::remove_file(&pid_path);
        println!("Cleaned up stale socket file");
    } else {
        println!("Daemon is still running");
    }

    Ok(())
}

/// Print daemon and engine status.
pub async fn check_status(paths: &Paths) -> CliResult {
    let Some(client) = client_for(paths) else {
        return Ok(());
    };

    let health = match client.call_method(Method::Health).await {
        Ok(response) => response,
        Err(e) => {
            println!("Failed to connect to daemon: {}", e);
            println!("Daemon may not be running or socket may be stale");
            return Ok(());
        }
    };

    let version = health
        .result
        .as_ref()
        .and_then(|r| r.get("version"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let pid = std::fs::read_to_string(paths.pid_file()).ok();

    println!("Daemon is running");
    println!("  Version:  {}", version);
    if let Some(pid) = pid {
        println!("  PID:      {}", pid.trim());
    }
    println!("  Socket:   {}", paths.socket_file().display());

    let response = client.call_method(Method::EngineStatus).await?;
    let Some(status) = response.result.as_ref() else {
        print_error(&response);
        return Ok(());
    };

    let addr = |channel: &str| {
        status
            .get("listen_addrs")
            .and_then(|a| a.get(channel))
            .and_then(|v| v.as_str())
            .unwrap_or("-")
            .to_string()
    };
    let pending = |key: &str| {
        status
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| format!("waiting ({})", s))
            .unwrap_or_else(|| "empty".to_string())
    };

    println!("  Channel 1: {} [{}]", addr("channel1"), pending("pending_channel1"));
    println!("  Channel 2: {} [{}]", addr("channel2"), pending("pending_channel2"));
    println!(
        "  Accepted: {}",
        status.get("accepted_count").and_then(|v| v.as_u64()).unwrap_or(0)
    );
    println!(
        "  Expected aux codes: {}",
        status
            .get("expected_aux_count")
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
    );

    Ok(())
}

/// Save accepted records now.
pub async fn flush_records(paths: &Paths) -> CliResult {
    let Some(client) = client_for(paths) else {
        return Ok(());
    };

    match client.call_method(Method::EngineFlush).await?.into_result() {
        Ok(result) => println!(
            "Saved {} records to {}",
            result["saved"],
            result["output_dir"].as_str().unwrap_or("-")
        ),
        Err(e) => {
            println!("Daemon returned {}", e);
            if let Some(dir) = e.data.as_ref().and_then(|d| d["output_dir"].as_str()) {
                println!("  Output directory: {}", dir);
            }
        }
    }
    Ok(())
}

/// Discard accepted records without saving.
pub async fn reset_records(paths: &Paths) -> CliResult {
    let Some(client) = client_for(paths) else {
        return Ok(());
    };

    match client.call_method(Method::EngineReset).await?.into_result() {
        Ok(result) => println!("Discarded {} records", result["discarded"]),
        Err(e) => println!("Daemon returned {}", e),
    }
    Ok(())
}

//! Engine inspection and log management handlers.

use crate::app::DaemonState;
use dualscan_engine::EngineError;
use dualscan_ipc::{error_codes, IpcServer, Method, Request, Response};
use tracing::warn;

/// Activity lines returned when no `limit` is given.
const DEFAULT_ACTIVITY_LIMIT: usize = 100;

pub async fn register(server: &IpcServer, state: DaemonState) {
    let s = state.clone();
    server
        .register_handler(Method::EngineStatus, move |req| {
            let state = s.clone();
            async move { status(&state, &req).await }
        })
        .await;

    let s = state.clone();
    server
        .register_handler(Method::EngineFlush, move |req| {
            let state = s.clone();
            async move { flush(&state, &req) }
        })
        .await;

    let s = state.clone();
    server
        .register_handler(Method::EngineReset, move |req| {
            let state = s.clone();
            async move {
                let discarded = state.engine.reset();
                Response::success(&req.id, serde_json::json!({ "discarded": discarded }))
            }
        })
        .await;

    let s = state.clone();
    server
        .register_handler(Method::EngineRecords, move |req| {
            let state = s.clone();
            async move {
                let records = state.engine.accepted_records();
                Response::success(&req.id, serde_json::json!({ "records": records }))
            }
        })
        .await;

    let s = state;
    server
        .register_handler(Method::EngineActivity, move |req| {
            let state = s.clone();
            async move { activity(&state, &req) }
        })
        .await;
}

async fn status(state: &DaemonState, req: &Request) -> Response {
    let status = state.engine.status().await;
    match serde_json::to_value(&status) {
        Ok(value) => Response::success(&req.id, value),
        Err(e) => Response::error(&req.id, error_codes::INTERNAL_ERROR, &e.to_string()),
    }
}

fn flush(state: &DaemonState, req: &Request) -> Response {
    match state.engine.flush() {
        Ok(saved) => Response::success(
            &req.id,
            serde_json::json!({
                "saved": saved,
                "output_dir": state.output_dir.display().to_string(),
            }),
        ),
        Err(EngineError::Persistence(e)) => {
            warn!(error = %e, "Flush requested over control socket failed");
            Response::error(&req.id, error_codes::PERSISTENCE_FAILED, &e.to_string())
                .with_error_data(serde_json::json!({
                    "output_dir": state.output_dir.display().to_string(),
                }))
        }
        Err(e) => Response::error(&req.id, error_codes::ENGINE_STATE, &e.to_string()),
    }
}

fn activity(state: &DaemonState, req: &Request) -> Response {
    let limit = req
        .param_u64("limit")
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let lines = state.activity.lines();
    let skip = lines.len().saturating_sub(limit);
    let recent: Vec<String> = lines.into_iter().skip(skip).collect();
    Response::success(&req.id, serde_json::json!({ "lines": recent }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::register_handlers;
    use dualscan_config_and_utils::Config;
    use dualscan_engine::{ChannelId, ScanPayload};
    use dualscan_ipc::IpcClient;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const PRIMARY: &str = "12345678901234567890";

    struct Fixture {
        dir: TempDir,
        state: DaemonState,
        server: Arc<IpcServer>,
        client: IpcClient,
    }

    async fn fixture(config: Config) -> Fixture {
        let dir = TempDir::new().unwrap();
        let state = DaemonState::new(&config, dir.path().join("records"));
        let socket = dir.path().join("ctl.sock");
        let server = Arc::new(IpcServer::new(&socket));
        register_handlers(&server, state.clone()).await;

        let running = server.clone();
        tokio::spawn(async move { running.run().await });
        for _ in 0..100 {
            if socket.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        Fixture {
            client: IpcClient::new(&socket),
            dir,
            state,
            server,
        }
    }

    fn accept_one(state: &DaemonState) {
        state
            .engine
            .submit(ScanPayload::new(ChannelId::Channel1, format!("{PRIMARY}|A|B")));
        state
            .engine
            .submit(ScanPayload::new(ChannelId::Channel2, "C|D|E|F"));
    }

    #[tokio::test]
    async fn records_then_flush_writes_batch_file() {
        let f = fixture(Config::default()).await;
        accept_one(&f.state);

        let records = f.client.call_method(Method::EngineRecords).await.unwrap();
        assert_eq!(
            records.result.unwrap()["records"],
            serde_json::json!([format!("{PRIMARY}|A|B|C|D|E|F")])
        );

        let flushed = f.client.call_method(Method::EngineFlush).await.unwrap();
        assert_eq!(flushed.result.unwrap()["saved"], 1);

        let files: Vec<_> = std::fs::read_dir(f.dir.path().join("records"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("ReceivedCodes_"));

        f.server.shutdown();
    }

    #[tokio::test]
    async fn failed_flush_reports_output_dir() {
        let f = fixture(Config::default()).await;
        // A plain file where the records directory should be.
        std::fs::write(f.dir.path().join("records"), "").unwrap();
        accept_one(&f.state);

        let response = f.client.call_method(Method::EngineFlush).await.unwrap();
        let error = response.into_result().unwrap_err();
        assert_eq!(error.code, error_codes::PERSISTENCE_FAILED);
        let dir = error.data.unwrap()["output_dir"].as_str().unwrap().to_string();
        assert!(dir.ends_with("records"));

        f.server.shutdown();
    }

    #[tokio::test]
    async fn reset_reports_discarded_count() {
        let f = fixture(Config::default()).await;
        accept_one(&f.state);

        let response = f.client.call_method(Method::EngineReset).await.unwrap();
        assert_eq!(response.result.unwrap()["discarded"], 1);
        assert!(f.state.engine.accepted_records().is_empty());

        f.server.shutdown();
    }

    #[tokio::test]
    async fn status_reports_pending_and_aux_count() {
        let config = Config {
            expected_aux_count: Some(-5),
            ..Config::default()
        };
        let f = fixture(config).await;
        f.state
            .engine
            .submit(ScanPayload::new(ChannelId::Channel2, "waiting"));

        let response = f.client.call_method(Method::EngineStatus).await.unwrap();
        let status = response.result.unwrap();
        assert_eq!(status["running"], false);
        assert_eq!(status["pending_channel2"], "waiting");
        assert_eq!(status["expected_aux_count"], 6);

        f.server.shutdown();
    }

    #[tokio::test]
    async fn activity_respects_limit() {
        let f = fixture(Config::default()).await;
        accept_one(&f.state);

        let response = f
            .client
            .call_method_with_params(Method::EngineActivity, serde_json::json!({ "limit": 2 }))
            .await
            .unwrap();
        let lines = response.result.unwrap()["lines"].as_array().unwrap().len();
        assert_eq!(lines, 2);

        f.server.shutdown();
    }

    #[tokio::test]
    async fn save_each_record_writes_codes_file() {
        let config = Config {
            save_each_record: true,
            ..Config::default()
        };
        let f = fixture(config).await;
        accept_one(&f.state);

        let codes = f.dir.path().join("records").join("codes");
        let files: Vec<_> = std::fs::read_dir(&codes).unwrap().collect();
        assert_eq!(files.len(), 1);

        f.server.shutdown();
    }

    #[tokio::test]
    async fn shutdown_request_stops_server() {
        let f = fixture(Config::default()).await;
        let mut shutdown = f.server.shutdown_receiver();

        let response = f.client.call_method(Method::Shutdown).await.unwrap();
        assert!(response.is_success());
        assert!(tokio::time::timeout(Duration::from_secs(1), shutdown.recv())
            .await
            .is_ok());
    }
}

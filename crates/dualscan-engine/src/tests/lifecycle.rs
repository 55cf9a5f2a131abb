//! Start, stop, flush and reset.

use super::harness::{wait_until, Station, TestEngine, PRIMARY};
use crate::{ChannelId, EngineError};
use std::time::Duration;

fn item(primary: &str) -> (String, String) {
    (format!("{primary}|A1|A2"), "B1|B2".to_string())
}

#[tokio::test]
async fn stop_flushes_accepted_records_in_order() {
    let t = TestEngine::new(4);
    t.engine.start_configured().await.unwrap();

    for primary in ["11111111111111111111", "22222222222222222222"] {
        let (a, b) = item(primary);
        t.submit_pair(&a, &b);
    }

    let flushed = t.engine.stop().await.unwrap();
    assert_eq!(flushed, 2);
    assert_eq!(
        t.sink.records(),
        vec![
            "11111111111111111111|A1|A2|B1|B2".to_string(),
            "22222222222222222222|A1|A2|B1|B2".to_string(),
        ]
    );
    assert!(t.engine.accepted_records().is_empty());
}

#[tokio::test]
async fn stop_discards_pending_buffers() {
    let t = TestEngine::new(4);
    t.engine.start_configured().await.unwrap();
    t.submit(ChannelId::Channel1, "orphan");

    t.engine.stop().await.unwrap();

    let status = t.engine.status().await;
    assert_eq!(status.pending_channel1, None);
    assert!(!status.running);
}

#[tokio::test]
async fn stop_returns_promptly_with_open_connections() {
    let t = TestEngine::new(4);
    let addrs = t.engine.start_configured().await.unwrap();

    let _one = Station::connect(addrs.channel1).await;
    let _two = Station::connect(addrs.channel2).await;
    assert!(wait_until(|| t.activity_contains("channel 2: station connected")).await);

    let stopped = tokio::time::timeout(Duration::from_secs(2), t.engine.stop()).await;
    assert!(stopped.is_ok(), "stop should not wait for clients to hang up");
    assert!(t.activity_contains("channel 1: listener stopped"));
    assert!(!t.activity_contains("read error"));
}

#[tokio::test]
async fn double_start_is_rejected() {
    let t = TestEngine::new(4);
    t.engine.start_configured().await.unwrap();
    assert!(matches!(
        t.engine.start_configured().await,
        Err(EngineError::AlreadyRunning)
    ));
    t.engine.stop().await.unwrap();
}

#[tokio::test]
async fn stop_without_start_is_rejected() {
    let t = TestEngine::new(4);
    assert!(matches!(t.engine.stop().await, Err(EngineError::NotRunning)));
}

#[tokio::test]
async fn engine_restarts_with_empty_log() {
    let t = TestEngine::new(4);
    t.engine.start_configured().await.unwrap();
    let (a, b) = item(PRIMARY);
    t.submit_pair(&a, &b);
    t.engine.stop().await.unwrap();

    t.engine.start_configured().await.unwrap();
    // Same item is new again after the flush.
    let (a, b) = item(PRIMARY);
    assert!(matches!(
        t.submit_pair(&a, &b),
        crate::SubmitOutcome::Accepted(_)
    ));
    t.engine.stop().await.unwrap();
    assert_eq!(t.sink.batches().len(), 2);
}

#[test]
fn flush_with_empty_log_still_calls_sink() {
    let t = TestEngine::new(4);
    assert_eq!(t.engine.flush().unwrap(), 0);
    assert_eq!(t.sink.batches(), vec![Vec::<String>::new()]);
}

#[test]
fn failed_flush_is_reported_and_not_requeued() {
    let t = TestEngine::new(4);
    let (a, b) = item(PRIMARY);
    t.submit_pair(&a, &b);
    t.sink.set_failing(true);

    assert!(matches!(t.engine.flush(), Err(EngineError::Persistence(_))));
    assert!(t.engine.accepted_records().is_empty());
    assert!(t.activity_contains("Failed to save 1 records"));
}

#[test]
fn reset_drops_records_without_persisting() {
    let t = TestEngine::new(4);
    let (a, b) = item(PRIMARY);
    t.submit_pair(&a, &b);

    assert_eq!(t.engine.reset(), 1);
    assert!(t.engine.accepted_records().is_empty());
    assert!(t.sink.batches().is_empty());

    // Primary code is no longer a duplicate.
    assert!(matches!(
        t.submit_pair(&a, &b),
        crate::SubmitOutcome::Accepted(_)
    ));
}

//! Both stations submitting at the same time.

use super::harness::TestEngine;
use crate::{ChannelId, ScanPayload, SubmitOutcome};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

const ROUNDS: usize = 2_000;
const DISTINCT_PRIMARIES: usize = 10;

fn primary(i: usize) -> String {
    format!("{:020}", i % DISTINCT_PRIMARIES)
}

#[test]
fn concurrent_submits_never_accept_a_primary_twice() {
    let t = TestEngine::new(2);
    let barrier = Arc::new(Barrier::new(2));

    let workers: Vec<_> = ChannelId::ALL
        .into_iter()
        .map(|channel| {
            let engine = t.engine.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let mut outcomes = Vec::with_capacity(ROUNDS);
                for i in 0..ROUNDS {
                    let text = match channel {
                        ChannelId::Channel1 => format!("{}|A{}", primary(i), i % 3),
                        ChannelId::Channel2 => format!("B{}|C", i % 5),
                    };
                    outcomes.push(engine.submit(ScanPayload::new(channel, text)));
                }
                outcomes
            })
        })
        .collect();

    let outcomes: Vec<SubmitOutcome> = workers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();

    let records = t.engine.accepted_records();
    let primaries: Vec<&str> = records.iter().map(|r| &r[..20]).collect();
    let unique: HashSet<&str> = primaries.iter().copied().collect();
    assert_eq!(unique.len(), primaries.len(), "primary accepted twice");
    assert!(primaries.len() <= DISTINCT_PRIMARIES);

    let accepted = outcomes
        .iter()
        .filter(|o| matches!(o, SubmitOutcome::Accepted(_)))
        .count();
    assert_eq!(accepted, records.len());
    assert_eq!(t.observer.seen().len(), records.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pairing_slots_are_never_both_filled() {
    let t = TestEngine::new(1);

    let tasks: Vec<_> = ChannelId::ALL
        .into_iter()
        .map(|channel| {
            let engine = t.engine.clone();
            tokio::spawn(async move {
                for i in 0..ROUNDS {
                    let text = match channel {
                        ChannelId::Channel1 => primary(i),
                        ChannelId::Channel2 => format!("AUX{i}"),
                    };
                    engine.submit(ScanPayload::new(channel, text));
                    if i % 64 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let status = t.engine.status().await;
    assert!(
        status.pending_channel1.is_none() || status.pending_channel2.is_none(),
        "both slots held a value after a completed pairing step"
    );

    // Complete whatever is still waiting; both slots must then be empty.
    if status.pending_channel1.is_some() {
        t.submit(ChannelId::Channel2, "AUX-final");
    } else if status.pending_channel2.is_some() {
        t.submit(ChannelId::Channel1, &primary(0));
    }
    let status = t.engine.status().await;
    assert_eq!(status.pending_channel1, None);
    assert_eq!(status.pending_channel2, None);

    let records = t.engine.accepted_records();
    let unique: HashSet<&str> = records.iter().map(|r| &r[..20]).collect();
    assert_eq!(unique.len(), records.len());
}

//! The scan engine: lifecycle, reconciliation and handoff.

use crate::acceptance_log::{AcceptanceLog, AcceptedRecord};
use crate::activity::{TracingActivityLog, TracingNotifier};
use crate::channel::{ChannelId, ScanPayload};
use crate::error::{EngineError, EngineResult, ValidationError};
use crate::listener::{ChannelListener, ListenerExit, PayloadHandler};
use crate::ports::{ActivityLog, ConfigProvider, OperatorNotifier, PersistenceSink, RecordObserver};
use crate::reconciler::Reconciler;
use crate::validator::{resolve_expected_aux_count, validate, Verdict};
use dualscan_config_and_utils::{
    DEFAULT_EXPECTED_AUX_COUNT, DEFAULT_LISTEN_HOST, DEFAULT_PORT1, DEFAULT_PORT2,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Values the engine reads once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub listen_host: String,
    pub port1: u16,
    pub port2: u16,
    /// Already resolved; always the effective minimum.
    pub expected_aux_count: usize,
}

impl EngineSettings {
    /// Read settings from a provider, resolving the aux count fallback.
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Self {
        Self {
            listen_host: provider.listen_host().to_string(),
            port1: provider.port(ChannelId::Channel1),
            port2: provider.port(ChannelId::Channel2),
            expected_aux_count: resolve_expected_aux_count(
                provider.expected_aux_count(),
                provider.default_expected_aux_count(),
            ),
        }
    }

    pub fn port(&self, channel: ChannelId) -> u16 {
        match channel {
            ChannelId::Channel1 => self.port1,
            ChannelId::Channel2 => self.port2,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            listen_host: DEFAULT_LISTEN_HOST.to_string(),
            port1: DEFAULT_PORT1,
            port2: DEFAULT_PORT2,
            expected_aux_count: DEFAULT_EXPECTED_AUX_COUNT,
        }
    }
}

/// External collaborators the engine reports to.
#[derive(Clone)]
pub struct Collaborators {
    pub sink: Arc<dyn PersistenceSink>,
    pub notifier: Arc<dyn OperatorNotifier>,
    pub activity: Arc<dyn ActivityLog>,
    pub observers: Vec<Arc<dyn RecordObserver>>,
}

impl Collaborators {
    /// Collaborators that log through `tracing` and persist to `sink`.
    pub fn new(sink: Arc<dyn PersistenceSink>) -> Self {
        Self {
            sink,
            notifier: Arc::new(TracingNotifier),
            activity: Arc::new(TracingActivityLog),
            observers: Vec::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn OperatorNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_activity(mut self, activity: Arc<dyn ActivityLog>) -> Self {
        self.activity = activity;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RecordObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

/// What one submitted payload led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Stored; waiting for the other station.
    Buffered { channel: ChannelId },
    Accepted(AcceptedRecord),
    /// Primary code already accepted since the last flush.
    Duplicate { primary_code: String },
    Rejected(ValidationError),
}

/// Actual bound addresses of both listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListenAddrs {
    pub channel1: SocketAddr,
    pub channel2: SocketAddr,
}

impl ListenAddrs {
    pub fn get(&self, channel: ChannelId) -> SocketAddr {
        match channel {
            ChannelId::Channel1 => self.channel1,
            ChannelId::Channel2 => self.channel2,
        }
    }
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub running: bool,
    pub pending_channel1: Option<String>,
    pub pending_channel2: Option<String>,
    pub accepted_count: usize,
    pub expected_aux_count: usize,
    pub listen_addrs: Option<ListenAddrs>,
    /// Per channel, whether its listener task is still running.
    pub listeners_alive: [bool; 2],
}

/// Pairing buffers and acceptance log, guarded together.
#[derive(Debug, Default)]
struct EngineState {
    reconciler: Reconciler,
    log: AcceptanceLog,
}

struct Shared {
    state: parking_lot::Mutex<EngineState>,
    settings: EngineSettings,
    collaborators: Collaborators,
}

struct Running {
    shutdown_tx: broadcast::Sender<()>,
    listeners: Vec<JoinHandle<ListenerExit>>,
    addrs: ListenAddrs,
}

/// Two-station reconciliation engine.
pub struct ScanEngine {
    shared: Arc<Shared>,
    running: AsyncMutex<Option<Running>>,
}

impl ScanEngine {
    pub fn new(settings: EngineSettings, collaborators: Collaborators) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: parking_lot::Mutex::new(EngineState::default()),
                settings,
                collaborators,
            }),
            running: AsyncMutex::new(None),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.shared.settings
    }

    /// Feed one payload through pairing and validation.
    pub fn submit(&self, payload: ScanPayload) -> SubmitOutcome {
        self.shared.submit(payload)
    }

    /// Bind both listeners and start accepting.
    ///
    /// Fails without starting anything if either port cannot be bound.
    pub async fn start(&self, host: &str, port1: u16, port2: u16) -> EngineResult<ListenAddrs> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(EngineError::AlreadyRunning);
        }

        let activity = self.shared.collaborators.activity.clone();
        let first = ChannelListener::bind(&format!("{host}:{port1}"), ChannelId::Channel1)
            .await?
            .with_activity(activity.clone());
        let second = ChannelListener::bind(&format!("{host}:{port2}"), ChannelId::Channel2)
            .await?
            .with_activity(activity);

        let addrs = ListenAddrs {
            channel1: first.local_addr(),
            channel2: second.local_addr(),
        };

        let (shutdown_tx, _) = broadcast::channel(1);
        let listeners = [first, second]
            .into_iter()
            .map(|listener| {
                let shutdown_rx = shutdown_tx.subscribe();
                let shared = self.shared.clone();
                tokio::spawn(async move { shared.run_listener(listener, shutdown_rx).await })
            })
            .collect();

        info!(
            channel1 = %addrs.channel1,
            channel2 = %addrs.channel2,
            expected_aux_count = self.shared.settings.expected_aux_count,
            "Engine started"
        );

        *running = Some(Running {
            shutdown_tx,
            listeners,
            addrs,
        });
        Ok(addrs)
    }

    /// Start on the host and ports from [`EngineSettings`].
    pub async fn start_configured(&self) -> EngineResult<ListenAddrs> {
        let settings = &self.shared.settings;
        self.start(&settings.listen_host, settings.port1, settings.port2)
            .await
    }

    /// Stop both listeners, discard pending buffers and flush the log.
    ///
    /// Returns the number of records handed to the sink.
    pub async fn stop(&self) -> EngineResult<usize> {
        let Some(running) = self.running.lock().await.take() else {
            return Err(EngineError::NotRunning);
        };

        let _ = running.shutdown_tx.send(());
        for handle in running.listeners {
            if let Err(e) = handle.await {
                warn!(error = %e, "Listener task did not finish cleanly");
            }
        }

        let discarded = self.shared.state.lock().reconciler.clear();
        if discarded > 0 {
            debug!(discarded, "Discarded pending buffers on stop");
        }

        info!("Engine stopped");
        self.flush()
    }

    /// Hand every accepted record to the sink and clear the log.
    ///
    /// Records are not put back if the sink fails.
    pub fn flush(&self) -> EngineResult<usize> {
        self.shared.flush()
    }

    /// Drop all accepted records without persisting them.
    pub fn reset(&self) -> usize {
        let dropped = self.shared.state.lock().log.reset();
        info!(dropped, "Acceptance log reset");
        self.shared
            .collaborators
            .activity
            .log(&format!("Database cleared ({dropped} records discarded)"));
        dropped
    }

    /// Serialized accepted records, in acceptance order.
    pub fn accepted_records(&self) -> Vec<String> {
        self.shared.state.lock().log.serialized()
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    pub async fn status(&self) -> EngineStatus {
        let running = self.running.lock().await;
        let (listen_addrs, listeners_alive) = match running.as_ref() {
            Some(r) => {
                let mut alive = [false; 2];
                for (slot, handle) in alive.iter_mut().zip(&r.listeners) {
                    *slot = !handle.is_finished();
                }
                (Some(r.addrs), alive)
            }
            None => (None, [false; 2]),
        };

        let state = self.shared.state.lock();
        EngineStatus {
            running: running.is_some(),
            pending_channel1: state
                .reconciler
                .pending(ChannelId::Channel1)
                .map(str::to_string),
            pending_channel2: state
                .reconciler
                .pending(ChannelId::Channel2)
                .map(str::to_string),
            accepted_count: state.log.len(),
            expected_aux_count: self.shared.settings.expected_aux_count,
            listen_addrs,
            listeners_alive,
        }
    }
}

impl Shared {
    fn submit(&self, payload: ScanPayload) -> SubmitOutcome {
        let channel = payload.channel;
        let activity = &self.collaborators.activity;
        activity.log(&format!("{}: received {}", channel, payload.text));

        let mut candidate_text = None;
        let outcome = {
            let mut state = self.state.lock();
            match state.reconciler.offer(payload) {
                None => SubmitOutcome::Buffered { channel },
                Some(candidate) => {
                    let verdict =
                        validate(&candidate, self.settings.expected_aux_count, &state.log);
                    candidate_text = Some(candidate.combined_text);
                    match verdict {
                        Ok(Verdict::Accepted(record)) => {
                            state.log.append(record.clone());
                            SubmitOutcome::Accepted(record)
                        }
                        Ok(Verdict::Duplicate { primary_code }) => {
                            SubmitOutcome::Duplicate { primary_code }
                        }
                        Err(e) => SubmitOutcome::Rejected(e),
                    }
                }
            }
        };

        let combined = candidate_text.unwrap_or_default();
        match &outcome {
            SubmitOutcome::Buffered { channel } => {
                debug!(%channel, "Waiting for peer");
                activity.log(&format!("{}: waiting for {}", channel, channel.peer()));
            }
            SubmitOutcome::Accepted(record) => {
                info!(primary_code = %record.primary_code, aux = record.aux_codes.len(), "Record accepted");
                activity.log(&format!("Combined: {combined}"));
                activity.log(&format!("Accepted: {}", record.serialized()));
                for observer in &self.collaborators.observers {
                    observer.on_accepted(record);
                }
            }
            SubmitOutcome::Duplicate { primary_code } => {
                info!(%primary_code, "Duplicate primary code dropped");
                activity.log(&format!("Combined: {combined}"));
                activity.log(&format!("Duplicate primary code {primary_code}, ignored"));
            }
            SubmitOutcome::Rejected(e) => {
                warn!(error = %e, candidate = %combined, "Candidate rejected");
                activity.log(&format!("Combined: {combined}"));
                activity.log(&format!("Rejected: {e}"));
                self.collaborators.notifier.notify(&e.to_string(), e.kind());
            }
        }

        outcome
    }

    fn flush(&self) -> EngineResult<usize> {
        let batch = self.state.lock().log.drain_all();
        let count = batch.len();

        if let Err(e) = self.collaborators.sink.save_batch(&batch) {
            error!(error = %e, records = count, "Failed to persist records");
            self.collaborators
                .activity
                .log(&format!("Failed to save {count} records: {e}"));
            return Err(e.into());
        }

        info!(records = count, "Flushed acceptance log");
        self.collaborators
            .activity
            .log(&format!("Saved {count} records"));
        Ok(count)
    }

    async fn run_listener(
        self: Arc<Self>,
        listener: ChannelListener,
        shutdown: broadcast::Receiver<()>,
    ) -> ListenerExit {
        let channel = listener.channel();
        let shared = self.clone();
        let on_payload: PayloadHandler = Arc::new(move |payload: ScanPayload| {
            shared.submit(payload);
        });

        let exit = listener.run(on_payload, shutdown).await;
        if let ListenerExit::Failed(reason) = &exit {
            error!(%channel, %reason, "Listener exited");
            self.collaborators
                .activity
                .log(&format!("{channel}: listener failed: {reason}"));
        }
        exit
    }
}

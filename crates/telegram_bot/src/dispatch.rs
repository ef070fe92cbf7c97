//! Update dispatcher.
//!
//! Inbound events are drained from one ordered stream and routed to lanes by
//! user id. Every lane handles its events one at a time, so the events of a
//! user are always processed in arrival order. One lane (the default) means a
//! single queue for everybody.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{sync::mpsc, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    event::InboundEvent,
    handlers::{Assistant, HandlerError},
};

const DEFAULT_EVENT_TIMEOUT: Duration = Duration::from_secs(10);
const LANE_CAPACITY: usize = 64;

/// Counters exposed for logging at shutdown and for tests.
#[derive(Debug, Default)]
pub struct DispatchStats {
    handled: AtomicU64,
    failed: AtomicU64,
    transport_failures: AtomicU64,
}

impl DispatchStats {
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn transport_failures(&self) -> u64 {
        self.transport_failures.load(Ordering::Relaxed)
    }
}

pub struct Dispatcher {
    assistant: Arc<Assistant>,
    lanes: usize,
    event_timeout: Duration,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    pub fn new(assistant: Arc<Assistant>) -> Self {
        Self {
            assistant,
            lanes: 1,
            event_timeout: DEFAULT_EVENT_TIMEOUT,
            stats: Arc::default(),
        }
    }

    /// Number of independent ordered queues. Zero is treated as one.
    pub fn with_lanes(mut self, lanes: usize) -> Self {
        self.lanes = lanes.max(1);
        self
    }

    /// Deadline of a single event, storage and rate lookups included.
    pub fn with_event_timeout(mut self, timeout: Duration) -> Self {
        self.event_timeout = timeout;
        self
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    /// Runs until `inbound` closes or `shutdown` fires.
    ///
    /// After shutdown no new event is started; events already being handled
    /// run to completion before this returns.
    pub async fn run(self, mut inbound: mpsc::Receiver<InboundEvent>, shutdown: CancellationToken) {
        let mut senders = Vec::with_capacity(self.lanes);
        let mut workers = JoinSet::new();
        for lane in 0..self.lanes {
            let (tx, rx) = mpsc::channel(LANE_CAPACITY);
            senders.push(tx);
            workers.spawn(lane_worker(
                lane,
                rx,
                self.assistant.clone(),
                self.event_timeout,
                self.stats.clone(),
                shutdown.clone(),
            ));
        }
        tracing::info!(lanes = self.lanes, "dispatcher started");

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = inbound.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let lane = lane_for(event.user_id(), senders.len());
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                sent = senders[lane].send(event) => {
                    if sent.is_err() {
                        tracing::error!(lane, "dispatch lane closed");
                        break;
                    }
                }
            }
        }

        drop(senders);
        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                tracing::error!("dispatch lane panicked: {err}");
            }
        }

        tracing::info!(
            handled = self.stats.handled(),
            failed = self.stats.failed(),
            transport_failures = self.stats.transport_failures(),
            "dispatcher stopped"
        );
    }
}

fn lane_for(user_id: engine::UserId, lanes: usize) -> usize {
    (user_id.unsigned_abs() % lanes as u64) as usize
}

async fn lane_worker(
    lane: usize,
    mut events: mpsc::Receiver<InboundEvent>,
    assistant: Arc<Assistant>,
    event_timeout: Duration,
    stats: Arc<DispatchStats>,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        process(lane, event, &assistant, event_timeout, &stats).await;
    }
}

async fn process(
    lane: usize,
    event: InboundEvent,
    assistant: &Assistant,
    event_timeout: Duration,
    stats: &DispatchStats,
) {
    let user_id = event.user_id();
    let kind = event.kind();
    tracing::debug!(lane, user_id, kind, "inbound event");

    let result = match tokio::time::timeout(event_timeout, assistant.handle(event)).await {
        Ok(result) => result,
        Err(_) => Err(HandlerError::Timeout {
            user_id,
            timeout: event_timeout,
        }),
    };

    match result {
        Ok(()) => {
            stats.handled.fetch_add(1, Ordering::Relaxed);
        }
        Err(err) => {
            if matches!(err, HandlerError::Transport(_)) {
                stats.transport_failures.fetch_add(1, Ordering::Relaxed);
            }
            stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(lane, user_id, kind, "event failed: {err}");
        }
    }
}

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use spdlog::{debug, error, info, trace, warn};
use tokio::sync::watch;

use crate::agent::Publisher;
use crate::error::{QueueError, RelayError, Result};
use crate::metrics::metric_types::{Reading, TIMESTAMP_FIELD};
use crate::metrics::payload::decode;
use crate::metrics::SharedStore;
use crate::queue::Queue;
use crate::sync::{ConnectionState, EngineState, RateState};

#[derive(Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Payload decoded. `fields` tracked metrics were updated.
    Merged { fields: usize },
    /// Payload could not be decoded and was dropped
    Skipped,
}

/// Drains the queue into the metric store, one message at a time, and retunes the report
/// interval from the backlog left behind.
pub struct SyncEngine {
    queue: Arc<dyn Queue>,
    queue_key: String,
    tracked: HashSet<String>,
    store: SharedStore,
    publisher: Arc<dyn Publisher>,
    rate: RateState,
    connection: watch::Receiver<ConnectionState>,
    state: EngineState,
}

impl SyncEngine {
    pub fn new(
        queue: Arc<dyn Queue>,
        queue_key: &str,
        store: SharedStore,
        publisher: Arc<dyn Publisher>,
        base_interval: Duration,
        connection: watch::Receiver<ConnectionState>,
    ) -> Self {
        let tracked = match store.lock() {
            Ok(store) => store.names().into_iter().collect(),
            Err(_) => HashSet::new(),
        };

        Self {
            queue,
            queue_key: queue_key.to_string(),
            tracked,
            store,
            publisher,
            rate: RateState::new(base_interval),
            connection,
            state: EngineState::Idle,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn rate(&self) -> &RateState {
        &self.rate
    }

    /// Hands the publisher one provider per tracked metric.
    pub fn register_metrics(&self) {
        let mut names: Vec<&String> = self.tracked.iter().collect();
        names.sort();

        for name in names {
            let store = self.store.clone();
            let metric = name.clone();
            self.publisher.add_metric(name, Box::new(move || read_for_report(&store, &metric)));
        }
    }

    /// Consumes while the publisher is connected, pausing while it is not.
    ///
    /// Returns `Ok` once the queue is closed and drained. Any other queue failure, or the
    /// publisher going away, ends the loop with an error.
    pub async fn run(mut self) -> Result<()> {
        loop {
            self.state = EngineState::Idle;
            let connected = self.connection.wait_for(|state| state.is_connected()).await.is_ok();
            if !connected {
                return Err(RelayError::PublisherGone);
            }

            match self.consume_once().await {
                Ok(outcome) => trace!("Consumed message: {:?}", outcome),
                Err(RelayError::Queue(QueueError::Closed)) => {
                    info!("Queue {} closed. Stopping consumption", self.queue_key);
                    self.state = EngineState::Idle;
                    return Ok(());
                }
                Err(e) => {
                    error!("Queue consumption failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Pops one message, merges its tracked fields and applies the backlog policy.
    pub async fn consume_once(&mut self) -> Result<ConsumeOutcome> {
        self.state = EngineState::AwaitingMessage;
        let raw = self.queue.pop(&self.queue_key).await?;
        let received_at = Utc::now().timestamp_millis();

        self.state = EngineState::Processing;
        let outcome = self.merge(&raw, received_at);

        self.state = EngineState::BacklogCheck;
        self.check_backlog().await;

        self.state = EngineState::AwaitingMessage;
        Ok(outcome)
    }

    fn merge(&self, raw: &[u8], received_at: i64) -> ConsumeOutcome {
        let payload = match decode(raw) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Invalid payload in {}, skipping: {}", self.queue_key, e);
                return ConsumeOutcome::Skipped;
            }
        };

        let mut store = match self.store.lock() {
            Ok(store) => store,
            Err(_) => {
                error!("Metric store lock poisoned. Dropping payload");
                return ConsumeOutcome::Skipped;
            }
        };

        let timestamp = payload.timestamp.unwrap_or(received_at);
        let mut fields = 0;
        for (name, value) in payload.fields.iter() {
            if name == TIMESTAMP_FIELD || !self.tracked.contains(name) {
                continue;
            }
            if store.update(name, Some(timestamp), *value) {
                fields += 1;
            }
        }
        store.mark_dirty();

        debug!("Merged {} metrics at {}", fields, timestamp);
        ConsumeOutcome::Merged { fields }
    }

    async fn check_backlog(&mut self) {
        let backlog = match self.queue.len(&self.queue_key).await {
            Ok(len) => len,
            Err(e) => {
                warn!("Could not read backlog of {}, keeping current speed: {}", self.queue_key, e);
                return;
            }
        };
        trace!("Backlog of {}: {}", self.queue_key, backlog);

        if let Some(interval) = self.rate.apply_backlog(backlog) {
            if self.rate.is_sped_up() {
                info!("Backlog of {} messages. Reporting every {:?}", backlog, interval);
            } else {
                info!("Backlog drained. Reporting every {:?}", interval);
            }
            self.publisher.set_interval(interval);
        }
    }
}

fn read_for_report(store: &SharedStore, name: &str) -> Reading {
    match store.lock() {
        Ok(mut store) => store.read_for_report(name).unwrap_or_default(),
        Err(_) => Reading::unset(),
    }
}

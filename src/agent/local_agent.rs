use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use spdlog::{debug, error, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::agent::{AgentEvent, AgentInfo, MetricProvider, MetricReport, Publisher, Report, ReportSink};
use crate::error::PublishError;

/// In-process reporter: on its own clock it reads every registered provider and hands the
/// resulting report to a sink.
pub struct LocalAgent {
    inner: Arc<AgentInner>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

struct AgentInner {
    info: AgentInfo,
    providers: Mutex<Vec<(String, MetricProvider)>>,
    interval: watch::Sender<Duration>,
    events: mpsc::Sender<AgentEvent>,
    sink: Arc<dyn ReportSink>,
    /// Last report reached the sink
    healthy: AtomicBool,
}

impl LocalAgent {
    pub fn new(
        info: AgentInfo,
        interval: Duration,
        sink: Arc<dyn ReportSink>,
    ) -> (Self, mpsc::Receiver<AgentEvent>) {
        let (events_tx, events_rx) = mpsc::channel::<AgentEvent>(64);
        let (interval_tx, _) = watch::channel(interval);

        let inner = AgentInner {
            info,
            providers: Mutex::new(vec![]),
            interval: interval_tx,
            events: events_tx,
            sink,
            healthy: AtomicBool::new(true),
        };

        let agent = Self {
            inner: Arc::new(inner),
            ticker: Mutex::new(None),
        };
        (agent, events_rx)
    }

    /// Reads every provider and sends one report, outside of the regular tick.
    pub async fn report_once(&self) -> Result<Report, PublishError> {
        self.inner.report_once().await
    }

    pub fn is_running(&self) -> bool {
        match self.ticker.lock() {
            Ok(ticker) => ticker.as_ref().map(|t| !t.is_finished()).unwrap_or(false),
            Err(_) => false,
        }
    }
}

impl AgentInner {
    fn build_report(&self) -> Report {
        let now = Utc::now().timestamp_millis();
        let metrics = match self.providers.lock() {
            Ok(providers) => providers
                .iter()
                .map(|(name, provider)| MetricReport::from_reading(name, provider(), now))
                .collect(),
            Err(_) => {
                error!("Metric providers lock poisoned. Sending empty report");
                vec![]
            }
        };

        Report {
            agent: self.info.clone(),
            timestamp: now,
            metrics,
        }
    }

    async fn report_once(&self) -> Result<Report, PublishError> {
        let report = self.build_report();

        match self.sink.send(&report).await {
            Ok(()) => {
                if !self.healthy.swap(true, Ordering::AcqRel) {
                    info!("Report transport recovered");
                    self.emit(AgentEvent::Connected).await;
                }
                self.emit(AgentEvent::MessageReceived).await;
                Ok(report)
            }
            Err(e) => {
                if self.healthy.swap(false, Ordering::AcqRel) {
                    warn!("Error sending report: {}. Reconnecting", e);
                    self.emit(AgentEvent::Reconnecting).await;
                }
                Err(e)
            }
        }
    }

    async fn emit(&self, event: AgentEvent) {
        if let Err(e) = self.events.send(event).await {
            debug!("Nobody listening for agent events: {}", e);
        }
    }

    /// Each wait ends `period` after the previous tick. An interval change only moves that
    /// deadline, so a period changing faster than it elapses still ticks.
    async fn run_ticker(self: Arc<Self>) {
        let mut interval_rx = self.interval.subscribe();
        let mut last_tick = Instant::now();
        loop {
            let period = *interval_rx.borrow_and_update();
            tokio::select! {
                _ = tokio::time::sleep_until(last_tick + period) => {
                    last_tick = Instant::now();
                    // Failures are reported through the event channel
                    let _ = self.report_once().await;
                }
                changed = interval_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    debug!("Report interval changed to {:?}", *interval_rx.borrow());
                }
            }
        }
    }
}

#[async_trait]
impl Publisher for LocalAgent {
    async fn connect(&self) -> Result<(), PublishError> {
        {
            let mut ticker = self
                .ticker
                .lock()
                .map_err(|_| PublishError::Transport("agent ticker lock poisoned".to_string()))?;
            if ticker.as_ref().map(|t| !t.is_finished()).unwrap_or(false) {
                return Ok(());
            }
            *ticker = Some(tokio::spawn(self.inner.clone().run_ticker()));
        }

        info!("Agent {} connected to {}", self.inner.info.uuid, self.inner.info.target);
        self.inner.healthy.store(true, Ordering::Release);
        self.inner.emit(AgentEvent::Connected).await;
        Ok(())
    }

    async fn disconnect(&self) {
        let ticker = match self.ticker.lock() {
            Ok(mut ticker) => ticker.take(),
            Err(_) => None,
        };

        if let Some(ticker) = ticker {
            ticker.abort();
            info!("Agent {} disconnected", self.inner.info.uuid);
            self.inner.emit(AgentEvent::Disconnected).await;
        }
    }

    fn add_metric(&self, name: &str, provider: MetricProvider) {
        match self.inner.providers.lock() {
            Ok(mut providers) => providers.push((name.to_string(), provider)),
            Err(_) => error!("Could not register metric {}: providers lock poisoned", name),
        }
    }

    fn set_interval(&self, interval: Duration) {
        self.inner.interval.send_replace(interval);
    }

    fn interval(&self) -> Duration {
        *self.inner.interval.borrow()
    }
}

impl Drop for LocalAgent {
    fn drop(&mut self) {
        if let Ok(mut ticker) = self.ticker.lock() {
            if let Some(ticker) = ticker.take() {
                ticker.abort();
            }
        }
    }
}

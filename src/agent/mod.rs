use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::PublishError;
use crate::metrics::metric_types::Reading;

pub use local_agent::LocalAgent;
pub use report_sink::{LogSink, ReportSink};

mod local_agent;
mod report_sink;

/// Called on every report for the current reading of one metric.
pub type MetricProvider = Box<dyn Fn() -> Reading + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentEvent {
    Connected,
    Disconnected,
    Reconnecting,
    /// A report went out. Fired after every provider has been read.
    MessageReceived,
}

/// Periodic reporter. Connection events are delivered on the channel handed out when the
/// publisher is built.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn connect(&self) -> Result<(), PublishError>;

    async fn disconnect(&self);

    fn add_metric(&self, name: &str, provider: MetricProvider);

    /// Changes the report period. Takes effect from the next wait.
    fn set_interval(&self, interval: Duration);

    fn interval(&self) -> Duration;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentInfo {
    pub uuid: String,
    pub target: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricReport {
    #[serde(rename = "type")]
    pub name: String,
    pub time: i64,
    pub value: Option<f64>,
}

impl MetricReport {
    /// Readings without a timestamp are stamped with the report time.
    pub fn from_reading(name: &str, reading: Reading, report_time: i64) -> Self {
        Self {
            name: name.to_string(),
            time: reading.timestamp.unwrap_or(report_time),
            value: reading.value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub agent: AgentInfo,
    pub timestamp: i64,
    pub metrics: Vec<MetricReport>,
}

impl Report {
    pub fn metric(&self, name: &str) -> Option<&MetricReport> {
        self.metrics.iter().find(|m| m.name == name)
    }
}

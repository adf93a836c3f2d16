use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use spdlog::formatter::{pattern, PatternFormatter};
use spdlog::sink::Sink;
use spdlog::{info, Logger};

use crate::agent::Report;
use crate::error::PublishError;
use crate::logger::daily_file_sink;

/// Transport a report is handed to on every tick.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn send(&self, report: &Report) -> Result<(), PublishError>;
}

/// Writes every report as one JSON line.
pub struct LogSink {
    logger: Option<Arc<Logger>>,
}

impl LogSink {
    /// Daily rotated report file, one bare JSON report per line. Old files are kept.
    pub fn to_file(base_path: &Path) -> spdlog::Result<Self> {
        let daily = daily_file_sink(base_path, 0)?;
        daily.set_formatter(Box::new(PatternFormatter::new(pattern!("{payload}{eol}"))));

        let logger = Arc::new(Logger::builder().sink(daily).build()?);
        Ok(Self {
            logger: Some(logger),
        })
    }

    /// Reports go to the default logger
    pub fn to_console() -> Self {
        Self { logger: None }
    }
}

#[async_trait]
impl ReportSink for LogSink {
    async fn send(&self, report: &Report) -> Result<(), PublishError> {
        let json = serde_json::to_string(report)?;
        match self.logger {
            Some(ref logger) => {
                info!(logger: logger, "{}", &json);
                logger.flush();
            }
            None => info!("report {}", &json),
        }
        Ok(())
    }
}

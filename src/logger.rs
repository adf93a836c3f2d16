use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use spdlog::sink::{RotatingFileSink, RotationPolicy, Sink, StdStream, StdStreamSink};
use spdlog::{Level, LevelFilter, Logger};

use crate::config::{Config, LogLevel};

/// Relay logs keep a month of files
const LOG_FILES_KEPT: usize = 30;

/// Least severe level the relay logs at
fn most_verbose(level: LogLevel) -> Level {
    // Declared in the same order as spdlog's levels
    Level::iter().nth(level as usize).unwrap_or(Level::Info)
}

/// File sink rolled over at midnight. `max_files` of 0 keeps every file.
pub fn daily_file_sink(base_path: &Path, max_files: usize) -> spdlog::Result<Arc<RotatingFileSink>> {
    let sink = RotatingFileSink::builder()
        .base_path(base_path)
        .rotation_policy(RotationPolicy::Daily { hour: 0, minute: 0 })
        .max_files(max_files)
        .rotate_on_open(false)
        .build()?;
    Ok(Arc::new(sink))
}

/// Errors and warnings on stderr, everything else on stdout
fn console_sinks() -> spdlog::Result<Vec<Arc<dyn Sink>>> {
    let split = [
        (StdStream::Stdout, LevelFilter::MoreVerbose(Level::Warn)),
        (StdStream::Stderr, LevelFilter::MoreSevereEqual(Level::Warn)),
    ];

    let mut sinks: Vec<Arc<dyn Sink>> = Vec::with_capacity(split.len());
    for (stream, filter) in split {
        let sink = StdStreamSink::builder().std_stream(stream).level_filter(filter).build()?;
        sinks.push(Arc::new(sink));
    }
    Ok(sinks)
}

/// Installs the configured logger as default. Without a `[log]` section the console
/// default logger stays in place.
pub fn configure_logger(config: &Config) -> spdlog::Result<()> {
    let Some(ref log) = config.log else {
        return Ok(());
    };

    let mut sinks: Vec<Arc<dyn Sink>> = vec![];
    if let Some(ref location) = log.location {
        sinks.push(daily_file_sink(location, LOG_FILES_KEPT)?);
    }
    if log.location.is_none() || log.log_to_console {
        sinks.extend(console_sinks()?);
    }

    let logger = Arc::new(Logger::builder().sinks(sinks).build()?);
    logger.set_flush_level_filter(LevelFilter::MoreSevereEqual(Level::Info));
    logger.set_flush_period(Some(Duration::from_secs(2)));
    logger.set_level_filter(LevelFilter::MoreSevereEqual(most_verbose(log.level)));

    spdlog::set_default_logger(logger);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(most_verbose(LogLevel::Critical), Level::Critical);
        assert_eq!(most_verbose(LogLevel::Warn), Level::Warn);
        assert_eq!(most_verbose(LogLevel::Debug), Level::Debug);
        assert_eq!(most_verbose(LogLevel::Trace), Level::Trace);
    }

    #[test]
    fn test_daily_file_sink_writes_under_base_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = daily_file_sink(&dir.path().join("relay.log"), LOG_FILES_KEPT).unwrap();
        let logger = Logger::builder().sink(sink).build().unwrap();

        spdlog::info!(logger: logger, "queue drained");
        logger.flush();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let written = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        assert!(written.contains("queue drained"));
    }
}

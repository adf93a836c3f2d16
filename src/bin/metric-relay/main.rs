use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use spdlog::{critical, info, warn};
use tokio::io::BufReader;
use tokio::task::JoinHandle;

use metric_relay::agent::{AgentInfo, LocalAgent, LogSink, Publisher, ReportSink};
use metric_relay::config::{Config, QueueBackend};
use metric_relay::logger::configure_logger;
use metric_relay::metrics::metric_store::MetricStore;
use metric_relay::metrics::shared_store;
use metric_relay::queue::{feed_lines, MemoryQueue, Queue, RedisQueue};
use metric_relay::sync::{connection_channel, EventHandler, ReportTracker, SyncEngine};

use crate::config::{generate_cfg, open_config};

mod config;
mod config_data;

const CFG_FILE_NAME: &str = "metric-relay.toml";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config path
    #[arg(short, long)]
    config_path: Option<String>,

    /// Writes a sample config file and exits
    #[arg(long)]
    init: bool,
}

fn report_sink(config: &Config) -> Arc<dyn ReportSink> {
    let location = config.report.as_ref().and_then(|report| report.location.as_ref());
    match location {
        Some(location) => match LogSink::to_file(location) {
            Ok(sink) => {
                info!("Writing reports to {}", location.display());
                Arc::new(sink)
            }
            Err(err) => {
                warn!("Error creating report file. Reporting to console instead. Desc={}", err);
                Arc::new(LogSink::to_console())
            }
        },
        None => Arc::new(LogSink::to_console()),
    }
}

/// Stdin lines pushed on an in-process list, closed at end of input
fn stdin_queue(key: &str) -> (Arc<MemoryQueue>, JoinHandle<()>) {
    let queue = Arc::new(MemoryQueue::new());
    let feeder = {
        let queue = queue.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            match feed_lines(stdin, &queue, &key).await {
                Ok(total) => info!("Input finished after {} messages", total),
                Err(e) => warn!("Input stopped: {}", e),
            }
            queue.close();
        })
    };
    (queue, feeder)
}

async fn relay(config: Config) -> Result<()> {
    let queue_key = config.queue.key.clone();
    let (queue, feeder): (Arc<dyn Queue>, Option<JoinHandle<()>>) = match config.queue.backend {
        QueueBackend::Redis => {
            info!("Consuming {} from redis at {}:{}", queue_key, config.queue.host, config.queue.port);
            let queue = RedisQueue::connect(&config.queue.host, config.queue.port).await?;
            (Arc::new(queue) as Arc<dyn Queue>, None)
        }
        QueueBackend::Stdin => {
            info!("Consuming {} from stdin", queue_key);
            let (queue, feeder) = stdin_queue(&queue_key);
            (queue as Arc<dyn Queue>, Some(feeder))
        }
    };

    let info = AgentInfo {
        uuid: config.instance_id(),
        target: config.agent.target.clone(),
    };
    let (agent, events) = LocalAgent::new(info, config.base_interval(), report_sink(&config));
    let agent = Arc::new(agent);

    let store = shared_store(MetricStore::new(&config.metrics));
    let (connection_tx, connection_rx) = connection_channel();
    let event_handler = EventHandler::new(events, ReportTracker::new(store.clone(), connection_tx));

    let engine = SyncEngine::new(
        queue.clone(),
        &queue_key,
        store,
        agent.clone(),
        config.base_interval(),
        connection_rx,
    );
    engine.register_metrics();
    info!("Tracking metrics: {}", config.metrics.join(", "));

    agent.connect().await?;

    let result = tokio::select! {
        result = engine.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted. Shutting down");
            Ok(())
        }
    };

    if let Some(feeder) = feeder {
        feeder.abort();
    }
    if result.is_ok() {
        // Last values merged before the queue closed
        if let Err(e) = agent.report_once().await {
            warn!("Final report failed: {}", e);
        }
    }
    agent.disconnect().await;
    event_handler.stop();

    Ok(result?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config_path.map(PathBuf::from);

    if args.init {
        if let Err(err) = generate_cfg(&config_path) {
            eprintln!("{}", err);
            process::exit(1);
        }
        return Ok(());
    }

    let config = match open_config(config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            eprintln!("Please run metric-relay --help");
            process::exit(1);
        }
    };

    if let Err(err) = configure_logger(&config) {
        warn!("Error creating logger sinks. Using console instead. Desc={}", err);
    }

    info!("Starting metric-relay =-=-=-=-=-=-=-=-=-=-=-=-=-=-=-");

    if let Err(err) = relay(config).await {
        critical!("Fatal error: {}", err);
        spdlog::default_logger().flush();
        process::exit(1);
    }

    Ok(())
}

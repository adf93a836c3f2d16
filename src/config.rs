use std::io::ErrorKind;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use std::{env, fs, io};

use serde::Deserialize;

use crate::util::os_helper::machine_id;

/// Where queued samples come from
#[derive(Deserialize, Debug, Copy, Clone, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    #[default]
    Redis,
    /// One JSON payload per stdin line
    Stdin,
}

impl FromStr for QueueBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(QueueBackend::Redis),
            "stdin" => Ok(QueueBackend::Stdin),
            _ => Err(format!("unknown queue backend {}", s)),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Queue {
    pub backend: QueueBackend,
    pub host: String,
    pub port: u16,
    /// List the samples are pushed on
    pub key: String,
}

impl Default for Queue {
    fn default() -> Self {
        Self {
            backend: QueueBackend::Redis,
            host: "localhost".to_string(),
            port: 6379,
            key: "streams".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Agent {
    /// Instance identifier. Derived from the machine when empty
    pub uuid: Option<String>,
    pub interval_ms: u64,
    pub target: String,
}

impl Default for Agent {
    fn default() -> Self {
        Self {
            uuid: None,
            interval_ms: 1000,
            target: "mqtt://localhost".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Copy, Clone, PartialEq)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Report {
    /// Base path of the daily report file. Reports go to the log when empty
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub queue: Queue,
    pub agent: Agent,
    pub metrics: Vec<String>,
    pub log: Option<Log>,
    pub report: Option<Report>,
}

impl Config {
    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.agent.interval_ms)
    }

    pub fn instance_id(&self) -> String {
        match self.agent.uuid {
            Some(ref uuid) if !uuid.is_empty() => uuid.clone(),
            _ => machine_id(),
        }
    }

    /// Applies the environment variables the collector has always honored.
    pub fn apply_env<F>(&mut self, var: F) -> io::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = var("QUEUE_BACKEND") {
            self.queue.backend = parse_var("QUEUE_BACKEND", &backend)?;
        }
        if let Some(host) = var("REDIS_HOST") {
            self.queue.host = host;
        }
        if let Some(port) = var("REDIS_PORT") {
            self.queue.port = parse_var("REDIS_PORT", &port)?;
        }
        if let Some(key) = var("REDIS_QUEUE") {
            self.queue.key = key;
        }
        if let Some(uuid) = var("UUID") {
            self.agent.uuid = Some(uuid);
        }
        if let Some(interval) = var("INTERVAL") {
            self.agent.interval_ms = parse_var("INTERVAL", &interval)?;
        }
        if let Some(target) = var("MQTT") {
            self.agent.target = target;
        }
        if let Some(metrics) = var("METRICS") {
            self.metrics = parse_metric_list(&metrics);
        }
        Ok(())
    }

    pub fn apply_process_env(&mut self) -> io::Result<()> {
        self.apply_env(|name| env::var(name).ok())
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> io::Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        io::Error::new(ErrorKind::InvalidData, format!("Invalid value for {}: {}", name, value))
    })
}

fn parse_metric_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .collect()
}

fn parse_path(path: PathBuf) -> PathBuf {
    if !path.starts_with("${exe_dir}") {
        return path;
    }

    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()));
    match exe_dir {
        Some(exe_dir) => {
            let str_path = path.to_string_lossy().replace("${exe_dir}", &exe_dir.to_string_lossy());
            PathBuf::from(str_path)
        }
        None => path,
    }
}

pub fn read_config(cfg_path: &PathBuf) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error opening configuration file {}: {}", cfg_path.display(), e))),
    };

    let mut cfg: Config = match toml::from_str::<Config>(cfg_content.as_str()) {
        Ok(cfg) => cfg,
        Err(e) => return Err(io::Error::new(
            ErrorKind::InvalidData, format!("Error parsing configuration file: {}", e))),
    };

    if let Some(ref mut log) = cfg.log {
        log.location = log.location.take().map(parse_path);
    }
    if let Some(ref mut report) = cfg.report {
        report.location = report.location.take().map(parse_path);
    }

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.queue.backend, QueueBackend::Redis);
        assert_eq!(cfg.queue.host, "localhost");
        assert_eq!(cfg.queue.port, 6379);
        assert_eq!(cfg.queue.key, "streams");
        assert_eq!(cfg.agent.interval_ms, 1000);
        assert_eq!(cfg.agent.target, "mqtt://localhost");
        assert!(cfg.metrics.is_empty());
        assert_eq!(cfg.base_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_read_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r##"
metrics = ["cpu", "mem"]

[queue]
backend = "stdin"
key = "rig-stream"

[agent]
uuid = "rig-1"
interval_ms = 500

[log]
level = "Debug"
log_to_console = true
location = "/var/log/metric-relay/relay.log"
"##).unwrap();

        let cfg = read_config(&file.path().to_path_buf()).unwrap();
        assert_eq!(cfg.metrics, vec!["cpu".to_string(), "mem".to_string()]);
        assert_eq!(cfg.queue.backend, QueueBackend::Stdin);
        assert_eq!(cfg.queue.key, "rig-stream");
        assert_eq!(cfg.queue.host, "localhost");
        assert_eq!(cfg.instance_id(), "rig-1");
        assert_eq!(cfg.base_interval(), Duration::from_millis(500));
        assert_eq!(cfg.agent.target, "mqtt://localhost");

        let log = cfg.log.unwrap();
        assert_eq!(log.level, LogLevel::Debug);
        assert_eq!(log.location, Some(PathBuf::from("/var/log/metric-relay/relay.log")));
        assert!(cfg.report.is_none());
    }

    #[test]
    fn test_read_invalid_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[agent]\ninterval_ms = \"fast\"\n").unwrap();
        let err = read_config(&file.path().to_path_buf()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        let missing = read_config(&PathBuf::from("/nonexistent/metric-relay.toml")).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("QUEUE_BACKEND", "STDIN"),
            ("REDIS_HOST", "queue.local"),
            ("REDIS_PORT", "6380"),
            ("REDIS_QUEUE", "rig"),
            ("UUID", "rig-7"),
            ("INTERVAL", "2000"),
            ("MQTT", "mqtt://broker"),
            ("METRICS", "cpu, mem,,disk"),
        ]);

        let mut cfg = Config::default();
        cfg.apply_env(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.queue.backend, QueueBackend::Stdin);
        assert_eq!(cfg.queue.host, "queue.local");
        assert_eq!(cfg.queue.port, 6380);
        assert_eq!(cfg.queue.key, "rig");
        assert_eq!(cfg.instance_id(), "rig-7");
        assert_eq!(cfg.base_interval(), Duration::from_millis(2000));
        assert_eq!(cfg.agent.target, "mqtt://broker");
        assert_eq!(cfg.metrics, vec!["cpu".to_string(), "mem".to_string(), "disk".to_string()]);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut cfg = Config::default();
        let err = cfg.apply_env(|name| (name == "INTERVAL").then(|| "soon".to_string())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        let err = cfg.apply_env(|name| (name == "QUEUE_BACKEND").then(|| "kafka".to_string())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_machine_id_fallback() {
        let mut cfg = Config::default();
        cfg.agent.uuid = Some(String::new());
        assert_eq!(cfg.instance_id(), machine_id());
    }
}

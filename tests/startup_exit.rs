use std::io::Write;
use std::process::{Command, Output};

fn run_relay(args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_metric-relay"));
    for var in ["METRICS", "INTERVAL", "REDIS_PORT", "QUEUE_BACKEND"] {
        cmd.env_remove(var);
    }
    cmd.args(args).envs(env.iter().copied()).output().unwrap()
}

fn config_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

#[test]
fn test_no_metrics_exits_with_error() {
    let file = config_file("[queue]\nbackend = \"stdin\"\n");
    let output = run_relay(&["-c", file.path().to_str().unwrap()], &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No metrics configured"));
}

#[test]
fn test_invalid_env_exits_with_error() {
    let file = config_file("metrics = [\"cpu\"]\n[queue]\nbackend = \"stdin\"\n");
    let path = file.path().to_str().unwrap();

    let output = run_relay(&["-c", path], &[("INTERVAL", "soon")]);
    assert_eq!(output.status.code(), Some(1));

    let output = run_relay(&["-c", path], &[("REDIS_PORT", "not-a-port")]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_missing_config_exits_with_error() {
    let output = run_relay(&["-c", "/nonexistent/metric-relay.toml"], &[]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_failed_init_exits_with_error() {
    let output = run_relay(&["--init", "-c", "/nonexistent/dir/metric-relay.toml"], &[]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_init_writes_sample() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metric-relay.toml");
    let output = run_relay(&["--init", "-c", path.to_str().unwrap()], &[]);
    assert_eq!(output.status.code(), Some(0));
    assert!(path.exists());
}

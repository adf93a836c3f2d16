use std::fs::File;
use std::io;
use std::io::Write;
use std::path::PathBuf;

const CONFIG_SAMPLE: &str = r#"# Metrics taken from the queue. Every other payload field is ignored
metrics = ["cpu", "mem"]

[queue]
# "redis", or "stdin" to read one JSON payload per line
backend = "redis"
host = "localhost"
port = 6379
key = "streams"

[agent]
# uuid = "{{UUID}}"
interval_ms = 1000
target = "mqtt://localhost"

# For the file locations, If you want it to be relative to the executable directory
# use ${exe_dir}/location
[log]
level = "Info"
log_to_console = true

[report]
location = "${exe_dir}/reports/report.log"
"#;

pub(crate) fn write_sample_cfg(file_path: &PathBuf) -> io::Result<()> {
    let mut file = File::create(file_path)?;
    file.write_all(get_sample_cfg().as_bytes())
}

fn get_sample_cfg() -> String {
    CONFIG_SAMPLE.replace("{{UUID}}", &metric_relay::util::os_helper::machine_id())
}

//! JSON traces of verdict timing and submission outcomes.
//!
//! `--log-timings` alone records info-level events: verdicts, rollbacks, commits,
//! submits. `--logs` adds the debug events. Event fields are flattened, so `attempt`,
//! `status` and `elapsed_ms` sit at the top level of each line, next to the name of
//! the thread that emitted it.

use crate::config::AppConfig;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::time::UtcTime;

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Most verbose level traced under `config`, or `None` when tracing is off.
fn trace_level(config: &AppConfig) -> Option<Level> {
    if !config.logging_enabled() {
        return None;
    }
    Some(if config.logs { Level::DEBUG } else { Level::INFO })
}

fn verdict_subscriber(file: File, level: Level) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_thread_names(true)
        .with_target(false)
        .with_timer(UtcTime::rfc_3339())
        .with_max_level(level)
        .with_writer(Mutex::new(file))
        .finish()
}

fn open_trace(path: &Path) -> Option<File> {
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Install the process-wide JSON trace subscriber when logging is enabled.
pub fn init_tracing(config: &AppConfig) {
    let Some(level) = trace_level(config) else {
        return;
    };
    let path = config.trace_path();
    INSTALLED.get_or_init(|| {
        if let Some(file) = open_trace(&path) {
            let _ = tracing::subscriber::set_global_default(verdict_subscriber(file, level));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rstest::rstest;
    use serde_json::Value;
    use std::env;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[rstest]
    #[case(&["t"], None)]
    #[case(&["t", "--log-timings"], Some(Level::INFO))]
    #[case(&["t", "--logs"], Some(Level::DEBUG))]
    #[case(&["t", "--logs", "--log-timings"], Some(Level::DEBUG))]
    #[case(&["t", "--logs", "--no-logs"], None)]
    fn trace_level_follows_flags(#[case] args: &[&str], #[case] expected: Option<Level>) {
        assert_eq!(trace_level(&AppConfig::parse_from(args)), expected);
    }

    #[test]
    fn verdict_events_are_flattened_and_level_filtered() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = env::temp_dir().join(format!("intersafety-trace-{nanos}.jsonl"));
        let file = match open_trace(&path) {
            Some(file) => file,
            None => panic!("trace file should open in the temp dir"),
        };

        tracing::subscriber::with_default(verdict_subscriber(file, Level::INFO), || {
            tracing::debug!(attempt = 7u64, "verdict requested");
            tracing::info!(
                attempt = 7u64,
                status = "blocked",
                elapsed_ms = 12u64,
                "safety verdict resolved"
            );
        });

        let contents = fs::read_to_string(&path).unwrap_or_default();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1, "debug event should be filtered: {contents}");
        let event: Value = match serde_json::from_str(lines[0]) {
            Ok(value) => value,
            Err(err) => panic!("trace line is not JSON: {err}"),
        };
        assert_eq!(event["attempt"], 7);
        assert_eq!(event["status"], "blocked");
        assert_eq!(event["elapsed_ms"], 12);
        assert_eq!(event["message"], "safety verdict resolved");
        assert!(event.get("target").is_none());
        let _ = fs::remove_file(path);
    }
}

//! Runtime flags and user settings so augmentation always reads a fresh, normalized view.

mod persist;
mod settings;
mod store;
mod watcher;

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub use persist::{default_settings_path, load_settings, load_settings_from, save_settings_to};
pub use settings::{describe_status, Settings, SettingsError, StoredSettings, VoiceMode};
pub use store::{SettingsSource, SharedSettings, SubscriptionId};
pub use watcher::SettingsWatcher;

/// Default upper bound on one safety-check round trip.
pub const DEFAULT_SAFETY_TIMEOUT_MS: u64 = 10_000;
const MIN_SAFETY_TIMEOUT_MS: u64 = 100;
const MAX_SAFETY_TIMEOUT_MS: u64 = 120_000;
const TRACE_FILE_NAME: &str = "intersafety_trace.jsonl";

/// Process-level flags shared by the library and the `intersafety` binary.
#[derive(Debug, Parser, Clone)]
#[command(about = "InterSafety prompt improver", author, version)]
pub struct AppConfig {
    /// Write debug logs and JSON traces to the temp directory
    #[arg(long = "logs", default_value_t = false, global = true)]
    pub logs: bool,

    /// Force logging off even when other log flags are set
    #[arg(long = "no-logs", default_value_t = false, global = true)]
    pub no_logs: bool,

    /// Allow prompt text in debug logs (requires --logs)
    #[arg(long = "log-content", default_value_t = false, global = true)]
    pub log_content: bool,

    /// Record verdict latency traces without full debug logging
    #[arg(long = "log-timings", default_value_t = false, global = true)]
    pub log_timings: bool,

    /// External safety-check command; receives request JSON on stdin, prints a verdict
    #[arg(long = "safety-cmd", env = "INTERSAFETY_SAFETY_CMD", global = true)]
    pub safety_cmd: Option<String>,

    /// Safety-check timeout in milliseconds; expiry counts as a skipped verdict
    #[arg(
        long = "safety-timeout-ms",
        default_value_t = DEFAULT_SAFETY_TIMEOUT_MS,
        global = true
    )]
    pub safety_timeout_ms: u64,

    /// Debug log file (defaults to intersafety.log in the temp directory)
    #[arg(long = "log-file", env = "INTERSAFETY_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// JSON trace file (defaults to intersafety_trace.jsonl in the temp directory)
    #[arg(long = "trace-file", env = "INTERSAFETY_TRACE_LOG", global = true)]
    pub trace_file: Option<PathBuf>,

    /// Settings file (defaults to ~/.config/intersafety/settings.toml)
    #[arg(long = "settings-file", global = true)]
    pub settings_file: Option<PathBuf>,
}

impl AppConfig {
    /// Logging is on when any log flag asks for it and `--no-logs` is absent.
    #[must_use]
    pub fn logging_enabled(&self) -> bool {
        (self.logs || self.log_timings) && !self.no_logs
    }

    /// Clamped verdict timeout.
    #[must_use]
    pub fn safety_timeout(&self) -> Duration {
        Duration::from_millis(
            self.safety_timeout_ms
                .clamp(MIN_SAFETY_TIMEOUT_MS, MAX_SAFETY_TIMEOUT_MS),
        )
    }

    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(crate::logging::default_log_path)
    }

    #[must_use]
    pub fn trace_path(&self) -> PathBuf {
        self.trace_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(TRACE_FILE_NAME))
    }

    /// Settings file from `--settings-file`, else the per-user default.
    #[must_use]
    pub fn settings_path(&self) -> Option<PathBuf> {
        self.settings_file.clone().or_else(default_settings_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["t"], false)]
    #[case(&["t", "--logs"], true)]
    #[case(&["t", "--log-timings"], true)]
    #[case(&["t", "--logs", "--no-logs"], false)]
    #[case(&["t", "--log-content"], false)]
    fn logging_enabled_truth_table(#[case] args: &[&str], #[case] expected: bool) {
        let config = AppConfig::parse_from(args);
        assert_eq!(config.logging_enabled(), expected);
    }

    #[test]
    fn safety_timeout_is_clamped() {
        let low = AppConfig::parse_from(["t", "--safety-timeout-ms", "1"]);
        assert_eq!(low.safety_timeout(), Duration::from_millis(100));
        let high = AppConfig::parse_from(["t", "--safety-timeout-ms", "999999"]);
        assert_eq!(high.safety_timeout(), Duration::from_millis(120_000));
        let default = AppConfig::parse_from(["t"]);
        assert_eq!(default.safety_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn output_paths_follow_flags() {
        let config = AppConfig::parse_from([
            "t",
            "--log-file",
            "/tmp/is/debug.log",
            "--trace-file",
            "/tmp/is/trace.jsonl",
        ]);
        assert_eq!(config.log_path(), PathBuf::from("/tmp/is/debug.log"));
        assert_eq!(config.trace_path(), PathBuf::from("/tmp/is/trace.jsonl"));
    }

    #[test]
    fn explicit_settings_file_wins() {
        let config = AppConfig::parse_from(["t", "--settings-file", "/tmp/custom.toml"]);
        assert_eq!(
            config.settings_path(),
            Some(PathBuf::from("/tmp/custom.toml"))
        );
    }
}

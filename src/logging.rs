//! Debug log file so hosts can troubleshoot augmentation and gating without a console.
//!
//! Lines read `<unix-ms> [<scope>] message`. The scope names the submission attempt
//! or surface when the caller has one, so one attempt can be grepped end to end.
//! At the size cap the file rolls over to `<name>.1`, keeping one previous window.

use crate::config::AppConfig;
use crate::surface::SurfaceId;
use std::env;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

const LOG_FILE_NAME: &str = "intersafety.log";
const ROLLOVER_BYTES: u64 = 2 * 1024 * 1024;

static SINK: Mutex<Option<RollingLog>> = Mutex::new(None);
static CONTENT_ENABLED: AtomicBool = AtomicBool::new(false);

/// Where a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogScope {
    General,
    Attempt(u64),
    Surface(SurfaceId),
}

impl fmt::Display for LogScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => f.write_str("intersafety"),
            Self::Attempt(id) => write!(f, "attempt {id}"),
            Self::Surface(id) => write!(f, "{id}"),
        }
    }
}

/// Default log location in the temp directory.
#[must_use]
pub fn default_log_path() -> PathBuf {
    env::temp_dir().join(LOG_FILE_NAME)
}

/// Path of the active log file, or the default when logging is off.
pub fn log_file_path() -> PathBuf {
    sink()
        .as_ref()
        .map(|log| log.path.clone())
        .unwrap_or_else(default_log_path)
}

struct RollingLog {
    path: PathBuf,
    file: File,
    written: u64,
    rollover_bytes: u64,
}

impl RollingLog {
    fn open(path: PathBuf, rollover_bytes: u64) -> Option<Self> {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;
        let written = file.metadata().map(|meta| meta.len()).unwrap_or(0);
        let mut log = Self {
            path,
            file,
            written,
            rollover_bytes,
        };
        if log.written > rollover_bytes {
            log.roll_over();
        }
        Some(log)
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".1");
        PathBuf::from(name)
    }

    fn roll_over(&mut self) {
        let backup = Self::backup_path(&self.path);
        let _ = fs::remove_file(&backup);
        if fs::rename(&self.path, &backup).is_err() {
            return;
        }
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            self.file = file;
            self.written = 0;
        }
    }

    fn write_line(&mut self, line: &str) {
        let len = line.len() as u64;
        if self.written > 0 && self.written.saturating_add(len) > self.rollover_bytes {
            self.roll_over();
        }
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.written = self.written.saturating_add(len);
        }
    }
}

fn sink() -> MutexGuard<'static, Option<RollingLog>> {
    SINK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn format_line(millis: u128, scope: LogScope, msg: &str) -> String {
    format!("{millis} [{scope}] {msg}\n")
}

fn open_log(path: Option<PathBuf>, content_enabled: bool) {
    let log = path.and_then(|path| RollingLog::open(path, ROLLOVER_BYTES));
    CONTENT_ENABLED.store(content_enabled && log.is_some(), Ordering::Relaxed);
    *sink() = log;
}

/// Open (or close) the debug log according to the runtime flags.
pub fn init_logging(config: &AppConfig) {
    let path = config.logging_enabled().then(|| config.log_path());
    open_log(path, config.log_content);
}

/// Append a line tagged with `scope`. No-op while logging is off.
pub fn log_scoped(scope: LogScope, msg: &str) {
    let mut guard = sink();
    let Some(log) = guard.as_mut() else {
        return;
    };
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    log.write_line(&format_line(millis, scope, msg));
}

pub fn log_debug(msg: &str) {
    log_scoped(LogScope::General, msg);
}

pub fn log_attempt(attempt: u64, msg: &str) {
    log_scoped(LogScope::Attempt(attempt), msg);
}

pub fn log_surface(surface: SurfaceId, msg: &str) {
    log_scoped(LogScope::Surface(surface), msg);
}

/// Log a line that quotes user prompt text. Requires `--log-content` on top of `--logs`.
pub fn log_debug_content(msg: &str) {
    if CONTENT_ENABLED.load(Ordering::Relaxed) {
        log_debug(msg);
    }
}

/// First `max_chars` characters of `text`, for log lines that quote prompts.
pub(crate) fn prompt_prefix(text: &str, max_chars: usize) -> String {
    let mut prefix: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        prefix.push_str("...");
    }
    prefix
}

//! Safety check backed by an external command.
//!
//! The request JSON goes to the command's stdin; one JSON verdict is read from its
//! stdout. Output is captured in temp files so a chatty command cannot stall on a
//! full pipe while we poll it. Stdin is fed from a helper thread, so a command that
//! never reads a large request still hits the deadline and is killed.

use super::{SafetyCheck, SafetyCheckError, SafetyRequest};
use crate::log_debug;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const STDERR_EXCERPT_MAX_CHARS: usize = 200;

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct CommandSafetyCheck {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSafetyCheck {
    /// Parse a shell-style command line. The process is killed after `timeout`.
    pub fn from_command_line(line: &str, timeout: Duration) -> Result<Self> {
        let mut words = shell_words::split(line)
            .with_context(|| format!("invalid safety command: {line}"))?;
        if words.is_empty() {
            bail!("safety command is empty");
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
            timeout,
        })
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn spawn(&self, stdout: &Path, stderr: &Path) -> Result<Child, SafetyCheckError> {
        let stdout_file = File::create(stdout).map_err(|err| SafetyCheckError::Io(err.to_string()))?;
        let stderr_file = File::create(stderr).map_err(|err| SafetyCheckError::Io(err.to_string()))?;
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .map_err(|err| SafetyCheckError::Unavailable(format!("{}: {err}", self.program)))
    }

    fn run(&self, payload: Vec<u8>, stdout: &Path, stderr: &Path) -> Result<String, SafetyCheckError> {
        let mut child = self.spawn(stdout, stderr)?;
        if let Some(stdin) = child.stdin.take() {
            if let Err(err) = feed_stdin(stdin, payload, &self.program) {
                terminate_child(&mut child);
                return Err(SafetyCheckError::Io(err.to_string()));
            }
        }

        let started_at = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started_at.elapsed() >= self.timeout => {
                    terminate_child(&mut child);
                    return Err(SafetyCheckError::Unavailable(format!(
                        "{} timed out after {}ms",
                        self.program,
                        self.timeout.as_millis()
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => {
                    terminate_child(&mut child);
                    return Err(SafetyCheckError::Io(err.to_string()));
                }
            }
        };

        if !status.success() {
            return Err(SafetyCheckError::Exit {
                code: status.code(),
                stderr: excerpt(&read_text_file(stderr)),
            });
        }
        Ok(read_text_file(stdout))
    }
}

impl SafetyCheck for CommandSafetyCheck {
    fn name(&self) -> &'static str {
        "command"
    }

    fn check(&self, request: &SafetyRequest) -> Result<Value, SafetyCheckError> {
        let payload =
            serde_json::to_vec(request).map_err(|err| SafetyCheckError::Malformed(err.to_string()))?;
        let run_id = NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed);
        let stdout_path = temporary_output_path(run_id, "stdout");
        let stderr_path = temporary_output_path(run_id, "stderr");

        let output = self.run(payload, &stdout_path, &stderr_path);
        cleanup_temp_files(&stdout_path, &stderr_path);
        let output = output?;

        log_debug(&format!(
            "safety command {} returned {} bytes",
            self.program,
            output.len()
        ));
        serde_json::from_str(output.trim())
            .map_err(|err| SafetyCheckError::Malformed(err.to_string()))
    }
}

/// Write `payload` on a detached thread and close the pipe. The thread ends once
/// the write finishes or the child's end of the pipe closes.
fn feed_stdin(mut stdin: ChildStdin, payload: Vec<u8>, program: &str) -> std::io::Result<()> {
    let program = program.to_string();
    thread::Builder::new()
        .name("intersafety-check-stdin".to_string())
        .spawn(move || {
            if let Err(err) = stdin.write_all(&payload) {
                if err.kind() != ErrorKind::BrokenPipe {
                    log_debug(&format!("safety command {program}: stdin write failed: {err}"));
                }
            }
        })
        .map(|_| ())
}

fn terminate_child(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn temporary_output_path(run_id: u64, stream: &str) -> PathBuf {
    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "intersafety-check-{stream}-{}-{run_id}-{now_nanos}.log",
        std::process::id()
    ))
}

fn read_text_file(path: &Path) -> String {
    fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn cleanup_temp_files(stdout_path: &Path, stderr_path: &Path) {
    let _ = fs::remove_file(stdout_path);
    let _ = fs::remove_file(stderr_path);
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    let mut out: String = trimmed.chars().take(STDERR_EXCERPT_MAX_CHARS).collect();
    if trimmed.chars().count() > STDERR_EXCERPT_MAX_CHARS {
        out.push_str("...");
    }
    out
}

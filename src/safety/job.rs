//! One in-flight safety check, run on a worker thread and polled from the host loop.

use super::{SafetyCheck, SafetyCheckError, SafetyRequest, Verdict, TIMEOUT_REASON, UNAVAILABLE_REASON};
use crate::log_attempt;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TryRecvError};
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

type CheckResult = Result<Value, SafetyCheckError>;

/// Handle to a verdict request. Resolves exactly once: to the collaborator's answer,
/// or to `skipped` when the worker vanishes or the deadline passes.
#[derive(Debug)]
pub struct VerdictJob {
    attempt: u64,
    rx: Receiver<CheckResult>,
    started_at: Instant,
    deadline: Instant,
    resolved: bool,
}

impl VerdictJob {
    /// Start `check` on a worker thread. The worker is detached; a check that never
    /// returns is abandoned at the deadline.
    pub fn spawn(
        attempt: u64,
        check: Arc<dyn SafetyCheck>,
        request: SafetyRequest,
        timeout: Duration,
        now: Instant,
    ) -> Self {
        let (tx, rx) = bounded(1);
        let spawned = thread::Builder::new()
            .name(format!("intersafety-verdict-{attempt}"))
            .spawn(move || {
                let _ = tx.send(check.check(&request));
            });
        if let Err(err) = spawned {
            log_attempt(attempt, &format!("verdict worker failed to start: {err}"));
        }
        Self {
            attempt,
            rx,
            started_at: now,
            deadline: now + timeout,
            resolved: false,
        }
    }

    #[must_use]
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Milliseconds since the request was issued, as of `now`.
    #[must_use]
    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        u64::try_from(now.saturating_duration_since(self.started_at).as_millis()).unwrap_or(u64::MAX)
    }

    fn resolve(&mut self, verdict: Verdict) -> Option<Verdict> {
        self.resolved = true;
        Some(verdict)
    }

    /// Non-blocking. Returns the verdict the first time one is available, then `None`.
    pub fn poll(&mut self, now: Instant) -> Option<Verdict> {
        if self.resolved {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => self.resolve(Verdict::from_check(result)),
            Err(TryRecvError::Disconnected) => self.resolve(Verdict::skipped(UNAVAILABLE_REASON)),
            Err(TryRecvError::Empty) if now >= self.deadline => {
                log_attempt(self.attempt, "verdict timed out");
                self.resolve(Verdict::skipped(TIMEOUT_REASON))
            }
            Err(TryRecvError::Empty) => None,
        }
    }

    /// Block until the verdict arrives or the deadline passes. For hosts without an
    /// event loop.
    pub fn wait(&mut self) -> Option<Verdict> {
        if self.resolved {
            return None;
        }
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(remaining) {
            Ok(result) => self.resolve(Verdict::from_check(result)),
            Err(RecvTimeoutError::Disconnected) => self.resolve(Verdict::skipped(UNAVAILABLE_REASON)),
            Err(RecvTimeoutError::Timeout) => {
                log_attempt(self.attempt, "verdict timed out");
                self.resolve(Verdict::skipped(TIMEOUT_REASON))
            }
        }
    }
}

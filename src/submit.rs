//! Submission gate: improve, ask the safety collaborator, then commit and submit or roll back.
//!
//! One attempt at a time. Each attempt gets a monotonically increasing id and
//! remembers which preview session (if any) it started under; a verdict that comes
//! back after the surface was detached or the session changed is dropped unapplied.
//! The host's submit action fires on the poll after the commit, so the change
//! notification is seen before the submit.

use crate::augment::improve;
use crate::config::Settings;
use crate::log_debug_content;
use crate::logging::prompt_prefix;
use crate::preview::PreviewController;
use crate::safety::{SafetyCheck, SafetyRequest, Verdict, VerdictJob, VerdictStatus};
use crate::surface::{SurfaceHost, SurfaceId};
use crate::toast::ToastHost;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const LOG_PROMPT_PREFIX_CHARS: usize = 60;

/// Why a submission attempt was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    /// The surface holds only whitespace. Not an error for the user.
    Empty,
    /// Another attempt is still waiting on its verdict or its submit frame.
    InFlight { attempt: u64 },
    /// The surface is no longer in the document.
    Detached,
}

impl fmt::Display for SubmitRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("nothing to submit"),
            Self::InFlight { attempt } => write!(f, "submission {attempt} still in flight"),
            Self::Detached => f.write_str("editing surface is detached"),
        }
    }
}

impl std::error::Error for SubmitRejected {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPath {
    /// The host's dedicated submit control.
    Control,
    /// A synthesized confirm keystroke on the surface.
    ConfirmKey,
}

/// What one call to [`SubmissionOrchestrator::poll`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Idle,
    Waiting { attempt: u64 },
    /// Verdict was `blocked`; the surface holds the pre-submission text again.
    Blocked { attempt: u64, reason: String },
    /// Verdict let it through; `text` is on the surface and submits on the next poll.
    Committed {
        attempt: u64,
        status: VerdictStatus,
        text: String,
    },
    Submitted { attempt: u64, path: SubmitPath },
    /// Verdict or submit arrived for a surface or session that no longer exists.
    Discarded { attempt: u64 },
}

#[derive(Debug)]
struct Attempt {
    id: u64,
    surface: SurfaceId,
    original: String,
    improved: String,
    preview_generation: Option<u64>,
    job: VerdictJob,
}

#[derive(Debug, Clone, Copy)]
struct PendingSubmit {
    attempt: u64,
    surface: SurfaceId,
}

pub struct SubmissionOrchestrator {
    check: Arc<dyn SafetyCheck>,
    timeout: Duration,
    next_attempt: u64,
    in_flight: Option<Attempt>,
    pending_submit: Option<PendingSubmit>,
}

impl fmt::Debug for SubmissionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionOrchestrator")
            .field("check", &self.check.name())
            .field("timeout", &self.timeout)
            .field("next_attempt", &self.next_attempt)
            .field("in_flight", &self.in_flight.as_ref().map(|attempt| attempt.id))
            .field("pending_submit", &self.pending_submit.map(|pending| pending.attempt))
            .finish()
    }
}

impl SubmissionOrchestrator {
    #[must_use]
    pub fn new(check: Arc<dyn SafetyCheck>, timeout: Duration) -> Self {
        Self {
            check,
            timeout,
            next_attempt: 1,
            in_flight: None,
            pending_submit: None,
        }
    }

    /// True from `start` until the submit frame has run or the attempt ended.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some() || self.pending_submit.is_some()
    }

    #[must_use]
    pub fn current_attempt(&self) -> Option<u64> {
        self.in_flight
            .as_ref()
            .map(|attempt| attempt.id)
            .or_else(|| self.pending_submit.map(|pending| pending.attempt))
    }

    /// Gather the text on `surface`, improve it and issue the verdict request.
    ///
    /// An active preview on `surface` supplies the text instead of re-reading it.
    /// The request is issued even when improvement changes nothing.
    pub fn start(
        &mut self,
        host: &dyn SurfaceHost,
        preview: &PreviewController,
        surface: SurfaceId,
        settings: &Settings,
        now: Instant,
    ) -> Result<u64, SubmitRejected> {
        if let Some(attempt) = self.current_attempt() {
            return Err(SubmitRejected::InFlight { attempt });
        }
        if !host.is_attached(surface) {
            return Err(SubmitRejected::Detached);
        }
        let original = match preview.preview_value(surface) {
            Some(value) => value.to_string(),
            None => host
                .surface(surface)
                .map(|target| target.read())
                .unwrap_or_default(),
        };
        if original.trim().is_empty() {
            return Err(SubmitRejected::Empty);
        }

        let improved = improve(&original, settings);
        if improved == original {
            debug!(surface = %surface, "nothing to augment; gating unchanged text");
        }
        log_debug_content(&format!(
            "submitting \"{}\"",
            prompt_prefix(&improved, LOG_PROMPT_PREFIX_CHARS)
        ));

        let id = self.next_attempt;
        self.next_attempt += 1;
        let request = SafetyRequest::new(&original, &improved, settings);
        let job = VerdictJob::spawn(id, Arc::clone(&self.check), request, self.timeout, now);
        let preview_generation = if preview.active_on(surface) {
            preview.generation()
        } else {
            None
        };
        self.in_flight = Some(Attempt {
            id,
            surface,
            original,
            improved,
            preview_generation,
            job,
        });
        debug!(attempt = id, check = self.check.name(), "verdict requested");
        Ok(id)
    }

    /// Advance the current attempt without blocking.
    pub fn poll(
        &mut self,
        host: &mut dyn SurfaceHost,
        preview: &mut PreviewController,
        toast: &mut dyn ToastHost,
        now: Instant,
    ) -> SubmitOutcome {
        if let Some(pending) = self.pending_submit.take() {
            return fire_submit(host, pending);
        }
        let Some(attempt) = self.in_flight.as_mut() else {
            return SubmitOutcome::Idle;
        };
        let Some(verdict) = attempt.job.poll(now) else {
            return SubmitOutcome::Waiting {
                attempt: attempt.id,
            };
        };
        let elapsed_ms = attempt.job.elapsed_ms(now);
        match self.in_flight.take() {
            Some(attempt) => self.apply(host, preview, toast, attempt, &verdict, elapsed_ms, now),
            None => SubmitOutcome::Idle,
        }
    }

    /// Block for the current verdict and apply it. The submit still waits for the
    /// next [`poll`](Self::poll).
    pub fn resolve_blocking(
        &mut self,
        host: &mut dyn SurfaceHost,
        preview: &mut PreviewController,
        toast: &mut dyn ToastHost,
    ) -> SubmitOutcome {
        let Some(mut attempt) = self.in_flight.take() else {
            return SubmitOutcome::Idle;
        };
        let Some(verdict) = attempt.job.wait() else {
            return SubmitOutcome::Discarded {
                attempt: attempt.id,
            };
        };
        let now = Instant::now();
        let elapsed_ms = attempt.job.elapsed_ms(now);
        self.apply(host, preview, toast, attempt, &verdict, elapsed_ms, now)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply(
        &mut self,
        host: &mut dyn SurfaceHost,
        preview: &mut PreviewController,
        toast: &mut dyn ToastHost,
        attempt: Attempt,
        verdict: &Verdict,
        elapsed_ms: u64,
        now: Instant,
    ) -> SubmitOutcome {
        info!(
            attempt = attempt.id,
            status = verdict.status.as_str(),
            elapsed_ms,
            "safety verdict resolved"
        );

        let current_session = if preview.active_on(attempt.surface) {
            preview.generation()
        } else {
            None
        };
        if !host.is_attached(attempt.surface) || current_session != attempt.preview_generation {
            warn!(attempt = attempt.id, "stale verdict discarded");
            return SubmitOutcome::Discarded {
                attempt: attempt.id,
            };
        }
        let was_previewing = attempt.preview_generation.is_some();

        if verdict.is_blocked() {
            let reason = verdict.block_message().to_string();
            toast.show(&reason, now);
            if was_previewing {
                preview.revert(host);
            } else if let Some(target) = host.surface_mut(attempt.surface) {
                target.write(&attempt.original);
                target.notify_changed();
            }
            info!(attempt = attempt.id, "submission rolled back");
            return SubmitOutcome::Blocked {
                attempt: attempt.id,
                reason,
            };
        }

        toast.hide();
        if was_previewing {
            let committed = preview.commit(host);
            if committed.as_deref() != Some(attempt.improved.as_str()) {
                if let Some(target) = host.surface_mut(attempt.surface) {
                    target.write(&attempt.improved);
                }
            }
        } else if let Some(target) = host.surface_mut(attempt.surface) {
            target.write(&attempt.improved);
        }
        if let Some(target) = host.surface_mut(attempt.surface) {
            target.notify_changed();
        }
        info!(attempt = attempt.id, status = verdict.status.as_str(), "submission committed");

        self.pending_submit = Some(PendingSubmit {
            attempt: attempt.id,
            surface: attempt.surface,
        });
        SubmitOutcome::Committed {
            attempt: attempt.id,
            status: verdict.status,
            text: attempt.improved,
        }
    }
}

fn fire_submit(host: &mut dyn SurfaceHost, pending: PendingSubmit) -> SubmitOutcome {
    if !host.is_attached(pending.surface) {
        warn!(attempt = pending.attempt, "surface detached before submit");
        return SubmitOutcome::Discarded {
            attempt: pending.attempt,
        };
    }
    if host.click_submit() {
        info!(attempt = pending.attempt, path = "control", "submitted");
        return SubmitOutcome::Submitted {
            attempt: pending.attempt,
            path: SubmitPath::Control,
        };
    }
    host.dispatch_confirm(pending.surface);
    info!(attempt = pending.attempt, path = "confirm-key", "submitted");
    SubmitOutcome::Submitted {
        attempt: pending.attempt,
        path: SubmitPath::ConfirmKey,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoiceMode;
    use crate::safety::{SafetyCheckError, DEFAULT_BLOCK_REASON};
    use crate::surface::{EditingSurface, FieldSurface, HostAction, MemoryHost, RichTextSurface, SubmitControl};
    use crate::toast::ToastSlot;
    use serde_json::{json, Value};
    use std::thread;

    struct Fixed(Value);

    impl SafetyCheck for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn check(&self, _request: &SafetyRequest) -> Result<Value, SafetyCheckError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl SafetyCheck for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn check(&self, _request: &SafetyRequest) -> Result<Value, SafetyCheckError> {
            Err(SafetyCheckError::Unavailable("connection refused".to_string()))
        }
    }

    struct Hangs;

    impl SafetyCheck for Hangs {
        fn name(&self) -> &'static str {
            "hangs"
        }

        fn check(&self, _request: &SafetyRequest) -> Result<Value, SafetyCheckError> {
            thread::sleep(Duration::from_millis(400));
            Ok(json!({"status": "allowed"}))
        }
    }

    fn settings() -> Settings {
        Settings {
            enabled: true,
            voice_mode: VoiceMode::Off,
            json_prompting: false,
        }
    }

    struct Fixture {
        host: MemoryHost,
        preview: PreviewController,
        toast: ToastSlot,
        surface: SurfaceId,
    }

    impl Fixture {
        fn field(text: &str) -> Self {
            let mut host = MemoryHost::new();
            let surface = host.add_field(FieldSurface::new(text));
            host.focus(Some(surface));
            Self {
                host,
                preview: PreviewController::new(),
                toast: ToastSlot::new(),
                surface,
            }
        }

        fn text(&self) -> String {
            self.host
                .surface(self.surface)
                .map(EditingSurface::read)
                .unwrap_or_default()
        }

        fn start(&mut self, gate: &mut SubmissionOrchestrator) -> u64 {
            match gate.start(&self.host, &self.preview, self.surface, &settings(), Instant::now()) {
                Ok(attempt) => attempt,
                Err(err) => panic!("attempt should start: {err}"),
            }
        }

        fn resolve(&mut self, gate: &mut SubmissionOrchestrator) -> SubmitOutcome {
            gate.resolve_blocking(&mut self.host, &mut self.preview, &mut self.toast)
        }

        fn poll(&mut self, gate: &mut SubmissionOrchestrator) -> SubmitOutcome {
            gate.poll(&mut self.host, &mut self.preview, &mut self.toast, Instant::now())
        }
    }

    fn gate(check: impl SafetyCheck + 'static) -> SubmissionOrchestrator {
        SubmissionOrchestrator::new(Arc::new(check), Duration::from_secs(5))
    }

    #[test]
    fn blocked_verdict_restores_original_and_never_submits() {
        let mut fx = Fixture::field("write a very long essay");
        let mut gate = gate(Fixed(json!({"status": "blocked", "reason": "Too long"})));
        let attempt = fx.start(&mut gate);

        let outcome = fx.resolve(&mut gate);
        assert_eq!(
            outcome,
            SubmitOutcome::Blocked {
                attempt,
                reason: "Too long".to_string()
            }
        );
        assert_eq!(fx.toast.message(), Some("Too long"));
        assert_eq!(fx.text(), "write a very long essay");
        assert_eq!(fx.poll(&mut gate), SubmitOutcome::Idle);
        assert_eq!(fx.host.submit_count(), 0);
    }

    #[test]
    fn blocked_without_reason_uses_default_message() {
        let mut fx = Fixture::field("hello");
        let mut gate = gate(Fixed(json!({"status": "blocked"})));
        fx.start(&mut gate);
        fx.resolve(&mut gate);
        assert_eq!(fx.toast.message(), Some(DEFAULT_BLOCK_REASON));
    }

    #[test]
    fn failing_check_skips_commits_and_submits_once() {
        let mut fx = Fixture::field("hello there");
        let mut gate = gate(Failing);
        let attempt = fx.start(&mut gate);

        let improved = improve("hello there", &settings());
        assert_eq!(
            fx.resolve(&mut gate),
            SubmitOutcome::Committed {
                attempt,
                status: VerdictStatus::Skipped,
                text: improved.clone()
            }
        );
        assert_eq!(fx.text(), improved);
        assert_eq!(fx.host.submit_count(), 0);

        assert_eq!(
            fx.poll(&mut gate),
            SubmitOutcome::Submitted {
                attempt,
                path: SubmitPath::ConfirmKey
            }
        );
        assert_eq!(fx.poll(&mut gate), SubmitOutcome::Idle);
        assert_eq!(fx.host.submit_count(), 1);
        assert_eq!(fx.host.last_submitted(), Some(improved.as_str()));
    }

    #[test]
    fn timeout_is_skipped_and_proceeds() {
        let mut fx = Fixture::field("hello");
        let mut gate = SubmissionOrchestrator::new(Arc::new(Hangs), Duration::from_millis(50));
        let start = Instant::now();
        let attempt = match gate.start(&fx.host, &fx.preview, fx.surface, &settings(), start) {
            Ok(attempt) => attempt,
            Err(err) => panic!("attempt should start: {err}"),
        };
        assert_eq!(
            gate.poll(&mut fx.host, &mut fx.preview, &mut fx.toast, start),
            SubmitOutcome::Waiting { attempt }
        );
        let outcome = gate.poll(
            &mut fx.host,
            &mut fx.preview,
            &mut fx.toast,
            start + Duration::from_millis(60),
        );
        assert!(matches!(
            outcome,
            SubmitOutcome::Committed {
                status: VerdictStatus::Skipped,
                ..
            }
        ));
        assert!(matches!(fx.poll(&mut gate), SubmitOutcome::Submitted { .. }));
        assert_eq!(fx.host.submit_count(), 1);
    }

    #[test]
    fn submit_control_is_preferred_when_enabled() {
        let mut fx = Fixture::field("hello");
        fx.host.set_submit_control(SubmitControl::Enabled);
        let mut gate = gate(Fixed(json!({"status": "allowed"})));
        let attempt = fx.start(&mut gate);
        fx.resolve(&mut gate);
        assert_eq!(
            fx.poll(&mut gate),
            SubmitOutcome::Submitted {
                attempt,
                path: SubmitPath::Control
            }
        );
        assert!(matches!(fx.host.actions(), [HostAction::SubmitClicked { .. }]));
    }

    #[test]
    fn active_preview_is_committed_on_allow() {
        let mut fx = Fixture::field("summarize this");
        let shown = improve("summarize this", &settings());
        assert!(fx.preview.begin(&mut fx.host, fx.surface, &shown));
        let mut gate = gate(Fixed(json!({"status": "allowed"})));
        fx.start(&mut gate);
        fx.resolve(&mut gate);

        assert!(!fx.preview.is_active());
        assert_eq!(fx.text(), shown);
        assert!(!fx
            .host
            .surface(fx.surface)
            .is_some_and(EditingSurface::has_preview_marker));
    }

    #[test]
    fn active_preview_is_reverted_on_block() {
        let mut fx = Fixture::field("summarize this");
        let shown = improve("summarize this", &settings());
        assert!(fx.preview.begin(&mut fx.host, fx.surface, &shown));
        let mut gate = gate(Fixed(json!({"status": "blocked", "reason": "Too long"})));
        fx.start(&mut gate);
        fx.resolve(&mut gate);

        assert!(!fx.preview.is_active());
        assert_eq!(fx.text(), "summarize this");
        assert_eq!(fx.host.submit_count(), 0);
    }

    #[test]
    fn detached_surface_discards_late_verdict() {
        let mut fx = Fixture::field("hello");
        let mut gate = gate(Fixed(json!({"status": "allowed"})));
        let attempt = fx.start(&mut gate);
        fx.host.detach(fx.surface);

        assert_eq!(fx.resolve(&mut gate), SubmitOutcome::Discarded { attempt });
        assert_eq!(fx.poll(&mut gate), SubmitOutcome::Idle);
        assert_eq!(fx.host.submit_count(), 0);
        assert_eq!(fx.host.field(fx.surface).map(FieldSurface::value), Some("hello"));
    }

    #[test]
    fn surface_detached_after_commit_is_not_submitted_by_control() {
        let mut fx = Fixture::field("hello");
        fx.host.set_submit_control(SubmitControl::Enabled);
        let mut gate = gate(Fixed(json!({"status": "allowed"})));
        let attempt = fx.start(&mut gate);
        assert!(matches!(
            fx.resolve(&mut gate),
            SubmitOutcome::Committed { .. }
        ));
        fx.host.detach(fx.surface);

        assert_eq!(fx.poll(&mut gate), SubmitOutcome::Discarded { attempt });
        assert_eq!(fx.poll(&mut gate), SubmitOutcome::Idle);
        assert_eq!(fx.host.submit_count(), 0);
        assert!(!fx
            .host
            .actions()
            .iter()
            .any(|action| matches!(action, HostAction::SubmitClicked { .. })));
    }

    #[test]
    fn replaced_preview_session_discards_verdict() {
        let mut fx = Fixture::field("first draft");
        assert!(fx.preview.begin(&mut fx.host, fx.surface, "First draft."));
        let mut gate = gate(Fixed(json!({"status": "blocked"})));
        let attempt = fx.start(&mut gate);

        assert!(fx.preview.revert(&mut fx.host));
        assert!(fx.preview.begin(&mut fx.host, fx.surface, "Another preview."));

        assert_eq!(fx.resolve(&mut gate), SubmitOutcome::Discarded { attempt });
        assert_eq!(fx.text(), "Another preview.");
        assert!(fx.toast.message().is_none());
    }

    #[test]
    fn empty_and_reentrant_attempts_are_rejected() {
        let mut fx = Fixture::field("   ");
        let mut gate = gate(Fixed(json!({"status": "allowed"})));
        assert_eq!(
            gate.start(&fx.host, &fx.preview, fx.surface, &settings(), Instant::now()),
            Err(SubmitRejected::Empty)
        );

        if let Some(field) = fx.host.field_mut(fx.surface) {
            field.write("real text");
        }
        let attempt = fx.start(&mut gate);
        assert_eq!(
            gate.start(&fx.host, &fx.preview, fx.surface, &settings(), Instant::now()),
            Err(SubmitRejected::InFlight { attempt })
        );
        fx.resolve(&mut gate);
        assert!(gate.is_busy());
        fx.poll(&mut gate);
        assert!(!gate.is_busy());
        assert_eq!(fx.start(&mut gate), attempt + 1);
    }

    #[test]
    fn unchanged_text_is_still_gated() {
        let text = improve("Explain recursion", &settings());
        let mut fx = Fixture::field(&text);
        let mut gate = gate(Fixed(json!({"status": "blocked", "reason": "nope"})));
        fx.start(&mut gate);
        assert!(matches!(fx.resolve(&mut gate), SubmitOutcome::Blocked { .. }));
        assert_eq!(fx.text(), text);
    }

    #[test]
    fn rich_text_surface_round_trips_through_block() {
        let mut host = MemoryHost::new();
        let markup = "<p>draft <b>one</b></p>";
        let surface = host.add_rich_text(RichTextSurface::from_markup(markup));
        let mut preview = PreviewController::new();
        let mut toast = ToastSlot::new();
        let mut gate = gate(Fixed(json!({"status": "blocked"})));

        assert!(gate
            .start(&host, &preview, surface, &settings(), Instant::now())
            .is_ok());
        gate.resolve_blocking(&mut host, &mut preview, &mut toast);
        assert_eq!(
            host.surface(surface).map(EditingSurface::read).as_deref(),
            Some("draft one")
        );
    }
}

//! Per-document owner of preview, submission and toast state.
//!
//! The host feeds key and focus events plus a periodic [`PromptSession::tick`];
//! the session routes them and drives the preview controller and submission gate.

use crate::augment::improve;
use crate::config::SettingsSource;
use crate::preview::PreviewController;
use crate::safety::SafetyCheck;
use crate::submit::{SubmissionOrchestrator, SubmitOutcome, SubmitRejected};
use crate::surface::{SurfaceHost, SurfaceId, SurfaceResolver};
use crate::toast::ToastSlot;
use crate::trigger::{route, KeyInput, RouteContext, Trigger};
use crate::log_attempt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What the session did with a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    pub trigger: Option<Trigger>,
    /// The host must not run its own default action for the key.
    pub suppress_default: bool,
}

impl KeyOutcome {
    fn routed(trigger: Trigger, suppress_default: bool) -> Self {
        Self {
            trigger: Some(trigger),
            suppress_default,
        }
    }
}

pub struct PromptSession<S, R> {
    settings: S,
    resolver: R,
    preview: PreviewController,
    gate: SubmissionOrchestrator,
    toast: ToastSlot,
}

impl<S: SettingsSource, R: SurfaceResolver> PromptSession<S, R> {
    pub fn new(settings: S, resolver: R, check: Arc<dyn SafetyCheck>, timeout: Duration) -> Self {
        Self {
            settings,
            resolver,
            preview: PreviewController::new(),
            gate: SubmissionOrchestrator::new(check, timeout),
            toast: ToastSlot::new(),
        }
    }

    #[must_use]
    pub fn preview(&self) -> &PreviewController {
        &self.preview
    }

    #[must_use]
    pub fn toast(&self) -> &ToastSlot {
        &self.toast
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn handle_key(&mut self, host: &mut dyn SurfaceHost, input: &KeyInput, now: Instant) -> KeyOutcome {
        let target = self.resolver.resolve(host, input.target);
        let ctx = RouteContext {
            enabled: self.settings.get().enabled,
            preview_active: self.preview.is_active(),
            preview_on_target: target.is_some_and(|id| self.preview.active_on(id)),
        };
        let Some(trigger) = route(input, ctx) else {
            return KeyOutcome::default();
        };

        match trigger {
            Trigger::Submit => {
                let suppress = self.submit(host, target, now);
                KeyOutcome::routed(trigger, suppress)
            }
            // A preview change while a verdict is pending would orphan it. Shift+Enter
            // still belongs to us, so the host must not insert a newline.
            _ if self.gate.is_busy() => {
                KeyOutcome::routed(trigger, trigger == Trigger::AcceptPreview)
            }
            Trigger::BeginPreview => {
                if let Some(id) = target {
                    self.begin_preview(host, id);
                }
                KeyOutcome::routed(trigger, false)
            }
            Trigger::CancelPreview => {
                self.preview.revert(host);
                KeyOutcome::routed(trigger, false)
            }
            Trigger::AcceptPreview => {
                if let Some(id) = self.preview.active_surface() {
                    if self.preview.commit(host).is_some() {
                        if let Some(surface) = host.surface_mut(id) {
                            surface.notify_changed();
                        }
                    }
                }
                KeyOutcome::routed(trigger, true)
            }
        }
    }

    /// Focus left the document: drop any preview.
    pub fn handle_focus_lost(&mut self, host: &mut dyn SurfaceHost) {
        if self.gate.is_busy() {
            return;
        }
        self.preview.revert(host);
    }

    /// Advance the pending submission and the toast timer.
    pub fn tick(&mut self, host: &mut dyn SurfaceHost, now: Instant) -> SubmitOutcome {
        self.toast.tick(now);
        self.gate.poll(host, &mut self.preview, &mut self.toast, now)
    }

    /// Like [`tick`](Self::tick), but blocks until a pending verdict arrives.
    pub fn settle(&mut self, host: &mut dyn SurfaceHost) -> SubmitOutcome {
        self.gate
            .resolve_blocking(host, &mut self.preview, &mut self.toast)
    }

    fn begin_preview(&mut self, host: &mut dyn SurfaceHost, id: SurfaceId) {
        let Some(original) = host.surface(id).map(|surface| surface.read()) else {
            return;
        };
        if original.trim().is_empty() {
            return;
        }
        let improved = improve(&original, &self.settings.get());
        if improved.trim().is_empty() || improved == original {
            return;
        }
        self.preview.begin(host, id, &improved);
    }

    /// Start a gated submission. Returns whether the host's default must be suppressed.
    fn submit(&mut self, host: &mut dyn SurfaceHost, target: Option<SurfaceId>, now: Instant) -> bool {
        let Some(id) = target else {
            return false;
        };
        let settings = self.settings.get();
        match self.gate.start(host, &self.preview, id, &settings, now) {
            Ok(_) => true,
            Err(SubmitRejected::InFlight { attempt }) => {
                log_attempt(attempt, "second submit ignored while in flight");
                true
            }
            Err(SubmitRejected::Empty | SubmitRejected::Detached) => false,
        }
    }
}

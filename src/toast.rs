//! Single-slot toast used to explain blocked submissions.

use std::time::{Duration, Instant};

/// Fixed auto-dismiss duration.
pub const TOAST_DISMISS_MS: u64 = 5_000;

/// Toast host contract: one message at a time.
pub trait ToastHost {
    /// Show `message`, replacing any visible one and restarting the dismiss timer.
    fn show(&mut self, message: &str, now: Instant);
    /// Hide the toast and cancel its timer.
    fn hide(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Toast {
    message: String,
    dismiss_at: Instant,
}

#[derive(Debug, Default)]
pub struct ToastSlot {
    current: Option<Toast>,
}

impl ToastSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn visible(&self) -> bool {
        self.current.is_some()
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.current.as_ref().map(|toast| toast.message.as_str())
    }

    /// Dismiss an expired toast. Returns `true` when it went away (caller should redraw).
    pub fn tick(&mut self, now: Instant) -> bool {
        let expired = self
            .current
            .as_ref()
            .is_some_and(|toast| now >= toast.dismiss_at);
        if expired {
            self.current = None;
        }
        expired
    }
}

impl ToastHost for ToastSlot {
    fn show(&mut self, message: &str, now: Instant) {
        self.current = Some(Toast {
            message: message.to_string(),
            dismiss_at: now + Duration::from_millis(TOAST_DISMISS_MS),
        });
    }

    fn hide(&mut self) {
        self.current = None;
    }
}

//! Single live preview of improved text over an editing surface.
//!
//! At most one session exists per controller. Beginning a preview while another is
//! active reverts the old one first. Every exit checks that the surface is still
//! attached and, when it is not, drops the session without touching the document.

use crate::log_surface;
use crate::surface::{SurfaceHost, SurfaceId, SurfaceSnapshot};

#[derive(Debug, Clone)]
struct PreviewSession {
    surface: SurfaceId,
    snapshot: SurfaceSnapshot,
    preview_value: String,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct PreviewController {
    session: Option<PreviewSession>,
    generation: u64,
}

impl PreviewController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn active_on(&self, surface: SurfaceId) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.surface == surface)
    }

    #[must_use]
    pub fn active_surface(&self) -> Option<SurfaceId> {
        self.session.as_ref().map(|session| session.surface)
    }

    /// Text shown by the session on `surface`, if one is active there.
    #[must_use]
    pub fn preview_value(&self, surface: SurfaceId) -> Option<&str> {
        self.session
            .as_ref()
            .filter(|session| session.surface == surface)
            .map(|session| session.preview_value.as_str())
    }

    /// Identity of the current session. Changes every time a preview begins.
    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        self.session.as_ref().map(|session| session.generation)
    }

    /// Snapshot `surface` and display `improved` over it.
    ///
    /// Returns false (and leaves no session) when the surface is missing or detached.
    pub fn begin(&mut self, host: &mut dyn SurfaceHost, surface: SurfaceId, improved: &str) -> bool {
        if self.session.is_some() {
            self.revert(host);
        }
        if !host.is_attached(surface) {
            return false;
        }
        let Some(target) = host.surface_mut(surface) else {
            return false;
        };

        let snapshot = target.snapshot();
        target.show_preview(improved);
        target.set_preview_marker(true);
        target.notify_changed();

        self.generation += 1;
        self.session = Some(PreviewSession {
            surface,
            snapshot,
            preview_value: improved.to_string(),
            generation: self.generation,
        });
        log_surface(surface, "preview started");
        true
    }

    /// Restore the pre-preview snapshot and clear the session.
    ///
    /// Returns whether the surface was restored; a detached surface only clears state.
    pub fn revert(&mut self, host: &mut dyn SurfaceHost) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        if !host.is_attached(session.surface) {
            log_surface(session.surface, "preview dropped: surface detached");
            return false;
        }
        let Some(target) = host.surface_mut(session.surface) else {
            return false;
        };
        target.set_preview_marker(false);
        target.restore(&session.snapshot);
        target.notify_changed();
        log_surface(session.surface, "preview reverted");
        true
    }

    /// Make the preview value permanent and clear the session.
    ///
    /// The write itself is the final change; no extra change notification is sent.
    /// Returns the committed text, or `None` when nothing was written.
    pub fn commit(&mut self, host: &mut dyn SurfaceHost) -> Option<String> {
        let session = self.session.take()?;
        if !host.is_attached(session.surface) {
            log_surface(session.surface, "preview commit dropped: surface detached");
            return None;
        }
        let target = host.surface_mut(session.surface)?;
        target.set_preview_marker(false);
        target.write(&session.preview_value);
        log_surface(session.surface, "preview committed");
        Some(session.preview_value)
    }
}

//! Editing surfaces: the live elements holding user-typed prompt text.
//!
//! Two variants sit behind [`EditingSurface`]: a field-valued surface (linear
//! string, caret, scroll offset) and a rich-text surface (markup subtree whose
//! text is derived). Their restore semantics differ, so each variant owns its
//! snapshot format and callers never branch on the variant.

mod field;
mod host;
mod resolve;
mod rich_text;

pub use field::{FieldSurface, Selection};
pub use host::{HostAction, MemoryHost, SubmitControl};
pub use resolve::{FocusedResolver, SurfaceResolver, TaggedResolver};
pub use rich_text::{escape_markup, markup_to_text, render_paragraph_markup, RichTextSurface};

use std::fmt;

/// Stable handle for a surface inside a [`SurfaceHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Field,
    RichText,
}

/// Everything needed to put a surface back exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceSnapshot {
    Field {
        value: String,
        selection: Selection,
        scroll_top: u32,
    },
    /// Rich text has no reliable plain-value round trip, so the markup is kept whole.
    RichText { markup: String },
}

/// Capability set shared by both surface variants.
pub trait EditingSurface {
    fn kind(&self) -> SurfaceKind;

    /// Canonical text of the surface.
    fn read(&self) -> String;

    /// Replace the content and leave the caret at end-of-text.
    fn write(&mut self, value: &str);

    fn move_caret_to_end(&mut self);

    /// Emit the host's "value changed" signal so other observers re-render.
    fn notify_changed(&mut self);

    /// False once the surface has been removed from its document.
    fn is_attached(&self) -> bool;

    fn snapshot(&self) -> SurfaceSnapshot;

    /// Display `value` in place of the current content. Field surfaces keep their
    /// caret and scroll offset; rich-text surfaces collapse the caret to the end.
    fn show_preview(&mut self, value: &str);

    /// Restore a snapshot taken from this surface. Snapshots of the other variant
    /// are ignored.
    fn restore(&mut self, snapshot: &SurfaceSnapshot);

    /// Toggle the attribute that styles the surface as a preview.
    fn set_preview_marker(&mut self, marked: bool);

    fn has_preview_marker(&self) -> bool;

    /// Host-assigned tag used by [`TaggedResolver`].
    fn tag(&self) -> Option<&str> {
        None
    }
}

/// The document holding editing surfaces plus the host's native submit paths.
pub trait SurfaceHost {
    /// Surfaces in document order.
    fn surface_ids(&self) -> Vec<SurfaceId>;

    fn surface(&self, id: SurfaceId) -> Option<&dyn EditingSurface>;

    fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut dyn EditingSurface>;

    /// Surface holding keyboard focus, if any.
    fn focused(&self) -> Option<SurfaceId>;

    /// Press the dedicated submit control. Returns false when it is absent or disabled.
    fn click_submit(&mut self) -> bool;

    /// Synthesize the confirm keystroke on `id`.
    fn dispatch_confirm(&mut self, id: SurfaceId);

    /// Whether `id` still refers to a surface in the document.
    fn is_attached(&self, id: SurfaceId) -> bool {
        self.surface(id)
            .is_some_and(|surface| surface.is_attached())
    }
}

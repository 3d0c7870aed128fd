//! Field-valued surface: a plain string with caret offsets and a scroll offset.

use super::{EditingSurface, SurfaceKind, SurfaceSnapshot};
use crate::log_debug;

/// Caret range in character offsets. A collapsed caret has `start == end`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    #[must_use]
    pub fn caret(at: usize) -> Self {
        Self { start: at, end: at }
    }

    fn clamped(self, len: usize) -> Self {
        Self {
            start: self.start.min(len),
            end: self.end.min(len),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSurface {
    value: String,
    selection: Selection,
    scroll_top: u32,
    attached: bool,
    preview_marker: bool,
    change_events: usize,
    tag: Option<String>,
}

impl FieldSurface {
    /// Attached field holding `value` with the caret at the end.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let end = value.chars().count();
        Self {
            value,
            selection: Selection::caret(end),
            attached: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamped(self.char_len());
    }

    #[must_use]
    pub fn scroll_top(&self) -> u32 {
        self.scroll_top
    }

    pub fn set_scroll_top(&mut self, scroll_top: u32) {
        self.scroll_top = scroll_top;
    }

    /// Number of change notifications emitted so far.
    #[must_use]
    pub fn change_events(&self) -> usize {
        self.change_events
    }

    pub(crate) fn detach(&mut self) {
        self.attached = false;
    }

    fn char_len(&self) -> usize {
        self.value.chars().count()
    }
}

impl EditingSurface for FieldSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Field
    }

    fn read(&self) -> String {
        self.value.clone()
    }

    fn write(&mut self, value: &str) {
        self.value = value.to_string();
        self.move_caret_to_end();
    }

    fn move_caret_to_end(&mut self) {
        self.selection = Selection::caret(self.char_len());
    }

    fn notify_changed(&mut self) {
        self.change_events += 1;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot::Field {
            value: self.value.clone(),
            selection: self.selection,
            scroll_top: self.scroll_top,
        }
    }

    fn show_preview(&mut self, value: &str) {
        self.value = value.to_string();
        self.selection = self.selection.clamped(self.char_len());
    }

    fn restore(&mut self, snapshot: &SurfaceSnapshot) {
        match snapshot {
            SurfaceSnapshot::Field {
                value,
                selection,
                scroll_top,
            } => {
                self.value.clone_from(value);
                self.selection = *selection;
                self.scroll_top = *scroll_top;
            }
            SurfaceSnapshot::RichText { .. } => {
                log_debug("field surface ignored a rich-text snapshot");
            }
        }
    }

    fn set_preview_marker(&mut self, marked: bool) {
        self.preview_marker = marked;
    }

    fn has_preview_marker(&self) -> bool {
        self.preview_marker
    }

    fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}

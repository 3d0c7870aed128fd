//! In-process document used by the CLI and tests.

use super::{EditingSurface, FieldSurface, RichTextSurface, SurfaceHost, SurfaceId};

/// State of the host's dedicated submit control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitControl {
    #[default]
    Absent,
    Enabled,
    Disabled,
}

/// Host-observable side effects, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    /// The submit control was pressed while `surface` held `text`.
    SubmitClicked { surface: Option<SurfaceId>, text: String },
    /// A confirm keystroke was synthesized on `surface`.
    ConfirmDispatched { surface: SurfaceId, text: String },
}

#[derive(Debug, Clone)]
enum Hosted {
    Field(FieldSurface),
    RichText(RichTextSurface),
}

impl Hosted {
    fn as_dyn(&self) -> &dyn EditingSurface {
        match self {
            Self::Field(field) => field,
            Self::RichText(rich) => rich,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn EditingSurface {
        match self {
            Self::Field(field) => field,
            Self::RichText(rich) => rich,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    surfaces: Vec<(SurfaceId, Hosted)>,
    next_id: u64,
    focused: Option<SurfaceId>,
    submit_control: SubmitControl,
    actions: Vec<HostAction>,
}

impl MemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, surface: Hosted) -> SurfaceId {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        self.surfaces.push((id, surface));
        id
    }

    pub fn add_field(&mut self, field: FieldSurface) -> SurfaceId {
        self.insert(Hosted::Field(field))
    }

    pub fn add_rich_text(&mut self, surface: RichTextSurface) -> SurfaceId {
        self.insert(Hosted::RichText(surface))
    }

    pub fn focus(&mut self, id: Option<SurfaceId>) {
        self.focused = id;
    }

    pub fn set_submit_control(&mut self, control: SubmitControl) {
        self.submit_control = control;
    }

    /// Remove `id` from the document. The object survives but reports detached.
    pub fn detach(&mut self, id: SurfaceId) {
        if let Some(hosted) = self.hosted_mut(id) {
            match hosted {
                Hosted::Field(field) => field.detach(),
                Hosted::RichText(rich) => rich.detach(),
            }
        }
        if self.focused == Some(id) {
            self.focused = None;
        }
    }

    #[must_use]
    pub fn field(&self, id: SurfaceId) -> Option<&FieldSurface> {
        match self.hosted(id)? {
            Hosted::Field(field) => Some(field),
            Hosted::RichText(_) => None,
        }
    }

    pub fn field_mut(&mut self, id: SurfaceId) -> Option<&mut FieldSurface> {
        match self.hosted_mut(id)? {
            Hosted::Field(field) => Some(field),
            Hosted::RichText(_) => None,
        }
    }

    #[must_use]
    pub fn rich_text(&self, id: SurfaceId) -> Option<&RichTextSurface> {
        match self.hosted(id)? {
            Hosted::RichText(rich) => Some(rich),
            Hosted::Field(_) => None,
        }
    }

    /// Side effects so far.
    #[must_use]
    pub fn actions(&self) -> &[HostAction] {
        &self.actions
    }

    /// Number of submits that left the document by either path.
    #[must_use]
    pub fn submit_count(&self) -> usize {
        self.actions.len()
    }

    /// Text carried by the most recent submit.
    #[must_use]
    pub fn last_submitted(&self) -> Option<&str> {
        self.actions.last().map(|action| match action {
            HostAction::SubmitClicked { text, .. } | HostAction::ConfirmDispatched { text, .. } => {
                text.as_str()
            }
        })
    }

    fn hosted(&self, id: SurfaceId) -> Option<&Hosted> {
        self.surfaces
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, hosted)| hosted)
    }

    fn hosted_mut(&mut self, id: SurfaceId) -> Option<&mut Hosted> {
        self.surfaces
            .iter_mut()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, hosted)| hosted)
    }

    fn submit_target(&self) -> Option<SurfaceId> {
        self.focused.or_else(|| {
            self.surfaces
                .iter()
                .find(|(_, hosted)| hosted.as_dyn().is_attached())
                .map(|(id, _)| *id)
        })
    }
}

impl SurfaceHost for MemoryHost {
    fn surface_ids(&self) -> Vec<SurfaceId> {
        self.surfaces
            .iter()
            .filter(|(_, hosted)| hosted.as_dyn().is_attached())
            .map(|(id, _)| *id)
            .collect()
    }

    fn surface(&self, id: SurfaceId) -> Option<&dyn EditingSurface> {
        self.hosted(id).map(Hosted::as_dyn)
    }

    fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut dyn EditingSurface> {
        self.hosted_mut(id).map(Hosted::as_dyn_mut)
    }

    fn focused(&self) -> Option<SurfaceId> {
        self.focused
    }

    fn click_submit(&mut self) -> bool {
        if self.submit_control != SubmitControl::Enabled {
            return false;
        }
        let surface = self.submit_target();
        let text = surface
            .and_then(|id| self.surface(id))
            .map(EditingSurface::read)
            .unwrap_or_default();
        self.actions.push(HostAction::SubmitClicked { surface, text });
        true
    }

    fn dispatch_confirm(&mut self, id: SurfaceId) {
        let text = self
            .surface(id)
            .map(EditingSurface::read)
            .unwrap_or_default();
        self.actions
            .push(HostAction::ConfirmDispatched { surface: id, text });
    }
}

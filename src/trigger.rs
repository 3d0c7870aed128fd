//! Maps host key and focus events to preview and submit triggers.

use crate::surface::SurfaceId;

/// Key that begins a preview while held.
pub const PREVIEW_MODIFIER: &str = "Shift";
pub const CONFIRM_KEY: &str = "Enter";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Down,
    Up,
}

/// One key event as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub key: String,
    pub phase: KeyPhase,
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub repeat: bool,
    /// An input-method composition is in progress.
    pub composing: bool,
    /// Surface the event was dispatched to, when known.
    pub target: Option<SurfaceId>,
}

impl KeyInput {
    #[must_use]
    pub fn down(key: &str) -> Self {
        Self {
            key: key.to_string(),
            phase: KeyPhase::Down,
            shift: key == PREVIEW_MODIFIER,
            alt: false,
            ctrl: false,
            meta: false,
            repeat: false,
            composing: false,
            target: None,
        }
    }

    #[must_use]
    pub fn up(key: &str) -> Self {
        Self {
            phase: KeyPhase::Up,
            shift: false,
            ..Self::down(key)
        }
    }

    #[must_use]
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    #[must_use]
    pub fn on(mut self, target: SurfaceId) -> Self {
        self.target = Some(target);
        self
    }

    fn is_key(&self, key: &str) -> bool {
        self.key == key
    }

    fn no_other_modifiers(&self) -> bool {
        !self.alt && !self.ctrl && !self.meta && !self.composing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    BeginPreview,
    CancelPreview,
    AcceptPreview,
    Submit,
}

/// State the router needs from the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteContext {
    pub enabled: bool,
    pub preview_active: bool,
    /// The active preview is on the surface the event targets.
    pub preview_on_target: bool,
}

/// Stateless key routing.
///
/// - disabled: a modifier press only cancels any preview
/// - modifier down (not auto-repeat): begin preview
/// - modifier + confirm with a preview on the target: accept it
/// - bare confirm: submit
/// - any other key down while previewing: cancel
/// - modifier up: cancel
#[must_use]
pub fn route(input: &KeyInput, ctx: RouteContext) -> Option<Trigger> {
    if input.phase == KeyPhase::Up {
        return input
            .is_key(PREVIEW_MODIFIER)
            .then_some(Trigger::CancelPreview);
    }

    if !ctx.enabled {
        return input
            .is_key(PREVIEW_MODIFIER)
            .then_some(Trigger::CancelPreview);
    }

    if input.is_key(PREVIEW_MODIFIER) {
        return (!input.repeat).then_some(Trigger::BeginPreview);
    }

    if input.is_key(CONFIRM_KEY) && input.no_other_modifiers() {
        if input.shift {
            return ctx.preview_on_target.then_some(Trigger::AcceptPreview);
        }
        return Some(Trigger::Submit);
    }

    ctx.preview_active.then_some(Trigger::CancelPreview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const ENABLED: RouteContext = RouteContext {
        enabled: true,
        preview_active: false,
        preview_on_target: false,
    };
    const PREVIEWING: RouteContext = RouteContext {
        enabled: true,
        preview_active: true,
        preview_on_target: true,
    };
    const DISABLED: RouteContext = RouteContext {
        enabled: false,
        preview_active: true,
        preview_on_target: true,
    };

    fn repeated(mut input: KeyInput) -> KeyInput {
        input.repeat = true;
        input
    }

    fn composing(mut input: KeyInput) -> KeyInput {
        input.composing = true;
        input
    }

    fn with_ctrl(mut input: KeyInput) -> KeyInput {
        input.ctrl = true;
        input
    }

    #[rstest]
    #[case(KeyInput::down("Shift"), ENABLED, Some(Trigger::BeginPreview))]
    #[case(repeated(KeyInput::down("Shift")), PREVIEWING, None)]
    #[case(KeyInput::up("Shift"), PREVIEWING, Some(Trigger::CancelPreview))]
    #[case(KeyInput::up("a"), PREVIEWING, None)]
    #[case(KeyInput::down("Enter").with_shift(), PREVIEWING, Some(Trigger::AcceptPreview))]
    #[case(KeyInput::down("Enter").with_shift(), ENABLED, None)]
    #[case(KeyInput::down("Enter"), ENABLED, Some(Trigger::Submit))]
    #[case(composing(KeyInput::down("Enter")), ENABLED, None)]
    #[case(with_ctrl(KeyInput::down("Enter")), ENABLED, None)]
    #[case(KeyInput::down("a"), PREVIEWING, Some(Trigger::CancelPreview))]
    #[case(KeyInput::down("a"), ENABLED, None)]
    #[case(KeyInput::down("Shift"), DISABLED, Some(Trigger::CancelPreview))]
    #[case(KeyInput::down("Enter"), DISABLED, None)]
    #[case(KeyInput::up("Shift"), DISABLED, Some(Trigger::CancelPreview))]
    fn routes_keys(
        #[case] input: KeyInput,
        #[case] ctx: RouteContext,
        #[case] expected: Option<Trigger>,
    ) {
        assert_eq!(route(&input, ctx), expected);
    }

    #[test]
    fn ctrl_enter_while_previewing_cancels() {
        assert_eq!(
            route(&with_ctrl(KeyInput::down("Enter")), PREVIEWING),
            Some(Trigger::CancelPreview)
        );
    }
}

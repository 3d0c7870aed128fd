//! Strategies for turning an input-event target into the surface to act on.

use super::{SurfaceHost, SurfaceId, SurfaceKind};
use anyhow::{Context, Result};
use regex::Regex;

/// Picks the editing surface an event applies to.
pub trait SurfaceResolver {
    /// `hint` is the event target, when the host knows one.
    fn resolve(&self, host: &dyn SurfaceHost, hint: Option<SurfaceId>) -> Option<SurfaceId>;
}

impl<R: SurfaceResolver + ?Sized> SurfaceResolver for Box<R> {
    fn resolve(&self, host: &dyn SurfaceHost, hint: Option<SurfaceId>) -> Option<SurfaceId> {
        (**self).resolve(host, hint)
    }
}

/// Event target, then focused surface, then the first field, then the first rich-text surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct FocusedResolver;

fn first_of_kind(host: &dyn SurfaceHost, kind: SurfaceKind) -> Option<SurfaceId> {
    host.surface_ids().into_iter().find(|id| {
        host.surface(*id)
            .is_some_and(|surface| surface.kind() == kind)
    })
}

impl SurfaceResolver for FocusedResolver {
    fn resolve(&self, host: &dyn SurfaceHost, hint: Option<SurfaceId>) -> Option<SurfaceId> {
        hint.filter(|id| host.is_attached(*id))
            .or_else(|| host.focused().filter(|id| host.is_attached(*id)))
            .or_else(|| first_of_kind(host, SurfaceKind::Field))
            .or_else(|| first_of_kind(host, SurfaceKind::RichText))
    }
}

/// Prefers a rich-text surface whose host tag matches a pattern, so a host can
/// point at its real prompt editor without the core knowing host selectors.
/// Field targets are taken as-is.
#[derive(Debug, Clone)]
pub struct TaggedResolver {
    pattern: Regex,
}

impl TaggedResolver {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern =
            Regex::new(pattern).with_context(|| format!("invalid surface tag pattern: {pattern}"))?;
        Ok(Self { pattern })
    }

    fn tagged(&self, host: &dyn SurfaceHost) -> Option<SurfaceId> {
        host.surface_ids().into_iter().find(|id| {
            host.surface(*id)
                .and_then(|surface| surface.tag())
                .is_some_and(|tag| self.pattern.is_match(tag))
        })
    }
}

impl SurfaceResolver for TaggedResolver {
    fn resolve(&self, host: &dyn SurfaceHost, hint: Option<SurfaceId>) -> Option<SurfaceId> {
        let target = hint.filter(|id| host.is_attached(*id));
        if let Some(id) = target {
            let is_field = host
                .surface(id)
                .is_some_and(|surface| surface.kind() == SurfaceKind::Field);
            if is_field {
                return Some(id);
            }
        }
        self.tagged(host)
            .or_else(|| FocusedResolver.resolve(host, target))
    }
}

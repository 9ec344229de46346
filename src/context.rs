//! Context acquisition for a mount point.
//!
//! A canvas can hold one context for its whole life, so re-mounting always
//! goes through the same sequence: lose the old context, drop the old canvas,
//! probe support off-document, then create and attach a fresh canvas. The
//! browser side implements [`ContextSurface`]; the ordering lives here.

use std::cell::Cell;
use std::rc::Rc;

use log::{debug, warn};

use crate::config::{BufferSize, ContextAttributes, Viewport};

/// Outcome of asking a previous canvas to give up its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossState {
    /// The container had no canvas.
    NoCanvas,
    /// No lose-context capability, or the context was already gone. The old
    /// canvas can be removed right away.
    Lost,
    /// Loss was requested; wait for the `webglcontextlost` event before
    /// removing the canvas.
    Pending,
}

pub trait ContextSurface {
    type Context;

    fn lose_existing(&mut self) -> LossState;

    fn remove_existing(&mut self);

    /// Tries to create a context on a throwaway canvas that never enters
    /// the document.
    fn probe_support(&self) -> bool;

    /// Container size in CSS pixels.
    fn container_size(&self) -> (f64, f64);

    fn device_pixel_ratio(&self) -> f64;

    /// Creates a canvas of `size`, appends it and requests a context. On
    /// failure the canvas must already be detached again.
    fn attach_context(&mut self, size: BufferSize, attrs: &ContextAttributes) -> Option<Self::Context>;
}

/// Cancellation token shared between a host and its in-flight setup.
#[derive(Debug, Clone)]
pub struct SetupTicket {
    cancelled: Rc<Cell<bool>>,
    generation: u32,
}

impl SetupTicket {
    pub fn new(generation: u32) -> Self {
        Self { cancelled: Rc::new(Cell::new(false)), generation }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// First half of clearing a mount point. When this returns
/// [`LossState::Pending`] the caller awaits the loss event and then calls
/// [`finish_clear`].
pub fn begin_clear<S: ContextSurface>(surface: &mut S) -> LossState {
    let state = surface.lose_existing();
    if state == LossState::Lost {
        surface.remove_existing();
    }
    state
}

pub fn finish_clear<S: ContextSurface>(surface: &mut S) {
    surface.remove_existing();
}

/// Probe, then create. Returns `None` when the setup was cancelled or no
/// context is available; neither case leaves a canvas behind.
pub fn acquire<S: ContextSurface>(
    surface: &mut S,
    ticket: &SetupTicket,
    attrs: &ContextAttributes,
) -> Option<S::Context> {
    if ticket.is_cancelled() {
        debug!("setup {} cancelled before context creation", ticket.generation());
        return None;
    }
    if !surface.probe_support() {
        warn!("WebGL2 not supported, using fallback background");
        return None;
    }
    let (width, height) = surface.container_size();
    let size = Viewport::new(width, height, surface.device_pixel_ratio()).buffer_size();
    let context = surface.attach_context(size, attrs);
    if context.is_none() {
        warn!("WebGL context creation failed");
    }
    context
}

/// Clear and acquire in one go for surfaces whose old context is released
/// synchronously.
pub fn clear_and_acquire<S: ContextSurface>(
    surface: &mut S,
    ticket: &SetupTicket,
    attrs: &ContextAttributes,
) -> Option<S::Context> {
    if begin_clear(surface) == LossState::Pending {
        finish_clear(surface);
    }
    acquire(surface, ticket, attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Quality;
    use crate::testing::ScriptedSurface;

    fn attrs() -> ContextAttributes {
        ContextAttributes::for_quality(Quality::High)
    }

    #[test]
    fn old_canvas_is_removed_before_the_new_one_is_attached() {
        let mut surface = ScriptedSurface::supported();
        surface.has_canvas = true;
        surface.lose_extension = true;
        assert_eq!(begin_clear(&mut surface), LossState::Pending);
        assert_eq!(surface.removed, 0);
        finish_clear(&mut surface);
        assert_eq!(surface.removed, 1);

        let ticket = SetupTicket::new(1);
        assert!(acquire(&mut surface, &ticket, &attrs()).is_some());
        assert_eq!(*surface.events.borrow(), vec!["lose", "remove", "probe", "attach"]);
    }

    #[test]
    fn missing_extension_removes_immediately() {
        let mut surface = ScriptedSurface::supported();
        surface.has_canvas = true;
        assert_eq!(begin_clear(&mut surface), LossState::Lost);
        assert_eq!(surface.removed, 1);
    }

    #[test]
    fn failed_probe_never_touches_the_dom() {
        let mut surface = ScriptedSurface::unsupported();
        let ticket = SetupTicket::new(1);
        assert!(clear_and_acquire(&mut surface, &ticket, &attrs()).is_none());
        assert_eq!(surface.attached, 0);
    }

    #[test]
    fn cancelled_ticket_skips_creation() {
        let mut surface = ScriptedSurface::supported();
        let ticket = SetupTicket::new(3);
        ticket.clone().cancel();
        assert!(clear_and_acquire(&mut surface, &ticket, &attrs()).is_none());
        assert_eq!(surface.attached, 0);
        assert!(!surface.events.borrow().contains(&"probe"));
    }

    #[test]
    fn canvas_is_sized_in_device_pixels() {
        let mut surface = ScriptedSurface::supported();
        surface.size = (640.0, 360.0);
        surface.dpr = 1.5;
        let ticket = SetupTicket::new(1);
        acquire(&mut surface, &ticket, &attrs()).unwrap();
        assert_eq!(surface.last_size, Some(BufferSize { width: 960, height: 540 }));

        surface.dpr = 3.0;
        acquire(&mut surface, &ticket, &attrs()).unwrap();
        assert_eq!(surface.last_size, Some(BufferSize { width: 1280, height: 720 }));
    }
}

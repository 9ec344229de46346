//! Custom cursor: a DOM dot that eases after the pointer plus a WebGL trail
//! drawn on its own full-window canvas.
//!
//! The dot works without WebGL, so the frame loop starts at mount and the
//! trail joins whenever (if ever) its context arrives.

use std::any::Any;

use glam::Vec2;
use log::{debug, warn};

use crate::backend::RenderBackend;
use crate::camera::OrthographicCamera;
use crate::config::{Viewport, TRAIL_LENGTH};
use crate::context::SetupTicket;
use crate::error::FxResult;
use crate::host::HostPhase;
use crate::particles::{CursorTrail, GpuLayer};
use crate::pointer::CursorFollower;
use crate::schedule::{FrameLoop, FrameScheduler};
use crate::signal::Signal;

/// Whether hovering an element should put the cursor into its hover style.
pub fn is_interactive(tag_name: &str, role: Option<&str>, class_name: &str) -> bool {
    let tag = tag_name.to_ascii_lowercase();
    tag == "a"
        || tag == "button"
        || role == Some("button")
        || class_name.split_whitespace().any(|c| c == "interactive")
}

/// Owns the trail canvas' context.
pub struct TrailRenderer<B: RenderBackend> {
    backend: B,
    camera: OrthographicCamera,
    layer: GpuLayer<CursorTrail, B::Layer>,
    disposed: bool,
}

impl<B: RenderBackend> TrailRenderer<B> {
    pub fn new(mut backend: B, viewport: &Viewport) -> FxResult<Self> {
        let camera = OrthographicCamera::for_viewport(viewport);
        let layer = match GpuLayer::create(&mut backend, CursorTrail::new(TRAIL_LENGTH, camera.z)) {
            Ok(layer) => layer,
            Err(err) => {
                backend.release();
                return Err(err);
            }
        };
        backend.resize(viewport.buffer_size());
        Ok(Self { backend, camera, layer, disposed: false })
    }

    /// Records a window-space position as the newest trail sample.
    pub fn push(&mut self, position: Vec2) {
        if self.disposed {
            return;
        }
        let world = self.camera.to_world(position.x, position.y);
        self.layer.generator_mut().push(world);
    }

    pub fn render(&mut self) -> FxResult<()> {
        if self.disposed {
            return Ok(());
        }
        self.backend.begin_pass()?;
        let view_projection = self.camera.view_projection();
        self.layer.draw(&mut self.backend, &view_projection)
    }

    pub fn resize(&mut self, viewport: &Viewport) {
        if self.disposed {
            return;
        }
        self.camera.resize(viewport);
        self.backend.resize(viewport.buffer_size());
    }

    pub fn trail(&self) -> &CursorTrail {
        self.layer.generator()
    }

    pub fn is_valid(&self) -> bool {
        !self.disposed
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.layer.dispose(&mut self.backend);
        self.backend.release();
    }
}

fn centre(viewport: &Viewport) -> Vec2 {
    Vec2::new((viewport.width / 2.0) as f32, (viewport.height / 2.0) as f32)
}

pub struct CursorHost<B: RenderBackend, S> {
    phase: HostPhase,
    generation: u32,
    ticket: Option<SetupTicket>,
    frames: FrameLoop<S>,
    follower: CursorFollower,
    viewport: Viewport,
    trail: Option<TrailRenderer<B>>,
    visible: Signal<bool>,
    hovering: Signal<bool>,
    pressed: Signal<bool>,
    listeners: Vec<Box<dyn Any>>,
}

impl<B: RenderBackend, S: FrameScheduler> CursorHost<B, S> {
    pub fn new(scheduler: S, viewport: Viewport) -> Self {
        Self {
            phase: HostPhase::Uninitialized,
            generation: 0,
            ticket: None,
            frames: FrameLoop::new(scheduler),
            follower: CursorFollower::at(centre(&viewport)),
            viewport,
            trail: None,
            visible: Signal::new(false),
            hovering: Signal::new(false),
            pressed: Signal::new(false),
            listeners: Vec::new(),
        }
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    pub fn visible(&self) -> Signal<bool> {
        self.visible.clone()
    }

    pub fn hovering(&self) -> Signal<bool> {
        self.hovering.clone()
    }

    /// True between mouse down and mouse up; drives the `clicking` style.
    pub fn pressed(&self) -> Signal<bool> {
        self.pressed.clone()
    }

    pub fn trail(&self) -> Option<&TrailRenderer<B>> {
        self.trail.as_ref()
    }

    pub fn mount(&mut self) -> FxResult<Option<SetupTicket>> {
        if self.phase != HostPhase::Uninitialized {
            return Ok(None);
        }
        self.frames.start()?;
        self.generation += 1;
        let ticket = SetupTicket::new(self.generation);
        self.ticket = Some(ticket.clone());
        self.phase = HostPhase::SettingUp;
        Ok(Some(ticket))
    }

    /// Attaches the trail once its context is ready. Without one the cursor
    /// keeps working as a plain DOM element.
    pub fn complete_setup(&mut self, ticket: &SetupTicket, backend: Option<B>) -> HostPhase {
        let current = self.ticket.as_ref().map(SetupTicket::generation);
        if ticket.is_cancelled() || self.phase != HostPhase::SettingUp || current != Some(ticket.generation()) {
            if let Some(mut backend) = backend {
                backend.release();
            }
            return self.phase;
        }
        self.ticket = None;
        self.phase = match backend.map(|b| TrailRenderer::new(b, &self.viewport)) {
            Some(Ok(trail)) => {
                self.trail = Some(trail);
                HostPhase::Running
            }
            Some(Err(err)) => {
                warn!("WebGL cursor effects disabled: {err}");
                HostPhase::Fallback
            }
            None => {
                debug!("cursor trail unavailable, DOM cursor only");
                HostPhase::Fallback
            }
        };
        self.phase
    }

    pub fn hold(&mut self, listener: impl Any) {
        if self.phase != HostPhase::Disposed {
            self.listeners.push(Box::new(listener));
        }
    }

    pub fn pointer_move(&mut self, client_x: f64, client_y: f64) {
        self.visible.set(true);
        self.follower.set_target(client_x as f32, client_y as f32);
    }

    pub fn pointer_leave(&mut self) {
        self.visible.set(false);
    }

    /// The pointer came back into the window; the dot restarts from the
    /// centre rather than sliding over from where it left.
    pub fn pointer_enter(&mut self) {
        self.visible.set(true);
        self.follower.reset(centre(&self.viewport));
    }

    pub fn pointer_down(&mut self) {
        self.pressed.set(true);
    }

    pub fn pointer_up(&mut self) {
        self.pressed.set(false);
    }

    pub fn hover(&mut self, tag_name: &str, role: Option<&str>, class_name: &str) {
        self.hovering.set(is_interactive(tag_name, role, class_name));
    }

    /// One frame: ease the dot, extend the trail, draw. Returns the dot's
    /// new position, or `None` when the loop is not running.
    pub fn frame(&mut self, now_ms: f64) -> Option<Vec2> {
        self.frames.begin_frame(now_ms)?;
        let position = self.follower.step();

        if let Some(trail) = self.trail.as_mut().filter(|t| t.is_valid()) {
            trail.push(position);
            if let Err(err) = trail.render() {
                warn!("cursor trail render failed, disabling: {err}");
                trail.dispose();
                self.phase = HostPhase::Fallback;
            }
        }

        if let Err(err) = self.frames.end_frame() {
            warn!("cursor frame loop stopped: {err}");
        }
        Some(position)
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let Some(trail) = self.trail.as_mut() {
            trail.resize(&viewport);
        }
    }

    pub fn unmount(&mut self) {
        if self.phase == HostPhase::Disposed {
            return;
        }
        if let Some(ticket) = self.ticket.take() {
            ticket.cancel();
        }
        self.frames.stop();
        if let Some(trail) = self.trail.as_mut() {
            trail.dispose();
        }
        self.listeners.clear();
        self.phase = HostPhase::Disposed;
        debug!("cursor unmounted");
    }
}

//! Mount/unmount lifecycle for the background layer.
//!
//! ```text
//! Uninitialized -> SettingUp -> Running -> Disposed
//!                      \-> Fallback -> Disposed
//! ```
//!
//! Setup is asynchronous in the browser, so completion arrives with the
//! [`SetupTicket`] issued at mount. A ticket that was cancelled by unmount
//! (or superseded) turns completion into cleanup.
//!
//! Fallback subscribers often call straight back into the host (to read its
//! state or unmount it). The host therefore never notifies them itself; go
//! through [`BackgroundHost::step`], which publishes the flag once the host
//! borrow is released.

use std::any::Any;
use std::cell::RefCell;

use log::{debug, warn};

use crate::backend::RenderBackend;
use crate::config::{ContextAttributes, SceneOptions, Viewport};
use crate::context::SetupTicket;
use crate::scene::{SceneController, TickOutcome};
use crate::schedule::FrameScheduler;
use crate::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    Uninitialized,
    SettingUp,
    Running,
    /// No context; the static gradient is shown.
    Fallback,
    Disposed,
}

pub struct BackgroundHost<B: RenderBackend, S> {
    phase: HostPhase,
    generation: u32,
    ticket: Option<SetupTicket>,
    viewport: Viewport,
    options: SceneOptions,
    scene: Option<SceneController<B, S>>,
    listeners: Vec<Box<dyn Any>>,
    fallback: Signal<bool>,
}

impl<B: RenderBackend, S: FrameScheduler> BackgroundHost<B, S> {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            phase: HostPhase::Uninitialized,
            generation: 0,
            ticket: None,
            viewport,
            options: SceneOptions::for_viewport(&viewport),
            scene: None,
            listeners: Vec::new(),
            fallback: Signal::new(false),
        }
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    pub fn options(&self) -> SceneOptions {
        self.options
    }

    pub fn context_attributes(&self) -> ContextAttributes {
        ContextAttributes::for_quality(self.options.quality)
    }

    /// Observable fallback flag for whatever renders the gradient.
    pub fn fallback(&self) -> Signal<bool> {
        self.fallback.clone()
    }

    /// The flag value this host's phase calls for, not yet published.
    pub fn fallback_update(&self) -> FallbackUpdate {
        FallbackUpdate { signal: self.fallback.clone(), on: self.phase == HostPhase::Fallback }
    }

    /// Runs `f` on the host, then publishes the fallback flag with the
    /// borrow released. Returns `None` without running `f` if the host is
    /// already borrowed further up the stack.
    pub fn step<R>(host: &RefCell<Self>, f: impl FnOnce(&mut Self) -> R) -> Option<R> {
        let (result, update) = {
            let mut this = host.try_borrow_mut().ok()?;
            let result = f(&mut this);
            (result, this.fallback_update())
        };
        update.publish();
        Some(result)
    }

    pub fn scene(&self) -> Option<&SceneController<B, S>> {
        self.scene.as_ref()
    }

    /// Starts a setup. Returns `None` if this host was already mounted, so a
    /// second mount can never start a second loop.
    pub fn mount(&mut self) -> Option<SetupTicket> {
        if self.phase != HostPhase::Uninitialized {
            return None;
        }
        self.generation += 1;
        let ticket = SetupTicket::new(self.generation);
        self.ticket = Some(ticket.clone());
        self.phase = HostPhase::SettingUp;
        debug!("background setup {} started", self.generation);
        Some(ticket)
    }

    /// Finishes a setup with whatever the acquisition produced.
    pub fn complete_setup(
        &mut self,
        ticket: &SetupTicket,
        acquired: Option<(B, S)>,
        seed: u64,
    ) -> HostPhase {
        let current = self.ticket.as_ref().map(SetupTicket::generation);
        if ticket.is_cancelled() || self.phase != HostPhase::SettingUp || current != Some(ticket.generation()) {
            if let Some((mut backend, _)) = acquired {
                backend.release();
            }
            debug!("stale background setup {} discarded", ticket.generation());
            return self.phase;
        }
        self.ticket = None;

        let Some((backend, scheduler)) = acquired else {
            self.enter_fallback();
            return self.phase;
        };
        let started = SceneController::new(backend, scheduler, self.viewport, self.options, seed)
            .and_then(|mut scene| scene.start().map(|_| scene));
        match started {
            Ok(scene) => {
                self.scene = Some(scene);
                self.phase = HostPhase::Running;
            }
            Err(err) => {
                warn!("background scene setup failed: {err}");
                self.enter_fallback();
            }
        }
        self.phase
    }

    /// Keeps `listener` (anything that detaches itself on drop) alive until
    /// unmount. Hosts that are no longer running drop it on the spot.
    pub fn hold(&mut self, listener: impl Any) {
        if self.phase == HostPhase::Running {
            self.listeners.push(Box::new(listener));
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn frame(&mut self, now_ms: f64) -> TickOutcome {
        let Some(scene) = self.scene.as_mut() else {
            return TickOutcome::Skipped;
        };
        let outcome = scene.tick(now_ms);
        if outcome == TickOutcome::Failed {
            self.enter_fallback();
        }
        outcome
    }

    pub fn pointer_move(&mut self, client_x: f64, client_y: f64) {
        if let Some(scene) = self.scene.as_mut() {
            scene.handle_pointer_move(client_x, client_y);
        }
    }

    pub fn touch_move(&mut self, first_touch: Option<(f64, f64)>) {
        if let Some(scene) = self.scene.as_mut() {
            scene.handle_touch(first_touch);
        }
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let Some(scene) = self.scene.as_mut() {
            scene.handle_resize(viewport);
        }
    }

    /// Synchronous teardown: cancels any in-flight setup, disposes the scene
    /// and removes listeners. Safe from any phase, any number of times.
    pub fn unmount(&mut self) {
        if self.phase == HostPhase::Disposed {
            return;
        }
        if let Some(ticket) = self.ticket.take() {
            ticket.cancel();
        }
        if let Some(scene) = self.scene.as_mut() {
            scene.dispose();
        }
        self.listeners.clear();
        self.phase = HostPhase::Disposed;
        debug!("background unmounted");
    }

    fn enter_fallback(&mut self) {
        if let Some(scene) = self.scene.as_mut() {
            scene.dispose();
        }
        self.listeners.clear();
        self.phase = HostPhase::Fallback;
    }
}

/// A fallback flag value waiting to be pushed to subscribers.
#[must_use = "nothing is notified until the update is published"]
pub struct FallbackUpdate {
    signal: Signal<bool>,
    on: bool,
}

impl FallbackUpdate {
    pub fn is_change(&self) -> bool {
        self.signal.get() != self.on
    }

    pub fn publish(self) {
        self.signal.set(self.on);
    }
}

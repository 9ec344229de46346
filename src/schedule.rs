//! Frame scheduling.
//!
//! [`FrameLoop`] owns the "one pending frame, stop forever after dispose"
//! bookkeeping; the actual `requestAnimationFrame` plumbing lives behind
//! [`FrameScheduler`] so the loop can be driven by hand in tests.

use crate::error::FxResult;

pub type FrameId = i32;

pub trait FrameScheduler {
    /// Ask for exactly one callback on the next frame.
    fn request_frame(&mut self) -> FxResult<FrameId>;
    fn cancel_frame(&mut self, id: FrameId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    /// Terminal. A stopped loop never schedules again.
    Stopped,
}

/// Clock readings handed to a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Seconds since the first frame.
    pub elapsed: f32,
    /// Seconds since the previous frame.
    pub delta: f32,
}

pub struct FrameLoop<S> {
    scheduler: S,
    state: LoopState,
    pending: Option<FrameId>,
    origin_ms: Option<f64>,
    elapsed: f32,
}

impl<S: FrameScheduler> FrameLoop<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            state: LoopState::Idle,
            pending: None,
            origin_ms: None,
            elapsed: 0.0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    /// Idempotent; a stopped loop stays stopped.
    pub fn start(&mut self) -> FxResult<()> {
        if self.state != LoopState::Idle {
            return Ok(());
        }
        self.state = LoopState::Running;
        self.schedule()
    }

    /// Called at the top of a frame callback. Returns `None` when the loop
    /// is not running, in which case the callback must do nothing.
    pub fn begin_frame(&mut self, now_ms: f64) -> Option<FrameTime> {
        if self.state != LoopState::Running {
            return None;
        }
        self.pending = None;
        let origin = *self.origin_ms.get_or_insert(now_ms);
        let elapsed = (((now_ms - origin) / 1000.0) as f32).max(self.elapsed);
        let delta = elapsed - self.elapsed;
        self.elapsed = elapsed;
        Some(FrameTime { elapsed, delta })
    }

    /// Re-arms the loop after a frame's work is done.
    pub fn end_frame(&mut self) -> FxResult<()> {
        if self.state == LoopState::Running && self.pending.is_none() {
            self.schedule()?;
        }
        Ok(())
    }

    /// Cancels the pending callback synchronously.
    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel_frame(id);
        }
    }

    fn schedule(&mut self) -> FxResult<()> {
        match self.scheduler.request_frame() {
            Ok(id) => {
                self.pending = Some(id);
                Ok(())
            }
            Err(err) => {
                self.state = LoopState::Stopped;
                Err(err)
            }
        }
    }
}

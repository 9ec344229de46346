//! Test doubles for the browser seams.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Mat4;

use crate::backend::RenderBackend;
use crate::config::{BufferSize, ContextAttributes};
use crate::context::{ContextSurface, LossState};
use crate::error::{FxError, FxResult};
use crate::particles::{Material, UniformSet};
use crate::schedule::{FrameId, FrameScheduler};

/// Frame scheduler driven by hand. Clones share one queue.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<RefCell<Queue>>,
}

#[derive(Default)]
struct Queue {
    next: FrameId,
    pending: Vec<FrameId>,
}

impl ManualScheduler {
    pub fn pending(&self) -> usize {
        self.queue.borrow().pending.len()
    }

    /// Takes every pending callback, as the browser does at a frame boundary.
    pub fn fire(&self) -> Vec<FrameId> {
        std::mem::take(&mut self.queue.borrow_mut().pending)
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FxResult<FrameId> {
        let mut queue = self.queue.borrow_mut();
        queue.next += 1;
        let id = queue.next;
        queue.pending.push(id);
        Ok(id)
    }

    fn cancel_frame(&mut self, id: FrameId) {
        self.queue.borrow_mut().pending.retain(|p| *p != id);
    }
}

#[derive(Debug)]
pub struct BackendLog {
    pub layers_created: usize,
    pub layers_released: usize,
    pub uploads: usize,
    pub passes: usize,
    pub draws: usize,
    pub resizes: usize,
    pub size: BufferSize,
    pub released: usize,
    pub last_uniforms: Option<UniformSet>,
}

impl Default for BackendLog {
    fn default() -> Self {
        Self {
            layers_created: 0,
            layers_released: 0,
            uploads: 0,
            passes: 0,
            draws: 0,
            resizes: 0,
            size: BufferSize { width: 1, height: 1 },
            released: 0,
            last_uniforms: None,
        }
    }
}

/// Backend that records calls instead of drawing.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    pub log: Rc<RefCell<BackendLog>>,
    pub fail_draws: Rc<Cell<bool>>,
    pub fail_layers: bool,
}

impl RecordingBackend {
    pub fn failing_layers() -> Self {
        Self { fail_layers: true, ..Self::default() }
    }
}

impl RenderBackend for RecordingBackend {
    type Layer = usize;

    fn create_layer(&mut self, _material: &Material, _positions: &[f32]) -> FxResult<usize> {
        if self.fail_layers {
            return Err(FxError::ShaderCompile("scripted failure".into()));
        }
        let mut log = self.log.borrow_mut();
        log.layers_created += 1;
        Ok(log.layers_created)
    }

    fn upload_positions(&mut self, _layer: &usize, _positions: &[f32]) {
        self.log.borrow_mut().uploads += 1;
    }

    fn resize(&mut self, size: BufferSize) {
        let mut log = self.log.borrow_mut();
        if log.size != size {
            log.size = size;
            log.resizes += 1;
        }
    }

    fn size(&self) -> BufferSize {
        self.log.borrow().size
    }

    fn begin_pass(&mut self) -> FxResult<()> {
        if self.fail_draws.get() {
            return Err(FxError::ContextUnavailable);
        }
        self.log.borrow_mut().passes += 1;
        Ok(())
    }

    fn draw(&mut self, _layer: &usize, _vp: &Mat4, uniforms: &UniformSet, _count: usize) -> FxResult<()> {
        let mut log = self.log.borrow_mut();
        log.draws += 1;
        log.last_uniforms = Some(uniforms.clone());
        Ok(())
    }

    fn release_layer(&mut self, _layer: usize) {
        self.log.borrow_mut().layers_released += 1;
    }

    fn release(&mut self) {
        self.log.borrow_mut().released += 1;
    }
}

/// Mount point with scripted browser capabilities.
pub struct ScriptedSurface {
    pub has_canvas: bool,
    pub lose_extension: bool,
    pub supported: bool,
    pub context_ok: bool,
    pub size: (f64, f64),
    pub dpr: f64,
    pub attached: usize,
    pub removed: usize,
    pub last_size: Option<BufferSize>,
    pub events: RefCell<Vec<&'static str>>,
    pub backend: RecordingBackend,
}

impl ScriptedSurface {
    pub fn supported() -> Self {
        Self {
            has_canvas: false,
            lose_extension: false,
            supported: true,
            context_ok: true,
            size: (800.0, 600.0),
            dpr: 1.0,
            attached: 0,
            removed: 0,
            last_size: None,
            events: RefCell::new(Vec::new()),
            backend: RecordingBackend::default(),
        }
    }

    pub fn unsupported() -> Self {
        Self { supported: false, context_ok: false, ..Self::supported() }
    }
}

impl ContextSurface for ScriptedSurface {
    type Context = RecordingBackend;

    fn lose_existing(&mut self) -> LossState {
        if !self.has_canvas {
            return LossState::NoCanvas;
        }
        self.events.borrow_mut().push("lose");
        if self.lose_extension {
            LossState::Pending
        } else {
            LossState::Lost
        }
    }

    fn remove_existing(&mut self) {
        if self.has_canvas {
            self.events.borrow_mut().push("remove");
            self.has_canvas = false;
            self.removed += 1;
        }
    }

    fn probe_support(&self) -> bool {
        self.events.borrow_mut().push("probe");
        self.supported
    }

    fn container_size(&self) -> (f64, f64) {
        self.size
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.dpr
    }

    fn attach_context(&mut self, size: BufferSize, _attrs: &ContextAttributes) -> Option<RecordingBackend> {
        if !self.context_ok {
            return None;
        }
        self.events.borrow_mut().push("attach");
        self.attached += 1;
        self.has_canvas = true;
        self.last_size = Some(size);
        Some(self.backend.clone())
    }
}

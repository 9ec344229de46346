//! The hero background scene.

use glam::Vec2;
use log::{debug, warn};

use crate::backend::RenderBackend;
use crate::camera::PerspectiveCamera;
use crate::config::{SceneOptions, Viewport};
use crate::error::FxResult;
use crate::particles::{FrameInputs, Generator, GpuLayer, ParticleField, VoidGrid};
use crate::pointer::{normalize, PointerState};
use crate::schedule::{FrameLoop, FrameScheduler, LoopState};

type SceneLayer<B> = GpuLayer<Box<dyn Generator>, <B as RenderBackend>::Layer>;

/// What a frame callback did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The loop is not running; nothing happened.
    Skipped,
    Rendered,
    /// Drawing failed. The scene has disposed itself.
    Failed,
}

pub struct SceneController<B: RenderBackend, S> {
    backend: B,
    frames: FrameLoop<S>,
    camera: PerspectiveCamera,
    pointer: PointerState,
    viewport: Viewport,
    layers: Vec<SceneLayer<B>>,
    disposed: bool,
}

impl<B: RenderBackend, S: FrameScheduler> SceneController<B, S> {
    /// Builds every layer on `backend`. On failure the backend is released
    /// before the error is returned, so no context outlives a failed setup.
    pub fn new(
        mut backend: B,
        scheduler: S,
        viewport: Viewport,
        options: SceneOptions,
        seed: u64,
    ) -> FxResult<Self> {
        let mut generators: Vec<Box<dyn Generator>> = Vec::new();
        if options.with_void_grid() {
            generators.push(Box::new(VoidGrid::new()));
        }
        generators.push(Box::new(ParticleField::new(options.particle_count, seed)));

        let mut layers: Vec<SceneLayer<B>> = Vec::with_capacity(generators.len());
        for generator in generators {
            match GpuLayer::create(&mut backend, generator) {
                Ok(layer) => layers.push(layer),
                Err(err) => {
                    for layer in &mut layers {
                        layer.dispose(&mut backend);
                    }
                    backend.release();
                    return Err(err);
                }
            }
        }
        backend.resize(viewport.buffer_size());
        debug!(
            "scene ready: {} particles, {:?} quality, {} layers",
            options.particle_count,
            options.quality,
            layers.len()
        );

        Ok(Self {
            backend,
            frames: FrameLoop::new(scheduler),
            camera: PerspectiveCamera::for_viewport(&viewport),
            pointer: PointerState::default(),
            viewport,
            layers,
            disposed: false,
        })
    }

    pub fn start(&mut self) -> FxResult<()> {
        if self.disposed {
            return Ok(());
        }
        self.frames.start()
    }

    /// The frame callback.
    pub fn tick(&mut self, now_ms: f64) -> TickOutcome {
        if self.disposed {
            return TickOutcome::Skipped;
        }
        let Some(time) = self.frames.begin_frame(now_ms) else {
            return TickOutcome::Skipped;
        };

        let pointer = self.pointer.step();
        let size = self.backend.size();
        let inputs = FrameInputs {
            time: time.elapsed,
            pointer,
            resolution: Vec2::new(size.width as f32, size.height as f32),
        };
        for layer in &mut self.layers {
            layer.generator_mut().update(&inputs);
        }

        if let Err(err) = self.render().and_then(|_| self.frames.end_frame()) {
            warn!("background render failed, disabling effect: {err}");
            self.dispose();
            return TickOutcome::Failed;
        }
        TickOutcome::Rendered
    }

    fn render(&mut self) -> FxResult<()> {
        self.backend.begin_pass()?;
        let view_projection = self.camera.view_projection();
        for layer in &mut self.layers {
            layer.draw(&mut self.backend, &view_projection)?;
        }
        Ok(())
    }

    /// Records the pointer target; the next frame picks it up.
    pub fn handle_pointer_move(&mut self, client_x: f64, client_y: f64) {
        if self.disposed {
            return;
        }
        self.pointer.set_target(normalize(client_x, client_y, &self.viewport));
    }

    /// Touch input follows the first touch point only.
    pub fn handle_touch(&mut self, first_touch: Option<(f64, f64)>) {
        if let Some((x, y)) = first_touch {
            self.handle_pointer_move(x, y);
        }
    }

    pub fn handle_resize(&mut self, viewport: Viewport) {
        if self.disposed {
            return;
        }
        self.viewport = viewport;
        self.camera.set_aspect(viewport.aspect());
        self.backend.resize(viewport.buffer_size());
    }

    /// Cancels the pending frame, frees every layer, then releases the
    /// context. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.frames.stop();
        for layer in &mut self.layers {
            layer.dispose(&mut self.backend);
        }
        self.backend.release();
        debug!("scene disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn loop_state(&self) -> LoopState {
        self.frames.state()
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Quality;
    use crate::particles::UniformValue;
    use crate::testing::{ManualScheduler, RecordingBackend};

    fn desktop() -> Viewport {
        Viewport::new(1280.0, 720.0, 1.0)
    }

    fn scene(
        backend: RecordingBackend,
        sched: &ManualScheduler,
    ) -> SceneController<RecordingBackend, ManualScheduler> {
        let vp = desktop();
        SceneController::new(backend, sched.clone(), vp, SceneOptions::for_viewport(&vp), 9).unwrap()
    }

    fn run(scene: &mut SceneController<RecordingBackend, ManualScheduler>, sched: &ManualScheduler, frames: usize) {
        for i in 0..frames {
            for _ in sched.fire() {
                scene.tick(i as f64 * 16.0);
            }
        }
    }

    #[test]
    fn dispose_twice_leaves_no_frame_scheduled() {
        let sched = ManualScheduler::default();
        let backend = RecordingBackend::default();
        let log = backend.log.clone();
        let mut scene = scene(backend, &sched);
        scene.start().unwrap();
        run(&mut scene, &sched, 3);
        assert_eq!(sched.pending(), 1);

        scene.dispose();
        scene.dispose();
        assert_eq!(sched.pending(), 0);
        assert!(sched.fire().is_empty());
        assert_eq!(scene.tick(1000.0), TickOutcome::Skipped);

        let log = log.borrow();
        assert_eq!(log.released, 1);
        assert_eq!(log.layers_released, log.layers_created);
    }

    #[test]
    fn each_frame_renders_once_and_reschedules() {
        let sched = ManualScheduler::default();
        let backend = RecordingBackend::default();
        let log = backend.log.clone();
        let mut scene = scene(backend, &sched);
        assert_eq!(scene.layer_count(), 2);
        scene.start().unwrap();
        scene.start().unwrap();
        run(&mut scene, &sched, 4);
        assert_eq!(log.borrow().passes, 4);
        assert_eq!(log.borrow().draws, 8);
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn pointer_input_waits_for_next_frame() {
        let sched = ManualScheduler::default();
        let backend = RecordingBackend::default();
        let log = backend.log.clone();
        let mut scene = scene(backend, &sched);
        scene.start().unwrap();

        scene.handle_pointer_move(1280.0, 0.0);
        assert_eq!(log.borrow().passes, 0);
        assert_eq!(scene.pointer().target(), Vec2::new(1.0, 1.0));

        run(&mut scene, &sched, 1);
        let smoothed = scene.pointer().smoothed();
        assert!((smoothed.x - 0.1).abs() < 1e-6);
        let uniforms = log.borrow().last_uniforms.clone().unwrap();
        assert_eq!(uniforms.get("uMouse"), Some(UniformValue::Vec2(smoothed)));
    }

    #[test]
    fn touch_uses_first_point() {
        let sched = ManualScheduler::default();
        let mut scene = scene(RecordingBackend::default(), &sched);
        scene.handle_touch(None);
        assert_eq!(scene.pointer().target(), Vec2::ZERO);
        scene.handle_touch(Some((0.0, 720.0)));
        assert_eq!(scene.pointer().target(), Vec2::new(-1.0, -1.0));
    }

    #[test]
    fn resize_is_idempotent() {
        let sched = ManualScheduler::default();
        let backend = RecordingBackend::default();
        let log = backend.log.clone();
        let mut scene = scene(backend, &sched);
        let resizes = log.borrow().resizes;

        let vp = Viewport::new(1000.0, 500.0, 1.0);
        scene.handle_resize(vp);
        let camera = *scene.camera();
        let size = log.borrow().size;
        scene.handle_resize(vp);
        assert_eq!(*scene.camera(), camera);
        assert_eq!(log.borrow().size, size);
        assert_eq!(camera.aspect, 2.0);
        assert_eq!(size.width, 1000);
        assert_eq!(log.borrow().resizes, resizes + 1);

        scene.dispose();
        scene.handle_resize(Viewport::new(10.0, 10.0, 1.0));
        assert_eq!(scene.camera().aspect, 2.0);
    }

    #[test]
    fn narrow_scene_skips_grid_layer() {
        let sched = ManualScheduler::default();
        let vp = Viewport::new(360.0, 640.0, 2.0);
        let opts = SceneOptions::for_viewport(&vp);
        assert_eq!(opts.quality, Quality::Low);
        let scene = SceneController::new(RecordingBackend::default(), sched, vp, opts, 1).unwrap();
        assert_eq!(scene.layer_count(), 1);
        assert_eq!(scene.camera().fov_degrees, 75.0);
    }

    #[test]
    fn failed_layer_releases_context() {
        let backend = RecordingBackend::failing_layers();
        let log = backend.log.clone();
        let vp = desktop();
        let result =
            SceneController::new(backend, ManualScheduler::default(), vp, SceneOptions::for_viewport(&vp), 1);
        assert!(result.is_err());
        assert_eq!(log.borrow().released, 1);
    }

    #[test]
    fn draw_failure_stops_the_loop() {
        let sched = ManualScheduler::default();
        let backend = RecordingBackend::default();
        let fail = backend.fail_draws.clone();
        let mut scene = scene(backend, &sched);
        scene.start().unwrap();
        run(&mut scene, &sched, 2);
        fail.set(true);
        assert_eq!(sched.fire().len(), 1);
        assert_eq!(scene.tick(100.0), TickOutcome::Failed);
        assert!(scene.is_disposed());
        assert_eq!(sched.pending(), 0);
        assert_eq!(scene.loop_state(), LoopState::Stopped);
    }
}

use glam::Vec3;

use super::{FrameInputs, Generator, Material, Primitive, UniformSet, UniformValue};
use crate::config::ACCENT;
use crate::shaders;

const TIME_STEP: f32 = 0.016;
const POINT_SIZE: f32 = 15.0;

/// Fixed-depth history of cursor positions. Slot 0 is always the most recent
/// sample; older samples slide toward the tail and fall off the end.
pub struct CursorTrail {
    positions: Vec<f32>,
    uniforms: UniformSet,
    dirty: bool,
}

impl CursorTrail {
    pub fn new(count: usize, camera_distance: f32) -> Self {
        let mut uniforms = UniformSet::default();
        uniforms.set("uSize", UniformValue::Float(POINT_SIZE));
        uniforms.set("uColor", UniformValue::Vec3(Vec3::from(ACCENT)));
        uniforms.set("uTime", UniformValue::Float(0.0));
        uniforms.set("uCount", UniformValue::Float(count.max(1) as f32));
        uniforms.set("uCameraDistance", UniformValue::Float(camera_distance));
        Self { positions: vec![0.0; count * 3], uniforms, dirty: true }
    }

    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn push(&mut self, position: Vec3) {
        if self.positions.is_empty() {
            return;
        }
        let len = self.positions.len();
        self.positions.copy_within(0..len - 3, 3);
        self.positions[..3].copy_from_slice(&position.to_array());

        let time = self.uniforms.float("uTime").unwrap_or(0.0) + TIME_STEP;
        self.uniforms.set("uTime", UniformValue::Float(time));
        self.dirty = true;
    }

    pub fn sample(&self, slot: usize) -> Option<Vec3> {
        self.positions.get(slot * 3..slot * 3 + 3).map(Vec3::from_slice)
    }
}

impl Generator for CursorTrail {
    fn material(&self) -> Material {
        Material {
            vertex: shaders::TRAIL_VERTEX,
            fragment: shaders::TRAIL_FRAGMENT,
            primitive: Primitive::Points,
            additive: true,
        }
    }

    fn positions(&self) -> &[f32] {
        &self.positions
    }

    fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    // The trail is fed through `push`; frame inputs carry nothing it needs.
    fn update(&mut self, _inputs: &FrameInputs) {}

    fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

use glam::{Vec2, Vec3};

use super::{FrameInputs, Generator, Material, Primitive, UniformSet, UniformValue};
use crate::config::ACCENT;
use crate::shaders;

const EASING: f32 = 0.1;
/// Pointer travel per frame (NDC units) that counts as interaction.
const MOVE_THRESHOLD: f32 = 0.01;

// Two clip-space triangles covering the viewport.
const QUAD: [f32; 18] = [
    -1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, //
    -1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0,
];

/// Full-screen glow and grid behind the particles. It reacts to how fast the
/// pointer moves rather than where it is.
pub struct VoidGrid {
    positions: Vec<f32>,
    uniforms: UniformSet,
    last_pointer: Vec2,
    velocity: f32,
    interaction: f32,
}

impl VoidGrid {
    pub fn new() -> Self {
        let mut uniforms = UniformSet::default();
        uniforms.set("uTime", UniformValue::Float(0.0));
        uniforms.set("uMouse", UniformValue::Vec2(Vec2::ZERO));
        uniforms.set("uMouseVelocity", UniformValue::Float(0.0));
        uniforms.set("uResolution", UniformValue::Vec2(Vec2::ONE));
        uniforms.set("uInteractionStrength", UniformValue::Float(0.0));
        uniforms.set("uColor", UniformValue::Vec3(Vec3::from(ACCENT)));
        Self {
            positions: QUAD.to_vec(),
            uniforms,
            last_pointer: Vec2::ZERO,
            velocity: 0.0,
            interaction: 0.0,
        }
    }

    pub fn interaction(&self) -> f32 {
        self.interaction
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }
}

impl Default for VoidGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for VoidGrid {
    fn material(&self) -> Material {
        Material {
            vertex: shaders::GRID_VERTEX,
            fragment: shaders::GRID_FRAGMENT,
            primitive: Primitive::Triangles,
            additive: true,
        }
    }

    fn positions(&self) -> &[f32] {
        &self.positions
    }

    fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    fn update(&mut self, inputs: &FrameInputs) {
        let travel = inputs.pointer.distance(self.last_pointer);
        self.last_pointer = inputs.pointer;

        self.velocity += (travel - self.velocity) * EASING;
        let target = if travel > MOVE_THRESHOLD { 1.0 } else { 0.0 };
        self.interaction += (target - self.interaction) * EASING;

        self.uniforms.set("uTime", UniformValue::Float(inputs.time));
        self.uniforms.set("uMouse", UniformValue::Vec2(inputs.pointer));
        self.uniforms.set("uMouseVelocity", UniformValue::Float(self.velocity));
        self.uniforms.set("uResolution", UniformValue::Vec2(inputs.resolution));
        self.uniforms.set("uInteractionStrength", UniformValue::Float(self.interaction));
    }
}

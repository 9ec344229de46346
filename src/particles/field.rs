use glam::{Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{FrameInputs, Generator, Material, Primitive, UniformSet, UniformValue};
use crate::config::ACCENT;
use crate::shaders;

/// Side of the cube particles are scattered in.
const SPREAD: f32 = 50.0;
const MAX_SPEED: f32 = 0.01;

/// The hero background: a static cloud whose motion lives entirely in the
/// vertex shader. The host only feeds it time and the pointer.
pub struct ParticleField {
    positions: Vec<f32>,
    velocities: Vec<f32>,
    uniforms: UniformSet,
}

impl ParticleField {
    pub fn new(count: usize, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut positions = Vec::with_capacity(count * 3);
        let mut velocities = Vec::with_capacity(count * 3);
        for _ in 0..count * 3 {
            positions.push((rng.gen::<f32>() - 0.5) * SPREAD);
            velocities.push(rng.gen_range(-MAX_SPEED..=MAX_SPEED));
        }

        let mut uniforms = UniformSet::default();
        uniforms.set("uTime", UniformValue::Float(0.0));
        uniforms.set("uColor", UniformValue::Vec3(Vec3::from(ACCENT)));
        uniforms.set("uMouse", UniformValue::Vec2(Vec2::ZERO));
        uniforms.set("uInteractionStrength", UniformValue::Float(0.0));

        Self { positions, velocities, uniforms }
    }

    pub fn count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn velocities(&self) -> &[f32] {
        &self.velocities
    }

    /// Breathes between 0 and 1 with a period of pi seconds.
    pub fn interaction_strength(time: f32) -> f32 {
        (time * 2.0).sin() * 0.5 + 0.5
    }
}

impl Generator for ParticleField {
    fn material(&self) -> Material {
        Material {
            vertex: shaders::FIELD_VERTEX,
            fragment: shaders::FIELD_FRAGMENT,
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

    fn update(&mut self, inputs: &FrameInputs) {
        self.uniforms.set("uTime", UniformValue::Float(inputs.time));
        self.uniforms.set("uMouse", UniformValue::Vec2(inputs.pointer));
        self.uniforms.set(
            "uInteractionStrength",
            UniformValue::Float(Self::interaction_strength(inputs.time)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(time: f32) -> FrameInputs {
        FrameInputs { time, pointer: Vec2::new(0.25, -0.5), resolution: Vec2::new(800.0, 600.0) }
    }

    #[test]
    fn buffer_holds_three_floats_per_particle() {
        for n in [1, 2, 17, 500, 1000] {
            let mut field = ParticleField::new(n, 7);
            assert_eq!(field.positions().len(), 3 * n);
            assert_eq!(field.velocities().len(), 3 * n);
            let before = field.positions().to_vec();
            field.update(&inputs(3.0));
            assert_eq!(field.positions(), &before[..]);
            assert_eq!(field.vertex_count(), n);
            assert!(!field.take_dirty());
        }
    }

    #[test]
    fn particles_start_inside_the_cube() {
        let field = ParticleField::new(1000, 42);
        assert!(field.positions().iter().all(|p| p.abs() <= SPREAD / 2.0));
        assert!(field.velocities().iter().all(|v| v.abs() <= MAX_SPEED));
    }

    #[test]
    fn update_pushes_uniforms() {
        let mut field = ParticleField::new(4, 1);
        field.update(&inputs(0.75));
        assert_eq!(field.uniforms().float("uTime"), Some(0.75));
        assert_eq!(field.uniforms().get("uMouse"), Some(UniformValue::Vec2(Vec2::new(0.25, -0.5))));
        let strength = field.uniforms().float("uInteractionStrength").unwrap();
        assert!((strength - ((1.5f32).sin() * 0.5 + 0.5)).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&strength));
    }
}

//! Point generators.
//!
//! A generator owns host-side vertex data plus the uniform values its shader
//! reads. It never touches the GPU; [`GpuLayer`] pairs it with whatever
//! handle a [`RenderBackend`] hands out and is what actually gets released on
//! teardown.

mod field;
mod trail;
mod void_grid;

pub use field::ParticleField;
pub use trail::CursorTrail;
pub use void_grid::VoidGrid;

use glam::{Mat4, Vec2, Vec3};

use crate::backend::RenderBackend;
use crate::error::FxResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
}

/// Named shader inputs, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformSet {
    entries: Vec<(&'static str, UniformValue)>,
}

impl UniformSet {
    pub fn set(&mut self, name: &'static str, value: UniformValue) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            UniformValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, UniformValue)> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Points,
    Triangles,
}

/// Shader pair and fixed pipeline state for one layer. The GLSL is an
/// opaque payload as far as the host is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Material {
    pub vertex: &'static str,
    pub fragment: &'static str,
    pub primitive: Primitive,
    pub additive: bool,
}

/// Per-frame values pushed into every generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInputs {
    pub time: f32,
    pub pointer: Vec2,
    /// Drawing-buffer size in device pixels.
    pub resolution: Vec2,
}

pub trait Generator {
    fn material(&self) -> Material;

    /// `x, y, z` triples. The length never changes after construction.
    fn positions(&self) -> &[f32];

    fn uniforms(&self) -> &UniformSet;

    fn update(&mut self, inputs: &FrameInputs);

    /// True once after the host-side positions changed.
    fn take_dirty(&mut self) -> bool {
        false
    }

    fn vertex_count(&self) -> usize {
        self.positions().len() / 3
    }
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn material(&self) -> Material {
        (**self).material()
    }

    fn positions(&self) -> &[f32] {
        (**self).positions()
    }

    fn uniforms(&self) -> &UniformSet {
        (**self).uniforms()
    }

    fn update(&mut self, inputs: &FrameInputs) {
        (**self).update(inputs)
    }

    fn take_dirty(&mut self) -> bool {
        (**self).take_dirty()
    }
}

/// A generator plus its GPU resources.
pub struct GpuLayer<G, L> {
    generator: G,
    handle: Option<L>,
}

impl<G: Generator, L> GpuLayer<G, L> {
    pub fn create<B>(backend: &mut B, mut generator: G) -> FxResult<Self>
    where
        B: RenderBackend<Layer = L>,
    {
        let handle = backend.create_layer(&generator.material(), generator.positions())?;
        generator.take_dirty();
        Ok(Self { generator, handle: Some(handle) })
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut G {
        &mut self.generator
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    pub fn draw<B>(&mut self, backend: &mut B, view_projection: &Mat4) -> FxResult<()>
    where
        B: RenderBackend<Layer = L>,
    {
        let Some(handle) = self.handle.as_ref() else {
            return Ok(());
        };
        if self.generator.take_dirty() {
            backend.upload_positions(handle, self.generator.positions());
        }
        backend.draw(handle, view_projection, self.generator.uniforms(), self.generator.vertex_count())
    }

    /// Frees the buffer and program. Safe to call more than once.
    pub fn dispose<B>(&mut self, backend: &mut B)
    where
        B: RenderBackend<Layer = L>,
    {
        if let Some(handle) = self.handle.take() {
            backend.release_layer(handle);
        }
    }
}

use glam::Mat4;

use crate::config::BufferSize;
use crate::error::FxResult;
use crate::particles::{Material, UniformSet};

/// A live drawing context bound to one canvas.
///
/// Implementations own the canvas they draw into. `release` loses the
/// context and detaches the canvas; nothing may be drawn afterwards.
pub trait RenderBackend {
    /// Program, buffer and vertex state for one layer.
    type Layer;

    fn create_layer(&mut self, material: &Material, positions: &[f32]) -> FxResult<Self::Layer>;

    fn upload_positions(&mut self, layer: &Self::Layer, positions: &[f32]);

    /// Resize the drawing buffer. Repeating the current size is a no-op.
    fn resize(&mut self, size: BufferSize);

    fn size(&self) -> BufferSize;

    /// Clears the frame. Fails if the context has gone away underneath us.
    fn begin_pass(&mut self) -> FxResult<()>;

    fn draw(
        &mut self,
        layer: &Self::Layer,
        view_projection: &Mat4,
        uniforms: &UniformSet,
        vertex_count: usize,
    ) -> FxResult<()>;

    fn release_layer(&mut self, layer: Self::Layer);

    fn release(&mut self);
}

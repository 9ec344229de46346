use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::Mat4;
use log::debug;
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram, WebGlShader,
    WebGlUniformLocation, WebGlVertexArrayObject, WebglLoseContext, Window,
};

use crate::backend::RenderBackend;
use crate::config::BufferSize;
use crate::error::{FxError, FxResult};
use crate::particles::{Material, Primitive, UniformSet, UniformValue};
use crate::schedule::{FrameId, FrameScheduler};

const POSITION_ATTRIBUTE: u32 = 0;

/// Program, vertex array and position buffer for one layer.
pub struct GlLayer {
    program: WebGlProgram,
    vao: WebGlVertexArrayObject,
    buffer: WebGlBuffer,
    mode: u32,
    additive: bool,
    locations: RefCell<HashMap<&'static str, Option<WebGlUniformLocation>>>,
}

impl GlLayer {
    fn location(&self, gl: &GL, name: &'static str) -> Option<WebGlUniformLocation> {
        self.locations
            .borrow_mut()
            .entry(name)
            .or_insert_with(|| gl.get_uniform_location(&self.program, name))
            .clone()
    }
}

/// A WebGL2 context and the canvas it was created on.
pub struct WebGlBackend {
    gl: GL,
    canvas: HtmlCanvasElement,
    size: BufferSize,
    released: bool,
}

impl WebGlBackend {
    pub fn new(gl: GL, canvas: HtmlCanvasElement) -> Self {
        let size = BufferSize { width: canvas.width().max(1), height: canvas.height().max(1) };
        Self { gl, canvas, size, released: false }
    }
}

/// Asks the browser to drop `gl` right away instead of waiting for GC.
pub fn lose_context(gl: &GL) -> bool {
    match gl.get_extension("WEBGL_lose_context") {
        Ok(Some(ext)) => {
            ext.unchecked_into::<WebglLoseContext>().lose_context();
            true
        }
        _ => false,
    }
}

fn compile_shader(gl: &GL, kind: u32, source: &str) -> FxResult<WebGlShader> {
    let shader = gl
        .create_shader(kind)
        .ok_or_else(|| FxError::ShaderCompile("unable to create shader object".into()))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    if gl.get_shader_parameter(&shader, GL::COMPILE_STATUS).as_bool().unwrap_or(false) {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_else(|| "unknown error".into());
        gl.delete_shader(Some(&shader));
        Err(FxError::ShaderCompile(log))
    }
}

fn link_program(gl: &GL, material: &Material) -> FxResult<WebGlProgram> {
    let vertex = compile_shader(gl, GL::VERTEX_SHADER, material.vertex)?;
    let fragment = match compile_shader(gl, GL::FRAGMENT_SHADER, material.fragment) {
        Ok(shader) => shader,
        Err(err) => {
            gl.delete_shader(Some(&vertex));
            return Err(err);
        }
    };
    let program = gl
        .create_program()
        .ok_or_else(|| FxError::ProgramLink("unable to create program object".into()))?;
    gl.attach_shader(&program, &vertex);
    gl.attach_shader(&program, &fragment);
    gl.bind_attrib_location(&program, POSITION_ATTRIBUTE, "a_position");
    gl.link_program(&program);

    // Shaders are no longer needed once linked.
    gl.delete_shader(Some(&vertex));
    gl.delete_shader(Some(&fragment));

    if gl.get_program_parameter(&program, GL::LINK_STATUS).as_bool().unwrap_or(false) {
        Ok(program)
    } else {
        let log = gl.get_program_info_log(&program).unwrap_or_else(|| "unknown error".into());
        gl.delete_program(Some(&program));
        Err(FxError::ProgramLink(log))
    }
}

impl RenderBackend for WebGlBackend {
    type Layer = GlLayer;

    fn create_layer(&mut self, material: &Material, positions: &[f32]) -> FxResult<GlLayer> {
        let gl = &self.gl;
        let program = link_program(gl, material)?;
        let Some(vao) = gl.create_vertex_array() else {
            gl.delete_program(Some(&program));
            return Err(FxError::BufferAllocation("vertex array"));
        };
        let Some(buffer) = gl.create_buffer() else {
            gl.delete_vertex_array(Some(&vao));
            gl.delete_program(Some(&program));
            return Err(FxError::BufferAllocation("position buffer"));
        };

        gl.bind_vertex_array(Some(&vao));
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
        let data = js_sys::Float32Array::from(positions);
        gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &data, GL::DYNAMIC_DRAW);
        gl.enable_vertex_attrib_array(POSITION_ATTRIBUTE);
        gl.vertex_attrib_pointer_with_i32(POSITION_ATTRIBUTE, 3, GL::FLOAT, false, 0, 0);
        gl.bind_vertex_array(None);

        let mode = match material.primitive {
            Primitive::Points => GL::POINTS,
            Primitive::Triangles => GL::TRIANGLES,
        };
        Ok(GlLayer {
            program,
            vao,
            buffer,
            mode,
            additive: material.additive,
            locations: RefCell::new(HashMap::new()),
        })
    }

    fn upload_positions(&mut self, layer: &GlLayer, positions: &[f32]) {
        let data = js_sys::Float32Array::from(positions);
        self.gl.bind_buffer(GL::ARRAY_BUFFER, Some(&layer.buffer));
        self.gl.buffer_sub_data_with_i32_and_array_buffer_view(GL::ARRAY_BUFFER, 0, &data);
    }

    fn resize(&mut self, size: BufferSize) {
        if self.released || size == self.size {
            return;
        }
        self.canvas.set_width(size.width);
        self.canvas.set_height(size.height);
        self.size = size;
    }

    fn size(&self) -> BufferSize {
        self.size
    }

    fn begin_pass(&mut self) -> FxResult<()> {
        if self.released || self.gl.is_context_lost() {
            return Err(FxError::ContextUnavailable);
        }
        let gl = &self.gl;
        gl.viewport(0, 0, self.size.width as i32, self.size.height as i32);
        gl.clear_color(0.0, 0.0, 0.0, 0.0);
        gl.clear(GL::COLOR_BUFFER_BIT | GL::DEPTH_BUFFER_BIT);
        Ok(())
    }

    fn draw(
        &mut self,
        layer: &GlLayer,
        view_projection: &Mat4,
        uniforms: &UniformSet,
        vertex_count: usize,
    ) -> FxResult<()> {
        let gl = &self.gl;
        gl.use_program(Some(&layer.program));

        let matrix = view_projection.to_cols_array();
        gl.uniform_matrix4fv_with_f32_array(layer.location(gl, "u_viewProjection").as_ref(), false, &matrix);
        for (name, value) in uniforms.iter() {
            let location = layer.location(gl, *name);
            match value {
                UniformValue::Float(v) => gl.uniform1f(location.as_ref(), *v),
                UniformValue::Vec2(v) => gl.uniform2f(location.as_ref(), v.x, v.y),
                UniformValue::Vec3(v) => gl.uniform3f(location.as_ref(), v.x, v.y, v.z),
            }
        }

        gl.enable(GL::BLEND);
        if layer.additive {
            gl.blend_func(GL::SRC_ALPHA, GL::ONE);
        } else {
            gl.blend_func(GL::SRC_ALPHA, GL::ONE_MINUS_SRC_ALPHA);
        }
        gl.depth_mask(false);

        gl.bind_vertex_array(Some(&layer.vao));
        gl.draw_arrays(layer.mode, 0, vertex_count as i32);
        gl.bind_vertex_array(None);

        if gl.is_context_lost() {
            return Err(FxError::ContextUnavailable);
        }
        Ok(())
    }

    fn release_layer(&mut self, layer: GlLayer) {
        if self.released {
            return;
        }
        self.gl.delete_buffer(Some(&layer.buffer));
        self.gl.delete_vertex_array(Some(&layer.vao));
        self.gl.delete_program(Some(&layer.program));
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if !lose_context(&self.gl) {
            debug!("WEBGL_lose_context unavailable, leaving context to GC");
        }
        self.canvas.remove();
    }
}

impl Drop for WebGlBackend {
    fn drop(&mut self) {
        self.release();
    }
}

type FrameCallback = Closure<dyn FnMut(f64)>;

/// `requestAnimationFrame` scheduler. Clones share the callback, which the
/// owner installs once and clears on teardown.
#[derive(Clone)]
pub struct RafScheduler {
    window: Window,
    callback: Rc<RefCell<Option<FrameCallback>>>,
}

impl RafScheduler {
    pub fn new(window: Window) -> Self {
        Self { window, callback: Rc::new(RefCell::new(None)) }
    }

    pub fn install(&self, on_frame: impl FnMut(f64) + 'static) {
        *self.callback.borrow_mut() = Some(Closure::wrap(Box::new(on_frame) as Box<dyn FnMut(f64)>));
    }

    /// Drops the callback. Only call this after the loop that uses it was
    /// stopped, and never from inside the callback itself.
    pub fn clear(&self) {
        self.callback.borrow_mut().take();
    }
}

impl FrameScheduler for RafScheduler {
    fn request_frame(&mut self) -> FxResult<FrameId> {
        let callback = self.callback.borrow();
        let callback = callback.as_ref().ok_or_else(|| FxError::Js("no frame callback installed".into()))?;
        Ok(self.window.request_animation_frame(callback.as_ref().unchecked_ref())?)
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if let Err(err) = self.window.cancel_animation_frame(id) {
            debug!("cancelAnimationFrame failed: {err:?}");
        }
    }
}

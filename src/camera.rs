use glam::{Mat4, Vec3};

use crate::config::Viewport;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl PerspectiveCamera {
    /// Phones get a wider lens and a closer camera so the field still fills
    /// a tall screen.
    pub fn for_viewport(viewport: &Viewport) -> Self {
        let (fov_degrees, distance) = if viewport.is_narrow() { (75.0, 25.0) } else { (60.0, 20.0) };
        Self {
            fov_degrees,
            aspect: viewport.aspect(),
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 0.0, distance),
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// Pixel-space camera used by the cursor overlay: one world unit per CSS
/// pixel, origin at the centre of the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicCamera {
    pub half_width: f32,
    pub half_height: f32,
    pub near: f32,
    pub far: f32,
    pub z: f32,
}

impl OrthographicCamera {
    pub fn for_viewport(viewport: &Viewport) -> Self {
        Self {
            half_width: viewport.width as f32 / 2.0,
            half_height: viewport.height as f32 / 2.0,
            near: 1.0,
            far: 1000.0,
            z: 10.0,
        }
    }

    pub fn resize(&mut self, viewport: &Viewport) {
        self.half_width = viewport.width as f32 / 2.0;
        self.half_height = viewport.height as f32 / 2.0;
    }

    /// Window coordinates (y down) to world coordinates (y up).
    pub fn to_world(&self, client_x: f32, client_y: f32) -> Vec3 {
        Vec3::new(client_x - self.half_width, -client_y + self.half_height, 0.0)
    }

    pub fn view_projection(&self) -> Mat4 {
        let projection = Mat4::orthographic_rh_gl(
            -self.half_width,
            self.half_width,
            -self.half_height,
            self.half_height,
            self.near,
            self.far,
        );
        projection * Mat4::from_translation(Vec3::new(0.0, 0.0, -self.z))
    }
}

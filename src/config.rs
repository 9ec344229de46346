//! Viewport-derived settings shared by every layer.
//!
//! The page has no runtime configuration surface: particle counts, camera
//! placement and context attributes all branch on the viewport width.

/// Viewports narrower than this (CSS px) are treated as phones.
pub const NARROW_VIEWPORT: f64 = 768.0;

pub const NARROW_PARTICLES: usize = 500;
pub const WIDE_PARTICLES: usize = 1000;

/// Drawing buffers never exceed this many device pixels per CSS pixel.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Pointer smoothing used by the background scene.
pub const SCENE_POINTER_SMOOTHING: f32 = 0.1;

/// Depth of the cursor trail history.
pub const TRAIL_LENGTH: usize = 50;

/// Brand accent, `#5865F2`.
pub const ACCENT: [f32; 3] = [0.345, 0.396, 0.949];

/// CSS size of the window plus its device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            device_pixel_ratio: if device_pixel_ratio > 0.0 { device_pixel_ratio } else { 1.0 },
        }
    }

    pub fn is_narrow(&self) -> bool {
        self.width < NARROW_VIEWPORT
    }

    pub fn aspect(&self) -> f32 {
        (self.width / self.height) as f32
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio.min(MAX_PIXEL_RATIO)
    }

    /// Drawing-buffer size in device pixels.
    pub fn buffer_size(&self) -> BufferSize {
        BufferSize::scaled(self.width, self.height, self.pixel_ratio())
    }
}

/// Width/height of a drawing buffer in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSize {
    pub width: u32,
    pub height: u32,
}

impl BufferSize {
    pub fn scaled(css_width: f64, css_height: f64, ratio: f64) -> Self {
        Self {
            width: (css_width * ratio).round().max(1.0) as u32,
            height: (css_height * ratio).round().max(1.0) as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Low,
    High,
}

/// Construction options for a background scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneOptions {
    pub particle_count: usize,
    pub quality: Quality,
}

impl SceneOptions {
    pub fn for_viewport(viewport: &Viewport) -> Self {
        if viewport.is_narrow() {
            Self { particle_count: NARROW_PARTICLES, quality: Quality::Low }
        } else {
            Self { particle_count: WIDE_PARTICLES, quality: Quality::High }
        }
    }

    /// The full-screen grid backdrop only runs on the high tier.
    pub fn with_void_grid(&self) -> bool {
        self.quality == Quality::High
    }
}

/// Attributes requested when creating a context. They favour compatibility:
/// software rasterizers are accepted and nothing is preserved between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAttributes {
    pub alpha: bool,
    pub antialias: bool,
    pub fail_if_major_performance_caveat: bool,
    pub preserve_drawing_buffer: bool,
    pub desynchronized: bool,
}

impl ContextAttributes {
    pub fn for_quality(quality: Quality) -> Self {
        Self {
            alpha: true,
            antialias: quality == Quality::High,
            fail_if_major_performance_caveat: false,
            preserve_drawing_buffer: false,
            desynchronized: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_viewport_gets_low_tier() {
        let phone = Viewport::new(390.0, 844.0, 3.0);
        let opts = SceneOptions::for_viewport(&phone);
        assert_eq!(opts.particle_count, NARROW_PARTICLES);
        assert_eq!(opts.quality, Quality::Low);
        assert!(!opts.with_void_grid());

        let desktop = Viewport::new(1440.0, 900.0, 1.0);
        let opts = SceneOptions::for_viewport(&desktop);
        assert_eq!(opts.particle_count, WIDE_PARTICLES);
        assert!(opts.with_void_grid());
    }

    #[test]
    fn buffer_size_clamps_pixel_ratio() {
        let vp = Viewport::new(400.0, 300.0, 3.0);
        assert_eq!(vp.buffer_size(), BufferSize { width: 800, height: 600 });
        let vp = Viewport::new(400.0, 300.0, 0.0);
        assert_eq!(vp.buffer_size(), BufferSize { width: 400, height: 300 });
    }

    #[test]
    fn attributes_never_fail_on_caveat() {
        let attrs = ContextAttributes::for_quality(Quality::Low);
        assert!(!attrs.antialias);
        assert!(!attrs.fail_if_major_performance_caveat);
        assert!(ContextAttributes::for_quality(Quality::High).antialias);
    }
}

use glam::Vec2;

use crate::config::{Viewport, SCENE_POINTER_SMOOTHING};

/// Map window coordinates to normalized device coordinates, y up.
pub fn normalize(client_x: f64, client_y: f64, viewport: &Viewport) -> Vec2 {
    let x = (client_x / viewport.width) * 2.0 - 1.0;
    let y = -(client_y / viewport.height) * 2.0 + 1.0;
    Vec2::new(x as f32, y as f32).clamp(Vec2::NEG_ONE, Vec2::ONE)
}

/// Raw pointer target plus a smoothed position that chases it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerState {
    smoothed: Vec2,
    target: Vec2,
    factor: f32,
}

impl Default for PointerState {
    fn default() -> Self {
        Self::with_factor(SCENE_POINTER_SMOOTHING)
    }
}

impl PointerState {
    pub fn with_factor(factor: f32) -> Self {
        Self {
            smoothed: Vec2::ZERO,
            target: Vec2::ZERO,
            factor: factor.clamp(0.0, 1.0),
        }
    }

    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
    }

    /// One exponential step toward the target.
    pub fn step(&mut self) -> Vec2 {
        self.smoothed = self.smoothed.lerp(self.target, self.factor);
        self.smoothed
    }

    pub fn smoothed(&self) -> Vec2 {
        self.smoothed
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }
}

/// Follows the pointer in CSS pixels for the DOM cursor. Unlike
/// [`PointerState`] it snaps onto the target once closer than `SNAP_DISTANCE`
/// so the element stops moving instead of creeping forever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorFollower {
    position: Vec2,
    target: Vec2,
}

impl CursorFollower {
    pub const FACTOR: f32 = 0.15;
    pub const SNAP_DISTANCE: f32 = 0.1;

    pub fn new() -> Self {
        Self::at(Vec2::ZERO)
    }

    /// A follower resting at `position`.
    pub fn at(position: Vec2) -> Self {
        Self { position, target: position }
    }

    /// Jumps to `position` and stops there until the next target.
    pub fn reset(&mut self, position: Vec2) {
        *self = Self::at(position);
    }

    pub fn set_target(&mut self, x: f32, y: f32) {
        self.target = Vec2::new(x, y);
    }

    pub fn step(&mut self) -> Vec2 {
        self.position = Vec2::new(
            snap_lerp(self.position.x, self.target.x),
            snap_lerp(self.position.y, self.target.y),
        );
        self.position
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }
}

impl Default for CursorFollower {
    fn default() -> Self {
        Self::new()
    }
}

fn snap_lerp(from: f32, to: f32) -> f32 {
    let diff = to - from;
    if diff.abs() < CursorFollower::SNAP_DISTANCE {
        to
    } else {
        from + diff * CursorFollower::FACTOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothing_follows_closed_form() {
        let mut p = PointerState::with_factor(0.2);
        p.set_target(Vec2::new(100.0, 0.0));
        let mut last = 0.0;
        for k in 1..=20 {
            let x = p.step().x;
            let expected = 100.0 * (1.0 - 0.8f32.powi(k));
            assert!((x - expected).abs() < 1e-3, "frame {k}: {x} vs {expected}");
            assert!(x > last);
            last = x;
        }
        assert!(p.smoothed().x > 98.0);
        assert_eq!(p.smoothed().y, 0.0);
    }

    #[test]
    fn scene_smoothing_converges_when_idle() {
        let mut p = PointerState::default();
        p.set_target(Vec2::new(-0.5, 0.75));
        for _ in 0..50 {
            p.step();
        }
        assert!(p.smoothed().distance(p.target()) < 0.1);
    }

    #[test]
    fn normalize_maps_corners() {
        let vp = Viewport::new(800.0, 600.0, 1.0);
        assert_eq!(normalize(0.0, 0.0, &vp), Vec2::new(-1.0, 1.0));
        assert_eq!(normalize(800.0, 600.0, &vp), Vec2::new(1.0, -1.0));
        assert_eq!(normalize(400.0, 300.0, &vp), Vec2::ZERO);
        assert_eq!(normalize(1600.0, -50.0, &vp), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn follower_snaps_when_close() {
        let mut c = CursorFollower::new();
        c.set_target(10.0, 0.0);
        for _ in 0..200 {
            c.step();
        }
        assert_eq!(c.position(), Vec2::new(10.0, 0.0));
    }

    #[test]
    fn reset_follower_stays_put() {
        let mut c = CursorFollower::at(Vec2::new(5.0, 5.0));
        assert_eq!(c.step(), Vec2::new(5.0, 5.0));
        c.set_target(100.0, 100.0);
        c.step();
        c.reset(Vec2::new(40.0, 30.0));
        assert_eq!(c.step(), Vec2::new(40.0, 30.0));
    }
}

//! Countdown splash shown before the site.
//!
//! Driven entirely by caller-supplied timestamps so it can be stepped from
//! the frame loop and tested without a clock.

use glam::Vec2;
use log::debug;

use crate::pointer::PointerState;

pub const IDLE_MESSAGE: &str = "INITIALIZE JB-VO INTERFACE";
pub const BREACH_MESSAGE: &str = "JB-VO SYSTEM BREACH INITIATED...";

const START_COUNT: u32 = 3;
const STEP_MS: f64 = 1000.0;
const DIGIT_FADE_MS: f64 = 500.0;
const FLASH_MS: f64 = 1500.0;
const FADE_OUT_MS: f64 = 1000.0;
const PARALLAX_EASING: f32 = 0.05;
const PARALLAX_RANGE: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroPhase {
    Interaction,
    Countdown,
    Transition,
    Complete,
}

pub struct IntroSequence {
    phase: IntroPhase,
    activated_at: Option<f64>,
    countdown: u32,
    digit_opacity: f32,
    opacity: f32,
    flashing: bool,
    frames: u64,
    parallax: PointerState,
    on_complete: Option<Box<dyn FnOnce()>>,
}

impl IntroSequence {
    pub fn new(on_complete: impl FnOnce() + 'static) -> Self {
        Self {
            phase: IntroPhase::Interaction,
            activated_at: None,
            countdown: START_COUNT,
            digit_opacity: 1.0,
            opacity: 1.0,
            flashing: false,
            frames: 0,
            parallax: PointerState::with_factor(PARALLAX_EASING),
            on_complete: Some(Box::new(on_complete)),
        }
    }

    pub fn phase(&self) -> IntroPhase {
        self.phase
    }

    pub fn message(&self) -> &'static str {
        match self.phase {
            IntroPhase::Interaction => IDLE_MESSAGE,
            _ => BREACH_MESSAGE,
        }
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn digit_opacity(&self) -> f32 {
        self.digit_opacity
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn is_flashing(&self) -> bool {
        self.flashing
    }

    /// The click that starts the countdown. Ignored outside the idle phase.
    pub fn activate(&mut self, now_ms: f64) -> bool {
        if self.phase != IntroPhase::Interaction {
            return false;
        }
        self.phase = IntroPhase::Countdown;
        self.activated_at = Some(now_ms);
        debug!("intro countdown started");
        true
    }

    pub fn pointer(&mut self, ndc: Vec2) {
        self.parallax.set_target(ndc);
    }

    /// Camera offset for the portal scene, eased toward the pointer.
    pub fn camera_offset(&self) -> Vec2 {
        self.parallax.smoothed() * PARALLAX_RANGE
    }

    /// Breathing scale of the portal ring.
    pub fn portal_scale(&self) -> f32 {
        let time = self.frames as f32 * 0.01;
        1.0 + (time * 2.0).sin() * 0.1
    }

    /// Steps the sequence to `now_ms`.
    pub fn advance(&mut self, now_ms: f64) -> IntroPhase {
        self.frames += 1;
        self.parallax.step();

        let Some(start) = self.activated_at else {
            return self.phase;
        };
        let elapsed = (now_ms - start).max(0.0);
        let countdown_end = STEP_MS * START_COUNT as f64;

        if elapsed < countdown_end {
            let steps = (elapsed / STEP_MS).floor();
            let into_step = elapsed - steps * STEP_MS;
            let shown = ((elapsed - DIGIT_FADE_MS) / STEP_MS).floor().max(0.0) as u32;
            self.countdown = START_COUNT - shown.min(START_COUNT);
            self.digit_opacity = if steps >= 1.0 && into_step < DIGIT_FADE_MS { 0.0 } else { 1.0 };
            return self.phase;
        }

        if self.phase == IntroPhase::Countdown {
            self.phase = IntroPhase::Transition;
            self.countdown = 0;
            self.flashing = true;
            debug!("intro countdown reached zero");
        }
        let after = elapsed - countdown_end;
        if after >= FLASH_MS {
            self.opacity = 0.0;
        }
        if after >= FLASH_MS + FADE_OUT_MS && self.phase != IntroPhase::Complete {
            self.phase = IntroPhase::Complete;
            if let Some(done) = self.on_complete.take() {
                done();
            }
        }
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn sequence() -> (IntroSequence, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        (IntroSequence::new(move || c.set(c.get() + 1)), calls)
    }

    #[test]
    fn waits_for_click() {
        let (mut intro, calls) = sequence();
        assert_eq!(intro.advance(10_000.0), IntroPhase::Interaction);
        assert_eq!(intro.message(), IDLE_MESSAGE);
        assert_eq!(intro.countdown(), 3);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn counts_down_then_completes_once() {
        let (mut intro, calls) = sequence();
        assert!(intro.activate(1000.0));
        assert!(!intro.activate(1100.0));
        assert_eq!(intro.message(), BREACH_MESSAGE);

        intro.advance(1200.0);
        assert_eq!((intro.countdown(), intro.digit_opacity()), (3, 1.0));
        intro.advance(2200.0);
        assert_eq!((intro.countdown(), intro.digit_opacity()), (3, 0.0));
        intro.advance(2600.0);
        assert_eq!((intro.countdown(), intro.digit_opacity()), (2, 1.0));
        intro.advance(3600.0);
        assert_eq!((intro.countdown(), intro.digit_opacity()), (1, 1.0));

        assert_eq!(intro.advance(4000.0), IntroPhase::Transition);
        assert!(intro.is_flashing());
        assert_eq!(intro.countdown(), 0);
        assert_eq!(intro.opacity(), 1.0);

        intro.advance(5500.0);
        assert_eq!(intro.opacity(), 0.0);
        assert_eq!(intro.phase(), IntroPhase::Transition);

        assert_eq!(intro.advance(6500.0), IntroPhase::Complete);
        intro.advance(9000.0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn camera_eases_toward_pointer() {
        let (mut intro, _) = sequence();
        intro.pointer(Vec2::new(1.0, -1.0));
        intro.advance(0.0);
        let first = intro.camera_offset();
        assert!((first.x - 0.5).abs() < 1e-5);
        for i in 0..200 {
            intro.advance(i as f64);
        }
        assert!((intro.camera_offset() - Vec2::new(10.0, -10.0)).length() < 0.01);
        assert!((0.9..=1.1).contains(&intro.portal_scale()));
    }
}

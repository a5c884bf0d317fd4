#![forbid(unsafe_code)]

//! Damped harmonic oscillator for the settle half of lift-and-settle.
//!
//!   F = -STIFFNESS × (position - target) - DAMPING × velocity
//!
//! A card dropped back into its slot should come to rest rather than stop
//! dead. The tuning sits just under critical damping.
//!
//! # Invariants
//!
//! 1. `value()` is the position clamped to `[0, 1]`; `position()` is raw.
//! 2. A spring at rest stays at rest until `reset()`.
//!
//! # Failure Modes
//!
//! - Large `dt` is subdivided into 4ms integration steps.

use std::time::Duration;

use super::Animation;

const STIFFNESS: f64 = 400.0;
const DAMPING: f64 = 38.0;
const MAX_STEP_SECS: f64 = 0.004;
const REST_THRESHOLD: f64 = 0.001;
const VELOCITY_THRESHOLD: f64 = 0.01;

/// A damped spring moving from an initial position toward a target.
#[derive(Debug, Clone)]
pub struct Spring {
    position: f64,
    velocity: f64,
    target: f64,
    initial: f64,
    at_rest: bool,
}

impl Spring {
    #[must_use]
    pub fn new(initial: f64, target: f64) -> Self {
        Self {
            position: initial,
            velocity: 0.0,
            target,
            initial,
            at_rest: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> f64 {
        self.position
    }

    // Semi-implicit Euler.
    fn step(&mut self, dt: f64) {
        let acceleration = -STIFFNESS * (self.position - self.target) - DAMPING * self.velocity;
        self.velocity += acceleration * dt;
        self.position += self.velocity * dt;
    }
}

impl Animation for Spring {
    fn tick(&mut self, dt: Duration) {
        if self.at_rest {
            return;
        }
        let mut remaining = dt.as_secs_f64();
        while remaining > 0.0 {
            let step = remaining.min(MAX_STEP_SECS);
            self.step(step);
            remaining -= step;
        }
        if (self.position - self.target).abs() < REST_THRESHOLD
            && self.velocity.abs() < VELOCITY_THRESHOLD
        {
            self.position = self.target;
            self.velocity = 0.0;
            self.at_rest = true;
        }
    }

    fn is_complete(&self) -> bool {
        self.at_rest
    }

    fn value(&self) -> f32 {
        (self.position as f32).clamp(0.0, 1.0)
    }

    fn reset(&mut self) {
        self.position = self.initial;
        self.velocity = 0.0;
        self.at_rest = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_16: Duration = Duration::from_millis(16);

    fn simulate(spring: &mut Spring, frames: usize) {
        for _ in 0..frames {
            spring.tick(MS_16);
        }
    }

    #[test]
    fn settles_at_target() {
        let mut spring = Spring::new(1.0, 0.0);
        simulate(&mut spring, 200);
        assert!(spring.is_complete());
        assert_eq!(spring.position(), 0.0);
        assert_eq!(spring.value(), 0.0);
    }

    #[test]
    fn settle_barely_overshoots() {
        let mut spring = Spring::new(1.0, 0.0);
        let mut min_pos = 1.0_f64;
        for _ in 0..120 {
            spring.tick(MS_16);
            min_pos = min_pos.min(spring.position());
        }
        assert!(min_pos > -0.01, "overshoot {min_pos}");
        assert!(spring.is_complete());
    }

    #[test]
    fn one_large_tick_matches_many_small_ones() {
        let mut coarse = Spring::new(1.0, 0.0);
        let mut fine = Spring::new(1.0, 0.0);
        coarse.tick(Duration::from_millis(80));
        simulate(&mut fine, 5);
        assert!((coarse.position() - fine.position()).abs() < 1e-6);
    }

    #[test]
    fn rest_is_sticky_until_reset() {
        let mut spring = Spring::new(1.0, 0.0);
        simulate(&mut spring, 300);
        assert!(spring.is_complete());
        spring.tick(Duration::from_secs(1));
        assert_eq!(spring.position(), 0.0);
        spring.reset();
        assert!(!spring.is_complete());
        assert_eq!(spring.position(), 1.0);
    }
}

#![forbid(unsafe_code)]

//! Tickable animation values.
//!
//! Every animation is an explicit state machine advanced by
//! [`Animation::tick`]. Nothing here owns a clock or a timer: the host drives
//! time, which keeps playback deterministic under test and lets the scheduler
//! cancel an animation by simply dropping it.
//!
//! - [`Fade`]: eased 0→1 progress over a fixed duration.
//! - [`Delayed`]: hold at the start value for an offset, then run.
//! - [`Sequence`]: run one animation, then another.
//! - [`Timeline`](timeline::Timeline): labeled events at offsets, looping.
//! - [`Spring`](spring::Spring): damped settle.
//! - [`primitives`]: the card effects built from the above.

pub mod primitives;
pub mod spring;
pub mod timeline;

use std::time::Duration;

pub use primitives::{
    Anchors, ArcMove, Artifact, FaceShown, Flip, GlowLoop, LiftSettle, MissingAnchor, Primitive,
    PrimitiveKind, PrimitiveSpec, Pulse, Sample, Shake,
};
pub use spring::Spring;
pub use timeline::{LoopCount, Timeline};

/// A value that evolves as time is fed into it.
pub trait Animation {
    /// Advance by `dt`.
    fn tick(&mut self, dt: Duration);

    /// Whether the animation has reached its end state.
    fn is_complete(&self) -> bool;

    /// Current value, nominally in `[0, 1]`.
    fn value(&self) -> f32;

    /// Return to the initial state.
    fn reset(&mut self);

    /// Time fed past completion on the tick that finished the animation.
    fn overshoot(&self) -> Duration {
        Duration::ZERO
    }
}

/// An easing curve over normalized time.
pub type EasingFn = fn(f32) -> f32;

pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

pub fn ease_in(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

pub fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

// ---------------------------------------------------------------------------
// Fade
// ---------------------------------------------------------------------------

/// Eased progress from 0.0 to 1.0 over `duration`.
#[derive(Debug, Clone, Copy)]
pub struct Fade {
    elapsed: Duration,
    duration: Duration,
    easing: EasingFn,
}

impl Fade {
    /// A linear fade. A zero duration completes on the first tick.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            elapsed: Duration::ZERO,
            duration,
            easing: linear,
        }
    }

    #[must_use]
    pub fn easing(mut self, easing: EasingFn) -> Self {
        self.easing = easing;
        self
    }

    #[inline]
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Un-eased progress.
    #[must_use]
    pub fn raw_progress(&self) -> f32 {
        if self.duration.is_zero() {
            return if self.elapsed.is_zero() { 0.0 } else { 1.0 };
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0) as f32
    }
}

impl Animation for Fade {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
        if self.duration.is_zero() && self.elapsed.is_zero() {
            self.elapsed = Duration::from_nanos(1);
        }
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.duration && !(self.duration.is_zero() && self.elapsed.is_zero())
    }

    fn value(&self) -> f32 {
        (self.easing)(self.raw_progress())
    }

    fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    fn overshoot(&self) -> Duration {
        self.elapsed.saturating_sub(self.duration)
    }
}

// ---------------------------------------------------------------------------
// Delayed
// ---------------------------------------------------------------------------

/// Holds `inner` at its start value for `delay`, then runs it.
#[derive(Debug, Clone)]
pub struct Delayed<A> {
    delay: Duration,
    waited: Duration,
    inner: A,
}

/// Start `animation` after `delay`.
pub fn delay<A: Animation>(delay: Duration, animation: A) -> Delayed<A> {
    Delayed {
        delay,
        waited: Duration::ZERO,
        inner: animation,
    }
}

impl<A> Delayed<A> {
    /// Whether the delay has elapsed.
    #[inline]
    #[must_use]
    pub fn has_started(&self) -> bool {
        self.waited >= self.delay
    }

    #[must_use]
    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: Animation> Animation for Delayed<A> {
    fn tick(&mut self, dt: Duration) {
        if self.has_started() {
            self.inner.tick(dt);
            return;
        }
        let remaining = self.delay.saturating_sub(self.waited);
        self.waited = self.waited.saturating_add(dt);
        if dt > remaining {
            self.inner.tick(dt - remaining);
        }
    }

    fn is_complete(&self) -> bool {
        self.has_started() && self.inner.is_complete()
    }

    fn value(&self) -> f32 {
        self.inner.value()
    }

    fn reset(&mut self) {
        self.waited = Duration::ZERO;
        self.inner.reset();
    }

    fn overshoot(&self) -> Duration {
        self.inner.overshoot()
    }
}

// ---------------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------------

/// Runs `first` to completion, then `second`. Overshoot carries across.
#[derive(Debug, Clone)]
pub struct Sequence<A, B> {
    first: A,
    second: B,
}

pub fn sequence<A: Animation, B: Animation>(first: A, second: B) -> Sequence<A, B> {
    Sequence { first, second }
}

impl<A: Animation, B: Animation> Sequence<A, B> {
    /// Whether playback has moved on to `second`.
    #[must_use]
    pub fn in_second(&self) -> bool {
        self.first.is_complete()
    }

    #[must_use]
    pub fn first(&self) -> &A {
        &self.first
    }

    #[must_use]
    pub fn second(&self) -> &B {
        &self.second
    }
}

impl<A: Animation, B: Animation> Animation for Sequence<A, B> {
    fn tick(&mut self, dt: Duration) {
        if self.first.is_complete() {
            self.second.tick(dt);
            return;
        }
        self.first.tick(dt);
        if self.first.is_complete() {
            let carry = self.first.overshoot();
            if !carry.is_zero() {
                self.second.tick(carry);
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.first.is_complete() && self.second.is_complete()
    }

    fn value(&self) -> f32 {
        if self.first.is_complete() {
            self.second.value()
        } else {
            self.first.value()
        }
    }

    fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
    }

    fn overshoot(&self) -> Duration {
        self.second.overshoot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_100: Duration = Duration::from_millis(100);

    #[test]
    fn fade_progresses_linearly() {
        let mut fade = Fade::new(Duration::from_millis(200));
        fade.tick(MS_100);
        assert!((fade.value() - 0.5).abs() < 1e-4);
        assert!(!fade.is_complete());
        fade.tick(Duration::from_millis(150));
        assert!(fade.is_complete());
        assert_eq!(fade.overshoot(), Duration::from_millis(50));
        fade.reset();
        assert_eq!(fade.value(), 0.0);
    }

    #[test]
    fn zero_length_fade_needs_one_tick() {
        let mut fade = Fade::new(Duration::ZERO);
        assert!(!fade.is_complete());
        fade.tick(Duration::ZERO);
        assert!(fade.is_complete());
        assert_eq!(fade.value(), 1.0);
    }

    #[test]
    fn delayed_holds_then_runs() {
        let mut d = delay(MS_100, Fade::new(MS_100));
        d.tick(Duration::from_millis(50));
        assert!(!d.has_started());
        assert_eq!(d.value(), 0.0);
        d.tick(Duration::from_millis(100));
        assert!(d.has_started());
        assert!((d.value() - 0.5).abs() < 1e-4);
        d.tick(MS_100);
        assert!(d.is_complete());
    }

    #[test]
    fn sequence_carries_overshoot() {
        let mut s = sequence(Fade::new(MS_100), Fade::new(MS_100));
        s.tick(Duration::from_millis(150));
        assert!(s.in_second());
        assert!((s.value() - 0.5).abs() < 1e-4);
        s.tick(Duration::from_millis(50));
        assert!(s.is_complete());
    }

    #[test]
    fn easings_hit_endpoints() {
        for f in [linear, ease_in, ease_out, ease_in_out, ease_out_cubic] {
            assert!(f(0.0).abs() < 1e-6);
            assert!((f(1.0) - 1.0).abs() < 1e-6);
            assert!((f(2.0) - 1.0).abs() < 1e-6);
        }
    }
}

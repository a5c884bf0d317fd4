#![forbid(unsafe_code)]

//! Timeline: several animations at fixed offsets, optionally looped.
//!
//! Card effects with distinct phases (a flip folds then unfolds; a glow
//! brightens then dims) are timelines of labeled [`Fade`](super::Fade)
//! events. The timeline's own [`Animation::value`] is overall progress.
//!
//! # Invariants
//!
//! 1. Events are sorted by offset; equal offsets keep insertion order.
//! 2. `tick()` only advances a timeline after `play()`.
//! 3. A looped timeline finishes after `1 + n` plays for `LoopCount::Times(n)`.
//!
//! # Failure Modes
//!
//! - Zero duration is clamped to 1ns.
//! - An empty timeline reports progress 1.0.

use std::time::Duration;

use super::Animation;

/// How many times to repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    Once,
    /// Total plays = n + 1.
    Times(u32),
}

impl LoopCount {
    fn repeats(self) -> u32 {
        match self {
            LoopCount::Once => 0,
            LoopCount::Times(n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaybackState {
    Idle,
    Playing,
    Finished,
}

struct TimelineEvent {
    offset: Duration,
    animation: Box<dyn Animation>,
    label: Option<&'static str>,
}

impl std::fmt::Debug for TimelineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineEvent")
            .field("offset", &self.offset)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Animations scheduled at offsets within a fixed window.
pub struct Timeline {
    events: Vec<TimelineEvent>,
    total_duration: Duration,
    duration_explicit: bool,
    loop_count: LoopCount,
    loops_remaining: u32,
    state: PlaybackState,
    current_time: Duration,
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("event_count", &self.events.len())
            .field("total_duration", &self.total_duration)
            .field("loop_count", &self.loop_count)
            .field("state", &self.state)
            .field("current_time", &self.current_time)
            .finish()
    }
}

impl Timeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            total_duration: Duration::from_nanos(1),
            duration_explicit: false,
            loop_count: LoopCount::Once,
            loops_remaining: 0,
            state: PlaybackState::Idle,
            current_time: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn add_labeled(
        mut self,
        label: &'static str,
        offset: Duration,
        animation: impl Animation + 'static,
    ) -> Self {
        self.push_event(offset, Box::new(animation), Some(label));
        self
    }

    /// Set the window explicitly. Without it the window ends at the last
    /// event's offset, which is rarely what a caller wants.
    #[must_use]
    pub fn set_duration(mut self, d: Duration) -> Self {
        self.total_duration = d.max(Duration::from_nanos(1));
        self.duration_explicit = true;
        self
    }

    #[must_use]
    pub fn set_loop_count(mut self, count: LoopCount) -> Self {
        self.loop_count = count;
        self.loops_remaining = count.repeats();
        self
    }

    fn push_event(
        &mut self,
        offset: Duration,
        animation: Box<dyn Animation>,
        label: Option<&'static str>,
    ) {
        let pos = self.events.partition_point(|e| e.offset <= offset);
        self.events.insert(
            pos,
            TimelineEvent {
                offset,
                animation,
                label,
            },
        );
        if !self.duration_explicit {
            self.total_duration = self
                .events
                .last()
                .map_or(Duration::from_nanos(1), |e| e.offset.max(Duration::from_nanos(1)));
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    /// Start (or restart) from the beginning.
    pub fn play(&mut self) {
        self.reset();
        self.state = PlaybackState::Playing;
    }

    /// Progress of the current play in `[0, 1]`.
    fn progress(&self) -> f32 {
        if self.events.is_empty() {
            return 1.0;
        }
        let t = self.current_time.as_secs_f64() / self.total_duration.as_secs_f64();
        (t as f32).clamp(0.0, 1.0)
    }

    /// Value of the first event with `label`.
    #[must_use]
    pub fn event_value(&self, label: &str) -> Option<f32> {
        self.event(label).map(|e| e.animation.value())
    }

    /// Whether the event with `label` has started in the current play.
    #[must_use]
    pub fn event_started(&self, label: &str) -> bool {
        self.event(label)
            .is_some_and(|e| self.current_time > e.offset || e.animation.is_complete())
    }

    fn event(&self, label: &str) -> Option<&TimelineEvent> {
        self.events.iter().find(|e| e.label == Some(label))
    }
}

impl Animation for Timeline {
    fn tick(&mut self, dt: Duration) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let new_time = self.current_time.saturating_add(dt);
        for event in &mut self.events {
            if new_time > event.offset && !event.animation.is_complete() {
                if self.current_time >= event.offset {
                    event.animation.tick(dt);
                } else {
                    event.animation.tick(new_time - event.offset);
                }
            }
        }
        self.current_time = new_time;

        if self.current_time < self.total_duration {
            return;
        }
        if self.loops_remaining == 0 {
            self.state = PlaybackState::Finished;
            return;
        }
        self.loops_remaining -= 1;
        let carry = self.current_time - self.total_duration;
        self.current_time = Duration::ZERO;
        for event in &mut self.events {
            event.animation.reset();
        }
        if !carry.is_zero() {
            self.tick(carry);
        }
    }

    fn is_complete(&self) -> bool {
        self.state == PlaybackState::Finished
    }

    fn value(&self) -> f32 {
        self.progress()
    }

    fn reset(&mut self) {
        self.current_time = Duration::ZERO;
        self.loops_remaining = self.loop_count.repeats();
        self.state = PlaybackState::Idle;
        for event in &mut self.events {
            event.animation.reset();
        }
    }

    fn overshoot(&self) -> Duration {
        if self.state == PlaybackState::Finished {
            self.current_time.saturating_sub(self.total_duration)
        } else {
            Duration::ZERO
        }
    }
}

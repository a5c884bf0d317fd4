#![forbid(unsafe_code)]

//! Per-subject serialization of card effects.
//!
//! A [`Directive`] names a primitive, the subjects it touches, who caused it
//! and the accepted-snapshot sequence it was derived from. The scheduler
//! starts a directive only when every subject it names is unlocked **and** no
//! earlier queued directive is waiting on one of them, so effects on the same
//! subject play strictly in submission order while unrelated subjects animate
//! concurrently.
//!
//! # Outcomes
//!
//! Every directive ends in exactly one [`Completion`]:
//!
//! | Outcome | When |
//! |---------|------|
//! | `Finished` | the primitive ran to its end |
//! | `Dropped` | a remote directive became eligible after a newer snapshot was accepted |
//! | `Failed` | an anchor could not be resolved; completes immediately |
//! | `Cancelled` | [`AnimationScheduler::cancel_all`] |
//!
//! Nothing here gates state application. The controller asks
//! [`AnimationScheduler::is_locked`] before accepting a snapshot and looks at
//! completions to know when a buffered snapshot may go through.

use std::collections::VecDeque;
use std::fmt;

use ahash::{AHashMap, AHashSet};
use fairway_core::animation::{Anchors, Animation, Artifact, Delayed, Primitive, PrimitiveSpec, delay};
use fairway_core::subject::SubjectKey;
use tracing::{debug, debug_span, trace};
use web_time::Duration;

use crate::cancellation::{CancellationScope, CancellationToken};

/// Identifies one scheduled directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimationHandle(pub u64);

impl fmt::Display for AnimationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anim#{}", self.0)
    }
}

/// Who caused an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// The local player's optimistic action.
    Local,
    /// Inferred from an authoritative snapshot.
    Remote,
}

/// An effect to schedule.
#[derive(Debug, Clone)]
pub struct Directive {
    pub spec: PrimitiveSpec,
    pub origin: Origin,
    /// Wait before the effect starts, once its subjects are free.
    pub delay: Duration,
    /// Accepted-snapshot sequence this was derived from.
    pub seq: u64,
}

impl Directive {
    pub fn local(spec: PrimitiveSpec, seq: u64) -> Self {
        Self {
            spec,
            origin: Origin::Local,
            delay: Duration::ZERO,
            seq,
        }
    }

    pub fn remote(spec: PrimitiveSpec, seq: u64) -> Self {
        Self {
            origin: Origin::Remote,
            ..Self::local(spec, seq)
        }
    }

    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// How a directive ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Finished,
    Dropped,
    Failed,
    Cancelled,
}

/// Report for one ended directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub handle: AnimationHandle,
    pub origin: Origin,
    pub outcome: Outcome,
    /// Subjects the directive named (now unlocked).
    pub subjects: Vec<SubjectKey>,
}

#[derive(Debug)]
struct Queued {
    handle: AnimationHandle,
    directive: Directive,
    token: CancellationToken,
}

#[derive(Debug)]
struct Running {
    handle: AnimationHandle,
    origin: Origin,
    subjects: Vec<SubjectKey>,
    animation: Delayed<Box<dyn Primitive>>,
}

/// Drives primitives under per-subject locks.
#[derive(Debug, Default)]
pub struct AnimationScheduler {
    next_handle: u64,
    queue: VecDeque<Queued>,
    running: Vec<Running>,
    locks: AHashMap<SubjectKey, AnimationHandle>,
    latest_seq: u64,
    scope: CancellationScope,
    completions: Vec<Completion>,
    started: u64,
}

impl AnimationScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `directive` and start whatever is eligible.
    ///
    /// Directives that fail or drop right away report through the next
    /// [`tick`](Self::tick) or [`drain_completions`](Self::drain_completions).
    pub fn run(&mut self, directive: Directive, anchors: &dyn Anchors) -> AnimationHandle {
        self.next_handle += 1;
        let handle = AnimationHandle(self.next_handle);
        trace!(
            target: "fairway.scheduler",
            handle = %handle,
            kind = %directive.spec.kind,
            origin = ?directive.origin,
            seq = directive.seq,
            "queued"
        );
        self.queue.push_back(Queued {
            handle,
            directive,
            token: self.scope.token(),
        });
        self.pump(anchors);
        handle
    }

    /// Advance running effects by `dt`, unlock the finished ones, start newly
    /// eligible ones, and return everything that ended since the last call.
    pub fn tick(&mut self, dt: Duration, anchors: &dyn Anchors) -> Vec<Completion> {
        for running in &mut self.running {
            running.animation.tick(dt);
        }
        let mut index = 0;
        while index < self.running.len() {
            if self.running[index].animation.is_complete() {
                let done = self.running.swap_remove(index);
                self.release(&done.subjects, done.handle);
                trace!(target: "fairway.scheduler", handle = %done.handle, "finished");
                self.completions.push(Completion {
                    handle: done.handle,
                    origin: done.origin,
                    outcome: Outcome::Finished,
                    subjects: done.subjects,
                });
            } else {
                index += 1;
            }
        }
        self.pump(anchors);
        self.drain_completions()
    }

    /// Record the newest accepted snapshot sequence. Queued remote
    /// directives derived from older snapshots drop when they become
    /// eligible.
    pub fn set_accepted_seq(&mut self, seq: u64) {
        self.latest_seq = self.latest_seq.max(seq);
    }

    #[must_use]
    pub fn accepted_seq(&self) -> u64 {
        self.latest_seq
    }

    /// Cancel everything: every queued and running directive reports
    /// `Cancelled`, every lock is released. Calling it again reports nothing.
    pub fn cancel_all(&mut self) -> Vec<Completion> {
        let epoch = self.scope.cancel_all();
        let mut out = self.drain_completions();
        let queued = self.queue.len();
        let running = self.running.len();
        out.extend(self.queue.drain(..).map(|q| Completion {
            handle: q.handle,
            origin: q.directive.origin,
            outcome: Outcome::Cancelled,
            subjects: q.directive.spec.subjects().cloned().collect(),
        }));
        out.extend(self.running.drain(..).map(|r| Completion {
            handle: r.handle,
            origin: r.origin,
            outcome: Outcome::Cancelled,
            subjects: r.subjects,
        }));
        self.locks.clear();
        if queued + running > 0 {
            debug!(target: "fairway.scheduler", epoch, queued, running, "cancelled all");
        }
        out
    }

    /// Sample every started effect for drawing.
    #[must_use]
    pub fn artifacts(&self) -> Vec<Artifact> {
        let mut artifacts: Vec<Artifact> = self
            .running
            .iter()
            .filter(|r| r.animation.has_started())
            .map(|r| Artifact {
                id: r.handle.0,
                subjects: r.subjects.clone(),
                sample: r.animation.inner().sample(),
            })
            .collect();
        artifacts.sort_by_key(|a| a.id);
        artifacts
    }

    #[must_use]
    pub fn is_locked(&self, subject: &SubjectKey) -> bool {
        self.locks.contains_key(subject)
    }

    /// Currently locked subjects.
    pub fn locks(&self) -> impl Iterator<Item = &SubjectKey> + '_ {
        self.locks.keys()
    }

    /// The directive holding `subject`, if any.
    #[must_use]
    pub fn holder(&self, subject: &SubjectKey) -> Option<AnimationHandle> {
        self.locks.get(subject).copied()
    }

    /// Nothing queued or running.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.running.is_empty()
    }

    /// Whether any queued or running directive came from `origin`.
    #[must_use]
    pub fn has_active(&self, origin: Origin) -> bool {
        self.running.iter().any(|r| r.origin == origin)
            || self.queue.iter().any(|q| q.directive.origin == origin)
    }

    #[must_use]
    pub fn running_len(&self) -> usize {
        self.running.len()
    }

    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Directives that have started a primitive so far.
    #[must_use]
    pub fn started_total(&self) -> u64 {
        self.started
    }

    /// Completions not yet handed out.
    pub fn drain_completions(&mut self) -> Vec<Completion> {
        std::mem::take(&mut self.completions)
    }

    fn release(&mut self, subjects: &[SubjectKey], handle: AnimationHandle) {
        for subject in subjects {
            if self.locks.get(subject) == Some(&handle) {
                self.locks.remove(subject);
            }
        }
    }

    /// Start every queued directive that is eligible, in queue order.
    fn pump(&mut self, anchors: &dyn Anchors) {
        // Subjects claimed by earlier directives that are still waiting.
        let mut claimed: AHashSet<SubjectKey> = AHashSet::new();
        let mut index = 0;
        while index < self.queue.len() {
            let entry = &self.queue[index];
            let subjects: Vec<SubjectKey> = entry.directive.spec.subjects().cloned().collect();
            let eligible = !entry.token.is_cancelled()
                && subjects
                    .iter()
                    .all(|s| !self.locks.contains_key(s) && !claimed.contains(s));
            if !eligible {
                claimed.extend(subjects);
                index += 1;
                continue;
            }
            let Some(entry) = self.queue.remove(index) else {
                break;
            };
            self.start(entry, subjects, anchors);
        }
    }

    fn start(&mut self, entry: Queued, subjects: Vec<SubjectKey>, anchors: &dyn Anchors) {
        let Queued {
            handle,
            directive,
            token: _,
        } = entry;
        let span = debug_span!(
            target: "fairway.scheduler",
            "scheduler.directive",
            handle = %handle,
            kind = %directive.spec.kind,
            origin = ?directive.origin,
            seq = directive.seq,
        );
        let _guard = span.enter();

        if directive.origin == Origin::Remote && directive.seq < self.latest_seq {
            debug!(
                target: "fairway.scheduler",
                latest = self.latest_seq,
                "stale remote directive dropped"
            );
            self.completions.push(Completion {
                handle,
                origin: directive.origin,
                outcome: Outcome::Dropped,
                subjects,
            });
            return;
        }

        match directive.spec.instantiate(anchors) {
            Ok(primitive) => {
                for subject in &subjects {
                    self.locks.insert(subject.clone(), handle);
                }
                self.started += 1;
                debug!(target: "fairway.scheduler", delay_ms = directive.delay.as_millis() as u64, "started");
                self.running.push(Running {
                    handle,
                    origin: directive.origin,
                    subjects,
                    animation: delay(directive.delay, primitive),
                });
            }
            Err(missing) => {
                debug!(target: "fairway.scheduler", error = %missing, "primitive failed");
                self.completions.push(Completion {
                    handle,
                    origin: directive.origin,
                    outcome: Outcome::Failed,
                    subjects,
                });
            }
        }
    }
}

#![forbid(unsafe_code)]

//! Card effects.
//!
//! Each primitive animates one visual subject between anchor rectangles and
//! knows nothing about the game: it is told where to start, where to end,
//! and which card face (if any) to show. The scheduler samples in-flight
//! primitives every frame; the render layer draws the samples over the
//! static table.
//!
//! | Primitive | Motion |
//! |-----------|--------|
//! | [`Flip`] | folds to zero width, swaps face, unfolds |
//! | [`ArcMove`] | travels between two anchors along a raised arc |
//! | [`Pulse`] | glows up and back down once |
//! | [`LiftSettle`] | rises, then springs back into place |
//! | [`Shake`] | decaying horizontal jitter |
//! | [`GlowLoop`] | repeated glow, a bounded number of times |
//!
//! A primitive is built from a [`PrimitiveSpec`] once its anchors are known.
//! An anchor that cannot be resolved is a [`MissingAnchor`] error; callers
//! treat that as an immediately failed animation.

use std::f32::consts::PI;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::spring::Spring;
use super::timeline::{LoopCount, Timeline};
use super::{Animation, Fade, Sequence, ease_in_out, ease_out, sequence};
use crate::card::Card;
use crate::geometry::Rect;
use crate::subject::SubjectKey;

/// Cells a card rises at the top of an arc.
const ARC_HEIGHT: f32 = 3.0;
/// Cells a card rises when lifted.
const LIFT_HEIGHT: f32 = 1.0;
/// Peak shake displacement in cells.
const SHAKE_AMPLITUDE: f32 = 2.0;
/// Full left-right cycles in one shake.
const SHAKE_CYCLES: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimitiveKind {
    Flip,
    ArcMove,
    Pulse,
    LiftSettle,
    Shake,
    GlowLoop,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrimitiveKind::Flip => "flip",
            PrimitiveKind::ArcMove => "arc-move",
            PrimitiveKind::Pulse => "pulse",
            PrimitiveKind::LiftSettle => "lift-settle",
            PrimitiveKind::Shake => "shake",
            PrimitiveKind::GlowLoop => "glow-loop",
        })
    }
}

/// Which side of the card an artifact shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceShown {
    Back,
    Front,
}

/// One frame of an in-flight primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub kind: PrimitiveKind,
    pub rect: Rect,
    pub card: Option<Card>,
    pub face: FaceShown,
    /// Height above the table, 0 at rest.
    pub lift: f32,
    /// Highlight intensity in `[0, 1]`.
    pub glow: f32,
}

impl Sample {
    fn at(kind: PrimitiveKind, rect: Rect, card: Option<Card>) -> Self {
        let face = if card.is_some_and(|c| c.is_face_up()) {
            FaceShown::Front
        } else {
            FaceShown::Back
        };
        Self {
            kind,
            rect,
            card,
            face,
            lift: 0.0,
            glow: 0.0,
        }
    }
}

/// A sampled in-flight animation, as handed to the render layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Scheduler handle of the animation.
    pub id: u64,
    pub subjects: Vec<SubjectKey>,
    pub sample: Sample,
}

/// Resolves a subject to the rectangle it currently occupies.
pub trait Anchors {
    fn anchor(&self, subject: &SubjectKey) -> Option<Rect>;
}

/// A subject has no usable rectangle (unlaid, off-table, or zero-area).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingAnchor(pub SubjectKey);

impl fmt::Display for MissingAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no anchor rectangle for {}", self.0)
    }
}

impl std::error::Error for MissingAnchor {}

/// An animation that can be drawn.
pub trait Primitive: Animation + fmt::Debug {
    fn kind(&self) -> PrimitiveKind;
    fn sample(&self) -> Sample;
}

impl<A: Animation + ?Sized> Animation for Box<A> {
    fn tick(&mut self, dt: Duration) {
        (**self).tick(dt);
    }

    fn is_complete(&self) -> bool {
        (**self).is_complete()
    }

    fn value(&self) -> f32 {
        (**self).value()
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn overshoot(&self) -> Duration {
        (**self).overshoot()
    }
}

// ---------------------------------------------------------------------------
// Spec
// ---------------------------------------------------------------------------

/// What to animate, before anchors are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveSpec {
    pub kind: PrimitiveKind,
    /// Where the effect starts (or the only subject it touches).
    pub from: SubjectKey,
    /// Destination, for [`ArcMove`].
    pub to: Option<SubjectKey>,
    /// The card shown by the effect, if any.
    pub card: Option<Card>,
    pub duration: Duration,
    /// Extra plays, for [`GlowLoop`].
    pub repeats: u32,
}

impl PrimitiveSpec {
    fn on(kind: PrimitiveKind, at: SubjectKey, duration: Duration) -> Self {
        Self {
            kind,
            from: at,
            to: None,
            card: None,
            duration,
            repeats: 0,
        }
    }

    #[must_use]
    pub fn flip(at: SubjectKey, card: Card, duration: Duration) -> Self {
        Self {
            card: Some(card),
            ..Self::on(PrimitiveKind::Flip, at, duration)
        }
    }

    #[must_use]
    pub fn arc_move(
        from: SubjectKey,
        to: SubjectKey,
        card: Option<Card>,
        duration: Duration,
    ) -> Self {
        Self {
            to: Some(to),
            card,
            ..Self::on(PrimitiveKind::ArcMove, from, duration)
        }
    }

    #[must_use]
    pub fn pulse(at: SubjectKey, duration: Duration) -> Self {
        Self::on(PrimitiveKind::Pulse, at, duration)
    }

    #[must_use]
    pub fn lift_settle(at: SubjectKey, card: Option<Card>, duration: Duration) -> Self {
        Self {
            card,
            ..Self::on(PrimitiveKind::LiftSettle, at, duration)
        }
    }

    #[must_use]
    pub fn shake(at: SubjectKey, duration: Duration) -> Self {
        Self::on(PrimitiveKind::Shake, at, duration)
    }

    /// `period` per glow, played `1 + repeats` times.
    #[must_use]
    pub fn glow_loop(at: SubjectKey, period: Duration, repeats: u32) -> Self {
        Self {
            repeats,
            ..Self::on(PrimitiveKind::GlowLoop, at, period)
        }
    }

    /// Every subject this effect touches.
    pub fn subjects(&self) -> impl Iterator<Item = &SubjectKey> + '_ {
        std::iter::once(&self.from).chain(self.to.as_ref())
    }

    /// Resolve anchors and build the running primitive.
    pub fn instantiate(&self, anchors: &dyn Anchors) -> Result<Box<dyn Primitive>, MissingAnchor> {
        let from = resolve(anchors, &self.from)?;
        let primitive: Box<dyn Primitive> = match self.kind {
            PrimitiveKind::Flip => Box::new(Flip::new(from, self.card, self.duration)),
            PrimitiveKind::ArcMove => {
                let to_key = self.to.as_ref().unwrap_or(&self.from);
                let to = resolve(anchors, to_key)?;
                Box::new(ArcMove::new(from, to, self.card, self.duration))
            }
            PrimitiveKind::Pulse => Box::new(Pulse::new(from, self.duration)),
            PrimitiveKind::LiftSettle => Box::new(LiftSettle::new(from, self.card, self.duration)),
            PrimitiveKind::Shake => Box::new(Shake::new(from, self.duration)),
            PrimitiveKind::GlowLoop => {
                Box::new(GlowLoop::new(from, self.duration, self.repeats))
            }
        };
        Ok(primitive)
    }
}

fn resolve(anchors: &dyn Anchors, key: &SubjectKey) -> Result<Rect, MissingAnchor> {
    anchors
        .anchor(key)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| MissingAnchor(key.clone()))
}

fn scale_cells(cells: u16, factor: f32) -> u16 {
    (f32::from(cells) * factor.clamp(0.0, 1.0)).round() as u16
}

// ---------------------------------------------------------------------------
// Flip
// ---------------------------------------------------------------------------

/// Turns a card over in place. Shows the back until the midpoint, then the
/// face.
#[derive(Debug)]
pub struct Flip {
    rect: Rect,
    card: Option<Card>,
    timeline: Timeline,
}

impl Flip {
    #[must_use]
    pub fn new(rect: Rect, card: Option<Card>, duration: Duration) -> Self {
        let half = duration / 2;
        let mut timeline = Timeline::new()
            .add_labeled("fold", Duration::ZERO, Fade::new(half).easing(ease_in_out))
            .add_labeled("unfold", half, Fade::new(duration - half).easing(ease_in_out))
            .set_duration(duration);
        timeline.play();
        Self {
            rect,
            card,
            timeline,
        }
    }
}

impl Animation for Flip {
    fn tick(&mut self, dt: Duration) {
        self.timeline.tick(dt);
    }
    fn is_complete(&self) -> bool {
        self.timeline.is_complete()
    }
    fn value(&self) -> f32 {
        self.timeline.value()
    }
    fn reset(&mut self) {
        self.timeline.play();
    }
}

impl Primitive for Flip {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Flip
    }

    fn sample(&self) -> Sample {
        let (face, width) = if self.timeline.event_started("unfold") {
            let v = self.timeline.event_value("unfold").unwrap_or(1.0);
            (FaceShown::Front, scale_cells(self.rect.width, v))
        } else {
            let v = self.timeline.event_value("fold").unwrap_or(0.0);
            (FaceShown::Back, scale_cells(self.rect.width, 1.0 - v))
        };
        let x = self.rect.x + (self.rect.width - width) / 2;
        Sample {
            face,
            rect: Rect { x, width, ..self.rect },
            ..Sample::at(PrimitiveKind::Flip, self.rect, self.card)
        }
    }
}

// ---------------------------------------------------------------------------
// ArcMove
// ---------------------------------------------------------------------------

/// Carries a card between two anchors, rising along the way.
#[derive(Debug)]
pub struct ArcMove {
    from: Rect,
    to: Rect,
    card: Option<Card>,
    progress: Fade,
}

impl ArcMove {
    #[must_use]
    pub fn new(from: Rect, to: Rect, card: Option<Card>, duration: Duration) -> Self {
        Self {
            from,
            to,
            card,
            progress: Fade::new(duration).easing(ease_in_out),
        }
    }
}

impl Animation for ArcMove {
    fn tick(&mut self, dt: Duration) {
        self.progress.tick(dt);
    }
    fn is_complete(&self) -> bool {
        self.progress.is_complete()
    }
    fn value(&self) -> f32 {
        self.progress.value()
    }
    fn reset(&mut self) {
        self.progress.reset();
    }
    fn overshoot(&self) -> Duration {
        self.progress.overshoot()
    }
}

impl Primitive for ArcMove {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::ArcMove
    }

    fn sample(&self) -> Sample {
        let t = self.progress.value();
        let lift = 4.0 * t * (1.0 - t);
        let rise = (ARC_HEIGHT * lift).round() as i32;
        Sample {
            lift,
            ..Sample::at(
                PrimitiveKind::ArcMove,
                self.from.lerp(&self.to, t).translated(0, -rise),
                self.card,
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Pulse
// ---------------------------------------------------------------------------

/// One glow up and back down.
#[derive(Debug)]
pub struct Pulse {
    rect: Rect,
    progress: Fade,
}

impl Pulse {
    #[must_use]
    pub fn new(rect: Rect, duration: Duration) -> Self {
        Self {
            rect,
            progress: Fade::new(duration),
        }
    }
}

impl Animation for Pulse {
    fn tick(&mut self, dt: Duration) {
        self.progress.tick(dt);
    }
    fn is_complete(&self) -> bool {
        self.progress.is_complete()
    }
    fn value(&self) -> f32 {
        self.progress.value()
    }
    fn reset(&mut self) {
        self.progress.reset();
    }
}

impl Primitive for Pulse {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Pulse
    }

    fn sample(&self) -> Sample {
        Sample {
            glow: (PI * self.progress.value()).sin().max(0.0),
            ..Sample::at(PrimitiveKind::Pulse, self.rect, None)
        }
    }
}

// ---------------------------------------------------------------------------
// LiftSettle
// ---------------------------------------------------------------------------

/// Raises a card, then lets it spring back down into its slot.
#[derive(Debug)]
pub struct LiftSettle {
    rect: Rect,
    card: Option<Card>,
    motion: Sequence<Fade, Spring>,
}

impl LiftSettle {
    /// `duration` covers the lift; the settle runs until the spring rests.
    #[must_use]
    pub fn new(rect: Rect, card: Option<Card>, duration: Duration) -> Self {
        Self {
            rect,
            card,
            motion: sequence(
                Fade::new(duration).easing(ease_out),
                Spring::new(1.0, 0.0),
            ),
        }
    }

    fn lift(&self) -> f32 {
        if self.motion.in_second() {
            self.motion.second().position() as f32
        } else {
            self.motion.first().value()
        }
    }
}

impl Animation for LiftSettle {
    fn tick(&mut self, dt: Duration) {
        self.motion.tick(dt);
    }
    fn is_complete(&self) -> bool {
        self.motion.is_complete()
    }
    fn value(&self) -> f32 {
        self.lift().clamp(0.0, 1.0)
    }
    fn reset(&mut self) {
        self.motion.reset();
    }
}

impl Primitive for LiftSettle {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::LiftSettle
    }

    fn sample(&self) -> Sample {
        let lift = self.lift();
        let rise = (LIFT_HEIGHT * lift).round() as i32;
        Sample {
            lift,
            ..Sample::at(
                PrimitiveKind::LiftSettle,
                self.rect.translated(0, -rise),
                self.card,
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Shake
// ---------------------------------------------------------------------------

/// Decaying side-to-side jitter, for refused actions.
#[derive(Debug)]
pub struct Shake {
    rect: Rect,
    progress: Fade,
}

impl Shake {
    #[must_use]
    pub fn new(rect: Rect, duration: Duration) -> Self {
        Self {
            rect,
            progress: Fade::new(duration),
        }
    }

    /// Horizontal displacement in cells.
    #[must_use]
    pub fn offset(&self) -> i32 {
        let t = self.progress.value();
        let wave = (2.0 * PI * SHAKE_CYCLES * t).sin();
        (SHAKE_AMPLITUDE * wave * (1.0 - t)).round() as i32
    }
}

impl Animation for Shake {
    fn tick(&mut self, dt: Duration) {
        self.progress.tick(dt);
    }
    fn is_complete(&self) -> bool {
        self.progress.is_complete()
    }
    fn value(&self) -> f32 {
        self.progress.value()
    }
    fn reset(&mut self) {
        self.progress.reset();
    }
}

impl Primitive for Shake {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::Shake
    }

    fn sample(&self) -> Sample {
        Sample::at(
            PrimitiveKind::Shake,
            self.rect.translated(self.offset(), 0),
            None,
        )
    }
}

// ---------------------------------------------------------------------------
// GlowLoop
// ---------------------------------------------------------------------------

/// Repeated rise-and-fall glow. Always bounded.
#[derive(Debug)]
pub struct GlowLoop {
    rect: Rect,
    timeline: Timeline,
}

impl GlowLoop {
    #[must_use]
    pub fn new(rect: Rect, period: Duration, repeats: u32) -> Self {
        let half = period / 2;
        let mut timeline = Timeline::new()
            .add_labeled("rise", Duration::ZERO, Fade::new(half).easing(ease_out))
            .add_labeled("fall", half, Fade::new(period - half).easing(ease_in_out))
            .set_duration(period)
            .set_loop_count(LoopCount::Times(repeats));
        timeline.play();
        Self { rect, timeline }
    }

    #[must_use]
    pub fn glow(&self) -> f32 {
        if self.timeline.event_started("fall") {
            1.0 - self.timeline.event_value("fall").unwrap_or(1.0)
        } else {
            self.timeline.event_value("rise").unwrap_or(0.0)
        }
    }
}

impl Animation for GlowLoop {
    fn tick(&mut self, dt: Duration) {
        self.timeline.tick(dt);
    }
    fn is_complete(&self) -> bool {
        self.timeline.is_complete()
    }
    fn value(&self) -> f32 {
        self.glow()
    }
    fn reset(&mut self) {
        self.timeline.play();
    }
}

impl Primitive for GlowLoop {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::GlowLoop
    }

    fn sample(&self) -> Sample {
        Sample {
            glow: self.glow(),
            ..Sample::at(PrimitiveKind::GlowLoop, self.rect, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardFace, Rank, Suit};
    use crate::snapshot::{HandPosition, PlayerId};

    const MS_100: Duration = Duration::from_millis(100);

    struct Fixed;

    impl Anchors for Fixed {
        fn anchor(&self, subject: &SubjectKey) -> Option<Rect> {
            match subject {
                SubjectKey::Deck => Some(Rect::new(10, 10, 4, 3)),
                SubjectKey::Discard => Some(Rect::new(20, 10, 4, 3)),
                SubjectKey::Held => Some(Rect::new(0, 0, 0, 0)),
                _ => None,
            }
        }
    }

    fn king() -> Card {
        Card::face_up(CardFace::new(Rank::King, Suit::Spades), 0)
    }

    #[test]
    fn flip_swaps_face_at_midpoint() {
        let mut flip = Flip::new(Rect::new(0, 0, 4, 3), Some(king()), Duration::from_millis(200));
        assert_eq!(flip.sample().face, FaceShown::Back);
        assert_eq!(flip.sample().rect.width, 4);
        flip.tick(MS_100);
        assert_eq!(flip.sample().rect.width, 0);
        flip.tick(Duration::from_millis(50));
        assert_eq!(flip.sample().face, FaceShown::Front);
        flip.tick(MS_100);
        assert!(flip.is_complete());
        assert_eq!(flip.sample().rect, Rect::new(0, 0, 4, 3));
    }

    #[test]
    fn arc_move_lands_on_destination() {
        let from = Rect::new(0, 10, 4, 3);
        let to = Rect::new(20, 10, 4, 3);
        let mut arc = ArcMove::new(from, to, None, Duration::from_millis(200));
        arc.tick(MS_100);
        let mid = arc.sample();
        assert!(mid.rect.y < 10, "card should be raised mid-flight");
        assert!(mid.lift > 0.9);
        arc.tick(MS_100);
        assert!(arc.is_complete());
        assert_eq!(arc.sample().rect, to);
        assert_eq!(arc.sample().face, FaceShown::Back);
    }

    #[test]
    fn lift_settle_returns_to_rest() {
        let rect = Rect::new(5, 5, 4, 3);
        let mut lift = LiftSettle::new(rect, None, MS_100);
        lift.tick(MS_100);
        assert_eq!(lift.sample().rect.y, 4);
        for _ in 0..200 {
            lift.tick(Duration::from_millis(16));
        }
        assert!(lift.is_complete());
        assert_eq!(lift.sample().rect, rect);
    }

    #[test]
    fn shake_decays_to_zero() {
        let mut shake = Shake::new(Rect::new(5, 5, 4, 3), Duration::from_millis(300));
        shake.tick(Duration::from_millis(300));
        assert!(shake.is_complete());
        assert_eq!(shake.offset(), 0);
    }

    #[test]
    fn glow_loop_is_bounded() {
        let mut glow = GlowLoop::new(Rect::new(0, 0, 4, 1), MS_100, 2);
        glow.tick(Duration::from_millis(50));
        assert!(glow.glow() > 0.9);
        glow.tick(Duration::from_millis(250));
        assert!(glow.is_complete());
    }

    #[test]
    fn pulse_peaks_mid_way() {
        let mut pulse = Pulse::new(Rect::new(0, 0, 4, 3), Duration::from_millis(200));
        pulse.tick(MS_100);
        assert!((pulse.sample().glow - 1.0).abs() < 1e-3);
    }

    #[test]
    fn spec_resolves_anchors() {
        let spec = PrimitiveSpec::arc_move(SubjectKey::Deck, SubjectKey::Discard, None, MS_100);
        let prim = spec.instantiate(&Fixed).unwrap();
        assert_eq!(prim.kind(), PrimitiveKind::ArcMove);
        assert_eq!(prim.sample().rect, Rect::new(10, 10, 4, 3));
        assert_eq!(spec.subjects().count(), 2);
    }

    #[test]
    fn missing_or_empty_anchor_fails() {
        let slot = SubjectKey::slot(&PlayerId::new("p"), HandPosition::new(0).unwrap());
        let err = PrimitiveSpec::shake(slot.clone(), MS_100)
            .instantiate(&Fixed)
            .unwrap_err();
        assert_eq!(err, MissingAnchor(slot));
        let err = PrimitiveSpec::pulse(SubjectKey::Held, MS_100)
            .instantiate(&Fixed)
            .unwrap_err();
        assert_eq!(err.0, SubjectKey::Held);
        assert!(err.to_string().contains("held"));
    }
}

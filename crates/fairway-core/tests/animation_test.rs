//! Integration tests for the animation module.

use std::time::Duration;

use fairway_core::animation::*;
use fairway_core::card::{Card, CardFace, Rank, Suit};
use fairway_core::geometry::Rect;
use fairway_core::subject::SubjectKey;

const MS_16: Duration = Duration::from_millis(16);
const MS_100: Duration = Duration::from_millis(100);

struct Table;

impl Anchors for Table {
    fn anchor(&self, subject: &SubjectKey) -> Option<Rect> {
        match subject {
            SubjectKey::Deck => Some(Rect::new(2, 2, 4, 3)),
            SubjectKey::Discard => Some(Rect::new(8, 2, 4, 3)),
            SubjectKey::Held => Some(Rect::new(14, 2, 4, 3)),
            _ => None,
        }
    }
}

fn run_to_end(primitive: &mut dyn Primitive, max_frames: usize) -> usize {
    for frame in 0..max_frames {
        if primitive.is_complete() {
            return frame;
        }
        primitive.tick(MS_16);
    }
    max_frames
}

#[test]
fn fade_duration_tracking() {
    let mut fade = Fade::new(Duration::from_secs(1));
    for _ in 0..1000 {
        fade.tick(Duration::from_millis(1));
    }
    assert!(fade.is_complete());
}

#[test]
fn nested_sequence_completes() {
    let inner = sequence(Fade::new(MS_100), Fade::new(MS_100));
    let mut outer = sequence(inner, Fade::new(MS_100));
    outer.tick(Duration::from_millis(300));
    assert!(outer.is_complete());
}

#[test]
fn easing_functions_are_monotonic() {
    for easing in [linear, ease_in, ease_out, ease_in_out, ease_out_cubic] {
        let mut prev = 0.0f32;
        for i in 0..=100 {
            let v = easing(i as f32 / 100.0);
            assert!(v + 1e-6 >= prev, "easing decreased at {i}");
            prev = v;
        }
    }
}

#[test]
fn delayed_primitive_holds_start_frame() {
    let spec = PrimitiveSpec::arc_move(SubjectKey::Deck, SubjectKey::Held, None, MS_100);
    let mut delayed = delay(MS_100, spec.instantiate(&Table).unwrap());
    delayed.tick(Duration::from_millis(60));
    assert!(!delayed.has_started());
    assert_eq!(delayed.inner().sample().rect, Rect::new(2, 2, 4, 3));
    delayed.tick(Duration::from_millis(150));
    assert!(delayed.is_complete());
    assert_eq!(delayed.inner().sample().rect, Rect::new(14, 2, 4, 3));
}

#[test]
fn every_primitive_finishes_at_frame_rate() {
    let king = Card::face_up(CardFace::new(Rank::King, Suit::Hearts), 0);
    let specs = [
        PrimitiveSpec::flip(SubjectKey::Discard, king, Duration::from_millis(240)),
        PrimitiveSpec::arc_move(SubjectKey::Deck, SubjectKey::Discard, Some(king), MS_100),
        PrimitiveSpec::pulse(SubjectKey::Deck, MS_100),
        PrimitiveSpec::lift_settle(SubjectKey::Held, Some(king), MS_100),
        PrimitiveSpec::shake(SubjectKey::Discard, MS_100),
        PrimitiveSpec::glow_loop(SubjectKey::Deck, MS_100, 3),
    ];
    for spec in specs {
        let mut primitive = spec.instantiate(&Table).unwrap();
        assert_eq!(primitive.kind(), spec.kind);
        let frames = run_to_end(primitive.as_mut(), 500);
        assert!(frames < 500, "{} never completed", spec.kind);
    }
}

#[test]
fn flip_ends_showing_the_face() {
    let queen = Card::face_up(CardFace::new(Rank::Queen, Suit::Clubs), 0);
    let mut flip = PrimitiveSpec::flip(SubjectKey::Deck, queen, MS_100)
        .instantiate(&Table)
        .unwrap();
    run_to_end(flip.as_mut(), 100);
    let sample = flip.sample();
    assert_eq!(sample.face, FaceShown::Front);
    assert_eq!(sample.card, Some(queen));
    assert_eq!(sample.rect, Rect::new(2, 2, 4, 3));
}

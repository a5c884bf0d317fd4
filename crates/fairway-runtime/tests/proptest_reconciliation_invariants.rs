//! Property-based invariants of snapshot reconciliation.
//!
//! 1. Snapshots pushed while their subjects are locked are applied exactly
//!    once, after release, and only the last of them is ever rendered.
//! 2. Animating a remote movement converges to the same visible table as
//!    snapping straight to the resulting snapshot.
//! 3. Cancel-all is idempotent and leaves no lock, queue, or artifact.

use fairway_core::animation::{Anchors, PrimitiveSpec};
use fairway_core::card::Card;
use fairway_core::geometry::Rect;
use fairway_core::snapshot::{PlayerId, Snapshot};
use fairway_core::subject::SubjectKey;
use fairway_core::wire::Inbound;
use fairway_harness::RecordingTransport;
use fairway_harness::fixtures::{SnapshotBuilder, card, hidden, pos};
use fairway_layout::{SlotView, TableView};
use fairway_runtime::{
    AnimationScheduler, ChoreographyConfig, Directive, InboundOutcome, Outcome, Session,
    SnapshotOutcome,
};
use proptest::prelude::*;
use web_time::Duration;

const FRAME: Duration = Duration::from_millis(16);
const FACES: [&str; 12] = [
    "Ah", "2c", "3d", "4s", "5h", "6c", "7d", "8s", "9h", "10c", "Jd", "Qs",
];

// ── Helpers ───────────────────────────────────────────────────────────────

fn session() -> Session<RecordingTransport> {
    Session::new(
        ChoreographyConfig::default(),
        Some(PlayerId::new("you")),
        Rect::new(0, 0, 120, 40),
        RecordingTransport::new(),
    )
}

fn push(session: &mut Session<RecordingTransport>, snapshot: Snapshot) -> SnapshotOutcome {
    match session.handle_inbound(Inbound::Snapshot(snapshot)) {
        InboundOutcome::Snapshot(outcome) => outcome,
        other => panic!("snapshot routed as {other:?}"),
    }
}

fn settle(session: &mut Session<RecordingTransport>) -> bool {
    for _ in 0..2_000 {
        session.tick(FRAME);
        let controller = session.controller();
        if controller.scheduler().is_idle() && !controller.transient().has_pending() {
            return true;
        }
    }
    false
}

/// The table as drawn, minus bookkeeping that legitimately differs.
fn visible(mut view: TableView) -> TableView {
    view.seq = 0;
    view.notices.clear();
    view
}

fn bot_turn() -> SnapshotBuilder {
    SnapshotBuilder::new()
        .player("you", false)
        .player("bot", true)
        .current("bot")
        .discard(card("Kh", 40))
        .deck(30)
}

/// One remote move by the computer seat.
#[derive(Debug, Clone)]
enum RemoteMove {
    DeckDraw { face: usize },
    Swap { position: usize, face: usize, revealed: usize },
    Discard { face: usize },
    FaceToFaceSwap { position: usize, old: usize, face: usize },
}

fn remote_move() -> impl Strategy<Value = RemoteMove> {
    prop_oneof![
        (0..FACES.len()).prop_map(|face| RemoteMove::DeckDraw { face }),
        (0..6usize, 0..FACES.len(), 0..FACES.len()).prop_map(|(position, face, revealed)| {
            RemoteMove::Swap {
                position,
                face,
                revealed,
            }
        }),
        (0..FACES.len()).prop_map(|face| RemoteMove::Discard { face }),
        (0..6usize, 0..FACES.len(), 0..FACES.len()).prop_map(|(position, old, face)| {
            RemoteMove::FaceToFaceSwap {
                position,
                old,
                face,
            }
        }),
    ]
}

/// Before and after snapshots for `m`; `hand_over` passes the turn to `you`.
fn transition(m: &RemoteMove, hand_over: bool) -> (Snapshot, Snapshot) {
    let held = |face: usize| card(FACES[face], 60);
    let (before, after) = match *m {
        RemoteMove::DeckDraw { face } => {
            let before = bot_turn().build();
            let after = bot_turn().deck(29).held("bot", held(face)).build();
            (before, after)
        }
        RemoteMove::Swap {
            position,
            face,
            revealed,
        } => {
            let before = bot_turn().held("bot", held(face)).build();
            let after = bot_turn()
                .slot("bot", position, held(face))
                .discard(card(FACES[revealed], 106 + position as u32))
                .build();
            (before, after)
        }
        RemoteMove::Discard { face } => {
            let before = bot_turn().held("bot", held(face)).build();
            let after = bot_turn().discard(held(face)).build();
            (before, after)
        }
        RemoteMove::FaceToFaceSwap {
            position,
            old,
            face,
        } => {
            let old_card = card(FACES[old], 70);
            let before = bot_turn()
                .slot("bot", position, old_card)
                .held("bot", held(face))
                .build();
            let after = bot_turn()
                .slot("bot", position, held(face))
                .discard(old_card)
                .build();
            (before, after)
        }
    };
    let after = if hand_over {
        SnapshotBuilder::from_snapshot(after).current("you").build()
    } else {
        after
    };
    (before, after)
}

struct Everywhere;

impl Anchors for Everywhere {
    fn anchor(&self, subject: &SubjectKey) -> Option<Rect> {
        match subject {
            SubjectKey::Seat(_) => None,
            _ => Some(Rect::new(10, 10, 7, 5)),
        }
    }
}

fn subject(i: u8) -> SubjectKey {
    match i % 5 {
        0 => SubjectKey::Deck,
        1 => SubjectKey::Discard,
        2 => SubjectKey::Held,
        3 => SubjectKey::slot(&PlayerId::new("a"), pos(usize::from(i % 6))),
        _ => SubjectKey::Seat(PlayerId::new("a")),
    }
}

fn spec(kind: u8, a: u8, b: u8, ms: u64) -> PrimitiveSpec {
    let d = Duration::from_millis(ms);
    let c: Card = hidden(u32::from(a));
    match kind % 4 {
        0 => PrimitiveSpec::flip(subject(a), card("7h", 1), d),
        1 if subject(a) != subject(b) => PrimitiveSpec::arc_move(subject(a), subject(b), Some(c), d),
        1 => PrimitiveSpec::lift_settle(subject(a), Some(c), d),
        2 => PrimitiveSpec::pulse(subject(a), d),
        _ => PrimitiveSpec::shake(subject(b), d),
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Exactly-once application of deferred snapshots
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn deferred_snapshots_apply_once_and_only_the_last(
        faces in proptest::collection::vec(0..FACES.len(), 1..8),
        gap_frames in 0u32..10,
    ) {
        let mut s = session();
        let held = bot_turn().held("bot", card("9s", 50)).build();
        push(&mut s, held.clone());
        let discarded = SnapshotBuilder::from_snapshot(held).not_held().discard(card("9s", 50)).build();
        prop_assert_eq!(push(&mut s, discarded), SnapshotOutcome::Applied { movements: 1 });
        let shown = s.view().discard;

        for (i, face) in faces.iter().enumerate() {
            let next = bot_turn().discard(card(FACES[*face], 200 + i as u32)).build();
            let outcome = push(&mut s, next);
            prop_assert_eq!(outcome, SnapshotOutcome::Buffered { superseded: i > 0 });
            // Intermediates are never drawn.
            prop_assert_eq!(s.view().discard, shown);
            for _ in 0..gap_frames {
                s.tick(Duration::from_millis(1));
            }
        }

        prop_assert!(settle(&mut s));
        let last = faces.len() - 1;
        let expected = card(FACES[faces[last]], 200 + last as u32);
        prop_assert_eq!(s.view().discard, SlotView::of(Some(&expected)));
        prop_assert_eq!(s.controller().accepted_seq(), 3);
        let counters = *s.counters();
        prop_assert_eq!(counters.snapshots_applied, 3);
        prop_assert_eq!(counters.snapshots_buffered, faces.len() as u64);
        prop_assert_eq!(counters.snapshots_superseded, faces.len() as u64 - 1);

        // Nothing left to apply a second time.
        for _ in 0..60 {
            s.tick(FRAME);
        }
        prop_assert_eq!(s.controller().accepted_seq(), 3);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Animate-then-settle equals snap
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn animating_a_remote_move_converges_to_the_snapped_table(
        m in remote_move(),
        hand_over in any::<bool>(),
    ) {
        let (before, after) = transition(&m, hand_over);

        let mut animated = session();
        push(&mut animated, before);
        let outcome = push(&mut animated, after.clone());
        prop_assert!(matches!(outcome, SnapshotOutcome::Applied { movements } if movements >= 1), "expected Applied with movements >= 1, got {:?}", outcome);
        prop_assert!(settle(&mut animated));

        let mut snapped = session();
        prop_assert_eq!(push(&mut snapped, after), SnapshotOutcome::Reset);

        let animated_view = animated.view();
        prop_assert!(animated_view.artifacts.is_empty());
        prop_assert_eq!(visible(animated_view), visible(snapped.view()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Cancel-all idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn cancel_all_is_idempotent(
        directives in proptest::collection::vec(
            (any::<u8>(), any::<u8>(), any::<u8>(), 1u64..800, 0u64..300, any::<bool>()),
            0..24,
        ),
        elapsed_ms in 0u64..600,
    ) {
        let mut scheduler = AnimationScheduler::new();
        scheduler.set_accepted_seq(1);
        for (kind, a, b, ms, delay_ms, local) in directives {
            let spec = spec(kind, a, b, ms);
            let directive = if local { Directive::local(spec, 1) } else { Directive::remote(spec, 1) };
            scheduler.run(directive.after(Duration::from_millis(delay_ms)), &Everywhere);
        }
        scheduler.tick(Duration::from_millis(elapsed_ms), &Everywhere);
        scheduler.drain_completions();

        let live = scheduler.running_len() + scheduler.queued_len();
        let cancelled = scheduler.cancel_all();
        prop_assert_eq!(cancelled.len(), live);
        prop_assert!(cancelled.iter().all(|c| c.outcome == Outcome::Cancelled));
        prop_assert!(scheduler.is_idle());
        prop_assert_eq!(scheduler.locks().count(), 0);
        prop_assert!(scheduler.artifacts().is_empty());

        prop_assert!(scheduler.cancel_all().is_empty());
        prop_assert!(scheduler.is_idle());
        prop_assert!(scheduler.tick(FRAME, &Everywhere).is_empty());
    }
}

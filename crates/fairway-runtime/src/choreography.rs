#![forbid(unsafe_code)]

//! Movements to directives.
//!
//! | Movement | Effects |
//! |----------|---------|
//! | draw (deck or discard) | arc pile → held |
//! | swap | arc held → slot, then arc slot → discard |
//! | discard | arc held → discard |
//! | flip | flip in place |
//! | knock | pulse on the seat |
//!
//! Remote movements by a computer-controlled player start after the
//! configured pause, so their turns read at a human pace. Only the first
//! effect of a movement waits; the rest queue behind it on shared subjects.

use fairway_core::animation::PrimitiveSpec;
use fairway_core::card::Card;
use fairway_core::movement::Movement;
use fairway_core::snapshot::Snapshot;
use fairway_core::subject::SubjectKey;
use web_time::Duration;

use crate::config::{ChoreographyConfig, DurationConfig};
use crate::scheduler::Directive;

/// Effects for one movement, without pacing.
#[must_use]
pub fn effects(movement: &Movement, durations: &DurationConfig) -> Vec<PrimitiveSpec> {
    match movement {
        Movement::Draw { source, card, .. } => vec![PrimitiveSpec::arc_move(
            SubjectKey::pile(*source),
            SubjectKey::Held,
            *card,
            durations.arc_move(),
        )],
        Movement::Swap {
            player,
            position,
            card,
            discarded,
        } => {
            let slot = SubjectKey::slot(player, *position);
            vec![
                PrimitiveSpec::arc_move(
                    SubjectKey::Held,
                    slot.clone(),
                    Some(*card),
                    durations.arc_move(),
                ),
                PrimitiveSpec::arc_move(slot, SubjectKey::Discard, *discarded, durations.arc_move()),
            ]
        }
        Movement::Discard { card, .. } => vec![PrimitiveSpec::arc_move(
            SubjectKey::Held,
            SubjectKey::Discard,
            *card,
            durations.arc_move(),
        )],
        Movement::Flip {
            player,
            position,
            card,
        } => vec![PrimitiveSpec::flip(
            SubjectKey::slot(player, *position),
            *card,
            durations.flip(),
        )],
        Movement::Knock { player } => vec![PrimitiveSpec::pulse(
            SubjectKey::Seat(player.clone()),
            durations.pulse(),
        )],
    }
}

/// Remote directives for inferred movements, paced by who moved.
///
/// `next` is the snapshot the movements lead to; it says whether each
/// player is computer-controlled.
#[must_use]
pub fn remote_directives(
    movements: &[Movement],
    next: &Snapshot,
    config: &ChoreographyConfig,
    seq: u64,
) -> Vec<Directive> {
    let mut out = Vec::new();
    for movement in movements {
        let computer = next
            .player(movement.player())
            .is_some_and(|p| p.is_computer_controlled);
        let pause = config.pacing.pause(computer);
        for (i, spec) in effects(movement, &config.durations).into_iter().enumerate() {
            let directive = Directive::remote(spec, seq);
            out.push(if i == 0 && !pause.is_zero() {
                directive.after(pause)
            } else {
                directive
            });
        }
    }
    out
}

/// Bounded glow on the seat whose turn it now is.
#[must_use]
pub fn turn_glow(seat: SubjectKey, durations: &DurationConfig) -> PrimitiveSpec {
    PrimitiveSpec::glow_loop(seat, durations.glow_period(), durations.glow_repeats)
}

/// Lift-and-settle for a card the local player just placed or picked.
#[must_use]
pub fn settle(slot: SubjectKey, card: Option<Card>, durations: &DurationConfig) -> PrimitiveSpec {
    PrimitiveSpec::lift_settle(slot, card, durations.lift_settle())
}

/// Shake a subject to signal a refused action.
#[must_use]
pub fn refusal(subject: SubjectKey, durations: &DurationConfig) -> PrimitiveSpec {
    PrimitiveSpec::shake(subject, durations.shake())
}

/// Total time the effects of `movement` take back to back.
#[must_use]
pub fn movement_span(movement: &Movement, durations: &DurationConfig) -> Duration {
    effects(movement, durations).iter().map(|s| s.duration).sum()
}

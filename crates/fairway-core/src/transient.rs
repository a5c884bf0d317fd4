#![forbid(unsafe_code)]

//! Client-only state layered over the accepted snapshot.
//!
//! Nothing here is ever transmitted. The reconciliation controller is the only
//! writer; the render layer reads it to show optimistic results before the
//! authority confirms them.

use std::collections::BTreeSet;

use crate::card::Card;
use crate::movement::DrawSource;
use crate::snapshot::{HandPosition, Snapshot};
use crate::subject::SubjectKey;

/// The local action whose result is being shown ahead of confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimisticMutation {
    /// Drew a card. A deck draw's face is unknown until confirmed.
    Drew {
        source: DrawSource,
        card: Option<Card>,
    },
    /// Placed the held card at `position`; `displaced` went to the discard.
    Swapped {
        position: HandPosition,
        card: Option<Card>,
        displaced: Option<Card>,
    },
    /// Threw the held card onto the discard pile.
    Discarded { card: Option<Card> },
    /// Turned one face-down card instead of drawing.
    FlippedAsAction { position: HandPosition },
    /// Declined the optional flip after a discard.
    SkippedFlip,
    /// Ended the round early.
    Knocked,
    /// Asked the authority to deal the next round.
    RequestedNextRound,
}

/// Local transient state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalTransientState {
    /// Initial-flip selections not yet confirmed by the authority.
    pub locally_flipped_positions: BTreeSet<HandPosition>,
    /// The card the local player is shown holding.
    pub held_card_optimistic: Option<Card>,
    /// The in-flight local mutation, if any.
    pub optimistic: Option<OptimisticMutation>,
    /// Subjects currently held by the scheduler.
    pub animation_locks: BTreeSet<SubjectKey>,
    /// A snapshot that arrived while a subject it touches was locked.
    pub pending_snapshot: Option<Snapshot>,
}

impl LocalTransientState {
    /// Drop everything: round start, channel loss.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Forget the optimistic mutation once the authority has caught up.
    pub fn clear_optimistic(&mut self) {
        self.locally_flipped_positions.clear();
        self.held_card_optimistic = None;
        self.optimistic = None;
    }

    /// Buffer a snapshot. Returns `true` when an earlier buffered snapshot was
    /// overwritten.
    pub fn buffer(&mut self, snapshot: Snapshot) -> bool {
        self.pending_snapshot.replace(snapshot).is_some()
    }

    /// Take the buffered snapshot, if any.
    pub fn take_pending(&mut self) -> Option<Snapshot> {
        self.pending_snapshot.take()
    }

    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_snapshot.is_some()
    }

    /// Capture the parts a rollback must restore.
    #[must_use]
    pub fn save_optimistic(&self) -> SavedOptimism {
        SavedOptimism {
            locally_flipped_positions: self.locally_flipped_positions.clone(),
            held_card_optimistic: self.held_card_optimistic,
            optimistic: self.optimistic.clone(),
        }
    }

    /// Restore what [`save_optimistic`](Self::save_optimistic) captured.
    pub fn restore_optimistic(&mut self, saved: SavedOptimism) {
        self.locally_flipped_positions = saved.locally_flipped_positions;
        self.held_card_optimistic = saved.held_card_optimistic;
        self.optimistic = saved.optimistic;
    }
}

/// Optimistic fields captured before a local action, for rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedOptimism {
    locally_flipped_positions: BTreeSet<HandPosition>,
    held_card_optimistic: Option<Card>,
    optimistic: Option<OptimisticMutation>,
}

#![forbid(unsafe_code)]

//! Lockable visual subjects.
//!
//! Every animation names the subjects it touches. A subject is held by at most
//! one in-flight animation at a time. Keys are structured so that two players'
//! slot 3, or the deck and a player named "deck", can never collide.

use std::fmt;

use crate::movement::DrawSource;
use crate::snapshot::{HandPosition, PlayerId};

/// A visual entity that can be locked during animation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubjectKey {
    /// The shared draw pile.
    Deck,
    /// The shared discard pile.
    Discard,
    /// The drawn card hovering between piles and hand.
    Held,
    /// One hand slot.
    Slot {
        player: PlayerId,
        position: HandPosition,
    },
    /// A player's seat banner (turn indicator).
    Seat(PlayerId),
}

impl SubjectKey {
    #[must_use]
    pub fn slot(player: &PlayerId, position: HandPosition) -> Self {
        SubjectKey::Slot {
            player: player.clone(),
            position,
        }
    }

    /// The pile a draw source refers to.
    #[must_use]
    pub fn pile(source: DrawSource) -> Self {
        match source {
            DrawSource::Deck => SubjectKey::Deck,
            DrawSource::Discard => SubjectKey::Discard,
        }
    }

    /// Seat banners are decorative: snapshots never wait on them.
    #[inline]
    #[must_use]
    pub fn blocks_snapshots(&self) -> bool {
        !matches!(self, SubjectKey::Seat(_))
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKey::Deck => f.write_str("deck"),
            SubjectKey::Discard => f.write_str("discard"),
            SubjectKey::Held => f.write_str("held"),
            SubjectKey::Slot { player, position } => write!(f, "slot[{player}#{position}]"),
            SubjectKey::Seat(player) => write!(f, "seat[{player}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_index_different_players_do_not_collide() {
        let p = HandPosition::new(3).unwrap();
        let a = SubjectKey::slot(&PlayerId::new("a"), p);
        let b = SubjectKey::slot(&PlayerId::new("b"), p);
        assert_ne!(a, b);
    }

    #[test]
    fn player_named_like_a_pile_is_distinct() {
        let seat = SubjectKey::Seat(PlayerId::new("deck"));
        assert_ne!(seat, SubjectKey::Deck);
        assert!(!seat.blocks_snapshots());
        assert!(SubjectKey::Deck.blocks_snapshots());
    }
}

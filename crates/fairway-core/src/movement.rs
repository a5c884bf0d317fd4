#![forbid(unsafe_code)]

//! Client-inferred discrete transitions between two snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::snapshot::{HandPosition, PlayerId};

/// Which pile a draw came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawSource {
    Deck,
    Discard,
}

impl DrawSource {
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            DrawSource::Deck => "deck",
            DrawSource::Discard => "discard",
        }
    }
}

/// Discriminant of a [`Movement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementKind {
    Flip,
    Swap,
    DrawDeck,
    DrawDiscard,
    Discard,
    Knock,
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MovementKind::Flip => "flip",
            MovementKind::Swap => "swap",
            MovementKind::DrawDeck => "draw-deck",
            MovementKind::DrawDiscard => "draw-discard",
            MovementKind::Discard => "discard",
            MovementKind::Knock => "knock",
        })
    }
}

/// A semantic transition attributed to one player.
///
/// Produced by the differ and consumed once by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Movement {
    /// A face-down card turned face-up in place.
    Flip {
        player: PlayerId,
        position: HandPosition,
        card: Card,
    },
    /// A card entered the hand at `position`; the card it replaced went to
    /// the discard pile (`discarded`, when visible).
    Swap {
        player: PlayerId,
        position: HandPosition,
        card: Card,
        discarded: Option<Card>,
    },
    /// A card was drawn from a pile into the player's hold.
    Draw {
        player: PlayerId,
        source: DrawSource,
        card: Option<Card>,
    },
    /// The held card went straight to the discard pile.
    Discard { player: PlayerId, card: Option<Card> },
    /// The player ended the round early.
    Knock { player: PlayerId },
}

impl Movement {
    #[must_use]
    pub fn kind(&self) -> MovementKind {
        match self {
            Movement::Flip { .. } => MovementKind::Flip,
            Movement::Swap { .. } => MovementKind::Swap,
            Movement::Draw {
                source: DrawSource::Deck,
                ..
            } => MovementKind::DrawDeck,
            Movement::Draw {
                source: DrawSource::Discard,
                ..
            } => MovementKind::DrawDiscard,
            Movement::Discard { .. } => MovementKind::Discard,
            Movement::Knock { .. } => MovementKind::Knock,
        }
    }

    /// The player the movement is attributed to.
    #[must_use]
    pub fn player(&self) -> &PlayerId {
        match self {
            Movement::Flip { player, .. }
            | Movement::Swap { player, .. }
            | Movement::Draw { player, .. }
            | Movement::Discard { player, .. }
            | Movement::Knock { player } => player,
        }
    }

    /// Hand position touched, if any.
    #[must_use]
    pub fn position(&self) -> Option<HandPosition> {
        match self {
            Movement::Flip { position, .. } | Movement::Swap { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// The card that moved, when known.
    #[must_use]
    pub fn card(&self) -> Option<&Card> {
        match self {
            Movement::Flip { card, .. } | Movement::Swap { card, .. } => Some(card),
            Movement::Draw { card, .. } | Movement::Discard { card, .. } => card.as_ref(),
            Movement::Knock { .. } => None,
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.kind(), self.player())?;
        if let Some(position) = self.position() {
            write!(f, " at {position}")?;
        }
        if let Some(card) = self.card() {
            write!(f, " ({card})")?;
        }
        Ok(())
    }
}

#![forbid(unsafe_code)]

//! Authoritative table snapshots.
//!
//! A [`Snapshot`] is always a complete description of the table as the
//! authority sees it; the client derives deltas itself. Snapshots are never
//! mutated client-side, only superseded by the next push.
//!
//! # Invariants
//!
//! 1. Every [`Hand`] has exactly [`HAND_SIZE`] slots. A slot the authority did
//!    not describe is `None`, and the snapshot is marked [`Integrity::Partial`].
//! 2. [`HandPosition`] is always in `0..HAND_SIZE`.
//! 3. Unknown phases and rule names are preserved verbatim, never dropped.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::card::Card;

/// Cards per hand.
pub const HAND_SIZE: usize = 6;

/// Columns in the 2×3 hand grid.
pub const HAND_COLUMNS: usize = 3;

/// Opaque player identifier assigned by the authority.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A slot index in a hand, laid out row-major in a 2×3 grid:
///
/// ```text
/// 0 1 2
/// 3 4 5
/// ```
///
/// Cards in the same column pair up for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HandPosition(u8);

impl HandPosition {
    /// All positions in scan order.
    pub const ALL: [HandPosition; HAND_SIZE] = [
        HandPosition(0),
        HandPosition(1),
        HandPosition(2),
        HandPosition(3),
        HandPosition(4),
        HandPosition(5),
    ];

    /// Create a position, rejecting out-of-range indices.
    #[must_use]
    pub const fn new(index: usize) -> Option<Self> {
        if index < HAND_SIZE {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Grid row (0 = top).
    #[inline]
    #[must_use]
    pub const fn row(self) -> usize {
        self.index() / HAND_COLUMNS
    }

    /// Grid column (0 = left).
    #[inline]
    #[must_use]
    pub const fn column(self) -> usize {
        self.index() % HAND_COLUMNS
    }

    /// The other slot in the same column.
    #[inline]
    #[must_use]
    pub const fn column_partner(self) -> Self {
        Self(((self.index() + HAND_COLUMNS) % HAND_SIZE) as u8)
    }
}

impl TryFrom<u8> for HandPosition {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(usize::from(value)).ok_or_else(|| format!("hand position {value} out of range"))
    }
}

impl From<HandPosition> for u8 {
    fn from(position: HandPosition) -> Self {
        position.0
    }
}

impl fmt::Display for HandPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Six ordered card slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hand([Option<Card>; HAND_SIZE]);

impl Hand {
    #[must_use]
    pub const fn new(slots: [Option<Card>; HAND_SIZE]) -> Self {
        Self(slots)
    }

    /// A hand with every slot filled.
    #[must_use]
    pub fn full(cards: [Card; HAND_SIZE]) -> Self {
        Self(cards.map(Some))
    }

    #[inline]
    #[must_use]
    pub fn get(&self, position: HandPosition) -> Option<&Card> {
        self.0[position.index()].as_ref()
    }

    /// Iterate `(position, slot)` pairs in scan order.
    pub fn slots(&self) -> impl Iterator<Item = (HandPosition, Option<&Card>)> + '_ {
        HandPosition::ALL
            .into_iter()
            .map(move |p| (p, self.0[p.index()].as_ref()))
    }

    /// Number of face-up cards.
    #[must_use]
    pub fn face_up_count(&self) -> usize {
        self.0.iter().flatten().filter(|c| c.is_face_up()).count()
    }

    /// Whether every described slot is face-up.
    #[must_use]
    pub fn all_face_up(&self) -> bool {
        self.0.iter().all(|slot| slot.is_some_and(|c| c.is_face_up()))
    }
}

/// Round/turn phase as reported by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    AwaitingInitialFlip,
    ActiveTurn,
    FinalTurn,
    RoundOver,
    GameOver,
    /// A phase this client does not know. Carried verbatim.
    Unknown(String),
}

impl Phase {
    /// Parse the authority's phase token.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token {
            "awaiting-initial-flip" => Phase::AwaitingInitialFlip,
            "active-turn" => Phase::ActiveTurn,
            "final-turn" => Phase::FinalTurn,
            "round-over" => Phase::RoundOver,
            "game-over" => Phase::GameOver,
            other => Phase::Unknown(other.to_string()),
        }
    }

    /// Phases in which turns are being played.
    #[inline]
    #[must_use]
    pub fn is_in_play(&self) -> bool {
        matches!(self, Phase::ActiveTurn | Phase::FinalTurn)
    }

    /// Phases after the last turn of a round.
    #[inline]
    #[must_use]
    pub fn is_round_end(&self) -> bool {
        matches!(self, Phase::RoundOver | Phase::GameOver)
    }

    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Phase::AwaitingInitialFlip => "awaiting-initial-flip",
            Phase::ActiveTurn => "active-turn",
            Phase::FinalTurn => "final-turn",
            Phase::RoundOver => "round-over",
            Phase::GameOver => "game-over",
            Phase::Unknown(raw) => raw,
        }
    }
}

bitflags! {
    /// Rule toggles the client needs to gate its own affordances.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RuleFlags: u16 {
        /// After discarding a drawn card the player flips one face-down card.
        const FLIP_ON_DISCARD = 1 << 0;
        /// A face-down card may be flipped instead of drawing.
        const FLIP_AS_ACTION = 1 << 1;
        /// A player may end the round early by knocking.
        const KNOCK_EARLY = 1 << 2;
        /// Jokers are in the deck.
        const JOKERS = 1 << 3;
    }
}

impl RuleFlags {
    /// Map a rule name to its flag.
    #[must_use]
    pub fn from_rule_token(name: &str) -> Option<Self> {
        match name {
            "flip-on-discard" => Some(Self::FLIP_ON_DISCARD),
            "flip-as-action" => Some(Self::FLIP_AS_ACTION),
            "knock-early" => Some(Self::KNOCK_EARLY),
            "jokers" => Some(Self::JOKERS),
            _ => None,
        }
    }
}

/// Active rules: known flags plus names this client does not recognise.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActiveRules {
    pub flags: RuleFlags,
    pub unrecognised: Vec<String>,
}

impl ActiveRules {
    /// Build from the authority's list of rule names.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut rules = Self::default();
        for name in names {
            match RuleFlags::from_rule_token(name) {
                Some(flag) => rules.flags |= flag,
                None => rules.unrecognised.push(name.to_string()),
            }
        }
        rules
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, flag: RuleFlags) -> bool {
        self.flags.contains(flag)
    }
}

/// One seat at the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub is_computer_controlled: bool,
    pub hand: Hand,
    pub round_score: i32,
    pub total_score: i32,
    pub rounds_won: u32,
}

/// Whether the authority described every field this client relies on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Integrity {
    #[default]
    Complete,
    /// Fields that were missing or ill-typed, by wire name.
    Partial(Vec<String>),
}

/// Complete authoritative table state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: Phase,
    pub players: Vec<PlayerView>,
    pub current_player_id: Option<PlayerId>,
    pub discard_top: Option<Card>,
    pub deck_remaining: u32,
    pub held_card: Option<Card>,
    pub held_by_player_id: Option<PlayerId>,
    pub active_rules: ActiveRules,
    pub dealer_id: Option<PlayerId>,
    pub finisher_id: Option<PlayerId>,
    pub integrity: Integrity,
}

impl Snapshot {
    /// Look up a player by id.
    #[must_use]
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| &p.id == id)
    }

    /// Hand of a player, if seated.
    #[must_use]
    pub fn hand_of(&self, id: &PlayerId) -> Option<&Hand> {
        self.player(id).map(|p| &p.hand)
    }

    #[inline]
    #[must_use]
    pub fn is_partial(&self) -> bool {
        matches!(self.integrity, Integrity::Partial(_))
    }

    /// Whether it is `id`'s turn.
    #[must_use]
    pub fn is_turn_of(&self, id: &PlayerId) -> bool {
        self.current_player_id.as_ref() == Some(id)
    }

    /// Whether `id` holds the drawn card.
    #[must_use]
    pub fn is_held_by(&self, id: &PlayerId) -> bool {
        self.held_card.is_some() && self.held_by_player_id.as_ref() == Some(id)
    }

    /// Seat order as sent by the authority.
    pub fn seat_order(&self) -> impl Iterator<Item = &PlayerId> + '_ {
        self.players.iter().map(|p| &p.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardFace, Rank, Suit};

    #[test]
    fn positions_pair_by_column() {
        let p0 = HandPosition::new(0).unwrap();
        let p4 = HandPosition::new(4).unwrap();
        assert_eq!(p0.column_partner().index(), 3);
        assert_eq!(p4.column_partner().index(), 1);
        assert_eq!(p4.row(), 1);
        assert_eq!(p4.column(), 1);
        assert!(HandPosition::new(6).is_none());
    }

    #[test]
    fn unknown_phase_is_preserved() {
        let phase = Phase::parse("sudden-death");
        assert_eq!(phase, Phase::Unknown("sudden-death".into()));
        assert_eq!(phase.token(), "sudden-death");
        assert!(!phase.is_in_play());
    }

    #[test]
    fn rules_keep_unrecognised_names() {
        let rules = ActiveRules::from_names(["knock-early", "wolfpack", "jokers"]);
        assert!(rules.contains(RuleFlags::KNOCK_EARLY | RuleFlags::JOKERS));
        assert!(!rules.contains(RuleFlags::FLIP_AS_ACTION));
        assert_eq!(rules.unrecognised, vec!["wolfpack".to_string()]);
    }

    #[test]
    fn rule_tokens_are_the_wire_names() {
        assert_eq!(
            RuleFlags::from_rule_token("flip-as-action"),
            Some(RuleFlags::FLIP_AS_ACTION)
        );
        assert_eq!(RuleFlags::from_rule_token("FLIP_AS_ACTION"), None);
        // Constant names still resolve through the generated lookup.
        assert_eq!(
            RuleFlags::from_name("FLIP_AS_ACTION"),
            Some(RuleFlags::FLIP_AS_ACTION)
        );
    }

    #[test]
    fn hand_counts_face_up_cards() {
        let up = Card::face_up(CardFace::new(Rank::Five, Suit::Hearts), 0);
        let down = Card::face_down(None, 0);
        let hand = Hand::full([up, down, down, up, down, down]);
        assert_eq!(hand.face_up_count(), 2);
        assert!(!hand.all_face_up());
        assert!(Hand::default().slots().all(|(_, slot)| slot.is_none()));
    }
}

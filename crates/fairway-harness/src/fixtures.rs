#![forbid(unsafe_code)]

//! Snapshot builders for tests.
//!
//! ```
//! use fairway_harness::fixtures::{SnapshotBuilder, card};
//! use fairway_core::snapshot::Phase;
//!
//! let snapshot = SnapshotBuilder::new()
//!     .player("ada", false)
//!     .player("bot", true)
//!     .phase(Phase::ActiveTurn)
//!     .current("ada")
//!     .discard(card("7h", 40))
//!     .build();
//! assert_eq!(snapshot.players.len(), 2);
//! ```

use fairway_core::card::{Card, CardFace, Rank, Suit};
use fairway_core::snapshot::{
    ActiveRules, HAND_SIZE, Hand, HandPosition, Integrity, Phase, PlayerId, PlayerView, RuleFlags,
    Snapshot,
};

/// A face-up card from a short token: rank then suit letter (`"7h"`,
/// `"10s"`, `"Kc"`, `"JOKER"`).
///
/// # Panics
///
/// On an unparseable token.
#[must_use]
pub fn card(token: &str, deck_index: u32) -> Card {
    Card::face_up(face(token), deck_index)
}

/// A face-down card whose face the client never sees.
#[must_use]
pub fn hidden(deck_index: u32) -> Card {
    Card::face_down(None, deck_index)
}

/// Parse a short face token.
///
/// # Panics
///
/// On an unparseable token.
#[must_use]
pub fn face(token: &str) -> CardFace {
    if token.eq_ignore_ascii_case("joker") {
        return CardFace::joker();
    }
    let split = token.len().saturating_sub(1);
    let (rank, suit) = token.split_at(split);
    let rank = Rank::parse(rank).unwrap_or_else(|| panic!("bad rank in {token:?}"));
    let suit = Suit::parse(suit).unwrap_or_else(|| panic!("bad suit in {token:?}"));
    CardFace::new(rank, suit)
}

/// Position shorthand.
///
/// # Panics
///
/// When `index >= HAND_SIZE`.
#[must_use]
pub fn pos(index: usize) -> HandPosition {
    HandPosition::new(index).unwrap_or_else(|| panic!("hand position {index} out of range"))
}

/// A hand of six face-down cards with deck indices `base..base + 6`.
#[must_use]
pub fn hidden_hand(base: u32) -> Hand {
    Hand::full(std::array::from_fn(|i| hidden(base + i as u32)))
}

/// Fluent [`Snapshot`] construction.
///
/// Players get a hidden hand with distinct deck indices unless one is set
/// with [`hand`](Self::hand) or [`slot`](Self::slot).
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot {
                phase: Phase::ActiveTurn,
                players: Vec::new(),
                current_player_id: None,
                discard_top: None,
                deck_remaining: 40,
                held_card: None,
                held_by_player_id: None,
                active_rules: ActiveRules::default(),
                dealer_id: None,
                finisher_id: None,
                integrity: Integrity::Complete,
            },
        }
    }

    /// Start from an existing snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    #[must_use]
    pub fn player(mut self, id: &str, computer: bool) -> Self {
        let base = 100 + (self.snapshot.players.len() * HAND_SIZE) as u32;
        self.snapshot.players.push(PlayerView {
            id: PlayerId::new(id),
            name: id.to_string(),
            is_host: self.snapshot.players.is_empty(),
            is_computer_controlled: computer,
            hand: hidden_hand(base),
            round_score: 0,
            total_score: 0,
            rounds_won: 0,
        });
        self
    }

    #[must_use]
    pub fn phase(mut self, phase: Phase) -> Self {
        self.snapshot.phase = phase;
        self
    }

    #[must_use]
    pub fn current(mut self, id: &str) -> Self {
        self.snapshot.current_player_id = Some(PlayerId::new(id));
        self
    }

    #[must_use]
    pub fn no_current(mut self) -> Self {
        self.snapshot.current_player_id = None;
        self
    }

    #[must_use]
    pub fn discard(mut self, card: Card) -> Self {
        self.snapshot.discard_top = Some(card);
        self
    }

    #[must_use]
    pub fn empty_discard(mut self) -> Self {
        self.snapshot.discard_top = None;
        self
    }

    #[must_use]
    pub fn deck(mut self, remaining: u32) -> Self {
        self.snapshot.deck_remaining = remaining;
        self
    }

    #[must_use]
    pub fn held(mut self, by: &str, card: Card) -> Self {
        self.snapshot.held_card = Some(card);
        self.snapshot.held_by_player_id = Some(PlayerId::new(by));
        self
    }

    #[must_use]
    pub fn not_held(mut self) -> Self {
        self.snapshot.held_card = None;
        self.snapshot.held_by_player_id = None;
        self
    }

    #[must_use]
    pub fn rules(mut self, flags: RuleFlags) -> Self {
        self.snapshot.active_rules.flags = flags;
        self
    }

    #[must_use]
    pub fn finisher(mut self, id: &str) -> Self {
        self.snapshot.finisher_id = Some(PlayerId::new(id));
        self
    }

    #[must_use]
    pub fn dealer(mut self, id: &str) -> Self {
        self.snapshot.dealer_id = Some(PlayerId::new(id));
        self
    }

    /// Replace one card in `player`'s hand.
    ///
    /// # Panics
    ///
    /// When `player` has not been added.
    #[must_use]
    pub fn slot(mut self, player: &str, position: usize, card: Card) -> Self {
        let view = self.player_mut(player);
        let mut slots: [Option<Card>; HAND_SIZE] =
            std::array::from_fn(|i| view.hand.get(pos(i)).copied());
        slots[pos(position).index()] = Some(card);
        view.hand = Hand::new(slots);
        self
    }

    /// Replace `player`'s whole hand.
    ///
    /// # Panics
    ///
    /// When `player` has not been added.
    #[must_use]
    pub fn hand(mut self, player: &str, hand: Hand) -> Self {
        self.player_mut(player).hand = hand;
        self
    }

    /// Turn every card in every hand face-up.
    #[must_use]
    pub fn reveal_all(mut self) -> Self {
        for player in &mut self.snapshot.players {
            let slots: [Option<Card>; HAND_SIZE] = std::array::from_fn(|i| {
                player
                    .hand
                    .get(pos(i))
                    .map(|c| c.revealed().unwrap_or(*c))
            });
            player.hand = Hand::new(slots);
        }
        self
    }

    #[must_use]
    pub fn scores(mut self, player: &str, round: i32, total: i32) -> Self {
        let view = self.player_mut(player);
        view.round_score = round;
        view.total_score = total;
        self
    }

    #[must_use]
    pub fn partial(mut self, missing: &[&str]) -> Self {
        self.snapshot.integrity =
            Integrity::Partial(missing.iter().map(|m| (*m).to_string()).collect());
        self
    }

    #[must_use]
    pub fn build(self) -> Snapshot {
        self.snapshot
    }

    fn player_mut(&mut self, id: &str) -> &mut PlayerView {
        self.snapshot
            .players
            .iter_mut()
            .find(|p| p.id.as_str() == id)
            .unwrap_or_else(|| panic!("no player {id:?} in builder"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_tokens() {
        assert_eq!(face("10s"), CardFace::new(Rank::Ten, Suit::Spades));
        assert_eq!(face("Kc"), CardFace::new(Rank::King, Suit::Clubs));
        assert_eq!(face("joker"), CardFace::joker());
    }

    #[test]
    fn players_get_distinct_hidden_hands() {
        let s = SnapshotBuilder::new().player("a", false).player("b", true).build();
        let a = s.players[0].hand.get(pos(0)).unwrap().deck_index();
        let b = s.players[1].hand.get(pos(0)).unwrap().deck_index();
        assert_ne!(a, b);
        assert!(s.players[0].is_host);
        assert!(!s.players[1].is_host);
    }

    #[test]
    fn slot_replaces_one_card() {
        let s = SnapshotBuilder::new()
            .player("a", false)
            .slot("a", 2, card("Qd", 7))
            .build();
        assert_eq!(s.players[0].hand.face_up_count(), 1);
        assert_eq!(s.players[0].hand.get(pos(2)).unwrap().deck_index(), 7);
    }
}

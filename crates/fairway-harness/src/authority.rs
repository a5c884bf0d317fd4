#![forbid(unsafe_code)]

//! A small in-process authority for six-card Golf.
//!
//! [`ScriptedAuthority`] deals from a seeded deck, applies action messages
//! from any seat, and produces the snapshots and frames a real authority
//! would send. It exists to drive sessions end to end in tests and in the
//! replay binary; it enforces enough of the rules to reject what a real
//! authority would reject, and no more.
//!
//! Scoring per column: a matching pair scores zero, otherwise both cards
//! count. Kings are 0, jokers -2, jacks and queens 10, others face value.

use fairway_core::card::{Card, CardFace, Rank, Suit};
use fairway_core::movement::DrawSource;
use fairway_core::snapshot::{
    ActiveRules, HAND_COLUMNS, HAND_SIZE, Hand, HandPosition, Integrity, Phase, PlayerId,
    PlayerView, RuleFlags, Snapshot,
};
use fairway_core::wire::{ActionMessage, card_to_value, snapshot_frame};
use serde_json::json;

/// Cards each player turns before the first turn.
pub const INITIAL_FLIPS: usize = 2;

/// Why the authority refused an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection(pub String);

impl Rejection {
    fn new(message: &str) -> Self {
        Self(message.to_string())
    }

    /// The `error` frame carrying this rejection.
    #[must_use]
    pub fn frame(&self) -> String {
        json!({ "type": "error", "message": self.0 }).to_string()
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Rejection {}

/// Deterministic LCG for shuffling.
#[derive(Debug, Clone)]
struct Lcg(u64);

impl Lcg {
    fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 16
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

/// Point value of a face.
#[must_use]
pub fn card_value(face: CardFace) -> i32 {
    match face.rank {
        Rank::Joker => -2,
        Rank::King => 0,
        Rank::Jack | Rank::Queen => 10,
        rank => i32::from(rank.ordinal()),
    }
}

/// Score a fully revealed hand.
#[must_use]
pub fn score_hand(hand: &Hand) -> i32 {
    let face_at = |i: usize| {
        HandPosition::new(i)
            .and_then(|p| hand.get(p))
            .and_then(Card::revealed)
            .and_then(|c| c.identity())
    };
    (0..HAND_COLUMNS)
        .map(|column| match (face_at(column), face_at(column + HAND_COLUMNS)) {
            (Some(top), Some(bottom)) if top.rank == bottom.rank => 0,
            (top, bottom) => top.map_or(0, card_value) + bottom.map_or(0, card_value),
        })
        .sum()
}

fn with_slot(hand: &Hand, position: HandPosition, card: Card) -> Hand {
    let mut slots: [Option<Card>; HAND_SIZE] = std::array::from_fn(|i| {
        HandPosition::new(i).and_then(|p| hand.get(p)).copied()
    });
    slots[position.index()] = Some(card);
    Hand::new(slots)
}

fn face_up(card: Card) -> Card {
    card.revealed().unwrap_or(card)
}

/// In-process authority.
#[derive(Debug, Clone)]
pub struct ScriptedAuthority {
    snapshot: Snapshot,
    deck: Vec<Card>,
    discard: Vec<Card>,
    drew_from: Option<DrawSource>,
    owes_flip: bool,
    round: u32,
    rng: Lcg,
}

impl ScriptedAuthority {
    /// Seat `players` (id, computer-controlled) and deal the first round.
    ///
    /// # Panics
    ///
    /// When no players are given.
    #[must_use]
    pub fn new(players: &[(&str, bool)], flags: RuleFlags, seed: u64) -> Self {
        assert!(!players.is_empty(), "a table needs players");
        let seats = players
            .iter()
            .enumerate()
            .map(|(i, (id, computer))| PlayerView {
                id: PlayerId::new(*id),
                name: (*id).to_string(),
                is_host: i == 0,
                is_computer_controlled: *computer,
                hand: Hand::default(),
                round_score: 0,
                total_score: 0,
                rounds_won: 0,
            })
            .collect();
        let mut authority = Self {
            snapshot: Snapshot {
                phase: Phase::AwaitingInitialFlip,
                players: seats,
                current_player_id: None,
                discard_top: None,
                deck_remaining: 0,
                held_card: None,
                held_by_player_id: None,
                active_rules: ActiveRules {
                    flags,
                    unrecognised: Vec::new(),
                },
                dealer_id: None,
                finisher_id: None,
                integrity: Integrity::Complete,
            },
            deck: Vec::new(),
            discard: Vec::new(),
            drew_from: None,
            owes_flip: false,
            round: 0,
            rng: Lcg(seed),
        };
        authority.deal();
        authority
    }

    fn deal(&mut self) {
        let jokers = self.snapshot.active_rules.contains(RuleFlags::JOKERS);
        let mut faces: Vec<CardFace> = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades]
            .into_iter()
            .flat_map(|suit| {
                Rank::ALL
                    .into_iter()
                    .filter(|r| *r != Rank::Joker)
                    .map(move |rank| CardFace::new(rank, suit))
            })
            .collect();
        if jokers {
            faces.push(CardFace::joker());
            faces.push(CardFace::joker());
        }
        let mut deck: Vec<Card> = faces
            .into_iter()
            .enumerate()
            .map(|(i, face)| Card::face_down(Some(face), i as u32))
            .collect();
        for i in (1..deck.len()).rev() {
            let j = self.rng.below(i + 1);
            deck.swap(i, j);
        }
        self.deck = deck;
        self.discard.clear();

        for seat in 0..self.snapshot.players.len() {
            let cards: [Card; HAND_SIZE] =
                std::array::from_fn(|_| self.deck.pop().unwrap_or(Card::face_down(None, 0)));
            let player = &mut self.snapshot.players[seat];
            player.hand = Hand::full(cards);
            player.round_score = 0;
        }
        if let Some(top) = self.deck.pop() {
            self.discard.push(face_up(top));
        }

        let seats = self.snapshot.players.len();
        let dealer = self.round as usize % seats;
        self.snapshot.dealer_id = Some(self.snapshot.players[dealer].id.clone());
        self.snapshot.current_player_id =
            Some(self.snapshot.players[(dealer + 1) % seats].id.clone());
        self.snapshot.phase = Phase::AwaitingInitialFlip;
        self.snapshot.finisher_id = None;
        self.snapshot.held_card = None;
        self.snapshot.held_by_player_id = None;
        self.drew_from = None;
        self.owes_flip = false;
        self.sync_piles();
    }

    fn sync_piles(&mut self) {
        self.snapshot.deck_remaining = self.deck.len() as u32;
        self.snapshot.discard_top = self.discard.last().copied();
    }

    /// The current authoritative state.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// The current state as a `snapshot` frame.
    #[must_use]
    pub fn frame(&self) -> String {
        snapshot_frame(&self.snapshot)
    }

    /// The `action-confirmed` frame for a drawn card.
    #[must_use]
    pub fn confirmed_frame(card: Option<Card>) -> String {
        json!({
            "type": "action-confirmed",
            "card": card.as_ref().map(card_to_value),
        })
        .to_string()
    }

    fn seat(&self, player: &PlayerId) -> Result<usize, Rejection> {
        self.snapshot
            .players
            .iter()
            .position(|p| &p.id == player)
            .ok_or_else(|| Rejection::new("not seated"))
    }

    fn require_turn(&self, player: &PlayerId) -> Result<usize, Rejection> {
        let seat = self.seat(player)?;
        if !self.snapshot.phase.is_in_play() {
            return Err(Rejection::new("not in play"));
        }
        if !self.snapshot.is_turn_of(player) {
            return Err(Rejection::new("not your turn"));
        }
        Ok(seat)
    }

    /// Apply `action` from `player`. A draw returns the drawn card for the
    /// `action-confirmed` frame.
    pub fn apply(
        &mut self,
        player: &PlayerId,
        action: &ActionMessage,
    ) -> Result<Option<Card>, Rejection> {
        match action {
            ActionMessage::FlipInitial { positions } => {
                let seat = self.seat(player)?;
                if self.snapshot.phase != Phase::AwaitingInitialFlip {
                    return Err(Rejection::new("initial flips are over"));
                }
                let hand = self.snapshot.players[seat].hand;
                let mut distinct = positions.clone();
                distinct.sort();
                distinct.dedup();
                if distinct.len() != INITIAL_FLIPS || hand.face_up_count() != 0 {
                    return Err(Rejection::new("flip exactly two cards"));
                }
                let mut hand = hand;
                for position in distinct {
                    if let Some(card) = hand.get(position).copied() {
                        hand = with_slot(&hand, position, face_up(card));
                    }
                }
                self.snapshot.players[seat].hand = hand;
                if self
                    .snapshot
                    .players
                    .iter()
                    .all(|p| p.hand.face_up_count() >= INITIAL_FLIPS)
                {
                    self.snapshot.phase = Phase::ActiveTurn;
                }
                Ok(None)
            }
            ActionMessage::Draw { source } => {
                self.require_turn(player)?;
                if self.snapshot.held_card.is_some() || self.owes_flip {
                    return Err(Rejection::new("already drew"));
                }
                let drawn = match source {
                    DrawSource::Deck => self.deck.pop(),
                    DrawSource::Discard => self.discard.pop(),
                }
                .ok_or_else(|| Rejection::new("pile is empty"))?;
                let drawn = face_up(drawn);
                self.snapshot.held_card = Some(drawn);
                self.snapshot.held_by_player_id = Some(player.clone());
                self.drew_from = Some(*source);
                self.sync_piles();
                Ok(Some(drawn))
            }
            ActionMessage::Swap { position } => {
                let seat = self.require_turn(player)?;
                let held = self
                    .snapshot
                    .held_card
                    .ok_or_else(|| Rejection::new("nothing held"))?;
                let hand = self.snapshot.players[seat].hand;
                let displaced = hand
                    .get(*position)
                    .copied()
                    .ok_or_else(|| Rejection::new("empty position"))?;
                self.snapshot.players[seat].hand = with_slot(&hand, *position, held);
                self.discard.push(face_up(displaced));
                self.release_held();
                self.end_turn(seat);
                Ok(None)
            }
            ActionMessage::Discard => {
                let seat = self.require_turn(player)?;
                let held = self
                    .snapshot
                    .held_card
                    .ok_or_else(|| Rejection::new("nothing held"))?;
                if self.drew_from == Some(DrawSource::Discard) {
                    return Err(Rejection::new("must swap a card taken from the discard"));
                }
                self.discard.push(held);
                self.release_held();
                let flip_owed = self
                    .snapshot
                    .active_rules
                    .contains(RuleFlags::FLIP_ON_DISCARD)
                    && !self.snapshot.players[seat].hand.all_face_up();
                if flip_owed {
                    self.owes_flip = true;
                } else {
                    self.end_turn(seat);
                }
                Ok(None)
            }
            ActionMessage::FlipAsAction { position } => {
                let seat = self.require_turn(player)?;
                if self.snapshot.held_card.is_some() {
                    return Err(Rejection::new("holding a card"));
                }
                let allowed = self.owes_flip
                    || self.snapshot.active_rules.contains(RuleFlags::FLIP_AS_ACTION);
                if !allowed {
                    return Err(Rejection::new("flip not allowed"));
                }
                let hand = self.snapshot.players[seat].hand;
                let card = hand
                    .get(*position)
                    .copied()
                    .filter(|c| !c.is_face_up())
                    .ok_or_else(|| Rejection::new("already face up"))?;
                self.snapshot.players[seat].hand = with_slot(&hand, *position, face_up(card));
                self.owes_flip = false;
                self.end_turn(seat);
                Ok(None)
            }
            ActionMessage::SkipFlip => {
                let seat = self.require_turn(player)?;
                if !self.owes_flip {
                    return Err(Rejection::new("no flip owed"));
                }
                self.owes_flip = false;
                self.end_turn(seat);
                Ok(None)
            }
            ActionMessage::KnockEarly => {
                let seat = self.require_turn(player)?;
                if !self.snapshot.active_rules.contains(RuleFlags::KNOCK_EARLY)
                    || self.snapshot.phase != Phase::ActiveTurn
                    || self.snapshot.held_card.is_some()
                {
                    return Err(Rejection::new("cannot knock now"));
                }
                self.snapshot.finisher_id = Some(player.clone());
                self.snapshot.phase = Phase::FinalTurn;
                self.end_turn(seat);
                Ok(None)
            }
            ActionMessage::NextRound => {
                self.seat(player)?;
                if self.snapshot.phase != Phase::RoundOver {
                    return Err(Rejection::new("round not over"));
                }
                self.round += 1;
                self.deal();
                Ok(None)
            }
        }
    }

    fn release_held(&mut self) {
        self.snapshot.held_card = None;
        self.snapshot.held_by_player_id = None;
        self.drew_from = None;
        self.sync_piles();
    }

    fn end_turn(&mut self, seat: usize) {
        if self.snapshot.phase == Phase::ActiveTurn
            && self.snapshot.players[seat].hand.all_face_up()
        {
            self.snapshot.finisher_id = Some(self.snapshot.players[seat].id.clone());
            self.snapshot.phase = Phase::FinalTurn;
        }
        let next = (seat + 1) % self.snapshot.players.len();
        let next_id = self.snapshot.players[next].id.clone();
        if self.snapshot.phase == Phase::FinalTurn
            && self.snapshot.finisher_id.as_ref() == Some(&next_id)
        {
            self.end_round();
            return;
        }
        self.snapshot.current_player_id = Some(next_id);
    }

    fn end_round(&mut self) {
        for player in &mut self.snapshot.players {
            let slots: [Option<Card>; HAND_SIZE] = std::array::from_fn(|i| {
                HandPosition::new(i)
                    .and_then(|p| player.hand.get(p))
                    .map(|c| face_up(*c))
            });
            player.hand = Hand::new(slots);
            player.round_score = score_hand(&player.hand);
            player.total_score += player.round_score;
        }
        if let Some(best) = self.snapshot.players.iter().map(|p| p.round_score).min() {
            for player in &mut self.snapshot.players {
                if player.round_score == best {
                    player.rounds_won += 1;
                }
            }
        }
        self.snapshot.phase = Phase::RoundOver;
        self.snapshot.current_player_id = None;
    }

    /// A sensible action for `player` right now, if they have one.
    #[must_use]
    pub fn suggest(&self, player: &PlayerId) -> Option<ActionMessage> {
        let seat = self.seat(player).ok()?;
        let hand = self.snapshot.players[seat].hand;
        let face_down: Vec<HandPosition> = HandPosition::ALL
            .into_iter()
            .filter(|p| hand.get(*p).is_some_and(|c| !c.is_face_up()))
            .collect();

        if self.snapshot.phase == Phase::AwaitingInitialFlip {
            if hand.face_up_count() > 0 {
                return None;
            }
            let positions = face_down.iter().take(INITIAL_FLIPS).copied().collect();
            return Some(ActionMessage::FlipInitial { positions });
        }
        if !self.snapshot.phase.is_in_play() || !self.snapshot.is_turn_of(player) {
            return None;
        }
        if self.owes_flip {
            return Some(match face_down.first() {
                Some(position) => ActionMessage::FlipAsAction {
                    position: *position,
                },
                None => ActionMessage::SkipFlip,
            });
        }

        let value_at = |p: HandPosition| {
            hand.get(p)
                .and_then(|c| c.identity())
                .map(card_value)
        };
        // Worst face-up card, if it is worse than `value`.
        let worst_above = |value: i32| {
            HandPosition::ALL
                .into_iter()
                .filter_map(|p| value_at(p).map(|v| (v, p)))
                .filter(|(v, _)| *v > value)
                .max_by_key(|(v, p)| (*v, std::cmp::Reverse(*p)))
                .map(|(_, p)| p)
        };

        match self.snapshot.held_card.and_then(|c| c.identity()) {
            Some(held) => {
                let value = card_value(held);
                let first_down = face_down.first().copied();
                // Taking from the discard, or an empty deck, must make progress.
                let must_place = self.drew_from == Some(DrawSource::Discard) || self.deck.is_empty();
                let position = if must_place {
                    first_down
                        .or_else(|| worst_above(value))
                        .or(HandPosition::new(0))
                } else if value <= 4 && first_down.is_some() {
                    first_down
                } else {
                    worst_above(value)
                };
                Some(match position {
                    Some(position) => ActionMessage::Swap { position },
                    None => ActionMessage::Discard,
                })
            }
            None => {
                let discard_value = self
                    .snapshot
                    .discard_top
                    .and_then(|c| c.identity())
                    .map(card_value);
                let take_discard = discard_value.is_some_and(|v| v <= 3);
                if take_discard || self.deck.is_empty() {
                    if self.discard.is_empty() {
                        return None;
                    }
                    Some(ActionMessage::Draw {
                        source: DrawSource::Discard,
                    })
                } else {
                    Some(ActionMessage::Draw {
                        source: DrawSource::Deck,
                    })
                }
            }
        }
    }

    /// The next computer-controlled move, if one is due.
    #[must_use]
    pub fn autoplay(&self) -> Option<(PlayerId, ActionMessage)> {
        self.snapshot
            .players
            .iter()
            .filter(|p| p.is_computer_controlled)
            .find_map(|p| self.suggest(&p.id).map(|action| (p.id.clone(), action)))
    }

    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{face, pos};

    fn table() -> ScriptedAuthority {
        ScriptedAuthority::new(&[("ada", false), ("bot", true)], RuleFlags::empty(), 7)
    }

    fn ada() -> PlayerId {
        PlayerId::new("ada")
    }

    fn bot() -> PlayerId {
        PlayerId::new("bot")
    }

    #[test]
    fn deal_is_seeded_and_hidden() {
        let a = table();
        let b = table();
        assert_eq!(a.snapshot(), b.snapshot());
        assert_eq!(a.snapshot().phase, Phase::AwaitingInitialFlip);
        assert_eq!(a.snapshot().deck_remaining, 52 - 12 - 1);
        assert!(a.snapshot().players.iter().all(|p| p.hand.face_up_count() == 0));
        assert!(a.snapshot().discard_top.unwrap().is_face_up());
    }

    #[test]
    fn initial_flips_start_play() {
        let mut a = table();
        let flip = ActionMessage::FlipInitial {
            positions: vec![pos(0), pos(4)],
        };
        a.apply(&ada(), &flip).unwrap();
        assert_eq!(a.snapshot().phase, Phase::AwaitingInitialFlip);
        assert!(a.apply(&ada(), &flip).is_err());
        a.apply(&bot(), &flip).unwrap();
        assert_eq!(a.snapshot().phase, Phase::ActiveTurn);
    }

    #[test]
    fn draw_then_discard_passes_the_turn() {
        let mut a = table();
        let flip = ActionMessage::FlipInitial {
            positions: vec![pos(0), pos(1)],
        };
        a.apply(&ada(), &flip).unwrap();
        a.apply(&bot(), &flip).unwrap();
        // Dealer is seat 0, so seat 1 plays first.
        assert!(a.snapshot().is_turn_of(&bot()));
        let err = a
            .apply(&ada(), &ActionMessage::Draw { source: DrawSource::Deck })
            .unwrap_err();
        assert_eq!(err.0, "not your turn");

        let before = a.snapshot().deck_remaining;
        let drawn = a
            .apply(&bot(), &ActionMessage::Draw { source: DrawSource::Deck })
            .unwrap()
            .unwrap();
        assert!(drawn.is_face_up());
        assert_eq!(a.snapshot().deck_remaining, before - 1);
        a.apply(&bot(), &ActionMessage::Discard).unwrap();
        assert_eq!(a.snapshot().discard_top, Some(drawn));
        assert!(a.snapshot().is_turn_of(&ada()));
    }

    #[test]
    fn discard_draw_must_be_swapped() {
        let mut a = table();
        let flip = ActionMessage::FlipInitial {
            positions: vec![pos(0), pos(1)],
        };
        a.apply(&ada(), &flip).unwrap();
        a.apply(&bot(), &flip).unwrap();
        a.apply(&bot(), &ActionMessage::Draw { source: DrawSource::Discard })
            .unwrap();
        assert!(a.apply(&bot(), &ActionMessage::Discard).is_err());
        a.apply(&bot(), &ActionMessage::Swap { position: pos(5) })
            .unwrap();
        assert!(a.snapshot().players[1].hand.get(pos(5)).unwrap().is_face_up());
    }

    #[test]
    fn column_pairs_cancel() {
        let cards = ["5h", "Kc", "9d", "5s", "2c", "Jh"]
            .map(|t| Card::face_up(face(t), 0));
        assert_eq!(score_hand(&Hand::full(cards)), 2 + 10 + 9);
    }

    #[test]
    fn autoplay_finishes_a_round() {
        let mut a = ScriptedAuthority::new(&[("b1", true), ("b2", true)], RuleFlags::empty(), 3);
        for _ in 0..500 {
            let Some((player, action)) = a.autoplay() else {
                break;
            };
            a.apply(&player, &action).unwrap();
        }
        assert_eq!(a.snapshot().phase, Phase::RoundOver);
        assert!(a.snapshot().players.iter().all(|p| p.hand.all_face_up()));
    }
}

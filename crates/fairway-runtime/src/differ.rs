#![forbid(unsafe_code)]

//! Movement inference from consecutive snapshots.
//!
//! The authority pushes complete table state and never says which action
//! produced it. [`StateDiffer`] compares the accepted snapshot with the next
//! one and names the discrete transitions in between, so the scheduler can
//! animate them.
//!
//! # Precondition
//!
//! At most one swap happens per turn. When several positions of the acting
//! player's hand changed in a way that could be a swap, the earliest position
//! wins; the others are treated as reveals or ignored.
//!
//! # Order
//!
//! Draws first, then the acting player's swap, discard, or flips, then
//! round-end reveals, then the knock.
//!
//! Malformed input degrades to "nothing inferred": if either snapshot is
//! partial the result is empty.

use std::collections::BTreeSet;

use fairway_core::card::Card;
use fairway_core::movement::{DrawSource, Movement};
use fairway_core::snapshot::{Hand, HandPosition, Phase, PlayerId, Snapshot};
use fairway_core::subject::SubjectKey;
use tracing::{debug, trace};

/// Infers movements, carrying the per-turn draw-cycle marker between calls.
///
/// The marker records that the acting player drew during the current turn.
/// While it is set, a change confined to the discard pile is half of a split
/// push and is not inferred as a discard. That covers both orders the
/// authority uses: discard first while the drawn card is still held, and
/// hand first with the discard trailing. It clears when the turn advances.
#[derive(Debug, Clone, Default)]
pub struct StateDiffer {
    draw_cycle: Option<PlayerId>,
}

impl StateDiffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the draw-cycle marker (round start, resync).
    pub fn reset(&mut self) {
        self.draw_cycle = None;
    }

    /// The player whose draw opened the current cycle, if any.
    #[must_use]
    pub fn draw_cycle_open(&self) -> Option<&PlayerId> {
        self.draw_cycle.as_ref()
    }

    /// Movements that take `previous` to `next`.
    pub fn diff(&mut self, previous: &Snapshot, next: &Snapshot) -> Vec<Movement> {
        if previous.is_partial() || next.is_partial() {
            debug!(target: "fairway.differ", "partial snapshot, no movements inferred");
            return Vec::new();
        }

        if previous.phase == Phase::AwaitingInitialFlip && next.phase != Phase::AwaitingInitialFlip {
            self.draw_cycle = None;
            let flips = reveals(previous, next, &BTreeSet::new());
            trace!(target: "fairway.differ", count = flips.len(), "initial flips");
            return flips;
        }
        if next.phase == Phase::AwaitingInitialFlip {
            return Vec::new();
        }

        let acting = previous.current_player_id.clone();
        if self.draw_cycle.is_some() && self.draw_cycle != acting {
            self.draw_cycle = None;
        }

        let mut draws = Vec::new();
        let mut moves = Vec::new();
        let mut attributed: BTreeSet<(PlayerId, HandPosition)> = BTreeSet::new();

        let discard_changed = card_changed(previous.discard_top.as_ref(), next.discard_top.as_ref());
        let newly_held = match (&previous.held_card, &next.held_card) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(before), Some(after)) => {
                before.deck_index() != after.deck_index()
                    || previous.held_by_player_id != next.held_by_player_id
            }
        };

        let mut draw_source = None;
        if newly_held {
            let holder = next.held_by_player_id.clone().or_else(|| acting.clone());
            if let Some(holder) = holder {
                let source = if discard_changed {
                    DrawSource::Discard
                } else {
                    DrawSource::Deck
                };
                draws.push(Movement::Draw {
                    player: holder.clone(),
                    source,
                    card: next.held_card,
                });
                draw_source = Some(source);
                self.draw_cycle = Some(holder);
            }
        } else if next.deck_remaining < previous.deck_remaining {
            if let Some(actor) = &acting {
                draws.push(Movement::Draw {
                    player: actor.clone(),
                    source: DrawSource::Deck,
                    card: None,
                });
                draw_source = Some(DrawSource::Deck);
                self.draw_cycle = Some(actor.clone());
            }
        }

        // A draw from the discard pile explains the discard change.
        let discard_moved = discard_changed && draw_source != Some(DrawSource::Discard);

        if let Some(actor) = &acting {
            if let (Some(before), Some(after)) = (previous.hand_of(actor), next.hand_of(actor)) {
                self.acting_moves(
                    actor,
                    before,
                    after,
                    previous,
                    next,
                    discard_moved,
                    draw_source.is_some(),
                    &mut moves,
                );
                attributed.extend(
                    moves
                        .iter()
                        .filter_map(|m| m.position().map(|p| (m.player().clone(), p))),
                );
            }
        }

        let mut out = draws;
        out.append(&mut moves);
        if next.phase.is_round_end() {
            out.extend(reveals(previous, next, &attributed));
        }
        if let Some(finisher) = &next.finisher_id {
            if previous.finisher_id.as_ref() != Some(finisher) {
                out.push(Movement::Knock {
                    player: finisher.clone(),
                });
            }
        }

        if previous.current_player_id != next.current_player_id {
            self.draw_cycle = None;
        }

        if !out.is_empty() {
            debug!(
                target: "fairway.differ",
                count = out.len(),
                first = %out[0],
                "movements inferred"
            );
        }
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn acting_moves(
        &self,
        actor: &PlayerId,
        before: &Hand,
        after: &Hand,
        previous: &Snapshot,
        next: &Snapshot,
        discard_moved: bool,
        drew: bool,
        out: &mut Vec<Movement>,
    ) {
        let turned: Vec<HandPosition> = HandPosition::ALL
            .into_iter()
            .filter(|p| turned_up(before.get(*p), after.get(*p)))
            .collect();
        let hand_changed = HandPosition::ALL
            .into_iter()
            .any(|p| card_changed(before.get(p), after.get(p)));

        let prev_held = previous.held_card.as_ref();
        let held_cleared = prev_held.is_some() && next.held_card.is_none();

        // The held card landed on the discard pile: any hand change in the
        // same push is the optional flip that follows a discard.
        let held_went_to_discard = held_cleared
            && prev_held.and_then(Card::identity).is_some()
            && prev_held.and_then(Card::identity)
                == next.discard_top.as_ref().and_then(Card::identity);
        if held_went_to_discard {
            out.push(Movement::Discard {
                player: actor.clone(),
                card: next.discard_top,
            });
            out.extend(turned.iter().filter_map(|&position| {
                after.get(position).map(|card| Movement::Flip {
                    player: actor.clone(),
                    position,
                    card: *card,
                })
            }));
            return;
        }

        let swapped_at = HandPosition::ALL.into_iter().find(|p| {
            let (b, a) = (before.get(*p), after.get(*p));
            (discard_moved && turned_up(b, a)) || identity_changed(b, a)
        });
        if let Some(position) = swapped_at {
            if let Some(card) = after.get(position) {
                out.push(Movement::Swap {
                    player: actor.clone(),
                    position,
                    card: *card,
                    discarded: next.discard_top.filter(|_| discard_moved),
                });
            }
            return;
        }

        // First half of a split push: held card placed, discard not yet sent.
        if held_cleared && !discard_moved {
            if let Some(&position) = turned.first() {
                if let Some(card) = after.get(position) {
                    out.push(Movement::Swap {
                        player: actor.clone(),
                        position,
                        card: *card,
                        discarded: None,
                    });
                }
                return;
            }
        }

        if !hand_changed && discard_moved {
            // Discard-first split: the displaced card is out, the drawn one still held.
            let still_holding = match (prev_held, next.held_card.as_ref()) {
                (Some(before), Some(after)) => {
                    before.deck_index() == after.deck_index()
                        && next.held_by_player_id.as_ref() == Some(actor)
                }
                _ => false,
            };
            let split =
                self.draw_cycle.as_ref() == Some(actor) && (prev_held.is_none() || still_holding);
            if split {
                trace!(
                    target: "fairway.differ",
                    player = %actor,
                    discard_first = still_holding,
                    "discard half of split push"
                );
            } else {
                out.push(Movement::Discard {
                    player: actor.clone(),
                    card: next.discard_top,
                });
            }
            return;
        }

        if !discard_moved && !drew && prev_held.is_none() {
            out.extend(turned.iter().filter_map(|&position| {
                after.get(position).map(|card| Movement::Flip {
                    player: actor.clone(),
                    position,
                    card: *card,
                })
            }));
        }
    }
}

/// Stateless diff with a fresh marker.
#[must_use]
pub fn diff(previous: &Snapshot, next: &Snapshot) -> Vec<Movement> {
    StateDiffer::new().diff(previous, next)
}

/// Subjects whose visible content differs between two snapshots.
///
/// A player present in only one of them touches all six of their slots.
#[must_use]
pub fn touched_subjects(previous: &Snapshot, next: &Snapshot) -> BTreeSet<SubjectKey> {
    let mut touched = BTreeSet::new();
    if previous.deck_remaining != next.deck_remaining {
        touched.insert(SubjectKey::Deck);
    }
    if card_changed(previous.discard_top.as_ref(), next.discard_top.as_ref()) {
        touched.insert(SubjectKey::Discard);
    }
    if card_changed(previous.held_card.as_ref(), next.held_card.as_ref())
        || previous.held_by_player_id != next.held_by_player_id
    {
        touched.insert(SubjectKey::Held);
    }

    let empty = Hand::default();
    for player in &next.players {
        let before = previous.hand_of(&player.id).unwrap_or(&empty);
        for position in HandPosition::ALL {
            if card_changed(before.get(position), player.hand.get(position)) {
                touched.insert(SubjectKey::slot(&player.id, position));
            }
        }
    }
    for player in &previous.players {
        if next.player(&player.id).is_none() {
            touched.extend(
                HandPosition::ALL
                    .into_iter()
                    .map(|position| SubjectKey::slot(&player.id, position)),
            );
        }
    }
    touched
}

/// Flips for every face-down→face-up change not already explained.
fn reveals(
    previous: &Snapshot,
    next: &Snapshot,
    attributed: &BTreeSet<(PlayerId, HandPosition)>,
) -> Vec<Movement> {
    let mut out = Vec::new();
    for player in &next.players {
        let Some(before) = previous.hand_of(&player.id) else {
            continue;
        };
        for position in HandPosition::ALL {
            if attributed.contains(&(player.id.clone(), position)) {
                continue;
            }
            let after = player.hand.get(position);
            if turned_up(before.get(position), after) {
                if let Some(card) = after {
                    out.push(Movement::Flip {
                        player: player.id.clone(),
                        position,
                        card: *card,
                    });
                }
            }
        }
    }
    out
}

fn card_changed(before: Option<&Card>, after: Option<&Card>) -> bool {
    match (before, after) {
        (None, None) => false,
        (Some(a), Some(b)) => !a.same_card(b),
        _ => true,
    }
}

fn turned_up(before: Option<&Card>, after: Option<&Card>) -> bool {
    matches!((before, after), (Some(b), Some(a)) if !b.is_face_up() && a.is_face_up())
}

fn identity_changed(before: Option<&Card>, after: Option<&Card>) -> bool {
    match (before.and_then(Card::identity), after.and_then(Card::identity)) {
        (Some(b), Some(a)) => b != a,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairway_core::card::{CardFace, Rank, Suit};
    use fairway_core::movement::MovementKind;
    use fairway_core::snapshot::{ActiveRules, Integrity, PlayerView};

    fn up(rank: Rank, suit: Suit, idx: u32) -> Card {
        Card::face_up(CardFace::new(rank, suit), idx)
    }

    fn down(idx: u32) -> Card {
        Card::face_down(None, idx)
    }

    fn pos(i: usize) -> HandPosition {
        HandPosition::new(i).unwrap()
    }

    fn player(id: &str, hand: [Card; 6]) -> PlayerView {
        PlayerView {
            id: PlayerId::new(id),
            name: id.to_uppercase(),
            is_host: false,
            is_computer_controlled: false,
            hand: Hand::full(hand),
            round_score: 0,
            total_score: 0,
            rounds_won: 0,
        }
    }

    fn table(a_hand: [Card; 6], discard: Card, deck: u32) -> Snapshot {
        Snapshot {
            phase: Phase::ActiveTurn,
            players: vec![
                player("a", a_hand),
                player("b", [down(20), down(21), down(22), down(23), down(24), down(25)]),
            ],
            current_player_id: Some(PlayerId::new("a")),
            discard_top: Some(discard),
            deck_remaining: deck,
            held_card: None,
            held_by_player_id: None,
            active_rules: ActiveRules::default(),
            dealer_id: None,
            finisher_id: None,
            integrity: Integrity::Complete,
        }
    }

    fn hidden_hand() -> [Card; 6] {
        [down(0), down(1), down(2), down(3), down(4), down(5)]
    }

    fn kinds(moves: &[Movement]) -> Vec<MovementKind> {
        moves.iter().map(Movement::kind).collect()
    }

    #[test]
    fn compressed_deck_draw_yields_only_the_draw() {
        let seven = up(Rank::Seven, Suit::Clubs, 40);
        let a = table(hidden_hand(), seven, 30);
        let mut hand = hidden_hand();
        hand[2] = up(Rank::King, Suit::Spades, 2);
        let b = table(hand, seven, 29);
        let moves = diff(&a, &b);
        assert_eq!(kinds(&moves), vec![MovementKind::DrawDeck]);
        assert_eq!(moves[0].player(), &PlayerId::new("a"));
    }

    #[test]
    fn compressed_discard_draw_and_swap_is_one_swap() {
        let three = up(Rank::Three, Suit::Diamonds, 41);
        let queen = up(Rank::Queen, Suit::Hearts, 5);
        let a = table(hidden_hand(), three, 30);
        let mut hand = hidden_hand();
        hand[5] = up(Rank::Three, Suit::Diamonds, 41);
        let b = table(hand, queen, 30);
        let moves = diff(&a, &b);
        assert_eq!(moves.len(), 1);
        match &moves[0] {
            Movement::Swap {
                position,
                discarded,
                ..
            } => {
                assert_eq!(*position, pos(5));
                assert_eq!(*discarded, Some(queen));
            }
            other => panic!("expected swap, got {other}"),
        }
    }

    #[test]
    fn face_down_turn_with_discard_change_is_never_flip_plus_discard() {
        let a = table(hidden_hand(), up(Rank::Two, Suit::Hearts, 40), 30);
        let mut held = a.clone();
        held.held_card = Some(up(Rank::Ace, Suit::Clubs, 50));
        held.held_by_player_id = Some(PlayerId::new("a"));
        held.deck_remaining = 29;
        let mut hand = hidden_hand();
        hand[1] = up(Rank::Ace, Suit::Clubs, 50);
        let b = table(hand, up(Rank::Nine, Suit::Spades, 1), 29);
        let moves = diff(&held, &b);
        assert_eq!(kinds(&moves), vec![MovementKind::Swap]);
    }

    #[test]
    fn face_to_face_swap() {
        let mut hand = hidden_hand();
        hand[0] = up(Rank::Jack, Suit::Clubs, 0);
        let mut a = table(hand, up(Rank::Two, Suit::Hearts, 40), 29);
        a.held_card = Some(up(Rank::Four, Suit::Clubs, 50));
        a.held_by_player_id = Some(PlayerId::new("a"));
        hand[0] = up(Rank::Four, Suit::Clubs, 50);
        let b = table(hand, up(Rank::Jack, Suit::Clubs, 0), 29);
        let moves = diff(&a, &b);
        assert_eq!(kinds(&moves), vec![MovementKind::Swap]);
        assert_eq!(moves[0].position(), Some(pos(0)));
    }

    #[test]
    fn draw_source_follows_discard_change() {
        let five = up(Rank::Five, Suit::Hearts, 40);
        let a = table(hidden_hand(), five, 30);

        let mut from_deck = a.clone();
        from_deck.held_card = Some(down(60));
        from_deck.held_by_player_id = Some(PlayerId::new("a"));
        from_deck.deck_remaining = 29;
        assert_eq!(kinds(&diff(&a, &from_deck)), vec![MovementKind::DrawDeck]);

        let mut from_discard = a.clone();
        from_discard.held_card = Some(five);
        from_discard.held_by_player_id = Some(PlayerId::new("a"));
        from_discard.discard_top = Some(up(Rank::Six, Suit::Spades, 39));
        assert_eq!(
            kinds(&diff(&a, &from_discard)),
            vec![MovementKind::DrawDiscard]
        );
    }

    #[test]
    fn discard_of_held_card_then_optional_flip() {
        let ten = up(Rank::Ten, Suit::Diamonds, 50);
        let mut a = table(hidden_hand(), up(Rank::Two, Suit::Hearts, 40), 29);
        a.held_card = Some(ten);
        a.held_by_player_id = Some(PlayerId::new("a"));

        let plain = table(hidden_hand(), ten, 29);
        assert_eq!(kinds(&diff(&a, &plain)), vec![MovementKind::Discard]);

        let mut hand = hidden_hand();
        hand[4] = up(Rank::Eight, Suit::Clubs, 4);
        let with_flip = table(hand, ten, 29);
        let moves = diff(&a, &with_flip);
        assert_eq!(kinds(&moves), vec![MovementKind::Discard, MovementKind::Flip]);
        assert_eq!(moves[1].position(), Some(pos(4)));
    }

    #[test]
    fn split_push_is_inferred_once() {
        let mut differ = StateDiffer::new();
        let a = table(hidden_hand(), up(Rank::Two, Suit::Hearts, 40), 30);

        let mut drew = a.clone();
        drew.held_card = Some(down(50));
        drew.held_by_player_id = Some(PlayerId::new("a"));
        drew.deck_remaining = 29;
        assert_eq!(kinds(&differ.diff(&a, &drew)), vec![MovementKind::DrawDeck]);
        assert_eq!(differ.draw_cycle_open(), Some(&PlayerId::new("a")));

        let mut hand = hidden_hand();
        hand[3] = up(Rank::Six, Suit::Hearts, 50);
        let placed = table(hand, up(Rank::Two, Suit::Hearts, 40), 29);
        let moves = differ.diff(&drew, &placed);
        assert_eq!(kinds(&moves), vec![MovementKind::Swap]);
        assert_eq!(moves[0].position(), Some(pos(3)));

        let tail = table(hand, up(Rank::Queen, Suit::Clubs, 3), 29);
        assert!(differ.diff(&placed, &tail).is_empty());
    }

    #[test]
    fn discard_first_split_push_is_one_swap() {
        let mut differ = StateDiffer::new();
        let a = table(hidden_hand(), up(Rank::Two, Suit::Hearts, 40), 30);

        let mut drew = a.clone();
        drew.held_card = Some(up(Rank::Six, Suit::Hearts, 50));
        drew.held_by_player_id = Some(PlayerId::new("a"));
        drew.deck_remaining = 29;
        assert_eq!(kinds(&differ.diff(&a, &drew)), vec![MovementKind::DrawDeck]);

        // The displaced card reaches the discard pile before the hand changes.
        let mut displaced = drew.clone();
        displaced.discard_top = Some(up(Rank::Queen, Suit::Clubs, 3));
        assert!(differ.diff(&drew, &displaced).is_empty());
        assert_eq!(differ.draw_cycle_open(), Some(&PlayerId::new("a")));

        let mut hand = hidden_hand();
        hand[3] = up(Rank::Six, Suit::Hearts, 50);
        let placed = table(hand, up(Rank::Queen, Suit::Clubs, 3), 29);
        let moves = differ.diff(&displaced, &placed);
        assert_eq!(kinds(&moves), vec![MovementKind::Swap]);
        assert_eq!(moves[0].position(), Some(pos(3)));
    }

    #[test]
    fn held_card_kept_by_someone_else_does_not_hide_a_discard() {
        let mut differ = StateDiffer::new();
        let a = table(hidden_hand(), up(Rank::Two, Suit::Hearts, 40), 30);
        let mut b_holds = a.clone();
        b_holds.held_card = Some(down(50));
        b_holds.held_by_player_id = Some(PlayerId::new("b"));
        let mut next = b_holds.clone();
        next.discard_top = Some(up(Rank::Queen, Suit::Clubs, 3));
        assert_eq!(kinds(&differ.diff(&b_holds, &next)), vec![MovementKind::Discard]);
    }

    #[test]
    fn marker_clears_when_turn_advances() {
        let mut differ = StateDiffer::new();
        let a = table(hidden_hand(), up(Rank::Two, Suit::Hearts, 40), 30);
        let mut drew = a.clone();
        drew.held_card = Some(down(50));
        drew.held_by_player_id = Some(PlayerId::new("a"));
        drew.deck_remaining = 29;
        differ.diff(&a, &drew);

        let mut done = table(hidden_hand(), up(Rank::Six, Suit::Hearts, 50), 29);
        done.current_player_id = Some(PlayerId::new("b"));
        assert_eq!(kinds(&differ.diff(&drew, &done)), vec![MovementKind::Discard]);
        assert!(differ.draw_cycle_open().is_none());
    }

    #[test]
    fn flip_as_action() {
        let a = table(hidden_hand(), up(Rank::Two, Suit::Hearts, 40), 30);
        let mut hand = hidden_hand();
        hand[0] = up(Rank::Nine, Suit::Clubs, 0);
        let b = table(hand, up(Rank::Two, Suit::Hearts, 40), 30);
        let moves = diff(&a, &b);
        assert_eq!(kinds(&moves), vec![MovementKind::Flip]);
    }

    #[test]
    fn leaving_initial_flip_flips_everyone() {
        let mut a = table(hidden_hand(), up(Rank::Two, Suit::Hearts, 40), 30);
        a.phase = Phase::AwaitingInitialFlip;
        let mut b = a.clone();
        b.phase = Phase::ActiveTurn;
        b.players[0].hand = Hand::full({
            let mut h = hidden_hand();
            h[0] = up(Rank::Ace, Suit::Spades, 0);
            h[1] = up(Rank::Two, Suit::Spades, 1);
            h
        });
        b.players[1].hand = Hand::full({
            let mut h = [down(20), down(21), down(22), down(23), down(24), down(25)];
            h[5] = up(Rank::Three, Suit::Spades, 25);
            h
        });
        let moves = diff(&a, &b);
        assert_eq!(moves.len(), 3);
        assert!(moves.iter().all(|m| m.kind() == MovementKind::Flip));
        assert_eq!(moves[2].player(), &PlayerId::new("b"));
    }

    #[test]
    fn during_initial_flip_nothing_is_inferred() {
        let mut a = table(hidden_hand(), up(Rank::Two, Suit::Hearts, 40), 30);
        a.phase = Phase::AwaitingInitialFlip;
        let mut b = a.clone();
        b.players[1].hand = Hand::full({
            let mut h = [down(20), down(21), down(22), down(23), down(24), down(25)];
            h[0] = up(Rank::Three, Suit::Spades, 20);
            h
        });
        assert!(diff(&a, &b).is_empty());
    }

    #[test]
    fn partial_snapshot_degrades_to_empty() {
        let a = table(hidden_hand(), up(Rank::Two, Suit::Hearts, 40), 30);
        let mut b = table(hidden_hand(), up(Rank::Four, Suit::Hearts, 41), 29);
        b.integrity = Integrity::Partial(vec!["discardTop".into()]);
        assert!(diff(&a, &b).is_empty());
        assert!(diff(&b, &a).is_empty());
    }

    #[test]
    fn round_end_reveals_and_knock_come_last() {
        let ten = up(Rank::Ten, Suit::Diamonds, 50);
        let mut a = table(hidden_hand(), up(Rank::Two, Suit::Hearts, 40), 29);
        a.held_card = Some(ten);
        a.held_by_player_id = Some(PlayerId::new("a"));
        let mut b = table(hidden_hand(), ten, 29);
        b.phase = Phase::RoundOver;
        b.finisher_id = Some(PlayerId::new("b"));
        b.players[1].hand = Hand::full({
            let mut h = [down(20), down(21), down(22), down(23), down(24), down(25)];
            h[1] = up(Rank::Five, Suit::Clubs, 21);
            h[2] = up(Rank::Six, Suit::Clubs, 22);
            h
        });
        let moves = diff(&a, &b);
        assert_eq!(
            kinds(&moves),
            vec![
                MovementKind::Discard,
                MovementKind::Flip,
                MovementKind::Flip,
                MovementKind::Knock
            ]
        );
    }

    #[test]
    fn touched_subjects_cover_visible_changes() {
        let a = table(hidden_hand(), up(Rank::Two, Suit::Hearts, 40), 30);
        let mut hand = hidden_hand();
        hand[1] = up(Rank::Nine, Suit::Clubs, 1);
        let b = table(hand, up(Rank::Three, Suit::Hearts, 41), 29);
        let touched = touched_subjects(&a, &b);
        assert!(touched.contains(&SubjectKey::Deck));
        assert!(touched.contains(&SubjectKey::Discard));
        assert!(touched.contains(&SubjectKey::slot(&PlayerId::new("a"), pos(1))));
        assert!(!touched.contains(&SubjectKey::Held));
        assert_eq!(touched.len(), 3);
        assert!(touched_subjects(&a, &a).is_empty());
    }

    #[test]
    fn departed_player_touches_all_slots() {
        let a = table(hidden_hand(), up(Rank::Two, Suit::Hearts, 40), 30);
        let mut b = a.clone();
        b.players.pop();
        assert_eq!(touched_subjects(&a, &b).len(), 6);
    }
}

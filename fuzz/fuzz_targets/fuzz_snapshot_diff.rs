#![no_main]

use arbitrary::Arbitrary;
use fairway_core::card::{Card, CardFace, Rank, Suit};
use fairway_core::snapshot::{
    ActiveRules, HAND_SIZE, Hand, Integrity, Phase, PlayerId, PlayerView, RuleFlags, Snapshot,
};
use fairway_core::wire::ActionMessage;
use fairway_layout::Rect;
use fairway_runtime::{
    ChoreographyConfig, Session, Transport, TransportError, diff, touched_subjects,
};
use libfuzzer_sys::fuzz_target;
use web_time::Duration;

const SEATS: [&str; 3] = ["you", "b", "c"];

#[derive(Debug, Arbitrary)]
struct FuzzCard {
    rank: u8,
    suit: u8,
    up: bool,
    index: u8,
}

#[derive(Debug, Arbitrary)]
struct FuzzTable {
    phase: u8,
    seats: u8,
    hands: [[Option<FuzzCard>; HAND_SIZE]; 3],
    current: Option<u8>,
    discard: Option<FuzzCard>,
    held: Option<(u8, FuzzCard)>,
    deck: u8,
    finisher: Option<u8>,
    rules: u8,
    partial: bool,
}

#[derive(Debug, Arbitrary)]
struct Input {
    tables: Vec<FuzzTable>,
    ticks: Vec<u8>,
    width: u8,
    height: u8,
}

struct Discarding;

impl Transport for Discarding {
    fn send(&mut self, _: &ActionMessage) -> Result<(), TransportError> {
        Ok(())
    }
}

fn card(c: &FuzzCard) -> Card {
    let rank = Rank::ALL[usize::from(c.rank) % Rank::ALL.len()];
    let face = if rank == Rank::Joker {
        CardFace::joker()
    } else {
        let suit = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades][usize::from(c.suit % 4)];
        CardFace::new(rank, suit)
    };
    if c.up {
        Card::face_up(face, u32::from(c.index))
    } else {
        Card::face_down(None, u32::from(c.index))
    }
}

fn seat(i: u8, seats: usize) -> PlayerId {
    PlayerId::new(SEATS[usize::from(i) % seats])
}

fn snapshot(t: &FuzzTable) -> Snapshot {
    let seats = usize::from(t.seats % 2) + 2;
    let phase = [
        Phase::AwaitingInitialFlip,
        Phase::ActiveTurn,
        Phase::FinalTurn,
        Phase::RoundOver,
        Phase::GameOver,
    ][usize::from(t.phase % 5)]
    .clone();
    let players = (0..seats)
        .map(|i| PlayerView {
            id: PlayerId::new(SEATS[i]),
            name: SEATS[i].to_string(),
            is_host: i == 0,
            is_computer_controlled: i > 0,
            hand: Hand::new(std::array::from_fn(|p| t.hands[i][p].as_ref().map(card))),
            round_score: 0,
            total_score: 0,
            rounds_won: 0,
        })
        .collect();
    Snapshot {
        phase,
        players,
        current_player_id: t.current.map(|i| seat(i, seats)),
        discard_top: t.discard.as_ref().map(card),
        deck_remaining: u32::from(t.deck),
        held_card: t.held.as_ref().map(|(_, c)| card(c)),
        held_by_player_id: t.held.as_ref().map(|(i, _)| seat(*i, seats)),
        active_rules: ActiveRules {
            flags: RuleFlags::from_bits_truncate(t.rules),
            unrecognised: Vec::new(),
        },
        dealer_id: None,
        finisher_id: t.finisher.map(|i| seat(i, seats)),
        integrity: if t.partial {
            Integrity::Partial(vec!["players".to_string()])
        } else {
            Integrity::Complete
        },
    }
}

fuzz_target!(|input: Input| {
    let snapshots: Vec<Snapshot> = input.tables.iter().take(16).map(snapshot).collect();

    // The pure differ is deterministic and reports only known players.
    for pair in snapshots.windows(2) {
        let first = diff(&pair[0], &pair[1]);
        assert_eq!(first, diff(&pair[0], &pair[1]));
        for movement in &first {
            assert!(pair[1].player(movement.player()).is_some() || pair[0].player(movement.player()).is_some());
        }
        let _ = touched_subjects(&pair[0], &pair[1]);
    }

    // The session accepts any sequence without panicking and settles.
    let viewport = Rect::new(0, 0, u16::from(input.width), u16::from(input.height));
    let mut session = Session::new(
        ChoreographyConfig::default(),
        Some(PlayerId::new("you")),
        viewport,
        Discarding,
    );
    for (i, snapshot) in snapshots.into_iter().enumerate() {
        session.handle_inbound(fairway_core::wire::Inbound::Snapshot(snapshot));
        let ms = input.ticks.get(i).copied().unwrap_or(16);
        session.tick(Duration::from_millis(u64::from(ms)));
        let _ = session.view();
    }
    for _ in 0..100 {
        session.tick(Duration::from_millis(100));
    }
    assert!(session.controller().scheduler().is_idle());
    assert!(!session.controller().transient().has_pending());
});

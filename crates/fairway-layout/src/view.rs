#![forbid(unsafe_code)]

//! The render model.
//!
//! [`render`] is a pure projection of:
//!
//! - the accepted [`Snapshot`] (the only source of truth for the table),
//! - [`LocalTransientState`] (the local player's optimistic overlay),
//! - in-flight [`Artifact`]s sampled from the scheduler,
//! - active notice texts.
//!
//! Face-down cards never expose their identity here, even when the authority
//! happened to send it.

use serde::Serialize;

use fairway_core::animation::{Artifact, FaceShown, PrimitiveKind};
use fairway_core::card::{Card, CardFace};
use fairway_core::geometry::Rect;
use fairway_core::movement::DrawSource;
use fairway_core::snapshot::{HandPosition, PlayerId, Snapshot};
use fairway_core::transient::{LocalTransientState, OptimisticMutation};

/// What a card position shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum SlotView {
    Empty,
    FaceDown,
    FaceUp { card: CardFace },
    /// Chosen locally, awaiting the authority's flip.
    Selected,
}

impl SlotView {
    /// The visible side of `card`.
    #[must_use]
    pub fn of(card: Option<&Card>) -> Self {
        match card {
            None => SlotView::Empty,
            Some(c) => match c.identity() {
                Some(face) => SlotView::FaceUp { card: face },
                None => SlotView::FaceDown,
            },
        }
    }

    /// `card` as it looks once turned face-up; face-down if its face is
    /// unknown.
    fn revealed(card: Option<Card>) -> Self {
        match card.and_then(|c| c.revealed()) {
            Some(up) => SlotView::of(Some(&up)),
            None => SlotView::FaceDown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatView {
    pub id: PlayerId,
    pub name: String,
    pub is_local: bool,
    pub is_current: bool,
    pub is_dealer: bool,
    pub is_finisher: bool,
    pub is_host: bool,
    pub is_computer_controlled: bool,
    pub round_score: i32,
    pub total_score: i32,
    pub rounds_won: u32,
    pub slots: Vec<SlotView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeldView {
    pub holder: Option<PlayerId>,
    pub card: SlotView,
}

/// One in-flight effect, drawn over the static table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactView {
    pub id: u64,
    pub kind: PrimitiveKind,
    pub subjects: Vec<String>,
    pub rect: Rect,
    pub face: FaceShown,
    /// Only when the front is showing.
    pub card: Option<CardFace>,
    pub lift: f32,
    pub glow: f32,
}

impl From<&Artifact> for ArtifactView {
    fn from(artifact: &Artifact) -> Self {
        let sample = &artifact.sample;
        let card = match sample.face {
            FaceShown::Front => sample.card.and_then(|c| c.revealed()).and_then(|c| c.identity()),
            FaceShown::Back => None,
        };
        Self {
            id: artifact.id,
            kind: sample.kind,
            subjects: artifact.subjects.iter().map(ToString::to_string).collect(),
            rect: sample.rect,
            face: sample.face,
            card,
            lift: sample.lift,
            glow: sample.glow,
        }
    }
}

/// Everything a frame shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    /// Sequence number of the accepted snapshot.
    pub seq: u64,
    pub phase: String,
    pub connected: bool,
    pub deck_remaining: u32,
    pub discard: SlotView,
    pub held: Option<HeldView>,
    pub seats: Vec<SeatView>,
    pub artifacts: Vec<ArtifactView>,
    pub notices: Vec<String>,
}

/// Inputs to [`render`].
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub snapshot: Option<&'a Snapshot>,
    pub seq: u64,
    pub transient: &'a LocalTransientState,
    pub local: Option<&'a PlayerId>,
    pub artifacts: &'a [Artifact],
    pub notices: &'a [String],
    pub connected: bool,
}

/// Project the inputs into a view.
#[must_use]
pub fn render(input: &RenderInput<'_>) -> TableView {
    let artifacts = input.artifacts.iter().map(ArtifactView::from).collect();
    let notices = input.notices.to_vec();
    let Some(snapshot) = input.snapshot else {
        return TableView {
            seq: input.seq,
            phase: String::new(),
            connected: input.connected,
            deck_remaining: 0,
            discard: SlotView::Empty,
            held: None,
            seats: Vec::new(),
            artifacts,
            notices,
        };
    };

    let mut view = TableView {
        seq: input.seq,
        phase: snapshot.phase.token().to_string(),
        connected: input.connected,
        deck_remaining: snapshot.deck_remaining,
        discard: SlotView::of(snapshot.discard_top.as_ref()),
        held: snapshot.held_card.as_ref().map(|card| HeldView {
            holder: snapshot.held_by_player_id.clone(),
            card: SlotView::of(Some(card)),
        }),
        seats: snapshot
            .players
            .iter()
            .map(|p| SeatView {
                id: p.id.clone(),
                name: p.name.clone(),
                is_local: input.local == Some(&p.id),
                is_current: snapshot.is_turn_of(&p.id),
                is_dealer: snapshot.dealer_id.as_ref() == Some(&p.id),
                is_finisher: snapshot.finisher_id.as_ref() == Some(&p.id),
                is_host: p.is_host,
                is_computer_controlled: p.is_computer_controlled,
                round_score: p.round_score,
                total_score: p.total_score,
                rounds_won: p.rounds_won,
                slots: p.hand.slots().map(|(_, card)| SlotView::of(card)).collect(),
            })
            .collect(),
        artifacts,
        notices,
    };

    if let Some(local) = input.local {
        apply_optimism(&mut view, input.transient, local);
    }
    view
}

fn apply_optimism(view: &mut TableView, transient: &LocalTransientState, local: &PlayerId) {
    let Some(seat) = view.seats.iter().position(|s| &s.id == local) else {
        return;
    };

    let select = |view: &mut TableView, position: HandPosition| {
        let slot = &mut view.seats[seat].slots[position.index()];
        if !matches!(slot, SlotView::FaceUp { .. }) {
            *slot = SlotView::Selected;
        }
    };
    for &position in &transient.locally_flipped_positions {
        select(view, position);
    }

    match &transient.optimistic {
        Some(OptimisticMutation::Drew { source, card }) => {
            let shown = transient.held_card_optimistic.or(*card);
            view.held = Some(HeldView {
                holder: Some(local.clone()),
                card: shown.map_or(SlotView::FaceDown, |c| SlotView::of(Some(&c))),
            });
            match source {
                DrawSource::Deck => view.deck_remaining = view.deck_remaining.saturating_sub(1),
                // The card underneath is unknown until the authority says.
                DrawSource::Discard => view.discard = SlotView::Empty,
            }
        }
        Some(OptimisticMutation::Swapped {
            position,
            card,
            displaced,
        }) => {
            view.seats[seat].slots[position.index()] = SlotView::revealed(*card);
            view.discard = SlotView::revealed(*displaced);
            view.held = None;
        }
        Some(OptimisticMutation::Discarded { card }) => {
            view.discard = SlotView::revealed(*card);
            view.held = None;
        }
        Some(OptimisticMutation::FlippedAsAction { position }) => select(view, *position),
        Some(
            OptimisticMutation::SkippedFlip
            | OptimisticMutation::Knocked
            | OptimisticMutation::RequestedNextRound,
        )
        | None => {
            if let Some(card) = transient.held_card_optimistic {
                view.held = Some(HeldView {
                    holder: Some(local.clone()),
                    card: SlotView::of(Some(&card)),
                });
            }
        }
    }
}

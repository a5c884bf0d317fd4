#![forbid(unsafe_code)]

//! Reconciliation between the authority's snapshots and the local player.
//!
//! The [`Controller`] is the only writer of the accepted snapshot and of
//! [`LocalTransientState`]. It has two inputs:
//!
//! - **Snapshots.** A snapshot that touches no locked subject is diffed
//!   against the accepted one, its movements are scheduled, and it is
//!   accepted. One that touches a locked subject is buffered (a later one
//!   overwrites it) and accepted without a diff once the lock is released.
//!   Entering the initial-flip phase, or the first snapshot after a
//!   reconnect, cancels everything and accepts with no movements.
//! - **Local actions.** Checked against the accepted snapshot, applied
//!   optimistically with an immediate effect, then sent. The action stays
//!   pending until a snapshot reflects it or the authority rejects it, in
//!   which case the optimistic overlay is rolled back.
//!
//! The controller's state ([`ControllerState`]) is derived from the
//! scheduler and the pending action; it is never stored.

use std::collections::BTreeSet;
use std::fmt;

use fairway_core::animation::{Anchors, PrimitiveSpec};
use fairway_core::card::Card;
use fairway_core::movement::{DrawSource, Movement, MovementKind};
use fairway_core::snapshot::{HandPosition, Integrity, Phase, PlayerId, RuleFlags, Snapshot};
use fairway_core::subject::SubjectKey;
use fairway_core::transient::{LocalTransientState, OptimisticMutation, SavedOptimism};
use fairway_core::wire::ActionMessage;
use tracing::{debug, debug_span, info, warn};
use web_time::Duration;

use crate::choreography;
use crate::config::ChoreographyConfig;
use crate::counters::ChoreographyCounters;
use crate::differ::{StateDiffer, touched_subjects};
use crate::notice::{NoticeBoard, NoticeKey};
use crate::scheduler::{AnimationScheduler, Completion, Directive, Origin};
use crate::transport::{Transport, TransportError};

/// What the controller is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    Idle,
    /// A local action was sent and no snapshot reflects it yet.
    AwaitingAuthorityConfirmation,
    /// A local optimistic effect is queued or playing.
    AnimatingLocal,
    /// Only effects inferred from snapshots are queued or playing.
    AnimatingRemote,
}

/// Something the local player asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalAction {
    Draw(DrawSource),
    Swap(HandPosition),
    Discard,
    /// Pick one card to turn at the start of a round. The selection is sent
    /// once the configured number of positions is picked.
    SelectInitialFlip(HandPosition),
    FlipAsAction(HandPosition),
    SkipFlip,
    KnockEarly,
    NextRound,
}

impl LocalAction {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Draw(_) => "draw",
            Self::Swap(_) => "swap",
            Self::Discard => "discard",
            Self::SelectInitialFlip(_) => "select-initial-flip",
            Self::FlipAsAction(_) => "flip-as-action",
            Self::SkipFlip => "skip-flip",
            Self::KnockEarly => "knock-early",
            Self::NextRound => "next-round",
        }
    }
}

/// Why a local action was not sent.
#[derive(Debug)]
pub enum ActionRefused {
    Disconnected,
    NoSnapshot,
    /// The local player has no seat at this table.
    NotSeated,
    WrongPhase { phase: String },
    NotYourTurn,
    AlreadyHolding,
    NothingHeld,
    EmptyPile(DrawSource),
    /// A card taken from the discard pile must be swapped into the hand.
    MustSwapDiscardDraw,
    RuleDisabled(&'static str),
    AwaitingConfirmation,
    AlreadyFaceUp(HandPosition),
    AlreadySelected(HandPosition),
    /// Skipping is only possible right after a discard.
    NoFlipOwed,
    Transport(TransportError),
}

impl fmt::Display for ActionRefused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("not connected"),
            Self::NoSnapshot => f.write_str("no table state yet"),
            Self::NotSeated => f.write_str("not seated at this table"),
            Self::WrongPhase { phase } => write!(f, "not allowed during {phase}"),
            Self::NotYourTurn => f.write_str("not your turn"),
            Self::AlreadyHolding => f.write_str("already holding a card"),
            Self::NothingHeld => f.write_str("no card held"),
            Self::EmptyPile(source) => write!(f, "the {} pile is empty", source.token()),
            Self::MustSwapDiscardDraw => f.write_str("a card taken from the discard must be swapped"),
            Self::RuleDisabled(rule) => write!(f, "rule {rule} is not enabled"),
            Self::AwaitingConfirmation => f.write_str("waiting for the previous action"),
            Self::AlreadyFaceUp(p) => write!(f, "card {p} is already face up"),
            Self::AlreadySelected(p) => write!(f, "card {p} is already selected"),
            Self::NoFlipOwed => f.write_str("no flip to skip"),
            Self::Transport(e) => write!(f, "could not send: {e}"),
        }
    }
}

impl std::error::Error for ActionRefused {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for ActionRefused {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

/// What happened to an incoming snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// Accepted after a cancel-all, with no movements inferred.
    Reset,
    /// Diffed and accepted; `movements` effects were scheduled.
    Applied { movements: usize },
    /// Held back until a lock releases. `superseded` is set when it replaced
    /// an earlier buffered snapshot.
    Buffered { superseded: bool },
}

/// A sent action not yet reflected by the authority.
#[derive(Debug, Clone)]
struct PendingAction {
    message: ActionMessage,
    saved: SavedOptimism,
    /// What to shake if the authority says no.
    subject: SubjectKey,
}

impl PendingAction {
    fn is_reflected_in(&self, snapshot: &Snapshot, local: &PlayerId) -> bool {
        let hand = snapshot.hand_of(local);
        let face_up =
            |p: &HandPosition| hand.and_then(|h| h.get(*p)).is_some_and(Card::is_face_up);
        let turn_over = !snapshot.is_turn_of(local) || !snapshot.phase.is_in_play();
        match &self.message {
            ActionMessage::Draw { .. } => snapshot.is_held_by(local) || turn_over,
            ActionMessage::Swap { .. } | ActionMessage::Discard => !snapshot.is_held_by(local),
            ActionMessage::FlipInitial { positions } => {
                snapshot.phase != Phase::AwaitingInitialFlip || positions.iter().all(face_up)
            }
            ActionMessage::FlipAsAction { position } => face_up(position) || turn_over,
            ActionMessage::SkipFlip => turn_over,
            ActionMessage::KnockEarly => {
                snapshot.finisher_id.as_ref() == Some(local) || turn_over
            }
            ActionMessage::NextRound => snapshot.phase != Phase::RoundOver,
        }
    }

    /// Inferred movements this action already animated.
    fn echoes(&self, movement: &Movement) -> bool {
        let kind = movement.kind();
        match &self.message {
            ActionMessage::Draw { .. } => {
                matches!(kind, MovementKind::DrawDeck | MovementKind::DrawDiscard)
            }
            ActionMessage::Swap { .. } => kind == MovementKind::Swap,
            ActionMessage::Discard => kind == MovementKind::Discard,
            ActionMessage::FlipAsAction { .. } => kind == MovementKind::Flip,
            ActionMessage::KnockEarly => kind == MovementKind::Knock,
            ActionMessage::FlipInitial { .. }
            | ActionMessage::SkipFlip
            | ActionMessage::NextRound => false,
        }
    }
}

/// Owns the accepted snapshot and reconciles it with local play.
#[derive(Debug)]
pub struct Controller {
    config: ChoreographyConfig,
    local: Option<PlayerId>,
    accepted: Option<Snapshot>,
    seq: u64,
    differ: StateDiffer,
    scheduler: AnimationScheduler,
    transient: LocalTransientState,
    pending: Option<PendingAction>,
    /// Pile the local player drew from this turn.
    turn_draw: Option<DrawSource>,
    connected: bool,
    resync: bool,
    notices: NoticeBoard,
    counters: ChoreographyCounters,
}

impl Controller {
    #[must_use]
    pub fn new(config: ChoreographyConfig, local: Option<PlayerId>) -> Self {
        Self {
            config,
            local,
            accepted: None,
            seq: 0,
            differ: StateDiffer::new(),
            scheduler: AnimationScheduler::new(),
            transient: LocalTransientState::default(),
            pending: None,
            turn_draw: None,
            connected: true,
            resync: false,
            notices: NoticeBoard::new(),
            counters: ChoreographyCounters::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Apply, buffer, or reset on an incoming snapshot.
    pub fn handle_snapshot(&mut self, snapshot: Snapshot, anchors: &dyn Anchors) -> SnapshotOutcome {
        self.counters.snapshots_received += 1;
        let span = debug_span!(
            target: "fairway.controller",
            "controller.snapshot",
            phase = snapshot.phase.token(),
            accepted_seq = self.seq,
        );
        let _guard = span.enter();

        if let Integrity::Partial(missing) = &snapshot.integrity {
            warn!(
                target: "fairway.controller",
                missing = ?missing,
                "partial snapshot accepted without inference"
            );
        }

        let Some(previous) = self.accepted.as_ref() else {
            return self.reset_to(snapshot, anchors);
        };
        let round_start = previous.phase != Phase::AwaitingInitialFlip
            && snapshot.phase == Phase::AwaitingInitialFlip;
        if round_start || self.resync {
            return self.reset_to(snapshot, anchors);
        }

        if self.transient.has_pending() || self.touches_locked(previous, &snapshot) {
            let superseded = self.transient.buffer(snapshot);
            self.counters.snapshots_buffered += 1;
            if superseded {
                self.counters.snapshots_superseded += 1;
            }
            debug!(target: "fairway.controller", superseded, "snapshot buffered");
            return SnapshotOutcome::Buffered { superseded };
        }

        let inferred = self.differ.diff(previous, &snapshot);
        self.counters.movements_inferred += inferred.len() as u64;
        let echo = match (&self.pending, &self.local) {
            (Some(pending), Some(local)) if pending.is_reflected_in(&snapshot, local) => {
                Some((pending.clone(), local.clone()))
            }
            _ => None,
        };
        let movements: Vec<Movement> = inferred
            .into_iter()
            .filter(|m| match &echo {
                Some((pending, local)) => !(m.player() == local && pending.echoes(m)),
                None => true,
            })
            .collect();

        let seq = self.seq + 1;
        let directives = choreography::remote_directives(&movements, &snapshot, &self.config, seq);
        self.accept(snapshot, anchors);
        for directive in directives {
            self.scheduler.run(directive, anchors);
        }
        self.sync_locks();
        SnapshotOutcome::Applied {
            movements: movements.len(),
        }
    }

    /// The confirmation for the pending draw: show the drawn card.
    pub fn handle_action_confirmed(&mut self, card: Option<Card>, anchors: &dyn Anchors) {
        let Some(card) = card else {
            return;
        };
        let Some(OptimisticMutation::Drew { card: drawn, .. }) = &mut self.transient.optimistic
        else {
            debug!(target: "fairway.controller", "confirmation with no draw in flight");
            return;
        };
        let shown = card.revealed().unwrap_or(card);
        *drawn = Some(shown);
        self.transient.held_card_optimistic = Some(shown);
        debug!(target: "fairway.controller", card = %shown, "draw confirmed");
        let spec = PrimitiveSpec::flip(SubjectKey::Held, shown, self.config.durations.flip());
        self.scheduler.run(Directive::local(spec, self.seq), anchors);
        self.sync_locks();
    }

    /// The authority rejected the last action.
    ///
    /// With no action pending the error is only a notice; a buffered
    /// snapshot stays buffered.
    pub fn handle_error(&mut self, message: &str, anchors: &dyn Anchors) {
        warn!(target: "fairway.controller", error = message, "action rejected");
        if let Some(pending) = self.pending.take() {
            self.transient.restore_optimistic(pending.saved);
            if matches!(pending.message, ActionMessage::Draw { .. }) {
                self.turn_draw = None;
            }
            let spec = choreography::refusal(pending.subject, &self.config.durations);
            self.scheduler.run(Directive::local(spec, self.seq), anchors);
            // Only a refusal of our own action voids the buffered snapshot.
            if self.transient.take_pending().is_some() {
                self.counters.snapshots_discarded += 1;
            }
        }
        self.notices
            .push_transient(message.to_owned(), self.config.notice_ttl());
        self.sync_locks();
    }

    // -----------------------------------------------------------------------
    // Local actions
    // -----------------------------------------------------------------------

    /// Check, apply optimistically, animate, and send a local action.
    pub fn perform(
        &mut self,
        action: LocalAction,
        transport: &mut dyn Transport,
        anchors: &dyn Anchors,
    ) -> Result<(), ActionRefused> {
        let span = debug_span!(target: "fairway.controller", "controller.action", action = action.name());
        let _guard = span.enter();

        if let Err(refused) = self.check(action) {
            debug!(target: "fairway.controller", reason = %refused, "action refused");
            return Err(refused);
        }
        let (Some(snapshot), Some(local)) = (self.accepted.as_ref(), self.local.clone()) else {
            return Err(ActionRefused::NoSnapshot);
        };

        let saved = self.transient.save_optimistic();
        let durations = &self.config.durations;
        let held = self
            .transient
            .held_card_optimistic
            .or_else(|| snapshot.held_card.filter(|_| snapshot.is_held_by(&local)));
        let slot_card = |p: HandPosition| snapshot.hand_of(&local).and_then(|h| h.get(p)).copied();
        let seat = SubjectKey::Seat(local.clone());

        let mut effects: Vec<PrimitiveSpec> = Vec::new();
        let (message, subject, saved) = match action {
            LocalAction::Draw(source) => {
                let card = match source {
                    DrawSource::Discard => snapshot.discard_top,
                    DrawSource::Deck => None,
                };
                self.transient.optimistic = Some(OptimisticMutation::Drew { source, card });
                self.transient.held_card_optimistic = card;
                self.turn_draw = Some(source);
                effects.push(PrimitiveSpec::arc_move(
                    SubjectKey::pile(source),
                    SubjectKey::Held,
                    card,
                    durations.arc_move(),
                ));
                (ActionMessage::Draw { source }, SubjectKey::pile(source), saved)
            }
            LocalAction::Swap(position) => {
                let slot = SubjectKey::slot(&local, position);
                let displaced = slot_card(position).map(|c| c.revealed().unwrap_or(c));
                self.transient.optimistic = Some(OptimisticMutation::Swapped {
                    position,
                    card: held,
                    displaced,
                });
                self.transient.held_card_optimistic = None;
                effects.push(PrimitiveSpec::arc_move(
                    SubjectKey::Held,
                    slot.clone(),
                    held,
                    durations.arc_move(),
                ));
                effects.push(PrimitiveSpec::arc_move(
                    slot.clone(),
                    SubjectKey::Discard,
                    displaced,
                    durations.arc_move(),
                ));
                effects.push(choreography::settle(slot.clone(), held, durations));
                (ActionMessage::Swap { position }, slot, saved)
            }
            LocalAction::Discard => {
                self.transient.optimistic = Some(OptimisticMutation::Discarded { card: held });
                self.transient.held_card_optimistic = None;
                effects.push(PrimitiveSpec::arc_move(
                    SubjectKey::Held,
                    SubjectKey::Discard,
                    held,
                    durations.arc_move(),
                ));
                (ActionMessage::Discard, SubjectKey::Discard, saved)
            }
            LocalAction::SelectInitialFlip(position) => {
                let slot = SubjectKey::slot(&local, position);
                self.transient.locally_flipped_positions.insert(position);
                effects.push(choreography::settle(slot.clone(), slot_card(position), durations));
                if self.transient.locally_flipped_positions.len() < self.config.initial_flip_count {
                    let specs = std::mem::take(&mut effects);
                    self.start_local(specs, anchors);
                    debug!(
                        target: "fairway.controller",
                        selected = self.transient.locally_flipped_positions.len(),
                        "initial flip selected"
                    );
                    return Ok(());
                }
                let positions = self.transient.locally_flipped_positions.iter().copied().collect();
                // Rejection clears the whole selection.
                (
                    ActionMessage::FlipInitial { positions },
                    slot,
                    SavedOptimism::default(),
                )
            }
            LocalAction::FlipAsAction(position) => {
                let slot = SubjectKey::slot(&local, position);
                self.transient.optimistic = Some(OptimisticMutation::FlippedAsAction { position });
                if let Some(card) = slot_card(position) {
                    let shown = card.revealed().unwrap_or(card);
                    effects.push(PrimitiveSpec::flip(slot.clone(), shown, durations.flip()));
                }
                (ActionMessage::FlipAsAction { position }, slot, saved)
            }
            LocalAction::SkipFlip => {
                self.transient.optimistic = Some(OptimisticMutation::SkippedFlip);
                (ActionMessage::SkipFlip, seat, saved)
            }
            LocalAction::KnockEarly => {
                self.transient.optimistic = Some(OptimisticMutation::Knocked);
                effects.push(PrimitiveSpec::pulse(seat.clone(), durations.pulse()));
                (ActionMessage::KnockEarly, seat, saved)
            }
            LocalAction::NextRound => {
                self.transient.optimistic = Some(OptimisticMutation::RequestedNextRound);
                (ActionMessage::NextRound, seat, saved)
            }
        };

        self.start_local(effects, anchors);

        if let Err(error) = transport.send(&message) {
            warn!(target: "fairway.controller", action = message.name(), %error, "send failed");
            self.transient.restore_optimistic(saved);
            if matches!(message, ActionMessage::Draw { .. }) {
                self.turn_draw = None;
            }
            let spec = choreography::refusal(subject, &self.config.durations);
            self.scheduler.run(Directive::local(spec, self.seq), anchors);
            self.sync_locks();
            return Err(ActionRefused::Transport(error));
        }
        info!(target: "fairway.controller", action = message.name(), "action sent");
        self.pending = Some(PendingAction {
            message,
            saved,
            subject,
        });
        Ok(())
    }

    fn start_local(&mut self, specs: Vec<PrimitiveSpec>, anchors: &dyn Anchors) {
        for spec in specs {
            self.scheduler.run(Directive::local(spec, self.seq), anchors);
        }
        self.sync_locks();
    }

    /// Advisory check against the accepted snapshot. The authority has the
    /// final word.
    pub fn check(&self, action: LocalAction) -> Result<(), ActionRefused> {
        if !self.connected {
            return Err(ActionRefused::Disconnected);
        }
        let snapshot = self.accepted.as_ref().ok_or(ActionRefused::NoSnapshot)?;
        let local = self.local.as_ref().ok_or(ActionRefused::NotSeated)?;
        let hand = snapshot.hand_of(local).ok_or(ActionRefused::NotSeated)?;
        if self.pending.is_some() {
            return Err(ActionRefused::AwaitingConfirmation);
        }
        let wrong_phase = || ActionRefused::WrongPhase {
            phase: snapshot.phase.token().to_owned(),
        };
        let face_up = |p: HandPosition| hand.get(p).is_some_and(Card::is_face_up);
        let rule = |flag: RuleFlags, name: &'static str| {
            if snapshot.active_rules.contains(flag) {
                Ok(())
            } else {
                Err(ActionRefused::RuleDisabled(name))
            }
        };

        match action {
            LocalAction::SelectInitialFlip(position) => {
                if snapshot.phase != Phase::AwaitingInitialFlip {
                    return Err(wrong_phase());
                }
                if face_up(position) {
                    return Err(ActionRefused::AlreadyFaceUp(position));
                }
                if self.transient.locally_flipped_positions.contains(&position) {
                    return Err(ActionRefused::AlreadySelected(position));
                }
                if hand.face_up_count() >= self.config.initial_flip_count {
                    return Err(wrong_phase());
                }
                return Ok(());
            }
            LocalAction::NextRound => {
                return if snapshot.phase == Phase::RoundOver {
                    Ok(())
                } else {
                    Err(wrong_phase())
                };
            }
            _ => {}
        }

        if !snapshot.phase.is_in_play() {
            return Err(wrong_phase());
        }
        if !snapshot.is_turn_of(local) {
            return Err(ActionRefused::NotYourTurn);
        }
        let holding = snapshot.is_held_by(local) || self.transient.held_card_optimistic.is_some();

        match action {
            LocalAction::Draw(source) => {
                if holding {
                    return Err(ActionRefused::AlreadyHolding);
                }
                let empty = match source {
                    DrawSource::Deck => snapshot.deck_remaining == 0,
                    DrawSource::Discard => snapshot.discard_top.is_none(),
                };
                if empty {
                    return Err(ActionRefused::EmptyPile(source));
                }
            }
            LocalAction::Swap(_) => {
                if !holding {
                    return Err(ActionRefused::NothingHeld);
                }
            }
            LocalAction::Discard => {
                if !holding {
                    return Err(ActionRefused::NothingHeld);
                }
                if self.turn_draw == Some(DrawSource::Discard) {
                    return Err(ActionRefused::MustSwapDiscardDraw);
                }
            }
            LocalAction::FlipAsAction(position) => {
                if holding {
                    return Err(ActionRefused::AlreadyHolding);
                }
                // After a discard the flip is the one the discard earned.
                if self.turn_draw.is_some() {
                    rule(RuleFlags::FLIP_ON_DISCARD, "flip-on-discard")?;
                } else {
                    rule(RuleFlags::FLIP_AS_ACTION, "flip-as-action")?;
                }
                if face_up(position) {
                    return Err(ActionRefused::AlreadyFaceUp(position));
                }
            }
            LocalAction::SkipFlip => {
                rule(RuleFlags::FLIP_ON_DISCARD, "flip-on-discard")?;
                if holding {
                    return Err(ActionRefused::AlreadyHolding);
                }
                if self.turn_draw.is_none() {
                    return Err(ActionRefused::NoFlipOwed);
                }
            }
            LocalAction::KnockEarly => {
                rule(RuleFlags::KNOCK_EARLY, "knock-early")?;
                if snapshot.phase != Phase::ActiveTurn {
                    return Err(wrong_phase());
                }
                if holding {
                    return Err(ActionRefused::AlreadyHolding);
                }
            }
            LocalAction::SelectInitialFlip(_) | LocalAction::NextRound => {}
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Time and channel
    // -----------------------------------------------------------------------

    /// Advance effects and notices; apply a buffered snapshot once the locks
    /// it waits on are gone.
    pub fn tick(&mut self, dt: Duration, anchors: &dyn Anchors) -> Vec<Completion> {
        let completions = self.scheduler.tick(dt, anchors);
        self.counters.record(&completions);
        self.notices.tick(dt);
        self.apply_buffered(anchors);
        self.sync_locks();
        completions
    }

    fn apply_buffered(&mut self, anchors: &dyn Anchors) {
        let ready = match (&self.accepted, &self.transient.pending_snapshot) {
            (Some(previous), Some(buffered)) => !self.touches_locked(previous, buffered),
            _ => false,
        };
        if !ready {
            return;
        }
        if let Some(snapshot) = self.transient.take_pending() {
            debug!(target: "fairway.controller", "buffered snapshot applied");
            self.accept(snapshot, anchors);
        }
    }

    /// The channel dropped: stop everything and wait for a fresh snapshot.
    pub fn channel_lost(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        self.counters.record(&cancelled);
        if self.transient.has_pending() {
            self.counters.snapshots_discarded += 1;
        }
        self.transient.reset();
        self.differ.reset();
        self.pending = None;
        self.turn_draw = None;
        self.connected = false;
        self.resync = true;
        self.notices.set(NoticeKey::ConnectionLost, "Connection lost");
        warn!(target: "fairway.controller", "channel lost");
    }

    /// The channel is back. The next snapshot is accepted as-is.
    pub fn channel_restored(&mut self) {
        self.connected = true;
        self.notices.clear(NoticeKey::ConnectionLost);
        self.notices.clear(NoticeKey::Reconnecting);
        info!(target: "fairway.controller", "channel restored");
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn reset_to(&mut self, snapshot: Snapshot, anchors: &dyn Anchors) -> SnapshotOutcome {
        let cancelled = self.scheduler.cancel_all();
        self.counters.record(&cancelled);
        if self.transient.has_pending() {
            self.counters.snapshots_discarded += 1;
        }
        self.transient.reset();
        self.differ.reset();
        self.pending = None;
        self.turn_draw = None;
        self.resync = false;
        debug!(
            target: "fairway.controller",
            cancelled = cancelled.len(),
            "reset to snapshot"
        );
        self.accept(snapshot, anchors);
        SnapshotOutcome::Reset
    }

    fn accept(&mut self, snapshot: Snapshot, anchors: &dyn Anchors) {
        self.seq += 1;
        self.scheduler.set_accepted_seq(self.seq);
        self.counters.snapshots_applied += 1;

        let reflected = match (&self.pending, &self.local) {
            (Some(pending), Some(local)) => pending.is_reflected_in(&snapshot, local),
            _ => false,
        };
        if reflected {
            if let Some(pending) = self.pending.take() {
                debug!(target: "fairway.controller", action = pending.message.name(), "action reflected");
            }
            self.transient.clear_optimistic();
        }
        if snapshot.phase != Phase::AwaitingInitialFlip {
            self.transient.locally_flipped_positions.clear();
        }

        let previous_turn = self
            .accepted
            .as_ref()
            .map(|s| s.current_player_id.clone());
        let turn_changed = previous_turn.is_some_and(|t| t != snapshot.current_player_id);
        if turn_changed {
            self.turn_draw = None;
            if let Some(current) = &snapshot.current_player_id {
                let spec = choreography::turn_glow(
                    SubjectKey::Seat(current.clone()),
                    &self.config.durations,
                );
                self.scheduler.run(Directive::remote(spec, self.seq), anchors);
            }
        }
        self.accepted = Some(snapshot);
        self.sync_locks();
    }

    fn touches_locked(&self, previous: &Snapshot, next: &Snapshot) -> bool {
        touched_subjects(previous, next)
            .iter()
            .any(|s| s.blocks_snapshots() && self.scheduler.is_locked(s))
    }

    fn sync_locks(&mut self) {
        self.counters.animations_started = self.scheduler.started_total();
        let locks: BTreeSet<SubjectKey> = self.scheduler.locks().cloned().collect();
        self.transient.animation_locks = locks;
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> ControllerState {
        if self.scheduler.has_active(Origin::Local) {
            ControllerState::AnimatingLocal
        } else if self.pending.is_some() {
            ControllerState::AwaitingAuthorityConfirmation
        } else if self.scheduler.has_active(Origin::Remote) {
            ControllerState::AnimatingRemote
        } else {
            ControllerState::Idle
        }
    }

    #[must_use]
    pub fn accepted(&self) -> Option<&Snapshot> {
        self.accepted.as_ref()
    }

    /// Sequence number of the accepted snapshot (0 before the first).
    #[must_use]
    pub fn accepted_seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub fn transient(&self) -> &LocalTransientState {
        &self.transient
    }

    #[must_use]
    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn counters(&self) -> &ChoreographyCounters {
        &self.counters
    }

    #[must_use]
    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut NoticeBoard {
        &mut self.notices
    }

    /// The sent action still waiting for the authority.
    #[must_use]
    pub fn pending_action(&self) -> Option<&ActionMessage> {
        self.pending.as_ref().map(|p| &p.message)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    pub fn local(&self) -> Option<&PlayerId> {
        self.local.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &ChoreographyConfig {
        &self.config
    }
}

#![forbid(unsafe_code)]

//! A whole table in one process.
//!
//! [`Simulation`] connects a [`Session`] for the local player to a
//! [`ScriptedAuthority`] through a [`RecordingTransport`]. Every step it
//! lets the local player act when the session would allow it, answers what
//! the session sent, lets one computer seat move when its pause is up, and
//! advances the session by one frame.
//!
//! Frames go through the same text decoding a live connection uses.

use fairway_core::geometry::Rect;
use fairway_core::snapshot::{Phase, PlayerId, RuleFlags};
use fairway_core::wire::ActionMessage;
use fairway_layout::TableView;
use fairway_runtime::config::ChoreographyConfig;
use fairway_runtime::controller::LocalAction;
use fairway_runtime::session::Session;
use tracing::{debug, warn};
use web_time::Duration;

use crate::authority::ScriptedAuthority;
use crate::transport::RecordingTransport;

/// Shape of a simulated table.
#[derive(Debug, Clone)]
pub struct SimulationSpec {
    pub seed: u64,
    /// Computer-controlled opponents.
    pub opponents: usize,
    pub rules: RuleFlags,
    pub viewport: Rect,
    /// Time between computer moves.
    pub computer_think: Duration,
}

impl Default for SimulationSpec {
    fn default() -> Self {
        Self {
            seed: 1,
            opponents: 2,
            rules: RuleFlags::empty(),
            viewport: Rect::new(0, 0, 120, 40),
            computer_think: Duration::from_millis(500),
        }
    }
}

/// Authority, session, and the clock between them.
#[derive(Debug)]
pub struct Simulation {
    authority: ScriptedAuthority,
    session: Session<RecordingTransport>,
    local: PlayerId,
    think: Duration,
    until_computer: Duration,
    /// Selections still to make for a pending initial flip.
    queued: Vec<LocalAction>,
    elapsed: Duration,
}

impl Simulation {
    #[must_use]
    pub fn new(spec: &SimulationSpec, config: ChoreographyConfig) -> Self {
        let names: Vec<String> = (1..=spec.opponents).map(|i| format!("bot{i}")).collect();
        let mut seats: Vec<(&str, bool)> = vec![("you", false)];
        seats.extend(names.iter().map(|n| (n.as_str(), true)));
        let authority = ScriptedAuthority::new(&seats, spec.rules, spec.seed);
        let local = PlayerId::new("you");
        let session = Session::new(
            config,
            Some(local.clone()),
            spec.viewport,
            RecordingTransport::new(),
        );
        let mut sim = Self {
            authority,
            session,
            local,
            think: spec.computer_think,
            until_computer: spec.computer_think,
            queued: Vec::new(),
            elapsed: Duration::ZERO,
        };
        sim.push_snapshot();
        sim
    }

    fn push_snapshot(&mut self) {
        let frame = self.authority.frame();
        if let Err(error) = self.session.handle_frame(&frame) {
            warn!(target: "fairway.harness", %error, "snapshot frame rejected");
        }
    }

    fn push_frame(&mut self, frame: &str) {
        if let Err(error) = self.session.handle_frame(frame) {
            warn!(target: "fairway.harness", %error, "frame rejected");
        }
    }

    /// Advance by `dt`.
    pub fn step(&mut self, dt: Duration) {
        self.local_turn();
        self.answer_local();
        self.computer_turn(dt);
        self.session.tick(dt);
        self.elapsed += dt;
    }

    fn local_turn(&mut self) {
        let controller = self.session.controller();
        if controller.pending_action().is_some() || !controller.scheduler().is_idle() {
            return;
        }
        if self.queued.is_empty() {
            let Some(suggested) = self.authority.suggest(&self.local) else {
                return;
            };
            self.queued = to_local(suggested);
        }
        if self.queued.is_empty() {
            return;
        }
        let action = self.queued.remove(0);
        if let Err(refused) = self.session.perform(action) {
            debug!(target: "fairway.harness", %refused, "local action refused");
            self.queued.clear();
        }
    }

    fn answer_local(&mut self) {
        for action in self.session.transport_mut().drain() {
            let local = self.local.clone();
            self.answer(&local, &action, true);
        }
    }

    fn answer(&mut self, player: &PlayerId, action: &ActionMessage, reply_to_session: bool) {
        match self.authority.apply(player, action) {
            Ok(drawn) => {
                if reply_to_session && matches!(action, ActionMessage::Draw { .. }) {
                    self.push_frame(&ScriptedAuthority::confirmed_frame(drawn));
                }
                self.push_snapshot();
            }
            Err(rejection) if reply_to_session => {
                self.push_frame(&rejection.frame());
            }
            Err(rejection) => {
                warn!(target: "fairway.harness", %rejection, player = %player, "computer move rejected");
            }
        }
    }

    fn computer_turn(&mut self, dt: Duration) {
        self.until_computer = self.until_computer.saturating_sub(dt);
        if !self.until_computer.is_zero() {
            return;
        }
        if let Some((player, action)) = self.authority.autoplay() {
            self.answer(&player, &action, false);
        }
        self.until_computer = self.think;
    }

    /// Step until the round is over and every effect has played, or
    /// `limit` simulated time passes. Returns whether the round finished.
    pub fn run_round(&mut self, dt: Duration, limit: Duration) -> bool {
        while self.elapsed < limit {
            self.step(dt);
            if self.is_settled() {
                return true;
            }
        }
        false
    }

    /// The round is over and the session shows it with nothing in flight.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        let controller = self.session.controller();
        self.authority.snapshot().phase == Phase::RoundOver
            && controller.accepted().is_some_and(|s| s.phase == Phase::RoundOver)
            && controller.scheduler().is_idle()
            && !controller.transient().has_pending()
    }

    #[must_use]
    pub fn view(&self) -> TableView {
        self.session.view()
    }

    #[must_use]
    pub fn session(&self) -> &Session<RecordingTransport> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<RecordingTransport> {
        &mut self.session
    }

    #[must_use]
    pub fn authority(&self) -> &ScriptedAuthority {
        &self.authority
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// The local actions that produce `message`.
#[must_use]
pub fn to_local(message: ActionMessage) -> Vec<LocalAction> {
    match message {
        ActionMessage::Draw { source } => vec![LocalAction::Draw(source)],
        ActionMessage::Swap { position } => vec![LocalAction::Swap(position)],
        ActionMessage::Discard => vec![LocalAction::Discard],
        ActionMessage::FlipInitial { positions } => positions
            .into_iter()
            .map(LocalAction::SelectInitialFlip)
            .collect(),
        ActionMessage::FlipAsAction { position } => vec![LocalAction::FlipAsAction(position)],
        ActionMessage::SkipFlip => vec![LocalAction::SkipFlip],
        ActionMessage::KnockEarly => vec![LocalAction::KnockEarly],
        ActionMessage::NextRound => vec![LocalAction::NextRound],
    }
}

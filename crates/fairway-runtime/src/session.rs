#![forbid(unsafe_code)]

//! One client's view of one table.
//!
//! A [`Session`] ties the [`Controller`] to a viewport and an outbound
//! [`Transport`]. The host feeds it inbound frames, local actions and frame
//! ticks, and asks it for a [`TableView`] to draw. The layout is recomputed
//! when the viewport or the seat order changes, before the snapshot that
//! changed it is reconciled, so inferred effects resolve against the new
//! seats.
//!
//! Reconnecting is the host's job. The session only keeps the backoff
//! clock: after [`channel_lost`](Session::channel_lost), poll
//! [`reconnect_due`](Session::reconnect_due) each tick and report the result
//! with [`reconnect_failed`](Session::reconnect_failed) or
//! [`channel_restored`](Session::channel_restored).

use fairway_core::subject::SubjectKey;
use fairway_core::wire::{DecodeError, Inbound, decode_inbound};
use fairway_core::snapshot::PlayerId;
use fairway_layout::{Rect, RenderInput, TableLayout, TableView, render};
use tracing::{debug, info, warn};
use web_time::Duration;

use crate::config::ChoreographyConfig;
use crate::controller::{ActionRefused, Controller, LocalAction, SnapshotOutcome};
use crate::counters::ChoreographyCounters;
use crate::notice::NoticeKey;
use crate::retry::ReconnectState;
use crate::scheduler::Completion;
use crate::transport::Transport;

/// What an inbound frame did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    Snapshot(SnapshotOutcome),
    Confirmed,
    Rejected,
    Ignored,
}

/// A table session.
#[derive(Debug)]
pub struct Session<T: Transport> {
    viewport: Rect,
    seats: Vec<PlayerId>,
    layout: TableLayout,
    controller: Controller,
    transport: T,
    reconnect: ReconnectState,
}

impl<T: Transport> Session<T> {
    pub fn new(
        config: ChoreographyConfig,
        local: Option<PlayerId>,
        viewport: Rect,
        transport: T,
    ) -> Self {
        info!(
            target: "fairway.session",
            local = local.as_ref().map(PlayerId::as_str),
            width = viewport.width,
            height = viewport.height,
            "session started"
        );
        let layout = TableLayout::compute(viewport, &[], local.as_ref());
        Self {
            viewport,
            seats: Vec::new(),
            layout,
            controller: Controller::new(config, local),
            transport,
            reconnect: ReconnectState::Connected,
        }
    }

    /// Decode and route one text frame.
    pub fn handle_frame(&mut self, text: &str) -> Result<InboundOutcome, DecodeError> {
        let inbound = decode_inbound(text).inspect_err(|error| {
            warn!(target: "fairway.session", %error, "undecodable frame");
        })?;
        Ok(self.handle_inbound(inbound))
    }

    pub fn handle_inbound(&mut self, inbound: Inbound) -> InboundOutcome {
        match inbound {
            Inbound::Snapshot(snapshot) => {
                let seats: Vec<PlayerId> = snapshot.seat_order().cloned().collect();
                if seats != self.seats {
                    self.seats = seats;
                    self.relayout();
                }
                InboundOutcome::Snapshot(self.controller.handle_snapshot(snapshot, &self.layout))
            }
            Inbound::ActionConfirmed { card } => {
                self.controller.handle_action_confirmed(card, &self.layout);
                InboundOutcome::Confirmed
            }
            Inbound::Error { message } => {
                self.controller.handle_error(&message, &self.layout);
                InboundOutcome::Rejected
            }
            Inbound::Unknown { kind } => {
                debug!(target: "fairway.session", kind = %kind, "ignored frame");
                InboundOutcome::Ignored
            }
        }
    }

    /// Perform a local action against the current layout.
    pub fn perform(&mut self, action: LocalAction) -> Result<(), ActionRefused> {
        self.controller
            .perform(action, &mut self.transport, &self.layout)
    }

    /// Advance one frame.
    pub fn tick(&mut self, dt: Duration) -> Vec<Completion> {
        let completions = self.controller.tick(dt, &self.layout);
        if self.reconnect.tick(dt) {
            if let ReconnectState::Due { attempt } = self.reconnect {
                info!(target: "fairway.session", attempt, "reconnect due");
                self.controller
                    .notices_mut()
                    .set(NoticeKey::Reconnecting, format!("Reconnecting (attempt {})", attempt + 1));
            }
        }
        completions
    }

    pub fn channel_lost(&mut self) {
        self.controller.channel_lost();
        self.reconnect = ReconnectState::begin(&self.controller.config().reconnect);
        if self.reconnect == ReconnectState::GaveUp {
            info!(target: "fairway.session", "automatic reconnect disabled");
        }
    }

    /// Whether the host should try to reconnect now.
    #[must_use]
    pub fn reconnect_due(&self) -> bool {
        self.reconnect.is_due()
    }

    pub fn reconnect_failed(&mut self) {
        let policy = self.controller.config().reconnect.clone();
        self.reconnect.failed(&policy);
        if self.reconnect == ReconnectState::GaveUp {
            warn!(target: "fairway.session", "reconnect attempts exhausted");
            self.controller
                .notices_mut()
                .set(NoticeKey::Reconnecting, "Could not reconnect");
        }
    }

    pub fn channel_restored(&mut self) {
        self.reconnect = ReconnectState::Connected;
        self.controller.channel_restored();
    }

    /// The frame to draw now.
    #[must_use]
    pub fn view(&self) -> TableView {
        let artifacts = self.controller.scheduler().artifacts();
        let notices = self.controller.notices().texts();
        render(&RenderInput {
            snapshot: self.controller.accepted(),
            seq: self.controller.accepted_seq(),
            transient: self.controller.transient(),
            local: self.controller.local(),
            artifacts: &artifacts,
            notices: &notices,
            connected: self.controller.is_connected(),
        })
    }

    pub fn resize(&mut self, viewport: Rect) {
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.relayout();
    }

    /// The subject under a viewport cell, for mapping clicks to actions.
    #[must_use]
    pub fn subject_at(&self, x: u16, y: u16) -> Option<SubjectKey> {
        self.layout.hit_test(x, y)
    }

    fn relayout(&mut self) {
        self.layout = TableLayout::compute(self.viewport, &self.seats, self.controller.local());
        debug!(
            target: "fairway.session",
            seats = self.seats.len(),
            laid_out = self.layout.len(),
            "layout recomputed"
        );
    }

    #[must_use]
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    #[must_use]
    pub fn counters(&self) -> &ChoreographyCounters {
        self.controller.counters()
    }

    #[must_use]
    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    #[must_use]
    pub fn reconnect_state(&self) -> &ReconnectState {
        &self.reconnect
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#![forbid(unsafe_code)]

//! Span and event structure emitted while reconciling.
//!
//! Run:
//!   cargo test -p fairway-runtime --test tracing_span_hierarchy

use fairway_core::movement::DrawSource;
use fairway_core::snapshot::PlayerId;
use fairway_core::wire::Inbound;
use fairway_harness::fixtures::{SnapshotBuilder, card};
use fairway_harness::{RecordingTransport, with_captured_tracing};
use fairway_layout::Rect;
use fairway_runtime::{ChoreographyConfig, LocalAction, Session};
use tracing::Level;
use web_time::Duration;

fn session() -> Session<RecordingTransport> {
    Session::new(
        ChoreographyConfig::default(),
        Some(PlayerId::new("you")),
        Rect::new(0, 0, 120, 40),
        RecordingTransport::new(),
    )
}

fn table() -> SnapshotBuilder {
    SnapshotBuilder::new()
        .player("you", false)
        .player("bot", true)
        .current("bot")
        .discard(card("2h", 40))
        .deck(30)
}

#[test]
fn every_snapshot_gets_a_span_with_phase_and_sequence() {
    let ((), capture) = with_captured_tracing(|| {
        let mut s = session();
        s.handle_inbound(Inbound::Snapshot(table().build()));
        s.handle_inbound(Inbound::Snapshot(table().deck(29).build()));
    });

    let spans = capture.spans_named("controller.snapshot");
    assert_eq!(spans.len(), 2);
    assert!(spans.iter().all(|s| s.target == "fairway.controller"));
    assert_eq!(spans[0].fields["phase"], "active-turn");
    assert_eq!(spans[0].fields["accepted_seq"], "0");
    assert_eq!(spans[1].fields["accepted_seq"], "1");
}

#[test]
fn directives_start_inside_the_snapshot_that_inferred_them() {
    let ((), capture) = with_captured_tracing(|| {
        let mut s = session();
        let held = table().held("bot", card("9s", 50)).build();
        s.handle_inbound(Inbound::Snapshot(held.clone()));
        let discarded = SnapshotBuilder::from_snapshot(held)
            .not_held()
            .discard(card("9s", 50))
            .build();
        s.handle_inbound(Inbound::Snapshot(discarded));
    });

    let directives = capture.spans_named("scheduler.directive");
    assert_eq!(directives.len(), 1);
    let directive = &directives[0];
    assert_eq!(directive.target, "fairway.scheduler");
    assert_eq!(directive.fields["kind"], "arc-move");
    assert_eq!(directive.fields["origin"], "Remote");
    assert_eq!(directive.fields["seq"], "2");

    let started: Vec<_> = capture
        .events_at("fairway.scheduler")
        .into_iter()
        .filter(|e| e.message() == Some("started"))
        .collect();
    assert_eq!(started.len(), 1);
    assert_eq!(
        started[0].scope,
        vec![
            "controller.snapshot".to_string(),
            "scheduler.directive".to_string()
        ]
    );
    assert_eq!(started[0].fields["delay_ms"], "450");
}

#[test]
fn local_actions_log_inside_their_action_span() {
    let ((), capture) = with_captured_tracing(|| {
        let mut s = session();
        s.handle_inbound(Inbound::Snapshot(table().current("you").build()));
        s.perform(LocalAction::Draw(DrawSource::Deck)).unwrap();
        assert!(s.perform(LocalAction::Discard).is_err());
    });

    let actions = capture.spans_named("controller.action");
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].fields["action"], "draw");
    assert_eq!(actions[1].fields["action"], "discard");

    let sent = capture.events_with_message("action sent");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].level, Level::INFO);
    assert_eq!(sent[0].scope, vec!["controller.action".to_string()]);

    let refused = capture.events_with_message("action refused");
    assert_eq!(refused.len(), 1);
    assert_eq!(refused[0].level, Level::DEBUG);
    assert_eq!(
        refused[0].fields["reason"],
        "waiting for the previous action"
    );
}

#[test]
fn partial_snapshots_and_rejections_warn() {
    let ((), capture) = with_captured_tracing(|| {
        let mut s = session();
        s.handle_inbound(Inbound::Snapshot(table().build()));
        s.handle_inbound(Inbound::Snapshot(table().partial(&["players"]).build()));
        s.handle_inbound(Inbound::Error {
            message: "Not your turn".into(),
        });
        s.tick(Duration::from_millis(16));
    });

    let warnings: Vec<_> = capture
        .events_at("fairway.controller")
        .into_iter()
        .filter(|e| e.level == Level::WARN)
        .collect();
    assert_eq!(warnings.len(), 2);
    assert_eq!(
        warnings[0].message(),
        Some("partial snapshot accepted without inference")
    );
    assert_eq!(warnings[0].scope, vec!["controller.snapshot".to_string()]);
    assert_eq!(warnings[1].message(), Some("action rejected"));
    assert_eq!(warnings[1].fields["error"], "Not your turn");
}

#[test]
fn unknown_frames_are_noted_not_fatal() {
    let ((), capture) = with_captured_tracing(|| {
        let mut s = session();
        s.handle_frame(r#"{"type":"lobby-update","players":[]}"#)
            .unwrap();
        assert!(s.handle_frame("[1,2,3]").is_err());
    });

    let ignored = capture.events_with_message("ignored frame");
    assert_eq!(ignored.len(), 1);
    assert_eq!(ignored[0].fields["kind"], "lobby-update");
    assert_eq!(capture.events_with_message("undecodable frame").len(), 1);
}

#![forbid(unsafe_code)]

//! Fairway Harness
//!
//! Test fixtures and a headless driver for Fairway sessions.
//!
//! # Key Components
//!
//! - [`fixtures::SnapshotBuilder`] - Fluent snapshots for unit and property tests
//! - [`authority::ScriptedAuthority`] - A seeded in-process authority
//! - [`transport::RecordingTransport`] - Captures outbound actions
//! - [`capture`] - A tracing layer for span and event assertions
//! - [`simulation::Simulation`] - Authority and session wired together
//! - [`replay`] - JSONL scripts in, JSONL table views out
//! - [`cli`] - The `fairway-harness` command line
//!
//! # Role in Fairway
//! Nothing here ships in a client. The runtime's integration tests and the
//! `fairway-harness` binary are built on it.

pub mod authority;
pub mod capture;
pub mod cli;
pub mod fixtures;
pub mod replay;
pub mod simulation;
pub mod transport;

pub use authority::{Rejection, ScriptedAuthority};
pub use capture::{CaptureHandle, CaptureLayer, with_captured_tracing};
pub use fixtures::SnapshotBuilder;
pub use replay::{ReplayOptions, ReplaySummary, ScriptStep, StepKind, parse_script, replay};
pub use simulation::{Simulation, SimulationSpec};
pub use transport::RecordingTransport;

#![forbid(unsafe_code)]

//! Fairway Runtime
//!
//! Turns a stream of authoritative table snapshots into smooth, ordered card
//! effects, while letting the local player act ahead of the authority.
//!
//! # Key Components
//!
//! - [`Session`] - One table: inbound frames, local actions, ticks, views
//! - [`Controller`] - Owns the accepted snapshot and the optimistic overlay
//! - [`StateDiffer`] - Infers movements between consecutive snapshots
//! - [`AnimationScheduler`] - Serializes effects per subject under locks
//! - [`ChoreographyConfig`] - Durations, pacing, and reconnect policy
//! - [`Transport`] - The outbound seam to the authority
//!
//! # Role in Fairway
//! `fairway-runtime` is the orchestrator. It consumes the value types of
//! `fairway-core`, resolves primitives against the anchors of
//! `fairway-layout`, and hands the host a `TableView` per frame.
//!
//! # How it fits in the system
//! The authority is always right. Animation never decides what state is
//! shown; it only decides *when* a snapshot that touches an animating card
//! is allowed through.

pub mod cancellation;
pub mod choreography;
pub mod config;
pub mod controller;
pub mod counters;
pub mod differ;
pub mod notice;
pub mod retry;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use cancellation::{CancellationScope, CancellationToken};
pub use config::{ChoreographyConfig, ConfigError, DurationConfig, PacingConfig};
pub use controller::{ActionRefused, Controller, ControllerState, LocalAction, SnapshotOutcome};
pub use counters::ChoreographyCounters;
pub use differ::{StateDiffer, diff, touched_subjects};
pub use notice::{NoticeBoard, NoticeKey};
pub use retry::{BackoffStrategy, ReconnectPolicy, ReconnectState};
pub use scheduler::{AnimationHandle, AnimationScheduler, Completion, Directive, Origin, Outcome};
pub use session::{InboundOutcome, Session};
pub use transport::{Transport, TransportError};

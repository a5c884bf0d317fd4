#![forbid(unsafe_code)]

//! Core: table model, wire schema, geometry, and animation primitives.
//!
//! # Role in Fairway
//! `fairway-core` is the leaf crate. It owns the authoritative snapshot model
//! as the client sees it, the JSON boundary to the authority, and the
//! game-agnostic animation values the scheduler drives.
//!
//! # Primary responsibilities
//! - **Snapshot**: complete table state, coerced from the wire and never
//!   mutated client-side.
//! - **Movement / SubjectKey**: the vocabulary the differ and scheduler share.
//! - **LocalTransientState**: optimistic overlays and the deferred snapshot.
//! - **wire**: tagged inbound frames, outbound actions, lenient coercion.
//! - **animation**: the `Animation` trait, timelines, springs, card effects.
//!
//! # How it fits in the system
//! `fairway-layout` maps subjects to rectangles and renders table views;
//! `fairway-runtime` diffs snapshots, schedules effects, and reconciles.
//! Neither reaches past the types defined here.

pub mod animation;
pub mod card;
pub mod geometry;
pub mod logging;
pub mod movement;
pub mod snapshot;
pub mod subject;
pub mod transient;
pub mod wire;

pub use card::{Card, CardFace, Rank, Suit};
pub use geometry::Rect;
pub use movement::{DrawSource, Movement, MovementKind};
pub use snapshot::{
    ActiveRules, HAND_SIZE, Hand, HandPosition, Integrity, Phase, PlayerId, PlayerView, RuleFlags,
    Snapshot,
};
pub use subject::SubjectKey;
pub use transient::{LocalTransientState, OptimisticMutation, SavedOptimism};
pub use wire::{ActionMessage, DecodeError, Inbound, decode_inbound};

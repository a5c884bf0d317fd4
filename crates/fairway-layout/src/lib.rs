#![forbid(unsafe_code)]

//! Table layout and the render model.
//!
//! [`TableLayout`] assigns every visual subject a rectangle for a given
//! viewport and seating; it is the [`Anchors`](fairway_core::animation::Anchors)
//! implementation the scheduler resolves primitives against.
//!
//! [`render`] projects the accepted snapshot, local transient state, and
//! in-flight animation artifacts into a [`TableView`]. It is a pure function:
//! the same inputs always yield the same view.

pub mod table;
pub mod view;

pub use fairway_core::geometry::{Rect, Sides};
pub use table::{CARD_HEIGHT, CARD_WIDTH, TableLayout};
pub use view::{ArtifactView, RenderInput, SeatView, SlotView, TableView, render};

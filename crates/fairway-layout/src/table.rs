#![forbid(unsafe_code)]

//! Subject rectangles for a table viewport.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  [seat B]            [seat C]          ...   │  opponents, seat order
//! │                                              │
//! │            [deck] [discard] [held]           │  piles, vertically centred
//! │                                              │
//! │                  [local seat]                │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! A seat is a one-row banner above a 2×3 grid of cards. Opponents are
//! listed starting after the local player, so the table reads clockwise.
//! Without a local player every seat goes on the top band.
//!
//! A seat that does not fit its share of the viewport is left out entirely:
//! its subjects have no anchor, and primitives aimed at them fail fast.

use fairway_core::animation::Anchors;
use fairway_core::geometry::Rect;
use fairway_core::snapshot::{HAND_COLUMNS, HAND_SIZE, HandPosition, PlayerId};
use fairway_core::subject::SubjectKey;
use rustc_hash::FxHashMap;

pub const CARD_WIDTH: u16 = 5;
pub const CARD_HEIGHT: u16 = 3;
const CARD_GAP: u16 = 1;
const PILE_GAP: u16 = 2;
const BANNER_HEIGHT: u16 = 1;

const HAND_ROWS: u16 = (HAND_SIZE / HAND_COLUMNS) as u16;
const HAND_WIDTH: u16 = HAND_COLUMNS as u16 * CARD_WIDTH + (HAND_COLUMNS as u16 - 1) * CARD_GAP;
const HAND_HEIGHT: u16 = HAND_ROWS * CARD_HEIGHT + (HAND_ROWS - 1) * CARD_GAP;
const SEAT_HEIGHT: u16 = BANNER_HEIGHT + HAND_HEIGHT;
const PILES_WIDTH: u16 = 3 * CARD_WIDTH + 2 * PILE_GAP;

/// Rectangles for every laid-out subject.
#[derive(Debug, Clone, Default)]
pub struct TableLayout {
    area: Rect,
    rects: FxHashMap<SubjectKey, Rect>,
}

impl TableLayout {
    /// Lay out `seats` (authority seat order) in `area`.
    #[must_use]
    pub fn compute(area: Rect, seats: &[PlayerId], local: Option<&PlayerId>) -> Self {
        let mut layout = Self {
            area,
            rects: FxHashMap::default(),
        };
        if area.is_empty() {
            return layout;
        }

        let pile_y = area.y + area.height.saturating_sub(CARD_HEIGHT) / 2;
        let pile_x = area.x + area.width.saturating_sub(PILES_WIDTH) / 2;
        if area.width >= PILES_WIDTH && area.height >= CARD_HEIGHT {
            let step = CARD_WIDTH + PILE_GAP;
            layout.put(SubjectKey::Deck, Rect::new(pile_x, pile_y, CARD_WIDTH, CARD_HEIGHT));
            layout.put(
                SubjectKey::Discard,
                Rect::new(pile_x + step, pile_y, CARD_WIDTH, CARD_HEIGHT),
            );
            layout.put(
                SubjectKey::Held,
                Rect::new(pile_x + 2 * step, pile_y, CARD_WIDTH, CARD_HEIGHT),
            );
        }

        // Bands must not overlap the pile row.
        let bands_fit = area.height >= 2 * SEAT_HEIGHT + CARD_HEIGHT + 2;

        let local = local.filter(|id| seats.contains(id));
        let opponents: Vec<&PlayerId> = match local.and_then(|id| seats.iter().position(|s| s == id)) {
            Some(at) => seats[at + 1..].iter().chain(&seats[..at]).collect(),
            None => seats.iter().collect(),
        };

        if let Some(id) = local.filter(|_| bands_fit && area.width >= HAND_WIDTH) {
            let x = area.x + (area.width - HAND_WIDTH) / 2;
            layout.place_seat(id, x, area.bottom() - SEAT_HEIGHT);
        }

        if !opponents.is_empty() && (bands_fit || local.is_none()) {
            let column = area.width / opponents.len() as u16;
            if column >= HAND_WIDTH && area.height >= SEAT_HEIGHT {
                for (i, id) in opponents.into_iter().enumerate() {
                    let x = area.x + i as u16 * column + (column - HAND_WIDTH) / 2;
                    layout.place_seat(id, x, area.y);
                }
            }
        }
        layout
    }

    fn put(&mut self, key: SubjectKey, rect: Rect) {
        self.rects.insert(key, rect);
    }

    fn place_seat(&mut self, id: &PlayerId, x: u16, y: u16) {
        self.put(
            SubjectKey::Seat(id.clone()),
            Rect::new(x, y, HAND_WIDTH, BANNER_HEIGHT),
        );
        let grid_y = y + BANNER_HEIGHT;
        for position in HandPosition::ALL {
            let col = position.column() as u16;
            let row = position.row() as u16;
            self.put(
                SubjectKey::slot(id, position),
                Rect::new(
                    x + col * (CARD_WIDTH + CARD_GAP),
                    grid_y + row * (CARD_HEIGHT + CARD_GAP),
                    CARD_WIDTH,
                    CARD_HEIGHT,
                ),
            );
        }
    }

    #[inline]
    #[must_use]
    pub fn area(&self) -> Rect {
        self.area
    }

    #[must_use]
    pub fn rect(&self, key: &SubjectKey) -> Option<Rect> {
        self.rects.get(key).copied()
    }

    /// Whether `player`'s seat was laid out.
    #[must_use]
    pub fn has_seat(&self, player: &PlayerId) -> bool {
        self.rects.contains_key(&SubjectKey::Seat(player.clone()))
    }

    /// The subject drawn at a cell, if any.
    #[must_use]
    pub fn hit_test(&self, x: u16, y: u16) -> Option<SubjectKey> {
        self.rects
            .iter()
            .filter(|(_, r)| r.contains(x, y))
            .map(|(k, _)| k.clone())
            .min()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
}

impl Anchors for TableLayout {
    fn anchor(&self, subject: &SubjectKey) -> Option<Rect> {
        self.rect(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<PlayerId> {
        names.iter().copied().map(PlayerId::from).collect()
    }

    #[test]
    fn four_seats_fit_a_wide_table() {
        let seats = ids(&["a", "b", "c", "d"]);
        let layout = TableLayout::compute(Rect::new(0, 0, 80, 30), &seats, Some(&seats[1]));
        for id in &seats {
            assert!(layout.has_seat(id), "{id} missing");
        }
        // 3 piles + 4 seats × (banner + 6 slots)
        assert_eq!(layout.len(), 3 + 4 * 7);
        let local = layout.rect(&SubjectKey::Seat(seats[1].clone())).unwrap();
        assert_eq!(local.y, 30 - SEAT_HEIGHT);
    }

    #[test]
    fn opponents_start_after_local_player() {
        let seats = ids(&["a", "b", "c"]);
        let layout = TableLayout::compute(Rect::new(0, 0, 80, 30), &seats, Some(&seats[1]));
        let c = layout.rect(&SubjectKey::Seat(seats[2].clone())).unwrap();
        let a = layout.rect(&SubjectKey::Seat(seats[0].clone())).unwrap();
        assert!(c.x < a.x);
        assert_eq!(c.y, 0);
    }

    #[test]
    fn slots_do_not_overlap() {
        let seats = ids(&["a", "b"]);
        let layout = TableLayout::compute(Rect::new(0, 0, 60, 30), &seats, Some(&seats[0]));
        let slots: Vec<Rect> = HandPosition::ALL
            .iter()
            .filter_map(|p| layout.rect(&SubjectKey::slot(&seats[0], *p)))
            .collect();
        assert_eq!(slots.len(), HAND_SIZE);
        for (i, a) in slots.iter().enumerate() {
            for b in &slots[i + 1..] {
                assert!(a.intersection_opt(b).is_none());
            }
        }
    }

    #[test]
    fn cramped_viewport_leaves_seats_unanchored() {
        let seats = ids(&["a", "b", "c", "d", "e", "f"]);
        let layout = TableLayout::compute(Rect::new(0, 0, 40, 30), &seats, Some(&seats[0]));
        assert!(layout.has_seat(&seats[0]));
        assert!(!layout.has_seat(&seats[3]));
        assert!(layout.anchor(&SubjectKey::Deck).is_some());
        let empty = TableLayout::compute(Rect::default(), &seats, None);
        assert!(empty.is_empty());
    }

    #[test]
    fn hit_test_finds_piles() {
        let layout = TableLayout::compute(Rect::new(0, 0, 80, 30), &[], None);
        let deck = layout.rect(&SubjectKey::Deck).unwrap();
        assert_eq!(layout.hit_test(deck.x, deck.y), Some(SubjectKey::Deck));
        assert_eq!(layout.hit_test(0, 0), None);
    }
}

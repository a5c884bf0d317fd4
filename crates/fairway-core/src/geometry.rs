#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! Table coordinates are integer cells, origin at the top-left. Animation
//! samples interpolate in `f32` and round back to cells.

use serde::Serialize;

/// A rectangle for table anchors and in-flight card positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: u16,
    /// Top edge (inclusive).
    pub y: u16,
    /// Width in cells.
    pub width: u16,
    /// Height in cells.
    pub height: u16,
}

impl Rect {
    #[inline]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle at the origin with the given size.
    #[inline]
    pub const fn from_size(width: u16, height: u16) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> u16 {
        self.y.saturating_add(self.height)
    }

    #[inline]
    pub const fn area(&self) -> u32 {
        self.width as u32 * self.height as u32
    }

    /// Zero-area rectangles are not valid anchors.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub const fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Center point, rounded toward the origin.
    #[inline]
    pub const fn center(&self) -> (u16, u16) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Shrink by `margin` on every side.
    pub fn inner(&self, margin: Sides) -> Rect {
        Rect {
            x: self.x.saturating_add(margin.left),
            y: self.y.saturating_add(margin.top),
            width: self.width.saturating_sub(margin.horizontal_sum()),
            height: self.height.saturating_sub(margin.vertical_sum()),
        }
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect {
            x,
            y,
            width: right.saturating_sub(x),
            height: bottom.saturating_sub(y),
        }
    }

    /// Overlap, or `None` if the rectangles are disjoint.
    pub fn intersection_opt(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if x < right && y < bottom {
            Some(Rect::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    /// Move by a signed offset, clamping at the origin.
    #[must_use]
    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            x: clamp_cell(i32::from(self.x) + dx),
            y: clamp_cell(i32::from(self.y) + dy),
            ..*self
        }
    }

    /// Interpolate position and size toward `to`. `t` is clamped to `[0, 1]`.
    #[must_use]
    pub fn lerp(&self, to: &Rect, t: f32) -> Rect {
        let t = t.clamp(0.0, 1.0);
        Rect {
            x: lerp_cell(self.x, to.x, t),
            y: lerp_cell(self.y, to.y, t),
            width: lerp_cell(self.width, to.width, t),
            height: lerp_cell(self.height, to.height, t),
        }
    }
}

fn lerp_cell(a: u16, b: u16, t: f32) -> u16 {
    let v = f32::from(a) + (f32::from(b) - f32::from(a)) * t;
    clamp_cell(v.round() as i32)
}

fn clamp_cell(v: i32) -> u16 {
    v.clamp(0, i32::from(u16::MAX)) as u16
}

/// Sides for padding/margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sides {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

impl Sides {
    pub const fn all(val: u16) -> Self {
        Self {
            top: val,
            right: val,
            bottom: val,
            left: val,
        }
    }

    pub const fn new(top: u16, right: u16, bottom: u16, left: u16) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    #[inline]
    pub const fn horizontal_sum(&self) -> u16 {
        self.left.saturating_add(self.right)
    }

    #[inline]
    pub const fn vertical_sum(&self) -> u16 {
        self.top.saturating_add(self.bottom)
    }
}

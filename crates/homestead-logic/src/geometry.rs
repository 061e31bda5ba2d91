//! Tile and pixel geometry.
//!
//! Tiles are integer grid cells; everything the engine intersects is an
//! axis-aligned pixel rectangle. Pixel → tile conversion uses floor
//! division so negative coordinates land on the correct tile.

use serde::{Deserialize, Serialize};

/// Integer grid coordinate.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The tile containing pixel `(px, py)`.
    pub fn containing(px: i32, py: i32, tile_size: i32) -> Self {
        Self {
            x: px.div_euclid(tile_size),
            y: py.div_euclid(tile_size),
        }
    }

    /// Pixel rectangle covered by this tile.
    pub fn pixel_rect(self, tile_size: i32) -> Rect {
        Rect::new(
            self.x * tile_size,
            self.y * tile_size,
            tile_size,
            tile_size,
        )
    }
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A pixel position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel rectangle. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning `w × h` tiles starting at `origin`.
    pub fn from_tiles(origin: Tile, w: i32, h: i32, tile_size: i32) -> Self {
        Self::new(
            origin.x * tile_size,
            origin.y * tile_size,
            w * tile_size,
            h * tile_size,
        )
    }

    pub const fn left(&self) -> i32 {
        self.x
    }
    pub const fn top(&self) -> i32 {
        self.y
    }
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub const fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2,
            y: self.y + self.height / 2,
        }
    }

    /// Zero or negative extent on either axis.
    pub const fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Interiors overlap. Touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    /// `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }

    /// Overlapping region, if the interiors overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Some(Rect::new(left, top, right - left, bottom - top))
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.left() && p.x < self.right() && p.y >= self.top() && p.y < self.bottom()
    }

    /// Grow by `dx` on the left and right and `dy` on the top and bottom.
    pub fn inflate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(
            self.x - dx,
            self.y - dy,
            self.width + 2 * dx,
            self.height + 2 * dy,
        )
    }

    /// Extend the top edge upward by `dy`, keeping the bottom fixed.
    pub fn extend_up(&self, dy: i32) -> Rect {
        Rect::new(self.x, self.y - dy, self.width, self.height + dy)
    }

    /// Tile under the box center, i.e. where an actor "stands".
    pub fn foot_tile(&self, tile_size: i32) -> Tile {
        let c = self.center();
        Tile::containing(c.x, c.y, tile_size)
    }
}

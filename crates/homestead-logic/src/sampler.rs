//! Corner sampling for tile-based checks.
//!
//! A moving box is tested against tile data by sampling the tiles under
//! its corners, plus the top and bottom midpoints when the box is wider
//! than a tile. `sample_and_test` skips corners that sit on the same tile
//! as in the actor's previous box and never evaluates one tile twice in a
//! call, so a side effect attached to a tile fires at most once.

use crate::geometry::{Rect, Tile};

/// Slot order: top-right, top-left, bottom-right, bottom-left, top-mid,
/// bottom-mid.
pub const CORNER_SLOTS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corners {
    slots: [Option<Tile>; CORNER_SLOTS],
}

impl Corners {
    pub fn get(&self, slot: usize) -> Option<Tile> {
        self.slots.get(slot).copied().flatten()
    }

    /// Sampled tiles in slot order, duplicates included.
    pub fn iter(&self) -> impl Iterator<Item = Tile> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// The four true corners.
    pub fn four(&self) -> impl Iterator<Item = Tile> + '_ {
        self.slots[..4].iter().flatten().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerSampler {
    tile_size: i32,
}

impl CornerSampler {
    pub fn new(tile_size: i32) -> Self {
        Self { tile_size }
    }

    pub fn corners(&self, b: &Rect) -> Corners {
        let ts = self.tile_size;
        // last pixel inside the box
        let right = (b.right() - 1).max(b.left());
        let bottom = (b.bottom() - 1).max(b.top());
        let mut slots = [
            Some(Tile::containing(right, b.top(), ts)),
            Some(Tile::containing(b.left(), b.top(), ts)),
            Some(Tile::containing(right, bottom, ts)),
            Some(Tile::containing(b.left(), bottom, ts)),
            None,
            None,
        ];
        if b.width > ts {
            let mid = b.center().x;
            slots[4] = Some(Tile::containing(mid, b.top(), ts));
            slots[5] = Some(Tile::containing(mid, bottom, ts));
        }
        Corners { slots }
    }

    /// Evaluate `predicate` on each sampled tile of `candidate` that is new
    /// relative to the same slot of `previous` and not yet visited this
    /// call. Returns `true` on the first tile the predicate accepts.
    ///
    /// Pass `previous = None` to disable the previous-box exclusion.
    pub fn sample_and_test<F>(&self, candidate: &Rect, previous: Option<&Rect>, mut predicate: F) -> bool
    where
        F: FnMut(Tile) -> bool,
    {
        let current = self.corners(candidate);
        let before = previous.map(|p| self.corners(p));
        let mut visited: Vec<Tile> = Vec::with_capacity(CORNER_SLOTS);

        for slot in 0..CORNER_SLOTS {
            let Some(tile) = current.get(slot) else {
                continue;
            };
            if before.is_some_and(|b| b.get(slot) == Some(tile)) {
                continue;
            }
            if visited.contains(&tile) {
                continue;
            }
            visited.push(tile);
            if predicate(tile) {
                return true;
            }
        }
        false
    }
}

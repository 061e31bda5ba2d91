//! Registry category bitsets.
//!
//! A query considers a category iff its bit is set in the collision mask.
//! The parallel ignore mask marks categories whose *individually passable*
//! entries are treated as non-blocking.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Which entity registries (and location-specific occupiers) a query
    /// considers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CollisionMask: u16 {
        const OBJECTS = 1 << 0;
        const FURNITURE = 1 << 1;
        const CHARACTERS = 1 << 2;
        const FARMERS = 1 << 3;
        const TERRAIN_FEATURES = 1 << 4;
        const FLOORING = 1 << 5;
        const BUILDINGS = 1 << 6;
        const LOCATION_SPECIFIC = 1 << 7;
    }
}

impl Default for CollisionMask {
    fn default() -> Self {
        Self::all()
    }
}

impl CollisionMask {
    /// Category participates in the query.
    pub fn considers(self, category: CollisionMask) -> bool {
        self.contains(category)
    }

    /// A found entry in `category` blocks unless the category is soft in
    /// `ignore` *and* the entry itself is passable.
    pub fn hard_block(ignore: CollisionMask, category: CollisionMask, entry_passable: bool) -> bool {
        !ignore.contains(category) || !entry_passable
    }

    /// Ignore mask used by placement checks.
    ///
    /// Unless `strict`, placed objects are never soft, and standing
    /// characters/farmers stay soft only for items that are walkable
    /// themselves.
    pub fn placement_ignore(ignore: CollisionMask, item_is_passable: bool, strict: bool) -> Self {
        if strict {
            return ignore;
        }
        let mut ignore = ignore - CollisionMask::OBJECTS;
        if !item_is_passable {
            ignore -= CollisionMask::CHARACTERS | CollisionMask::FARMERS;
        }
        ignore
    }
}

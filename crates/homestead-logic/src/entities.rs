//! Registry entry types.
//!
//! Each entry exposes its bounding box and passability; behavior that
//! differs per kind is a closed enum matched once, not a type test.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Tile};
use crate::grid::{Layer, WorldGrid};

// ── Point-indexed entries ───────────────────────────────────────────────

/// An item sitting on a single tile (chest, keg, fence post, egg, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedObject {
    pub name: String,
    /// Walk-over objects (paths, dropped forage).
    pub passable: bool,
    /// Eggs, wool, truffles: farm animals walk over these.
    pub animal_product: bool,
    /// Object wants a collision callback when bumped.
    pub reacts_to_collision: bool,
}

impl PlacedObject {
    pub fn solid(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passable: false,
            animal_product: false,
            reacts_to_collision: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub name: String,
    /// Trellis crops block movement.
    pub raised: bool,
}

/// Tile-sized ground growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TerrainGrowth {
    Grass,
    Tree { stage: u8 },
    FruitTree { stage: u8 },
    Bush,
    HoeDirt { crop: Option<Crop> },
    Flooring,
}

impl TerrainGrowth {
    pub fn bounding_box(&self, tile: Tile, tile_size: i32) -> Rect {
        tile.pixel_rect(tile_size)
    }

    pub fn is_flooring(&self) -> bool {
        matches!(self, Self::Flooring)
    }

    /// Passable with no particular mover in mind.
    pub fn is_passable(&self) -> bool {
        self.is_passable_for(false)
    }

    /// Passable for a mover; crop tenders walk between trellis rows.
    pub fn is_passable_for(&self, tends_crops: bool) -> bool {
        match self {
            Self::Grass | Self::Flooring => true,
            Self::Tree { stage } | Self::FruitTree { stage } => *stage == 0,
            Self::Bush => false,
            Self::HoeDirt { crop } => tends_crops || !crop.as_ref().is_some_and(|c| c.raised),
        }
    }

    /// Reacts to actors brushing through (shaking grass, rustling crops).
    pub fn is_disturbable(&self) -> bool {
        !self.is_flooring()
    }

    pub fn crop(&self) -> Option<&Crop> {
        match self {
            Self::HoeDirt { crop } => crop.as_ref(),
            _ => None,
        }
    }
}

// ── Bounding-box entries ────────────────────────────────────────────────

/// Which animals a building can house.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Housing {
    Coop,
    Barn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalDoor {
    /// Top-left tile, relative to the building origin.
    pub offset: Tile,
    pub tiles_wide: i32,
    pub tiles_high: i32,
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub kind: String,
    pub origin: Tile,
    pub tiles_wide: i32,
    pub tiles_high: i32,
    /// Door tile relative to `origin`.
    pub human_door: Option<Tile>,
    pub animal_door: Option<AnimalDoor>,
    pub housing: Option<Housing>,
    /// Paths and flooring may be laid under this building.
    pub allows_flooring_underneath: bool,
}

impl Building {
    pub fn footprint(&self, tile_size: i32) -> Rect {
        Rect::from_tiles(self.origin, self.tiles_wide, self.tiles_high, tile_size)
    }

    pub fn occupies(&self, tile: Tile) -> bool {
        tile.x >= self.origin.x
            && tile.y >= self.origin.y
            && tile.x < self.origin.x + self.tiles_wide
            && tile.y < self.origin.y + self.tiles_high
    }

    /// Tiles inside the footprint an actor can stand on.
    pub fn is_tile_passable(&self, tile: Tile) -> bool {
        self.human_door
            .is_some_and(|d| self.origin.offset(d.x, d.y) == tile)
    }

    /// Human door rectangle, grown by `inflate_tiles` above and below.
    pub fn human_door_rect(&self, tile_size: i32, inflate_tiles: i32) -> Option<Rect> {
        let d = self.human_door?;
        Some(
            self.origin
                .offset(d.x, d.y)
                .pixel_rect(tile_size)
                .inflate(0, inflate_tiles * tile_size),
        )
    }

    /// Animal door rectangle, only while the door is open.
    pub fn animal_door_rect(&self, tile_size: i32) -> Option<Rect> {
        let door = self.animal_door.as_ref().filter(|d| d.open)?;
        Some(Rect::from_tiles(
            self.origin.offset(door.offset.x, door.offset.y),
            door.tiles_wide,
            door.tiles_high,
            tile_size,
        ))
    }

    pub fn can_house(&self, animal: &FarmAnimal) -> bool {
        self.housing == Some(animal.housing)
    }
}

/// Stumps, boulders, meteorites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceClump {
    pub kind: String,
    pub origin: Tile,
    pub tiles_wide: i32,
    pub tiles_high: i32,
    pub health: f32,
}

impl ResourceClump {
    pub fn bounding_box(&self, tile_size: i32) -> Rect {
        Rect::from_tiles(self.origin, self.tiles_wide, self.tiles_high, tile_size)
    }
}

/// Bushes and similar growths larger than one tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LargeTerrainGrowth {
    pub kind: String,
    pub bounds: Rect,
    pub passable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FurnishingKind {
    Rug,
    Chair,
    Table,
    Bed,
    Lamp,
    Decor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Furnishing {
    pub kind: FurnishingKind,
    pub bounds: Rect,
    pub emits_light: bool,
}

impl Furnishing {
    /// Walk-over furnishing categories.
    pub fn is_passable(&self) -> bool {
        matches!(self.kind, FurnishingKind::Rug)
    }
}

// ── Actors ──────────────────────────────────────────────────────────────

/// Custom per-actor collision predicate, evaluated on corner tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpecialCollisionRule {
    /// Never step on these tiles.
    AvoidTiles(BTreeSet<Tile>),
    /// Never step on a tile carrying this marker.
    AvoidMarker { name: String, layer: Layer },
    /// Never leave this pixel rectangle.
    Leash(Rect),
}

impl SpecialCollisionRule {
    pub fn blocks(&self, tile: Tile, grid: &WorldGrid) -> bool {
        match self {
            Self::AvoidTiles(tiles) => tiles.contains(&tile),
            Self::AvoidMarker { name, layer } => grid.has_marker(tile, name, *layer),
            Self::Leash(area) => !area.contains(&tile.pixel_rect(grid.tile_size())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterKind {
    Villager,
    Monster { flying: bool },
}

/// NPC or monster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterActor {
    pub name: String,
    pub kind: CharacterKind,
    pub bounds: Rect,
    pub speed: i32,
    pub invisible: bool,
    /// Players walk through this character.
    pub farmer_passes_through: bool,
    pub lying_down: bool,
    pub collides_with_others: bool,
    /// Walking a scripted/pathfinding route.
    pub has_controller: bool,
    pub passes_action_tiles: bool,
    /// Harvest helpers that walk through raised crops.
    pub tends_crops: bool,
    /// Driven by a cutscene rather than its own logic.
    pub event_actor: bool,
    pub special_rule: Option<SpecialCollisionRule>,
    /// Incremented by the owner each time a push is applied.
    pub times_pushed: u32,
}

impl CharacterActor {
    pub fn villager(name: &str, bounds: Rect) -> Self {
        Self {
            name: name.to_string(),
            kind: CharacterKind::Villager,
            bounds,
            speed: 2,
            invisible: false,
            farmer_passes_through: false,
            lying_down: false,
            collides_with_others: false,
            has_controller: false,
            passes_action_tiles: false,
            tends_crops: false,
            event_actor: false,
            special_rule: None,
            times_pushed: 0,
        }
    }

    pub fn monster(name: &str, bounds: Rect, flying: bool) -> Self {
        Self {
            kind: CharacterKind::Monster { flying },
            ..Self::villager(name, bounds)
        }
    }

    pub fn is_monster(&self) -> bool {
        matches!(self.kind, CharacterKind::Monster { .. })
    }

    pub fn is_flying_monster(&self) -> bool {
        matches!(self.kind, CharacterKind::Monster { flying: true })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmAnimal {
    pub kind: String,
    pub housing: Housing,
    pub bounds: Rect,
    pub speed: i32,
    pub swimming: bool,
    pub event_actor: bool,
    /// Incremented by the owner each time a push is applied.
    pub times_pushed: u32,
}

impl FarmAnimal {
    pub fn new(kind: &str, housing: Housing, bounds: Rect) -> Self {
        Self {
            kind: kind.to_string(),
            housing,
            bounds,
            speed: 2,
            swimming: false,
            event_actor: false,
            times_pushed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlState {
    #[default]
    Free,
    /// Using a tool, in a menu, mid-animation.
    Restricted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerActor {
    pub name: String,
    pub bounds: Rect,
    pub speed: i32,
    pub rafting: bool,
    /// Index into the location's bridge list.
    pub bridge: Option<usize>,
    pub temporarily_invincible: bool,
    pub control: ControlState,
    /// Phase-through rectangles; owned and cleared by the player.
    pub temporary_passable: Vec<Rect>,
    pub special_rule: Option<SpecialCollisionRule>,
}

impl PlayerActor {
    pub fn new(name: &str, bounds: Rect) -> Self {
        Self {
            name: name.to_string(),
            bounds,
            speed: 5,
            rafting: false,
            bridge: None,
            temporarily_invincible: false,
            control: ControlState::Free,
            temporary_passable: Vec::new(),
            special_rule: None,
        }
    }

    pub fn temporary_covers(&self, area: &Rect) -> bool {
        self.temporary_passable.iter().any(|r| r.intersects(area))
    }
}

/// A walkable span over water or a gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bridge {
    pub span: Rect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_passability() {
        assert!(TerrainGrowth::Grass.is_passable());
        assert!(TerrainGrowth::Tree { stage: 0 }.is_passable());
        assert!(!TerrainGrowth::Tree { stage: 3 }.is_passable());
        assert!(!TerrainGrowth::Bush.is_passable());
        let trellis = TerrainGrowth::HoeDirt {
            crop: Some(Crop {
                name: "hops".into(),
                raised: true,
            }),
        };
        assert!(!trellis.is_passable());
        assert!(trellis.is_passable_for(true));
        assert!(!TerrainGrowth::Bush.is_passable_for(true));
        assert!(TerrainGrowth::HoeDirt { crop: None }.is_passable());
        assert!(!TerrainGrowth::Flooring.is_disturbable());
    }

    fn coop() -> Building {
        Building {
            kind: "Coop".into(),
            origin: Tile::new(10, 10),
            tiles_wide: 6,
            tiles_high: 3,
            human_door: Some(Tile::new(1, 2)),
            animal_door: Some(AnimalDoor {
                offset: Tile::new(4, 2),
                tiles_wide: 1,
                tiles_high: 1,
                open: true,
            }),
            housing: Some(Housing::Coop),
            allows_flooring_underneath: false,
        }
    }

    #[test]
    fn building_doors() {
        let b = coop();
        assert!(b.occupies(Tile::new(15, 12)));
        assert!(!b.occupies(Tile::new(16, 12)));
        assert!(b.is_tile_passable(Tile::new(11, 12)));
        assert_eq!(
            b.human_door_rect(64, 1),
            Some(Rect::new(11 * 64, 11 * 64, 64, 192))
        );
        assert_eq!(b.animal_door_rect(64), Some(Rect::new(14 * 64, 12 * 64, 64, 64)));
    }

    #[test]
    fn closed_animal_door_has_no_rect() {
        let mut b = coop();
        if let Some(door) = b.animal_door.as_mut() {
            door.open = false;
        }
        assert_eq!(b.animal_door_rect(64), None);
    }

    #[test]
    fn leash_rule_blocks_outside() {
        let grid = WorldGrid::with_ground(10, 10, 64);
        let rule = SpecialCollisionRule::Leash(Rect::from_tiles(Tile::new(2, 2), 3, 3, 64));
        assert!(!rule.blocks(Tile::new(3, 3), &grid));
        assert!(rule.blocks(Tile::new(5, 3), &grid));
    }
}

//! The location: map grid plus every entity registry, owned in one place.
//!
//! `WorldContext` is passed by reference into the engine; the engine never
//! holds on to it. `SimulationContext` carries the per-tick ambient state
//! (the active cutscene) that would otherwise be global.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::effects::SideEffect;
use crate::entities::{
    Bridge, Building, CharacterActor, FarmAnimal, Furnishing, LargeTerrainGrowth, PlacedObject,
    PlayerActor, ResourceClump, TerrainGrowth,
};
use crate::error::{RegistryKind, WorldError};
use crate::geometry::{Rect, Tile};
use crate::grid::WorldGrid;
use crate::registry::{BoxRegistry, EntryId, PointRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    Farm,
    /// Endless procedurally-floored level.
    Dungeon,
    Island,
    Town,
    Interior,
}

/// Handle to any actor that can propose a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorId {
    Player(EntryId),
    Character(EntryId),
    Animal(EntryId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldContext {
    pub name: String,
    pub kind: LocationKind,
    pub outdoors: bool,
    pub grid: WorldGrid,
    objects: PointRegistry<PlacedObject>,
    growths: PointRegistry<TerrainGrowth>,
    pub buildings: BoxRegistry<Building>,
    pub clumps: BoxRegistry<ResourceClump>,
    pub large_growths: BoxRegistry<LargeTerrainGrowth>,
    pub furnishings: BoxRegistry<Furnishing>,
    pub characters: BoxRegistry<CharacterActor>,
    pub animals: BoxRegistry<FarmAnimal>,
    pub players: BoxRegistry<PlayerActor>,
    pub bridges: Vec<Bridge>,
    /// Tiles held by location-specific fixtures (shipping bins, altars).
    pub location_occupiers: BTreeSet<Tile>,
    /// Structure-layer door tiles currently open.
    pub open_doors: BTreeSet<Tile>,
    /// How many times each growth was brushed through.
    pub disturbances: BTreeMap<Tile, u32>,
    /// How many times each reacting object was bumped.
    pub object_bumps: BTreeMap<Tile, u32>,
}

impl WorldContext {
    pub fn new(name: &str, kind: LocationKind, outdoors: bool, grid: WorldGrid) -> Self {
        Self {
            name: name.to_string(),
            kind,
            outdoors,
            grid,
            objects: PointRegistry::new(RegistryKind::Objects),
            growths: PointRegistry::new(RegistryKind::TerrainGrowths),
            buildings: BoxRegistry::new(RegistryKind::Buildings),
            clumps: BoxRegistry::new(RegistryKind::ResourceClumps),
            large_growths: BoxRegistry::new(RegistryKind::LargeTerrainGrowths),
            furnishings: BoxRegistry::new(RegistryKind::Furnishings),
            characters: BoxRegistry::new(RegistryKind::Characters),
            animals: BoxRegistry::new(RegistryKind::FarmAnimals),
            players: BoxRegistry::new(RegistryKind::Players),
            bridges: Vec::new(),
            location_occupiers: BTreeSet::new(),
            open_doors: BTreeSet::new(),
            disturbances: BTreeMap::new(),
            object_bumps: BTreeMap::new(),
        }
    }

    pub fn tile_size(&self) -> i32 {
        self.grid.tile_size()
    }

    pub fn objects(&self) -> &PointRegistry<PlacedObject> {
        &self.objects
    }

    pub fn growths(&self) -> &PointRegistry<TerrainGrowth> {
        &self.growths
    }

    pub fn object_at(&self, tile: Tile) -> Option<&PlacedObject> {
        self.objects.get(tile)
    }

    pub fn growth_at(&self, tile: Tile) -> Option<&TerrainGrowth> {
        self.growths.get(tile)
    }

    /// Put an object on a tile. A tile holds at most one point-indexed
    /// entry across objects and growths.
    pub fn place_object(&mut self, tile: Tile, object: PlacedObject) -> Result<(), WorldError> {
        self.check_point_free(tile)?;
        self.objects.insert(tile, object)
    }

    pub fn plant_growth(&mut self, tile: Tile, growth: TerrainGrowth) -> Result<(), WorldError> {
        self.check_point_free(tile)?;
        self.growths.insert(tile, growth)
    }

    pub fn remove_object(&mut self, tile: Tile) -> Option<PlacedObject> {
        self.objects.remove(tile)
    }

    pub fn remove_growth(&mut self, tile: Tile) -> Option<TerrainGrowth> {
        self.growths.remove(tile)
    }

    pub fn growth_mut(&mut self, tile: Tile) -> Option<&mut TerrainGrowth> {
        self.growths.get_mut(tile)
    }

    fn check_point_free(&self, tile: Tile) -> Result<(), WorldError> {
        if !self.grid.is_on_grid(tile) {
            return Err(WorldError::OffGrid { tile });
        }
        if self.objects.contains(tile) {
            return Err(WorldError::TileOccupied {
                tile,
                owner: RegistryKind::Objects,
            });
        }
        if self.growths.contains(tile) {
            return Err(WorldError::TileOccupied {
                tile,
                owner: RegistryKind::TerrainGrowths,
            });
        }
        Ok(())
    }

    /// Current bounding box of an actor, if it still exists.
    pub fn actor_box(&self, actor: ActorId) -> Option<Rect> {
        match actor {
            ActorId::Player(id) => self.players.get(id).map(|p| p.bounds),
            ActorId::Character(id) => self.characters.get(id).map(|c| c.bounds),
            ActorId::Animal(id) => self.animals.get(id).map(|a| a.bounds),
        }
    }

    /// Carry out a side effect the engine requested.
    pub fn apply_effect(&mut self, effect: &SideEffect) -> Result<(), WorldError> {
        match effect {
            SideEffect::AnimalPushed { animal, .. } => {
                let a = self
                    .animals
                    .get_mut(*animal)
                    .ok_or(WorldError::UnknownEntry {
                        registry: RegistryKind::FarmAnimals,
                        id: *animal,
                    })?;
                a.times_pushed += 1;
            }
            SideEffect::CharacterPushed { character, .. } => {
                let c = self
                    .characters
                    .get_mut(*character)
                    .ok_or(WorldError::UnknownEntry {
                        registry: RegistryKind::Characters,
                        id: *character,
                    })?;
                c.times_pushed += 1;
            }
            SideEffect::ObjectCollided { tile, .. } => {
                *self.object_bumps.entry(*tile).or_default() += 1;
            }
            SideEffect::GrowthDisturbed { tile, .. } => {
                *self.disturbances.entry(*tile).or_default() += 1;
            }
            SideEffect::DoorOpenRequested { tile } => {
                self.open_doors.insert(*tile);
            }
            SideEffect::RaftingStopped { player, snap_to } => {
                let p = self
                    .players
                    .get_mut(*player)
                    .ok_or(WorldError::UnknownEntry {
                        registry: RegistryKind::Players,
                        id: *player,
                    })?;
                p.rafting = false;
                p.bounds.x = snap_to.x;
                p.bounds.y = snap_to.y;
            }
        }
        log::trace!("applied {:?} in {}", effect, self.name);
        Ok(())
    }

    /// Apply a batch of effects in emission order, stopping at the first
    /// entry that no longer exists.
    pub fn apply_effects(&mut self, effects: &[SideEffect]) -> Result<(), WorldError> {
        effects.iter().try_for_each(|e| self.apply_effect(e))
    }
}

/// A running cutscene that overrides normal collision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cutscene {
    /// The cutscene keeps the player inside `boundary` instead of the
    /// normal displayed-area check.
    pub boundary_collisions: bool,
    pub boundary: Rect,
    /// Scripted obstacles.
    pub blocked: Vec<Rect>,
}

impl Cutscene {
    /// Blocked if the box strays outside the cutscene's boundary.
    pub fn check_boundary(&self, candidate: &Rect) -> bool {
        !self.boundary.contains(candidate)
    }

    pub fn is_colliding(&self, candidate: &Rect) -> bool {
        self.blocked.iter().any(|r| r.intersects(candidate))
    }
}

/// Ambient per-tick state passed explicitly into queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationContext {
    pub cutscene: Option<Cutscene>,
}

impl SimulationContext {
    pub fn cutscene_active(&self) -> bool {
        self.cutscene.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn farm() -> WorldContext {
        WorldContext::new(
            "Farm",
            LocationKind::Farm,
            true,
            WorldGrid::with_ground(20, 20, 64),
        )
    }

    #[test]
    fn objects_and_growths_share_tiles_exclusively() {
        let mut w = farm();
        w.plant_growth(Tile::new(3, 3), TerrainGrowth::Grass).unwrap();
        let err = w
            .place_object(Tile::new(3, 3), PlacedObject::solid("Chest"))
            .unwrap_err();
        assert_eq!(
            err,
            WorldError::TileOccupied {
                tile: Tile::new(3, 3),
                owner: RegistryKind::TerrainGrowths
            }
        );
        assert!(matches!(
            w.place_object(Tile::new(30, 3), PlacedObject::solid("Chest")),
            Err(WorldError::OffGrid { .. })
        ));
    }

    #[test]
    fn rafting_stop_moves_player() {
        let mut w = farm();
        let mut p = PlayerActor::new("Farmer", Rect::new(0, 0, 48, 32));
        p.rafting = true;
        let id = w.players.insert(p);
        w.apply_effect(&SideEffect::RaftingStopped {
            player: id,
            snap_to: Point::new(640, 608),
        })
        .unwrap();
        let p = w.players.get(id).unwrap();
        assert!(!p.rafting);
        assert_eq!((p.bounds.x, p.bounds.y), (640, 608));
    }

    #[test]
    fn effect_on_removed_entry_errors() {
        let mut w = farm();
        let err = w
            .apply_effect(&SideEffect::AnimalPushed {
                animal: EntryId(4),
                by: None,
            })
            .unwrap_err();
        assert!(matches!(err, WorldError::UnknownEntry { .. }));
    }

    #[test]
    fn cutscene_checks() {
        let c = Cutscene {
            boundary_collisions: true,
            boundary: Rect::new(0, 0, 640, 640),
            blocked: vec![Rect::new(128, 128, 64, 64)],
        };
        assert!(!c.check_boundary(&Rect::new(10, 10, 48, 32)));
        assert!(c.check_boundary(&Rect::new(620, 10, 48, 32)));
        assert!(c.is_colliding(&Rect::new(150, 150, 10, 10)));
    }
}

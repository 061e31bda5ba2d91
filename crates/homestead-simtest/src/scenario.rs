//! Bundled JSON scenarios: a small location, one mover, and the verdicts
//! and side effects each move is expected to produce.

use std::collections::BTreeMap;

use homestead_logic::effects::SideEffect;
use homestead_logic::entities::{
    Building, CharacterActor, FarmAnimal, Housing, PlacedObject, PlayerActor, TerrainGrowth,
};
use homestead_logic::error::WorldError;
use homestead_logic::geometry::{Rect, Tile};
use homestead_logic::grid::{Layer, StaticTile, WorldGrid};
use homestead_logic::world::{ActorId, LocationKind, WorldContext};
use homestead_logic::GauntletStep;
use serde::Deserialize;
use thiserror::Error;

pub const SCENARIOS_JSON: &str = include_str!("../data/scenarios.json");

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("scenario data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("scenario {name}: {source}")]
    World { name: String, source: WorldError },
    #[error("mirror codec: {0}")]
    Mirror(#[from] bincode::Error),
    #[error("bad argument: {0}")]
    Args(String),
}

fn tile(t: [i32; 2]) -> Tile {
    Tile::new(t[0], t[1])
}

/// A 32x32 body centred in a tile.
pub fn body_at(t: Tile, tile_size: i32) -> Rect {
    let inset = (tile_size - 32) / 2;
    Rect::new(t.x * tile_size + inset, t.y * tile_size + inset, 32, 32)
}

// ── File format ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default = "farm_kind")]
    pub kind: LocationKind,
    #[serde(default = "outdoors")]
    pub outdoors: bool,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub tiles: Vec<TileSpec>,
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    #[serde(default)]
    pub growths: Vec<GrowthSpec>,
    #[serde(default)]
    pub buildings: Vec<Building>,
    #[serde(default)]
    pub animals: Vec<AnimalSpec>,
    #[serde(default)]
    pub villagers: Vec<[i32; 2]>,
    #[serde(default)]
    pub mover: Option<MoverSpec>,
    #[serde(default)]
    pub moves: Vec<MoveCheck>,
    #[serde(default)]
    pub placements: Vec<PlacementCheck>,
}

fn farm_kind() -> LocationKind {
    LocationKind::Farm
}

fn outdoors() -> bool {
    true
}

/// Markers on one tile, or on every tile of the `from..=to` rectangle.
#[derive(Debug, Deserialize)]
pub struct TileSpec {
    pub from: [i32; 2],
    #[serde(default)]
    pub to: Option<[i32; 2]>,
    pub layer: Layer,
    #[serde(default)]
    pub markers: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct ObjectSpec {
    pub tile: [i32; 2],
    pub object: PlacedObject,
}

#[derive(Debug, Deserialize)]
pub struct GrowthSpec {
    pub tile: [i32; 2],
    pub growth: TerrainGrowth,
}

#[derive(Debug, Deserialize)]
pub struct AnimalSpec {
    pub tile: [i32; 2],
    pub kind: String,
    pub housing: Housing,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MoverSpec {
    Player {
        tile: [i32; 2],
        #[serde(default)]
        rafting: bool,
    },
    Villager {
        tile: [i32; 2],
        #[serde(default)]
        has_controller: bool,
        #[serde(default)]
        passes_action_tiles: bool,
    },
    Animal {
        tile: [i32; 2],
        housing: Housing,
    },
}

#[derive(Debug, Deserialize)]
pub struct MoveCheck {
    pub target: [i32; 2],
    #[serde(default)]
    pub flying: bool,
    #[serde(default)]
    pub probe: bool,
    pub blocked: bool,
    #[serde(default)]
    pub step: Option<GauntletStep>,
    /// Expected side effects by kind, in emission order.
    #[serde(default)]
    pub effects: Vec<String>,
}

impl MoveCheck {
    pub fn target(&self) -> Tile {
        tile(self.target)
    }
}

#[derive(Debug, Deserialize)]
pub struct PlacementCheck {
    pub tile: [i32; 2],
    #[serde(default)]
    pub passable: bool,
    pub allowed: bool,
}

impl PlacementCheck {
    pub fn tile(&self) -> Tile {
        tile(self.tile)
    }
}

pub fn load_scenarios(json: &str) -> Result<Vec<Scenario>, HarnessError> {
    Ok(serde_json::from_str(json)?)
}

pub fn effect_kind(effect: &SideEffect) -> &'static str {
    match effect {
        SideEffect::AnimalPushed { .. } => "AnimalPushed",
        SideEffect::CharacterPushed { .. } => "CharacterPushed",
        SideEffect::ObjectCollided { .. } => "ObjectCollided",
        SideEffect::GrowthDisturbed { .. } => "GrowthDisturbed",
        SideEffect::DoorOpenRequested { .. } => "DoorOpenRequested",
        SideEffect::RaftingStopped { .. } => "RaftingStopped",
    }
}

// ── World construction ──────────────────────────────────────────────────

impl Scenario {
    /// Build the location and insert the mover, if any.
    pub fn build(&self, tile_size: i32) -> Result<(WorldContext, Option<ActorId>), HarnessError> {
        self.populate(tile_size).map_err(|source| HarnessError::World {
            name: self.name.clone(),
            source,
        })
    }

    fn populate(&self, ts: i32) -> Result<(WorldContext, Option<ActorId>), WorldError> {
        let grid = WorldGrid::with_ground(self.width, self.height, ts);
        let mut w = WorldContext::new(&self.name, self.kind, self.outdoors, grid);

        for spec in &self.tiles {
            let to = spec.to.unwrap_or(spec.from);
            for x in spec.from[0]..=to[0] {
                for y in spec.from[1]..=to[1] {
                    let t = Tile::new(x, y);
                    if w.grid.tile_at(t, spec.layer).is_none() {
                        w.grid.set_tile(t, spec.layer, Some(StaticTile::new(1)))?;
                    }
                    for (name, value) in &spec.markers {
                        w.grid.set_marker(t, spec.layer, name, value)?;
                    }
                }
            }
        }
        for o in &self.objects {
            w.place_object(tile(o.tile), o.object.clone())?;
        }
        for g in &self.growths {
            w.plant_growth(tile(g.tile), g.growth.clone())?;
        }
        for b in &self.buildings {
            w.buildings.insert(b.clone());
        }
        for a in &self.animals {
            let bounds = tile(a.tile).pixel_rect(ts);
            w.animals.insert(FarmAnimal::new(&a.kind, a.housing, bounds));
        }
        for (i, v) in self.villagers.iter().enumerate() {
            let name = format!("Villager {}", i + 1);
            w.characters
                .insert(CharacterActor::villager(&name, body_at(tile(*v), ts)));
        }

        let mover = match &self.mover {
            None => None,
            Some(MoverSpec::Player { tile: t, rafting }) => {
                let mut p = PlayerActor::new("Farmer", body_at(tile(*t), ts));
                p.rafting = *rafting;
                Some(ActorId::Player(w.players.insert(p)))
            }
            Some(MoverSpec::Villager {
                tile: t,
                has_controller,
                passes_action_tiles,
            }) => {
                let mut c = CharacterActor::villager("Walker", body_at(tile(*t), ts));
                c.has_controller = *has_controller;
                c.passes_action_tiles = *passes_action_tiles;
                Some(ActorId::Character(w.characters.insert(c)))
            }
            Some(MoverSpec::Animal { tile: t, housing }) => {
                let a = FarmAnimal::new("Animal", *housing, body_at(tile(*t), ts));
                Some(ActorId::Animal(w.animals.insert(a)))
            }
        };
        Ok((w, mover))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_scenarios_parse_and_build() {
        let scenarios = load_scenarios(SCENARIOS_JSON).unwrap();
        assert!(scenarios.len() >= 8);
        for s in &scenarios {
            let (world, mover) = s.build(64).unwrap();
            assert_eq!(world.name, s.name);
            assert_eq!(mover.is_some(), s.mover.is_some());
        }
    }

    #[test]
    fn tile_ranges_fill_every_cell() {
        let s: Scenario = serde_json::from_str(
            r#"{
                "name": "pond",
                "width": 8,
                "height": 8,
                "tiles": [{"from": [1, 1], "to": [3, 2], "layer": "Back", "markers": {"Water": "T"}}]
            }"#,
        )
        .unwrap();
        let (w, mover) = s.build(64).unwrap();
        assert!(mover.is_none());
        let wet = (0..8)
            .flat_map(|x| (0..8).map(move |y| Tile::new(x, y)))
            .filter(|t| w.grid.has_marker(*t, "Water", Layer::Back))
            .count();
        assert_eq!(wet, 6);
    }

    #[test]
    fn off_grid_entries_are_reported() {
        let s: Scenario = serde_json::from_str(
            r#"{"name": "tiny", "width": 2, "height": 2,
                "growths": [{"tile": [5, 5], "growth": "Grass"}]}"#,
        )
        .unwrap();
        let err = s.build(64).unwrap_err();
        assert!(matches!(err, HarnessError::World { .. }));
    }
}

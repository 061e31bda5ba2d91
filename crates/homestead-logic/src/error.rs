//! Error types.
//!
//! `WorldError` is returned to collaborators that mutate registries.
//! `QueryFault` never escapes a query as an `Err`: it rides along on a
//! [`Verdict`](crate::resolver::Verdict) so callers can see *why* a query
//! failed closed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Tile;
use crate::registry::EntryId;

/// Registry names used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryKind {
    Objects,
    TerrainGrowths,
    Buildings,
    ResourceClumps,
    LargeTerrainGrowths,
    Furnishings,
    Characters,
    FarmAnimals,
    Players,
}

impl std::fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Objects => "objects",
            Self::TerrainGrowths => "terrain growths",
            Self::Buildings => "buildings",
            Self::ResourceClumps => "resource clumps",
            Self::LargeTerrainGrowths => "large terrain growths",
            Self::Furnishings => "furnishings",
            Self::Characters => "characters",
            Self::FarmAnimals => "farm animals",
            Self::Players => "players",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("tile {tile} is already held by {owner}")]
    TileOccupied { tile: Tile, owner: RegistryKind },
    #[error("tile {tile} is outside the map")]
    OffGrid { tile: Tile },
    #[error("no entry {id} in {registry}")]
    UnknownEntry { registry: RegistryKind, id: EntryId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum QueryFault {
    #[error("candidate box lies outside the displayed area")]
    OutOfBounds,
    #[error("query requires an actor but none was given")]
    MissingActor,
    #[error("{registry} entry {id} has a degenerate bounding box")]
    DegenerateEntry { registry: RegistryKind, id: EntryId },
    #[error("location grid has a {tile_size}px tile size")]
    InvalidTileSize { tile_size: i32 },
}

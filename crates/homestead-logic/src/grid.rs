//! Static per-tile map facts.
//!
//! `WorldGrid` is what the map loader hands over: tiles on four layers,
//! each optionally carrying string markers. The collision engine treats it
//! as read-only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::markers;
use crate::error::WorldError;
use crate::geometry::{Rect, Tile};

/// Map layers, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    /// Ground: grass, dirt, water.
    Back = 0,
    /// The structure layer: walls and fences.
    Buildings = 1,
    Front = 2,
    AlwaysFront = 3,
}

impl Layer {
    pub const ALL: [Layer; 4] = [
        Layer::Back,
        Layer::Buildings,
        Layer::Front,
        Layer::AlwaysFront,
    ];
}

/// A single map tile on one layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticTile {
    pub index: u32,
    pub markers: BTreeMap<String, String>,
}

impl StaticTile {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            markers: BTreeMap::new(),
        }
    }

    pub fn with_marker(mut self, name: &str, value: &str) -> Self {
        self.markers.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldGrid {
    width: i32,
    height: i32,
    tile_size: i32,
    /// One row-major cell vector per layer, indexed by `Layer as usize`.
    layers: Vec<Vec<Option<StaticTile>>>,
}

impl WorldGrid {
    /// An empty map: every layer present but without tiles.
    pub fn new(width: i32, height: i32, tile_size: i32) -> Self {
        let cells = (width.max(0) * height.max(0)) as usize;
        Self {
            width: width.max(0),
            height: height.max(0),
            tile_size,
            layers: Layer::ALL.iter().map(|_| vec![None; cells]).collect(),
        }
    }

    /// A map whose base layer is filled with plain ground tiles.
    pub fn with_ground(width: i32, height: i32, tile_size: i32) -> Self {
        let mut grid = Self::new(width, height, tile_size);
        for cell in &mut grid.layers[Layer::Back as usize] {
            *cell = Some(StaticTile::new(0));
        }
        grid
    }

    pub fn width(&self) -> i32 {
        self.width
    }
    pub fn height(&self) -> i32 {
        self.height
    }
    pub fn tile_size(&self) -> i32 {
        self.tile_size
    }

    /// Pixel geometry is meaningless without a positive tile size.
    pub fn has_valid_tile_size(&self) -> bool {
        self.tile_size > 0
    }

    /// Whole map in pixels.
    pub fn pixel_bounds(&self) -> Rect {
        Rect::new(
            0,
            0,
            self.width * self.tile_size,
            self.height * self.tile_size,
        )
    }

    pub fn is_on_grid(&self, tile: Tile) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    fn index_of(&self, tile: Tile) -> Option<usize> {
        if !self.is_on_grid(tile) {
            return None;
        }
        Some(tile.y as usize * self.width as usize + tile.x as usize)
    }

    pub fn tile_at(&self, tile: Tile, layer: Layer) -> Option<&StaticTile> {
        let index = self.index_of(tile)?;
        self.layers[layer as usize][index].as_ref()
    }

    pub fn set_tile(
        &mut self,
        tile: Tile,
        layer: Layer,
        value: Option<StaticTile>,
    ) -> Result<(), WorldError> {
        let index = self.index_of(tile).ok_or(WorldError::OffGrid { tile })?;
        self.layers[layer as usize][index] = value;
        Ok(())
    }

    /// Add (or overwrite) a marker on an existing tile, creating a blank
    /// tile if the cell is empty.
    pub fn set_marker(
        &mut self,
        tile: Tile,
        layer: Layer,
        name: &str,
        value: &str,
    ) -> Result<(), WorldError> {
        let index = self.index_of(tile).ok_or(WorldError::OffGrid { tile })?;
        self.layers[layer as usize][index]
            .get_or_insert_with(|| StaticTile::new(0))
            .markers
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Marker value on `layer` at `tile`, or `None` if the tile or marker
    /// is missing.
    pub fn marker(&self, tile: Tile, name: &str, layer: Layer) -> Option<&str> {
        self.tile_at(tile, layer)?
            .markers
            .get(name)
            .map(String::as_str)
    }

    pub fn has_marker(&self, tile: Tile, name: &str, layer: Layer) -> bool {
        self.marker(tile, name, layer).is_some()
    }

    /// Plain static passability, ignoring every entity registry.
    ///
    /// Off-grid tiles are impassable. A base-layer `Passable` marker makes
    /// the ground unwalkable; a structure-layer tile blocks unless it is
    /// marked `Passable` or `Shadow`.
    pub fn is_tile_passable(&self, tile: Tile) -> bool {
        if !self.is_on_grid(tile) {
            return false;
        }
        if self.has_marker(tile, markers::PASSABLE, Layer::Back) {
            return false;
        }
        match self.tile_at(tile, Layer::Buildings) {
            Some(t) => {
                t.markers.contains_key(markers::PASSABLE) || t.markers.contains_key(markers::SHADOW)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_grid_is_impassable() {
        let g = WorldGrid::with_ground(4, 4, 64);
        assert!(!g.is_on_grid(Tile::new(-1, 0)));
        assert!(!g.is_on_grid(Tile::new(4, 0)));
        assert!(!g.is_tile_passable(Tile::new(0, 4)));
        assert!(g.is_tile_passable(Tile::new(3, 3)));
    }

    #[test]
    fn structure_tile_blocks_unless_marked() {
        let mut g = WorldGrid::with_ground(4, 4, 64);
        g.set_tile(Tile::new(1, 1), Layer::Buildings, Some(StaticTile::new(7)))
            .unwrap();
        assert!(!g.is_tile_passable(Tile::new(1, 1)));

        g.set_marker(Tile::new(1, 1), Layer::Buildings, markers::SHADOW, "T")
            .unwrap();
        assert!(g.is_tile_passable(Tile::new(1, 1)));
    }

    #[test]
    fn base_layer_passable_marker_blocks() {
        let mut g = WorldGrid::with_ground(4, 4, 64);
        g.set_marker(Tile::new(2, 2), Layer::Back, markers::PASSABLE, "F")
            .unwrap();
        assert!(!g.is_tile_passable(Tile::new(2, 2)));
    }

    #[test]
    fn marker_lookup_and_off_grid_writes() {
        let mut g = WorldGrid::new(2, 2, 64);
        assert_eq!(g.marker(Tile::new(0, 0), markers::WATER, Layer::Back), None);
        g.set_marker(Tile::new(0, 0), Layer::Back, markers::WATER, "T")
            .unwrap();
        assert_eq!(
            g.marker(Tile::new(0, 0), markers::WATER, Layer::Back),
            Some("T")
        );
        assert!(matches!(
            g.set_marker(Tile::new(5, 5), Layer::Back, markers::WATER, "T"),
            Err(WorldError::OffGrid { .. })
        ));
    }
}

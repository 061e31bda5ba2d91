//! Side-effect-free tile predicates: occupancy, blocked, placement.
//!
//! Used by spawning, building placement and pathfinding. Each takes the
//! world by reference and is deterministic for a given registry state.

use crate::constants::{marker_values, markers};
use crate::error::{QueryFault, RegistryKind};
use crate::geometry::{Rect, Tile};
use crate::grid::Layer;
use crate::mask::CollisionMask;
use crate::registry::EntryId;
use crate::world::WorldContext;

/// Skip (and report) entries whose box has no area.
pub(crate) fn well_formed(registry: RegistryKind, id: EntryId, bounds: &Rect) -> bool {
    if bounds.is_degenerate() {
        log::warn!("skipping {}", QueryFault::DegenerateEntry { registry, id });
        return false;
    }
    true
}

/// Is `tile` held by anything in the registries selected by `mask`?
///
/// Entries in a category set in `ignore` are skipped when they are
/// themselves passable. With `use_actor_tile`, players match on their
/// standing tile instead of box overlap.
pub fn is_tile_occupied(
    world: &WorldContext,
    tile: Tile,
    mask: CollisionMask,
    ignore: CollisionMask,
    use_actor_tile: bool,
) -> bool {
    if !world.grid.has_valid_tile_size() {
        log::warn!("{}: {}px tiles, treating {} as occupied", world.name, world.tile_size(), tile);
        return true;
    }
    let ts = world.tile_size();
    let area = tile.pixel_rect(ts);
    let blocks = |category: CollisionMask, passable: bool| {
        CollisionMask::hard_block(ignore, category, passable)
    };

    if mask.considers(CollisionMask::FARMERS) {
        for (id, p) in world.players.iter() {
            if !well_formed(RegistryKind::Players, id, &p.bounds) {
                continue;
            }
            let hit = if use_actor_tile {
                p.bounds.foot_tile(ts) == tile
            } else {
                p.bounds.intersects(&area)
            };
            // standing actors are soft
            if hit && blocks(CollisionMask::FARMERS, true) {
                return true;
            }
        }
    }

    if mask.considers(CollisionMask::OBJECTS) {
        if let Some(obj) = world.object_at(tile) {
            if blocks(CollisionMask::OBJECTS, obj.passable) {
                return true;
            }
        }
    }

    if mask.considers(CollisionMask::FURNITURE) {
        for (id, f) in world.furnishings.iter() {
            if well_formed(RegistryKind::Furnishings, id, &f.bounds)
                && f.bounds.intersects(&area)
                && blocks(CollisionMask::FURNITURE, f.is_passable())
            {
                return true;
            }
        }
    }

    if mask.considers(CollisionMask::CHARACTERS) {
        for (id, c) in world.characters.iter() {
            if well_formed(RegistryKind::Characters, id, &c.bounds)
                && c.bounds.intersects(&area)
                && blocks(CollisionMask::CHARACTERS, true)
            {
                return true;
            }
        }
        for (id, a) in world.animals.iter() {
            if well_formed(RegistryKind::FarmAnimals, id, &a.bounds)
                && a.bounds.intersects(&area)
                && blocks(CollisionMask::CHARACTERS, true)
            {
                return true;
            }
        }
    }

    if mask.considers(CollisionMask::TERRAIN_FEATURES) {
        if let Some(g) = world.growth_at(tile).filter(|g| !g.is_flooring()) {
            if blocks(CollisionMask::TERRAIN_FEATURES, g.is_passable()) {
                return true;
            }
        }
        for (id, lg) in world.large_growths.iter() {
            if well_formed(RegistryKind::LargeTerrainGrowths, id, &lg.bounds)
                && lg.bounds.intersects(&area)
                && blocks(CollisionMask::TERRAIN_FEATURES, lg.passable)
            {
                return true;
            }
        }
        for (id, clump) in world.clumps.iter() {
            let bounds = clump.bounding_box(ts);
            if well_formed(RegistryKind::ResourceClumps, id, &bounds)
                && bounds.intersects(&area)
                && blocks(CollisionMask::TERRAIN_FEATURES, false)
            {
                return true;
            }
        }
    }

    if mask.considers(CollisionMask::FLOORING)
        && world.growth_at(tile).is_some_and(|g| g.is_flooring())
        && blocks(CollisionMask::FLOORING, true)
    {
        return true;
    }

    if mask.considers(CollisionMask::BUILDINGS) {
        for (id, b) in world.buildings.iter() {
            if well_formed(RegistryKind::Buildings, id, &b.footprint(ts))
                && b.occupies(tile)
                && blocks(CollisionMask::BUILDINGS, b.is_tile_passable(tile))
            {
                return true;
            }
        }
    }

    mask.considers(CollisionMask::LOCATION_SPECIFIC)
        && world.location_occupiers.contains(&tile)
        && blocks(CollisionMask::LOCATION_SPECIFIC, false)
}

/// Occupied, or statically impassable on the map.
pub fn is_tile_blocked(
    world: &WorldContext,
    tile: Tile,
    mask: CollisionMask,
    ignore: CollisionMask,
    use_actor_tile: bool,
) -> bool {
    is_tile_occupied(world, tile, mask, ignore, use_actor_tile) || !world.grid.is_tile_passable(tile)
}

/// Parameters of a "can this item go here" check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementRequest {
    /// The item can be walked over once placed (paths, flooring, rugs).
    pub item_is_passable: bool,
    pub mask: CollisionMask,
    pub ignore: CollisionMask,
    pub use_actor_tile: bool,
    /// Use `ignore` exactly as given.
    pub strict_ignore: bool,
}

impl Default for PlacementRequest {
    fn default() -> Self {
        Self {
            item_is_passable: false,
            mask: CollisionMask::all(),
            ignore: CollisionMask::all(),
            use_actor_tile: false,
            strict_ignore: false,
        }
    }
}

impl PlacementRequest {
    pub fn passable_item() -> Self {
        Self {
            item_is_passable: true,
            ..Self::default()
        }
    }
}

/// Why a placement was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementDenial {
    OffGrid,
    /// Map forbids placement here.
    Banned,
    /// Tilled dirt with a crop growing in it.
    LiveCrop,
    Blocked,
    /// Walkable items may not go under this building.
    NoFlooringUnderBuilding,
}

/// Placement check with the reason for refusal.
pub fn check_placement(
    world: &WorldContext,
    tile: Tile,
    req: &PlacementRequest,
) -> Result<(), PlacementDenial> {
    let ignore = CollisionMask::placement_ignore(req.ignore, req.item_is_passable, req.strict_ignore);

    if !world.grid.is_on_grid(tile) {
        return Err(PlacementDenial::OffGrid);
    }

    match world.grid.marker(tile, markers::NO_PLACEMENT, Layer::Back) {
        Some(marker_values::BAN_ALL) => return Err(PlacementDenial::Banned),
        Some(_) if !req.item_is_passable && world.outdoors => {
            return Err(PlacementDenial::Banned)
        }
        _ => {}
    }

    if world.growth_at(tile).and_then(|g| g.crop()).is_some() {
        return Err(PlacementDenial::LiveCrop);
    }

    if is_tile_blocked(world, tile, req.mask, ignore, req.use_actor_tile) {
        return Err(PlacementDenial::Blocked);
    }

    if req.item_is_passable
        && world
            .buildings
            .iter()
            .any(|(_, b)| b.occupies(tile) && !b.allows_flooring_underneath)
    {
        return Err(PlacementDenial::NoFlooringUnderBuilding);
    }

    Ok(())
}

pub fn can_place_item(world: &WorldContext, tile: Tile, req: &PlacementRequest) -> bool {
    check_placement(world, tile, req).is_ok()
}

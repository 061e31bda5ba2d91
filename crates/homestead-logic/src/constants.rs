//! Static tile marker names and their well-known values.
//!
//! Markers are string properties attached to map tiles by the map
//! author. The engine only ever reads them.

pub mod markers {
    /// Base layer: tile is NOT walkable. Structure layer: tile IS walkable.
    pub const PASSABLE: &str = "Passable";
    /// Structure-layer tile that only draws a shadow.
    pub const SHADOW: &str = "Shadow";
    /// Structure-layer tile walkable by non-player actors.
    pub const NPC_PASSABLE: &str = "NPCPassable";
    /// Structure-layer tile projectiles fly through.
    pub const PROJECTILE_PASSABLE: &str = "ProjectilePassable";
    /// Interactive structure tile (doors, signs, ...).
    pub const ACTION: &str = "Action";
    /// Base-layer water.
    pub const WATER: &str = "Water";
    /// Blocks every mover except a rafting player.
    pub const TEMPORARY_BARRIER: &str = "TemporaryBarrier";
    /// Blocks non-NPC movers in farm/dungeon/island locations.
    pub const ACTOR_BARRIER: &str = "ActorBarrier";
    /// Base-layer placement ban.
    pub const NO_PLACEMENT: &str = "NoPlacement";
}

pub mod marker_values {
    /// `NoPlacement` value that bans passable items too.
    pub const BAN_ALL: &str = "All";
    /// Prefix of an `Action` value that denotes a door.
    pub const DOOR: &str = "Door";
}

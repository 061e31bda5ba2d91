//! Engine tuning knobs.
//!
//! Everything here is plain data so hosts and observers can share one
//! config blob. Defaults describe the standard 64-pixel tile world.

use serde::{Deserialize, Serialize};

use crate::world::LocationKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Pixels per tile.
    pub tile_size: i32,
    /// A building's human door counts as this many tiles taller on each
    /// side, so actors can approach it head-on.
    pub door_inflate_tiles: i32,
    /// How far above the blocking tile a rafting player lands when forced
    /// ashore.
    pub raft_exit_offset: i32,
    /// Upward growth of a lying-down actor's box.
    pub lying_down_inflate: i32,
    /// Location kinds that honor the actor-barrier marker.
    pub barrier_locations: Vec<LocationKind>,
    /// Apply the previous-box exclusion to the terrain disturbance pass as
    /// well. Off by default: growths react every tick an actor overlaps
    /// them, not only on entry.
    pub disturbance_uses_previous_box: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            tile_size: 64,
            door_inflate_tiles: 1,
            raft_exit_offset: 32,
            lying_down_inflate: 64,
            barrier_locations: vec![LocationKind::Farm, LocationKind::Dungeon, LocationKind::Island],
            disturbance_uses_previous_box: false,
        }
    }
}

/// A problem found by [`validate_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub field: &'static str,
    pub message: String,
}

/// Check a config for values the engine cannot work with.
pub fn validate_config(config: &CollisionConfig) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    if config.tile_size <= 0 {
        issues.push(ConfigIssue {
            field: "tile_size",
            message: format!("must be positive, got {}", config.tile_size),
        });
    }
    if config.door_inflate_tiles < 0 {
        issues.push(ConfigIssue {
            field: "door_inflate_tiles",
            message: format!("must not be negative, got {}", config.door_inflate_tiles),
        });
    }
    if config.raft_exit_offset < 0 || config.raft_exit_offset > config.tile_size {
        issues.push(ConfigIssue {
            field: "raft_exit_offset",
            message: format!(
                "must be within 0..={}, got {}",
                config.tile_size, config.raft_exit_offset
            ),
        });
    }
    if config.lying_down_inflate < 0 {
        issues.push(ConfigIssue {
            field: "lying_down_inflate",
            message: format!("must not be negative, got {}", config.lying_down_inflate),
        });
    }
    issues
}

//! Side effects requested by the resolver.
//!
//! The resolver never mutates a registry. It emits these requests into an
//! [`EffectSink`]; the registry owners apply them afterwards (see
//! [`WorldContext::apply_effect`](crate::world::WorldContext::apply_effect)).

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Tile};
use crate::registry::EntryId;
use crate::world::ActorId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideEffect {
    /// A mover bumped into a farm animal.
    AnimalPushed { animal: EntryId, by: Option<ActorId> },
    /// A mover overlapped an NPC or monster.
    CharacterPushed {
        character: EntryId,
        by: Option<ActorId>,
    },
    /// A mover ran into a placed object that reacts to collisions.
    ObjectCollided { tile: Tile, by: Option<ActorId> },
    /// A mover brushed through a terrain growth.
    GrowthDisturbed { tile: Tile, speed: i32 },
    /// Open the door on this structure-layer tile.
    DoorOpenRequested { tile: Tile },
    /// Force a rafting player ashore at `snap_to`.
    RaftingStopped { player: EntryId, snap_to: Point },
}

pub trait EffectSink {
    fn emit(&mut self, effect: SideEffect);
}

impl EffectSink for Vec<SideEffect> {
    fn emit(&mut self, effect: SideEffect) {
        self.push(effect);
    }
}

/// Sink for callers that only want the verdict.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl EffectSink for Discard {
    fn emit(&mut self, _effect: SideEffect) {}
}

//! Movement collision: may this actor's bounding box occupy this rectangle?
//!
//! A query runs an ordered gauntlet of steps. Each step either decides the
//! outcome (blocked, or cleared without looking further) or passes the
//! query on; a query no step decides is clear. The order is fixed in
//! [`GAUNTLET`] and observable through [`GauntletStep::ORDER`]: later steps
//! never run once an earlier one has decided, so their side effects never
//! fire either.
//!
//! Side effects (pushes, disturbances, door requests, rafting exit) are
//! emitted into the caller's [`EffectSink`] and applied by the caller.

use serde::{Deserialize, Serialize};

use crate::config::CollisionConfig;
use crate::constants::{marker_values, markers};
use crate::effects::{EffectSink, SideEffect};
use crate::entities::{CharacterActor, ControlState, FarmAnimal, PlayerActor, SpecialCollisionRule};
use crate::error::{QueryFault, RegistryKind};
use crate::geometry::{Point, Rect, Tile};
use crate::grid::Layer;
use crate::mask::CollisionMask;
use crate::occupancy::{self, well_formed, PlacementRequest};
use crate::registry::EntryId;
use crate::sampler::CornerSampler;
use crate::world::{ActorId, SimulationContext, WorldContext};

// ── Query ──────────────────────────────────────────────────────────────

/// A proposed move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveQuery {
    pub candidate: Rect,
    /// The displayed area; a box entirely outside it is out of bounds.
    pub viewport: Rect,
    pub is_player: bool,
    /// Nonzero for damaging movers (monsters, thrown hazards).
    pub contact_damage: i32,
    pub is_flying: bool,
    pub actor: Option<ActorId>,
    /// Pathfinders probe tiles; probes skip actor bodies and side effects.
    pub is_pathfinding_probe: bool,
    pub is_projectile: bool,
    /// Allow a query with no actor.
    pub ignore_actor_requirement: bool,
    pub skip_side_effects: bool,
}

impl MoveQuery {
    /// An ordinary step by an existing actor.
    pub fn walk(actor: ActorId, candidate: Rect, viewport: Rect) -> Self {
        Self {
            candidate,
            viewport,
            is_player: matches!(actor, ActorId::Player(_)),
            contact_damage: 0,
            is_flying: false,
            actor: Some(actor),
            is_pathfinding_probe: false,
            is_projectile: false,
            ignore_actor_requirement: false,
            skip_side_effects: false,
        }
    }

    /// An actor-less projectile.
    pub fn projectile(candidate: Rect, viewport: Rect) -> Self {
        Self {
            candidate,
            viewport,
            is_player: false,
            contact_damage: 0,
            is_flying: false,
            actor: None,
            is_pathfinding_probe: false,
            is_projectile: true,
            ignore_actor_requirement: true,
            skip_side_effects: true,
        }
    }

    pub fn probe(mut self) -> Self {
        self.is_pathfinding_probe = true;
        self.skip_side_effects = true;
        self
    }

    pub fn flying(mut self) -> Self {
        self.is_flying = true;
        self
    }
}

// ── Mover ──────────────────────────────────────────────────────────────

/// The querying actor, looked up once per query.
#[derive(Debug, Clone, Copy)]
pub enum Mover<'a> {
    Player(EntryId, &'a PlayerActor),
    Character(EntryId, &'a CharacterActor),
    Animal(EntryId, &'a FarmAnimal),
}

impl<'a> Mover<'a> {
    pub fn lookup(world: &'a WorldContext, actor: ActorId) -> Option<Self> {
        match actor {
            ActorId::Player(id) => world.players.get(id).map(|p| Mover::Player(id, p)),
            ActorId::Character(id) => world.characters.get(id).map(|c| Mover::Character(id, c)),
            ActorId::Animal(id) => world.animals.get(id).map(|a| Mover::Animal(id, a)),
        }
    }

    pub fn id(&self) -> ActorId {
        match self {
            Mover::Player(id, _) => ActorId::Player(*id),
            Mover::Character(id, _) => ActorId::Character(*id),
            Mover::Animal(id, _) => ActorId::Animal(*id),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Mover::Player(_, p) => p.bounds,
            Mover::Character(_, c) => c.bounds,
            Mover::Animal(_, a) => a.bounds,
        }
    }

    pub fn speed(&self) -> i32 {
        match self {
            Mover::Player(_, p) => p.speed,
            Mover::Character(_, c) => c.speed,
            Mover::Animal(_, a) => a.speed,
        }
    }

    pub fn is_animal(&self) -> bool {
        matches!(self, Mover::Animal(..))
    }

    pub fn is_monster(&self) -> bool {
        matches!(self, Mover::Character(_, c) if c.is_monster())
    }

    pub fn event_actor(&self) -> bool {
        match self {
            Mover::Player(..) => false,
            Mover::Character(_, c) => c.event_actor,
            Mover::Animal(_, a) => a.event_actor,
        }
    }

    pub fn special_rule(&self) -> Option<&'a SpecialCollisionRule> {
        match self {
            Mover::Player(_, p) => p.special_rule.as_ref(),
            Mover::Character(_, c) => c.special_rule.as_ref(),
            Mover::Animal(..) => None,
        }
    }

    pub fn tends_crops(&self) -> bool {
        matches!(self, Mover::Character(_, c) if c.tends_crops)
    }

    pub fn passes_action_tiles(&self) -> bool {
        matches!(self, Mover::Character(_, c) if c.passes_action_tiles)
    }

    /// Only players carry temporary passable regions.
    pub fn temporary_covers(&self, area: &Rect) -> bool {
        matches!(self, Mover::Player(_, p) if p.temporary_covers(area))
    }
}

fn covers(mover: Option<Mover<'_>>, area: &Rect) -> bool {
    mover.is_some_and(|m| m.temporary_covers(area))
}

// ── Gauntlet ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GauntletStep {
    Bounds,
    ActorPresence,
    Bridge,
    FarmAnimals,
    Buildings,
    ResourceClumps,
    Furnishings,
    LargeGrowths,
    PlacedObjects,
    GrowthDisturbance,
    Growths,
    SpecialRules,
    OtherActors,
    Cutscene,
    OtherPlayers,
    ActorBarrier,
    TemporaryBarrier,
    BaseLayer,
    StructureLayer,
    DoorAutoOpen,
    RaftingExit,
}

impl GauntletStep {
    pub const ORDER: [GauntletStep; 21] = [
        GauntletStep::Bounds,
        GauntletStep::ActorPresence,
        GauntletStep::Bridge,
        GauntletStep::FarmAnimals,
        GauntletStep::Buildings,
        GauntletStep::ResourceClumps,
        GauntletStep::Furnishings,
        GauntletStep::LargeGrowths,
        GauntletStep::PlacedObjects,
        GauntletStep::GrowthDisturbance,
        GauntletStep::Growths,
        GauntletStep::SpecialRules,
        GauntletStep::OtherActors,
        GauntletStep::Cutscene,
        GauntletStep::OtherPlayers,
        GauntletStep::ActorBarrier,
        GauntletStep::TemporaryBarrier,
        GauntletStep::BaseLayer,
        GauntletStep::StructureLayer,
        GauntletStep::DoorAutoOpen,
        GauntletStep::RaftingExit,
    ];

    pub fn position(self) -> usize {
        Self::ORDER.iter().position(|s| *s == self).unwrap_or(Self::ORDER.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Blocked,
    /// Decided clear; nothing later runs.
    Clear,
    /// Settled as clear, but the given step and those after it still run.
    SkipTo(GauntletStep),
}

impl Flow {
    fn blocked_if(hit: bool) -> Self {
        if hit {
            Flow::Blocked
        } else {
            Flow::Continue
        }
    }
}

struct Effects<'s> {
    sink: &'s mut dyn EffectSink,
    suppressed: bool,
}

impl Effects<'_> {
    fn emit(&mut self, effect: SideEffect) {
        if !self.suppressed {
            self.sink.emit(effect);
        }
    }
}

/// Everything a step may look at during one query.
struct Pass<'a, 's> {
    config: &'a CollisionConfig,
    world: &'a WorldContext,
    sim: &'a SimulationContext,
    query: &'a MoveQuery,
    mover: Option<Mover<'a>>,
    /// The mover's box before this move, for previous-box exclusion.
    current: Option<Rect>,
    sampler: CornerSampler,
    ts: i32,
    effects: Effects<'s>,
    fault: Option<QueryFault>,
}

struct GauntletEntry {
    step: GauntletStep,
    /// Solid-body steps that flying movers skip.
    hard_body: bool,
    run: fn(&mut Pass<'_, '_>) -> Flow,
}

const GAUNTLET: [GauntletEntry; 21] = [
    GauntletEntry { step: GauntletStep::Bounds, hard_body: false, run: check_bounds },
    GauntletEntry { step: GauntletStep::ActorPresence, hard_body: false, run: check_actor_presence },
    GauntletEntry { step: GauntletStep::Bridge, hard_body: false, run: check_bridge },
    GauntletEntry { step: GauntletStep::FarmAnimals, hard_body: true, run: check_farm_animals },
    GauntletEntry { step: GauntletStep::Buildings, hard_body: true, run: check_buildings },
    GauntletEntry { step: GauntletStep::ResourceClumps, hard_body: true, run: check_clumps },
    GauntletEntry { step: GauntletStep::Furnishings, hard_body: true, run: check_furnishings },
    GauntletEntry { step: GauntletStep::LargeGrowths, hard_body: true, run: check_large_growths },
    GauntletEntry { step: GauntletStep::PlacedObjects, hard_body: true, run: check_objects },
    GauntletEntry { step: GauntletStep::GrowthDisturbance, hard_body: true, run: disturb_growths },
    GauntletEntry { step: GauntletStep::Growths, hard_body: true, run: check_growths },
    GauntletEntry { step: GauntletStep::SpecialRules, hard_body: false, run: check_special_rule },
    GauntletEntry { step: GauntletStep::OtherActors, hard_body: false, run: check_other_actors },
    GauntletEntry { step: GauntletStep::Cutscene, hard_body: false, run: check_cutscene },
    GauntletEntry { step: GauntletStep::OtherPlayers, hard_body: false, run: check_other_players },
    GauntletEntry { step: GauntletStep::ActorBarrier, hard_body: false, run: check_actor_barrier },
    GauntletEntry { step: GauntletStep::TemporaryBarrier, hard_body: false, run: check_temporary_barrier },
    GauntletEntry { step: GauntletStep::BaseLayer, hard_body: false, run: check_base_layer },
    GauntletEntry { step: GauntletStep::StructureLayer, hard_body: false, run: check_structure_layer },
    GauntletEntry { step: GauntletStep::DoorAutoOpen, hard_body: false, run: request_doors },
    GauntletEntry { step: GauntletStep::RaftingExit, hard_body: false, run: check_rafting_exit },
];

// ── Steps ──────────────────────────────────────────────────────────────

fn check_bounds(p: &mut Pass<'_, '_>) -> Flow {
    let q = p.query;
    if q.candidate.intersects(&q.viewport) {
        return Flow::Continue;
    }
    if q.is_player {
        if let Some(c) = p.sim.cutscene.as_ref().filter(|c| c.boundary_collisions) {
            return Flow::blocked_if(c.check_boundary(&q.candidate));
        }
    }
    p.fault = Some(QueryFault::OutOfBounds);
    Flow::Blocked
}

fn check_actor_presence(p: &mut Pass<'_, '_>) -> Flow {
    if p.mover.is_some() || p.query.ignore_actor_requirement {
        return Flow::Continue;
    }
    p.fault = Some(QueryFault::MissingActor);
    Flow::Blocked
}

fn check_bridge(p: &mut Pass<'_, '_>) -> Flow {
    let Some(Mover::Player(_, player)) = p.mover else {
        return Flow::Continue;
    };
    let Some(bridge) = player.bridge.and_then(|i| p.world.bridges.get(i)) else {
        return Flow::Continue;
    };
    let c = p.query.candidate;
    let span = bridge.span;
    if c.right() <= span.left() || c.left() >= span.right() {
        return Flow::Continue;
    }
    // inside the horizontal span the deck decides all body and tile checks
    if c.top() >= span.top() && c.bottom() <= span.bottom() {
        Flow::SkipTo(GauntletStep::DoorAutoOpen)
    } else {
        Flow::Blocked
    }
}

fn check_farm_animals(p: &mut Pass<'_, '_>) -> Flow {
    if p.mover.is_some_and(|m| m.is_animal()) {
        return Flow::Continue;
    }
    let by = p.mover.map(|m| m.id());
    let cand = p.query.candidate;
    for (id, animal) in p.world.animals.iter() {
        if !well_formed(RegistryKind::FarmAnimals, id, &animal.bounds) {
            continue;
        }
        if !cand.intersects(&animal.bounds) {
            continue;
        }
        // already overlapping: neither pushed nor blocking
        if p.current.is_some_and(|c| c.intersects(&animal.bounds)) {
            continue;
        }
        p.effects.emit(SideEffect::AnimalPushed { animal: id, by });
        if covers(p.mover, &cand) {
            continue;
        }
        return Flow::Blocked;
    }
    Flow::Continue
}

fn check_buildings(p: &mut Pass<'_, '_>) -> Flow {
    let cand = p.query.candidate;
    for (id, building) in p.world.buildings.iter() {
        let footprint = building.footprint(p.ts);
        if !well_formed(RegistryKind::Buildings, id, &footprint) || !cand.intersects(&footprint) {
            continue;
        }
        match p.mover {
            Some(Mover::Animal(_, animal)) => {
                let inside = cand.intersection(&footprint);
                let through_door = building
                    .animal_door_rect(p.ts)
                    .zip(inside)
                    .is_some_and(|(door, overlap)| door.contains(&overlap));
                if through_door && building.can_house(animal) {
                    continue;
                }
            }
            m if m.and_then(|m| m.special_rule()).is_none() => {
                let door = building.human_door_rect(p.ts, p.config.door_inflate_tiles);
                if door.is_some_and(|d| d.contains(&cand)) {
                    continue;
                }
            }
            _ => {}
        }
        log::debug!("{:?} blocked by building {} ({})", p.mover.map(|m| m.id()), id, building.kind);
        return Flow::Blocked;
    }
    Flow::Continue
}

fn check_clumps(p: &mut Pass<'_, '_>) -> Flow {
    let cand = p.query.candidate;
    let hit = p.world.clumps.iter().any(|(id, clump)| {
        let b = clump.bounding_box(p.ts);
        well_formed(RegistryKind::ResourceClumps, id, &b)
            && cand.intersects(&b)
            && !p.current.is_some_and(|c| c.intersects(&b))
    });
    Flow::blocked_if(hit)
}

fn check_furnishings(p: &mut Pass<'_, '_>) -> Flow {
    if p.sim.cutscene_active() {
        return Flow::Continue;
    }
    let cand = p.query.candidate;
    let hit = p.world.furnishings.iter().any(|(id, f)| {
        !f.is_passable()
            && well_formed(RegistryKind::Furnishings, id, &f.bounds)
            && cand.intersects(&f.bounds)
            && !p.current.is_some_and(|c| c.intersects(&f.bounds))
    });
    Flow::blocked_if(hit)
}

fn check_large_growths(p: &mut Pass<'_, '_>) -> Flow {
    let cand = p.query.candidate;
    let hit = p.world.large_growths.iter().any(|(id, g)| {
        !g.passable
            && well_formed(RegistryKind::LargeTerrainGrowths, id, &g.bounds)
            && cand.intersects(&g.bounds)
            && !p.current.is_some_and(|c| c.intersects(&g.bounds))
    });
    Flow::blocked_if(hit)
}

fn check_objects(p: &mut Pass<'_, '_>) -> Flow {
    let world = p.world;
    let mover = p.mover;
    let ts = p.ts;
    let by = mover.map(|m| m.id());
    let effects = &mut p.effects;
    let hit = p.sampler.sample_and_test(&p.query.candidate, p.current.as_ref(), |tile| {
        let Some(object) = world.object_at(tile) else {
            return false;
        };
        if object.passable {
            return false;
        }
        if object.animal_product && mover.is_some_and(|m| m.is_animal()) {
            return false;
        }
        if covers(mover, &tile.pixel_rect(ts)) {
            return false;
        }
        if object.reacts_to_collision && by.is_some() {
            effects.emit(SideEffect::ObjectCollided { tile, by });
        }
        true
    });
    Flow::blocked_if(hit)
}

/// Brush through growths under the candidate. Never blocks.
fn disturb_growths(p: &mut Pass<'_, '_>) -> Flow {
    if p.query.is_pathfinding_probe || p.effects.suppressed {
        return Flow::Continue;
    }
    let world = p.world;
    let ts = p.ts;
    let cand = p.query.candidate;
    let speed = p.mover.map_or(0, |m| m.speed());
    let previous = if p.config.disturbance_uses_previous_box {
        p.current
    } else {
        None
    };
    let effects = &mut p.effects;
    p.sampler.sample_and_test(&cand, previous.as_ref(), |tile| {
        if let Some(growth) = world.growth_at(tile) {
            if growth.is_disturbable() && growth.bounding_box(tile, ts).intersects(&cand) {
                effects.emit(SideEffect::GrowthDisturbed { tile, speed });
            }
        }
        false
    });
    Flow::Continue
}

fn check_growths(p: &mut Pass<'_, '_>) -> Flow {
    let world = p.world;
    let ts = p.ts;
    let cand = p.query.candidate;
    let tends_crops = p.mover.is_some_and(|m| m.tends_crops());
    let hit = p.sampler.sample_and_test(&cand, p.current.as_ref(), |tile| {
        world.growth_at(tile).is_some_and(|g| {
            !g.is_passable_for(tends_crops) && g.bounding_box(tile, ts).intersects(&cand)
        })
    });
    Flow::blocked_if(hit)
}

fn check_special_rule(p: &mut Pass<'_, '_>) -> Flow {
    let Some(rule) = p.mover.and_then(|m| m.special_rule()) else {
        return Flow::Continue;
    };
    let grid = &p.world.grid;
    let corners = p.sampler.corners(&p.query.candidate);
    let hit = corners.four().any(|tile| rule.blocks(tile, grid));
    Flow::blocked_if(hit)
}

fn check_other_actors(p: &mut Pass<'_, '_>) -> Flow {
    if p.query.is_pathfinding_probe {
        return Flow::Continue;
    }
    let free_player = matches!(p.mover, Some(Mover::Player(_, pl)) if pl.control == ControlState::Free);
    let collides = matches!(p.mover, Some(Mover::Character(_, c)) if c.collides_with_others);
    if !(free_player || collides) {
        return Flow::Continue;
    }
    let by = p.mover.map(|m| m.id());
    let cand = p.query.candidate;
    for (id, other) in p.world.characters.iter_rev() {
        if by == Some(ActorId::Character(id)) {
            continue;
        }
        if !well_formed(RegistryKind::Characters, id, &other.bounds) {
            continue;
        }
        let mut body = other.bounds;
        if other.lying_down {
            body = body.extend_up(p.config.lying_down_inflate);
        }
        if !cand.intersects(&body) {
            continue;
        }
        p.effects.emit(SideEffect::CharacterPushed { character: id, by });
        if other.invisible || other.farmer_passes_through {
            continue;
        }
        if let Some(Mover::Player(_, player)) = p.mover {
            if player.temporarily_invincible || !player.temporary_passable.is_empty() {
                continue;
            }
            if other.is_flying_monster() && !p.current.is_some_and(|c| c.intersects(&body)) {
                continue;
            }
        }
        log::debug!("{:?} blocked by {} ({})", by, other.name, id);
        return Flow::Blocked;
    }
    Flow::Continue
}

fn check_cutscene(p: &mut Pass<'_, '_>) -> Flow {
    if !p.query.is_player {
        return Flow::Continue;
    }
    match p.sim.cutscene.as_ref() {
        Some(c) if c.is_colliding(&p.query.candidate) => Flow::Blocked,
        Some(_) => Flow::Clear,
        None => Flow::Continue,
    }
}

fn check_other_players(p: &mut Pass<'_, '_>) -> Flow {
    let q = p.query;
    if q.is_pathfinding_probe || q.contact_damage != 0 || q.is_flying {
        return Flow::Continue;
    }
    if p.mover.is_some_and(|m| m.is_monster()) {
        return Flow::Continue;
    }
    let me = p.mover.map(|m| m.id());
    let hit = p.world.players.iter().any(|(id, player)| {
        me != Some(ActorId::Player(id)) && q.candidate.intersects(&player.bounds)
    });
    Flow::blocked_if(hit)
}

fn check_actor_barrier(p: &mut Pass<'_, '_>) -> Flow {
    if !p.config.barrier_locations.contains(&p.world.kind) {
        return Flow::Continue;
    }
    let applies = matches!(p.mover, Some(Mover::Player(..) | Mover::Animal(..)))
        && !p.mover.is_some_and(|m| m.event_actor());
    if !applies {
        return Flow::Continue;
    }
    let grid = &p.world.grid;
    let hit = p.sampler.sample_and_test(&p.query.candidate, p.current.as_ref(), |tile| {
        grid.has_marker(tile, markers::ACTOR_BARRIER, Layer::Back)
    });
    Flow::blocked_if(hit)
}

fn check_temporary_barrier(p: &mut Pass<'_, '_>) -> Flow {
    if matches!(p.mover, Some(Mover::Player(_, pl)) if pl.rafting) {
        return Flow::Continue;
    }
    let grid = &p.world.grid;
    let hit = p.sampler.sample_and_test(&p.query.candidate, p.current.as_ref(), |tile| {
        grid.has_marker(tile, markers::TEMPORARY_BARRIER, Layer::Back)
    });
    Flow::blocked_if(hit)
}

fn check_base_layer(p: &mut Pass<'_, '_>) -> Flow {
    if matches!(p.mover, Some(Mover::Animal(_, a)) if a.swimming) {
        return Flow::Continue;
    }
    let grid = &p.world.grid;
    let mover = p.mover;
    let ts = p.ts;
    let hit = p.sampler.sample_and_test(&p.query.candidate, p.current.as_ref(), |tile| {
        grid.has_marker(tile, markers::PASSABLE, Layer::Back) && !covers(mover, &tile.pixel_rect(ts))
    });
    Flow::blocked_if(hit)
}

fn check_structure_layer(p: &mut Pass<'_, '_>) -> Flow {
    let grid = &p.world.grid;
    let mover = p.mover;
    let q = p.query;
    let ts = p.ts;
    let hit = p.sampler.sample_and_test(&q.candidate, p.current.as_ref(), |tile| {
        let Some(st) = grid.tile_at(tile, Layer::Buildings) else {
            return false;
        };
        let has = |name: &str| st.markers.contains_key(name);
        if has(markers::PASSABLE) || has(markers::SHADOW) {
            return false;
        }
        if !q.is_player && has(markers::NPC_PASSABLE) {
            return false;
        }
        if q.is_projectile && has(markers::PROJECTILE_PASSABLE) {
            return false;
        }
        if has(markers::ACTION) && mover.is_some_and(|m| m.passes_action_tiles()) {
            return false;
        }
        !covers(mover, &tile.pixel_rect(ts))
    });
    Flow::blocked_if(hit)
}

/// Ask for doors under and just above a controlled NPC's feet to open.
fn request_doors(p: &mut Pass<'_, '_>) -> Flow {
    if p.effects.suppressed {
        return Flow::Continue;
    }
    if !matches!(p.mover, Some(Mover::Character(_, c)) if c.has_controller) {
        return Flow::Continue;
    }
    let foot = p.query.candidate.foot_tile(p.ts);
    for tile in [foot, foot.offset(0, -1)] {
        let is_door = p
            .world
            .grid
            .marker(tile, markers::ACTION, Layer::Buildings)
            .is_some_and(|v| v.starts_with(marker_values::DOOR));
        if is_door {
            p.effects.emit(SideEffect::DoorOpenRequested { tile });
        }
    }
    Flow::Continue
}

/// A rafting player touching occupied dry land is put ashore.
fn check_rafting_exit(p: &mut Pass<'_, '_>) -> Flow {
    let Some(Mover::Player(id, player)) = p.mover else {
        return Flow::Continue;
    };
    if !player.rafting {
        return Flow::Continue;
    }
    let world = p.world;
    // the raft itself never counts as an occupant
    let mask = CollisionMask::all() - CollisionMask::FARMERS;
    let mut landing: Option<Tile> = None;
    let hit = p.sampler.sample_and_test(&p.query.candidate, p.current.as_ref(), |tile| {
        if world.grid.has_marker(tile, markers::WATER, Layer::Back) {
            return false;
        }
        if occupancy::is_tile_occupied(world, tile, mask, CollisionMask::empty(), false) {
            landing = Some(tile);
            return true;
        }
        false
    });
    if let (true, Some(tile)) = (hit, landing) {
        let snap_to = Point::new(tile.x * p.ts, tile.y * p.ts - p.config.raft_exit_offset);
        log::debug!("{} leaves the raft at {}", player.name, tile);
        p.effects.emit(SideEffect::RaftingStopped { player: id, snap_to });
    }
    Flow::blocked_if(hit)
}

// ── Engine ─────────────────────────────────────────────────────────────

/// Outcome of one query, with the step that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub blocked: bool,
    /// `None` when every step passed, or when the query could not start.
    pub decided_by: Option<GauntletStep>,
    pub fault: Option<QueryFault>,
}

impl Verdict {
    const CLEAR: Verdict = Verdict {
        blocked: false,
        decided_by: None,
        fault: None,
    };
}

#[derive(Debug, Clone, Default)]
pub struct CollisionEngine {
    config: CollisionConfig,
}

impl CollisionEngine {
    pub fn new(config: CollisionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Is the candidate box blocked?
    pub fn resolve(
        &self,
        world: &WorldContext,
        sim: &SimulationContext,
        query: &MoveQuery,
        sink: &mut dyn EffectSink,
    ) -> bool {
        self.resolve_verdict(world, sim, query, sink).blocked
    }

    pub fn resolve_verdict(
        &self,
        world: &WorldContext,
        sim: &SimulationContext,
        query: &MoveQuery,
        sink: &mut dyn EffectSink,
    ) -> Verdict {
        self.run(world, sim, query, sink, GAUNTLET.len())
    }

    /// Run only the steps up to and including `last`.
    pub fn resolve_through(
        &self,
        world: &WorldContext,
        sim: &SimulationContext,
        query: &MoveQuery,
        sink: &mut dyn EffectSink,
        last: GauntletStep,
    ) -> Verdict {
        self.run(world, sim, query, sink, last.position() + 1)
    }

    fn run(
        &self,
        world: &WorldContext,
        sim: &SimulationContext,
        query: &MoveQuery,
        sink: &mut dyn EffectSink,
        steps: usize,
    ) -> Verdict {
        let ts = world.tile_size();
        if !world.grid.has_valid_tile_size() {
            log::warn!("{} has a {}px tile size, refusing all movement", world.name, ts);
            return Verdict {
                blocked: true,
                decided_by: None,
                fault: Some(QueryFault::InvalidTileSize { tile_size: ts }),
            };
        }
        if ts != self.config.tile_size {
            log::warn!(
                "{} uses {}px tiles, engine configured for {}px",
                world.name,
                ts,
                self.config.tile_size
            );
        }
        let mover = query.actor.and_then(|a| Mover::lookup(world, a));
        let mut pass = Pass {
            config: &self.config,
            world,
            sim,
            query,
            mover,
            current: mover.map(|m| m.bounds()),
            sampler: CornerSampler::new(ts),
            ts,
            effects: Effects {
                sink,
                suppressed: query.skip_side_effects,
            },
            fault: None,
        };

        let mut skip_to: Option<GauntletStep> = None;
        let mut settled_by: Option<GauntletStep> = None;
        for entry in GAUNTLET.iter().take(steps) {
            if skip_to.is_some_and(|s| s != entry.step) {
                continue;
            }
            skip_to = None;
            if entry.hard_body && query.is_flying {
                continue;
            }
            match (entry.run)(&mut pass) {
                Flow::Continue => {}
                Flow::Blocked => {
                    log::trace!("{:?} blocked at {:?}", query.actor, entry.step);
                    return Verdict {
                        blocked: true,
                        decided_by: Some(entry.step),
                        fault: pass.fault,
                    };
                }
                Flow::Clear => {
                    return Verdict {
                        blocked: false,
                        decided_by: Some(entry.step),
                        fault: None,
                    };
                }
                Flow::SkipTo(next) => {
                    settled_by = Some(entry.step);
                    skip_to = Some(next);
                }
            }
        }
        Verdict {
            decided_by: settled_by,
            ..Verdict::CLEAR
        }
    }

    // Tile predicates, exposed here so callers hold one handle.

    pub fn is_tile_occupied(
        &self,
        world: &WorldContext,
        tile: Tile,
        mask: CollisionMask,
        ignore: CollisionMask,
        use_actor_tile: bool,
    ) -> bool {
        occupancy::is_tile_occupied(world, tile, mask, ignore, use_actor_tile)
    }

    pub fn is_tile_blocked(
        &self,
        world: &WorldContext,
        tile: Tile,
        mask: CollisionMask,
        ignore: CollisionMask,
        use_actor_tile: bool,
    ) -> bool {
        occupancy::is_tile_blocked(world, tile, mask, ignore, use_actor_tile)
    }

    pub fn can_place_item(&self, world: &WorldContext, tile: Tile, req: &PlacementRequest) -> bool {
        occupancy::can_place_item(world, tile, req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Discard;
    use crate::entities::{Bridge, Building, Furnishing, FurnishingKind, Housing, PlacedObject, TerrainGrowth};
    use crate::grid::{StaticTile, WorldGrid};
    use crate::world::{Cutscene, LocationKind};

    const VIEW: Rect = Rect {
        x: 0,
        y: 0,
        width: 1280,
        height: 1280,
    };

    fn farm() -> WorldContext {
        WorldContext::new("Farm", LocationKind::Farm, true, WorldGrid::with_ground(20, 20, 64))
    }

    fn engine() -> CollisionEngine {
        CollisionEngine::default()
    }

    /// A 32x32 box centred in a tile.
    fn body_at(tile: Tile) -> Rect {
        Rect::new(tile.x * 64 + 16, tile.y * 64 + 16, 32, 32)
    }

    fn spawn_player(world: &mut WorldContext, tile: Tile) -> ActorId {
        ActorId::Player(world.players.insert(PlayerActor::new("Farmer", body_at(tile))))
    }

    fn verdict(world: &WorldContext, query: &MoveQuery) -> (Verdict, Vec<SideEffect>) {
        let mut fx = Vec::new();
        let v = engine().resolve_verdict(world, &SimulationContext::default(), query, &mut fx);
        (v, fx)
    }

    #[test]
    fn order_matches_table() {
        let table: Vec<GauntletStep> = GAUNTLET.iter().map(|e| e.step).collect();
        assert_eq!(table, GauntletStep::ORDER.to_vec());
        assert_eq!(GauntletStep::Bounds.position(), 0);
        assert_eq!(GauntletStep::RaftingExit.position(), 20);
    }

    #[test]
    fn open_ground_is_clear() {
        let mut w = farm();
        let me = spawn_player(&mut w, Tile::new(5, 5));
        let q = MoveQuery::walk(me, body_at(Tile::new(6, 5)), VIEW);
        let (v, fx) = verdict(&w, &q);
        assert_eq!(v, Verdict::CLEAR);
        assert!(fx.is_empty());
    }

    #[test]
    fn outside_viewport_is_a_fault() {
        let mut w = farm();
        let me = spawn_player(&mut w, Tile::new(5, 5));
        let q = MoveQuery::walk(me, Rect::new(-500, -500, 32, 32), VIEW);
        let (v, _) = verdict(&w, &q);
        assert!(v.blocked);
        assert_eq!(v.decided_by, Some(GauntletStep::Bounds));
        assert_eq!(v.fault, Some(QueryFault::OutOfBounds));
    }

    #[test]
    fn cutscene_boundary_replaces_viewport() {
        let mut w = farm();
        let me = spawn_player(&mut w, Tile::new(5, 5));
        let sim = SimulationContext {
            cutscene: Some(Cutscene {
                boundary_collisions: true,
                boundary: Rect::new(-1000, -1000, 3000, 3000),
                blocked: Vec::new(),
            }),
        };
        let q = MoveQuery::walk(me, Rect::new(-500, -500, 32, 32), VIEW);
        let v = engine().resolve_verdict(&w, &sim, &q, &mut Discard);
        // past bounds, then cleared by the cutscene step
        assert!(!v.blocked);
        assert_eq!(v.decided_by, Some(GauntletStep::Cutscene));
    }

    #[test]
    fn missing_actor_blocks_unless_waived() {
        let w = farm();
        let mut q = MoveQuery::walk(ActorId::Player(EntryId(9)), body_at(Tile::new(2, 2)), VIEW);
        let (v, _) = verdict(&w, &q);
        assert_eq!(v.fault, Some(QueryFault::MissingActor));
        q.ignore_actor_requirement = true;
        assert!(!verdict(&w, &q).0.blocked);
    }

    #[test]
    fn bridge_deck_decides() {
        let mut w = farm();
        w.bridges.push(Bridge {
            span: Rect::new(640, 320, 256, 64),
        });
        let mut player = PlayerActor::new("Farmer", Rect::new(600, 330, 32, 32));
        player.bridge = Some(0);
        let me = ActorId::Player(w.players.insert(player));
        // a wall under the deck does not matter
        w.grid
            .set_marker(Tile::new(10, 5), Layer::Back, markers::PASSABLE, "T")
            .unwrap();

        let on_deck = MoveQuery::walk(me, Rect::new(650, 330, 32, 32), VIEW);
        let (v, _) = verdict(&w, &on_deck);
        assert_eq!((v.blocked, v.decided_by), (false, Some(GauntletStep::Bridge)));

        let over_rail = MoveQuery::walk(me, Rect::new(650, 300, 32, 32), VIEW);
        let (v, _) = verdict(&w, &over_rail);
        assert_eq!((v.blocked, v.decided_by), (true, Some(GauntletStep::Bridge)));
    }

    #[test]
    fn animal_push_fires_once_per_new_overlap() {
        let mut w = farm();
        let me = spawn_player(&mut w, Tile::new(5, 5));
        let cow = w
            .animals
            .insert(FarmAnimal::new("Cow", Housing::Barn, body_at(Tile::new(6, 5))));
        let q = MoveQuery::walk(me, Rect::new(6 * 64, 5 * 64 + 16, 32, 32), VIEW);
        let (v, fx) = verdict(&w, &q);
        assert_eq!(v.decided_by, Some(GauntletStep::FarmAnimals));
        assert_eq!(
            fx,
            vec![SideEffect::AnimalPushed {
                animal: cow,
                by: Some(me)
            }]
        );
    }

    #[test]
    fn flying_skips_hard_bodies() {
        let mut w = farm();
        let me = spawn_player(&mut w, Tile::new(5, 5));
        w.place_object(Tile::new(6, 5), PlacedObject::solid("Boulder"))
            .unwrap();
        let q = MoveQuery::walk(me, body_at(Tile::new(6, 5)), VIEW);
        assert_eq!(verdict(&w, &q).0.decided_by, Some(GauntletStep::PlacedObjects));
        assert!(!verdict(&w, &q.clone().flying()).0.blocked);
    }

    #[test]
    fn human_door_lets_players_in() {
        let mut w = farm();
        w.buildings.insert(Building {
            kind: "Shed".into(),
            origin: Tile::new(8, 8),
            tiles_wide: 3,
            tiles_high: 2,
            human_door: Some(Tile::new(1, 1)),
            animal_door: None,
            housing: None,
            allows_flooring_underneath: false,
        });
        let me = spawn_player(&mut w, Tile::new(9, 10));
        let into_door = MoveQuery::walk(me, body_at(Tile::new(9, 9)), VIEW);
        assert!(!verdict(&w, &into_door).0.blocked);
        let into_wall = MoveQuery::walk(me, body_at(Tile::new(8, 9)), VIEW);
        assert_eq!(verdict(&w, &into_wall).0.decided_by, Some(GauntletStep::Buildings));
    }

    #[test]
    fn furniture_ignored_during_cutscene() {
        let mut w = farm();
        let me = spawn_player(&mut w, Tile::new(5, 5));
        w.furnishings.insert(Furnishing {
            kind: FurnishingKind::Table,
            bounds: Tile::new(6, 5).pixel_rect(64),
            emits_light: false,
        });
        let q = MoveQuery::walk(me, body_at(Tile::new(6, 5)), VIEW);
        assert_eq!(verdict(&w, &q).0.decided_by, Some(GauntletStep::Furnishings));
        let sim = SimulationContext {
            cutscene: Some(Cutscene::default()),
        };
        let v = engine().resolve_verdict(&w, &sim, &q, &mut Discard);
        assert!(!v.blocked);
    }

    #[test]
    fn growth_disturbed_even_when_standing_in_it() {
        let mut w = farm();
        w.plant_growth(Tile::new(5, 5), TerrainGrowth::Grass).unwrap();
        let me = spawn_player(&mut w, Tile::new(5, 5));
        let q = MoveQuery::walk(me, Rect::new(5 * 64 + 18, 5 * 64 + 16, 32, 32), VIEW);
        let (v, fx) = verdict(&w, &q);
        assert!(!v.blocked);
        assert_eq!(
            fx,
            vec![SideEffect::GrowthDisturbed {
                tile: Tile::new(5, 5),
                speed: 5
            }]
        );
        let (_, fx) = verdict(&w, &q.clone().probe());
        assert!(fx.is_empty());
    }

    #[test]
    fn npc_requests_door_above_feet() {
        let mut w = farm();
        w.grid
            .set_tile(
                Tile::new(4, 3),
                Layer::Buildings,
                Some(StaticTile::new(7).with_marker(markers::ACTION, "Door 12")),
            )
            .unwrap();
        let mut npc = CharacterActor::villager("Abigail", body_at(Tile::new(4, 5)));
        npc.has_controller = true;
        let me = ActorId::Character(w.characters.insert(npc));
        let q = MoveQuery::walk(me, body_at(Tile::new(4, 4)), VIEW);
        let (v, fx) = verdict(&w, &q);
        assert!(!v.blocked);
        assert_eq!(
            fx,
            vec![SideEffect::DoorOpenRequested {
                tile: Tile::new(4, 3)
            }]
        );
    }

    #[test]
    fn prefix_runs_stop_early() {
        let mut w = farm();
        let me = spawn_player(&mut w, Tile::new(5, 5));
        w.grid
            .set_marker(Tile::new(6, 5), Layer::Back, markers::PASSABLE, "T")
            .unwrap();
        let q = MoveQuery::walk(me, body_at(Tile::new(6, 5)), VIEW);
        let sim = SimulationContext::default();
        let early = engine().resolve_through(&w, &sim, &q, &mut Discard, GauntletStep::ActorBarrier);
        assert!(!early.blocked);
        let full = engine().resolve_verdict(&w, &sim, &q, &mut Discard);
        assert_eq!(full.decided_by, Some(GauntletStep::BaseLayer));
    }
}

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use homestead_logic::constants::markers;
use homestead_logic::effects::{Discard, SideEffect};
use homestead_logic::entities::{CharacterActor, FarmAnimal, Housing, PlacedObject, PlayerActor, TerrainGrowth};
use homestead_logic::geometry::{Rect, Tile};
use homestead_logic::grid::{Layer, WorldGrid};
use homestead_logic::mask::CollisionMask;
use homestead_logic::occupancy::{can_place_item, is_tile_occupied, PlacementRequest};
use homestead_logic::world::{ActorId, LocationKind, SimulationContext, WorldContext};
use homestead_logic::{CollisionEngine, MoveQuery};

/// A 64x64 farm with a scattering of everything.
fn busy_farm() -> (WorldContext, ActorId) {
    let mut w = WorldContext::new("Farm", LocationKind::Farm, true, WorldGrid::with_ground(64, 64, 64));
    for i in 0..64 {
        let t = Tile::new((i * 7) % 64, (i * 13) % 64);
        if i % 3 == 0 {
            let _ = w.place_object(t, PlacedObject::solid("Fence"));
        } else {
            let _ = w.plant_growth(t, TerrainGrowth::Grass);
        }
        if i % 5 == 0 {
            let _ = w.grid.set_marker(Tile::new(i, 40), Layer::Back, markers::PASSABLE, "T");
        }
    }
    for i in 0..12 {
        let px = i * 300 % 4000;
        w.animals
            .insert(FarmAnimal::new("Cow", Housing::Barn, Rect::new(px, 1200, 64, 64)));
        w.characters
            .insert(CharacterActor::villager("Villager", Rect::new(px, 2000, 32, 32)));
    }
    let me = w.players.insert(PlayerActor::new("Farmer", Rect::new(1024, 1024, 48, 32)));
    (w, ActorId::Player(me))
}

fn bench_resolve(c: &mut Criterion) {
    let (world, me) = busy_farm();
    let engine = CollisionEngine::default();
    let sim = SimulationContext::default();
    let view = Rect::new(0, 0, 4096, 4096);

    c.bench_function("resolve_open_step", |b| {
        let q = MoveQuery::walk(me, Rect::new(1029, 1024, 48, 32), view);
        b.iter(|| engine.resolve(black_box(&world), &sim, black_box(&q), &mut Discard))
    });

    c.bench_function("resolve_probe", |b| {
        let q = MoveQuery::walk(me, Rect::new(1090, 1024, 48, 32), view).probe();
        b.iter(|| engine.resolve(black_box(&world), &sim, black_box(&q), &mut Discard))
    });

    c.bench_function("resolve_collecting_effects", |b| {
        let mut fx: Vec<SideEffect> = Vec::with_capacity(8);
        let q = MoveQuery::walk(me, Rect::new(1024, 1029, 48, 32), view);
        b.iter(|| {
            fx.clear();
            engine.resolve(black_box(&world), &sim, black_box(&q), &mut fx)
        })
    });
}

fn bench_predicates(c: &mut Criterion) {
    let (world, _) = busy_farm();

    c.bench_function("is_tile_occupied", |b| {
        b.iter(|| {
            is_tile_occupied(
                black_box(&world),
                black_box(Tile::new(20, 20)),
                CollisionMask::all(),
                CollisionMask::empty(),
                false,
            )
        })
    });

    c.bench_function("can_place_item", |b| {
        let req = PlacementRequest::default();
        b.iter(|| can_place_item(black_box(&world), black_box(Tile::new(31, 17)), &req))
    });
}

criterion_group!(benches, bench_resolve, bench_predicates);
criterion_main!(benches);

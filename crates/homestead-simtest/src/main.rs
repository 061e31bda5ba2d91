//! Homestead Headless Collision Harness
//!
//! Replays bundled collision scenarios, sweeps randomized locations for
//! engine invariants, and checks that a bincode-mirrored observer copy of a
//! location reaches the same verdicts as the host.
//! Runs entirely in-process with no rendering or networking.
//!
//! Usage:
//!   cargo run -p homestead-simtest
//!   cargo run -p homestead-simtest -- --verbose --seed 7 --config tuning.json

mod scenario;

use std::collections::BTreeSet;

use homestead_logic::config::{validate_config, CollisionConfig};
use homestead_logic::constants::markers;
use homestead_logic::effects::{Discard, SideEffect};
use homestead_logic::entities::{
    Building, CharacterActor, FarmAnimal, Furnishing, FurnishingKind, Housing, PlacedObject,
    PlayerActor, TerrainGrowth,
};
use homestead_logic::geometry::{Rect, Tile};
use homestead_logic::grid::{Layer, StaticTile, WorldGrid};
use homestead_logic::occupancy::{check_placement, PlacementDenial, PlacementRequest};
use homestead_logic::registry::{BoxRegistry, EntryId, RegistryEvent, Subscription};
use homestead_logic::world::{ActorId, LocationKind, SimulationContext, WorldContext};
use homestead_logic::{CollisionEngine, GauntletStep, MoveQuery};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use scenario::{body_at, effect_kind, load_scenarios, HarnessError, SCENARIOS_JSON};

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Args {
    verbose: bool,
    seed: u64,
    config_path: Option<String>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, HarnessError> {
        let mut parsed = Args {
            verbose: false,
            seed: 42,
            config_path: None,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--verbose" => parsed.verbose = true,
                "--seed" => {
                    let value = args
                        .next()
                        .ok_or_else(|| HarnessError::Args("--seed needs a value".into()))?;
                    parsed.seed = value
                        .parse()
                        .map_err(|_| HarnessError::Args(format!("--seed {}", value)))?;
                }
                "--config" => {
                    parsed.config_path = Some(
                        args.next()
                            .ok_or_else(|| HarnessError::Args("--config needs a path".into()))?,
                    );
                }
                other => return Err(HarnessError::Args(other.to_string())),
            }
        }
        Ok(parsed)
    }
}

fn load_config(path: Option<&str>) -> Result<CollisionConfig, HarnessError> {
    let Some(path) = path else {
        return Ok(CollisionConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|source| HarnessError::Read {
        path: path.to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

fn main() {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    println!("=== Homestead Collision Harness ===\n");

    let config = match load_config(args.config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    let engine = CollisionEngine::new(config);
    let mut rng = StdRng::seed_from_u64(args.seed);
    log::info!("seed {}", args.seed);

    let mut results = Vec::new();

    // 1. Config sanity
    results.extend(validate_engine_config(&engine));

    // 2. Bundled scenarios
    results.extend(run_scenarios(&engine, args.verbose));

    // 3. Gauntlet monotonicity sweep
    results.extend(sweep_monotonicity(&engine, &mut rng, args.verbose));

    // 4. Placement soft-pass symmetry
    results.extend(sweep_placement_symmetry(&engine, &mut rng));

    // 5. Host / observer mirror
    results.extend(validate_mirror(&engine, &mut rng));

    // 6. Registry subscriptions
    results.extend(validate_light_cache(&mut rng));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || args.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Config ───────────────────────────────────────────────────────────

fn validate_engine_config(engine: &CollisionEngine) -> Vec<TestResult> {
    println!("--- Config ---");
    let issues = validate_config(engine.config());
    vec![TestResult {
        name: "config_valid".into(),
        passed: issues.is_empty(),
        detail: if issues.is_empty() {
            format!("{}px tiles", engine.config().tile_size)
        } else {
            issues
                .iter()
                .map(|i| format!("{}: {}", i.field, i.message))
                .collect::<Vec<_>>()
                .join("; ")
        },
    }]
}

// ── 2. Scenarios ────────────────────────────────────────────────────────

fn run_scenarios(engine: &CollisionEngine, verbose: bool) -> Vec<TestResult> {
    println!("--- Scenarios ---");
    let mut results = Vec::new();
    let ts = engine.config().tile_size;

    let scenarios = match load_scenarios(SCENARIOS_JSON) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult {
                name: "scenarios_parse".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };
    let sim = SimulationContext::default();

    for s in &scenarios {
        let (world, mover) = match s.build(ts) {
            Ok(built) => built,
            Err(e) => {
                results.push(TestResult {
                    name: format!("{}_build", s.name),
                    passed: false,
                    detail: e.to_string(),
                });
                continue;
            }
        };
        let viewport = world.grid.pixel_bounds();

        for (i, check) in s.moves.iter().enumerate() {
            let name = format!("{}_move_{}", s.name, i + 1);
            let Some(actor) = mover else {
                results.push(TestResult {
                    name,
                    passed: false,
                    detail: "move check without a mover".into(),
                });
                continue;
            };
            let mut query = MoveQuery::walk(actor, body_at(check.target(), ts), viewport);
            if check.flying {
                query = query.flying();
            }
            if check.probe {
                query = query.probe();
            }
            let mut fx: Vec<SideEffect> = Vec::new();
            let verdict = engine.resolve_verdict(&world, &sim, &query, &mut fx);
            let kinds: Vec<&str> = fx.iter().map(effect_kind).collect();

            let step_ok = check.step.is_none() || check.step == verdict.decided_by;
            results.push(TestResult {
                name,
                passed: verdict.blocked == check.blocked && step_ok && kinds == check.effects,
                detail: format!(
                    "→ {} blocked={} by {:?}, effects {:?}",
                    check.target(),
                    verdict.blocked,
                    verdict.decided_by,
                    kinds
                ),
            });
        }

        for (i, check) in s.placements.iter().enumerate() {
            let req = if check.passable {
                PlacementRequest::passable_item()
            } else {
                PlacementRequest::default()
            };
            let outcome = check_placement(&world, check.tile(), &req);
            results.push(TestResult {
                name: format!("{}_place_{}", s.name, i + 1),
                passed: outcome.is_ok() == check.allowed,
                detail: format!("{} passable={} → {:?}", check.tile(), check.passable, outcome),
            });
        }

        if verbose {
            println!(
                "  {:28} {} moves, {} placements",
                s.name,
                s.moves.len(),
                s.placements.len()
            );
        }
    }

    results.push(TestResult {
        name: "scenarios_loaded".into(),
        passed: !scenarios.is_empty(),
        detail: format!("{} scenarios", scenarios.len()),
    });
    results
}

// ── Random locations ────────────────────────────────────────────────────

const SWEEP_SIZE: i32 = 24;

fn random_tile(rng: &mut StdRng) -> Tile {
    Tile::new(rng.gen_range(0..SWEEP_SIZE), rng.gen_range(0..SWEEP_SIZE))
}

/// A cluttered farm plus one player somewhere in it.
fn random_farm(rng: &mut StdRng, ts: i32) -> (WorldContext, ActorId) {
    let mut w = WorldContext::new(
        "Farm",
        LocationKind::Farm,
        true,
        WorldGrid::with_ground(SWEEP_SIZE, SWEEP_SIZE, ts),
    );
    for _ in 0..40 {
        let t = random_tile(rng);
        // collisions with an earlier entry are expected and skipped
        let _ = match rng.gen_range(0..6) {
            0 => w.place_object(t, PlacedObject::solid("Fence")),
            1 => w.place_object(
                t,
                PlacedObject {
                    passable: true,
                    ..PlacedObject::solid("Path")
                },
            ),
            2 => w.plant_growth(t, TerrainGrowth::Grass),
            3 => w.plant_growth(t, TerrainGrowth::Bush),
            4 => w.plant_growth(
                t,
                TerrainGrowth::Tree {
                    stage: rng.gen_range(0..5),
                },
            ),
            _ => w.plant_growth(t, TerrainGrowth::Flooring),
        };
    }
    for _ in 0..12 {
        let t = random_tile(rng);
        let name = match rng.gen_range(0..3) {
            0 => markers::PASSABLE,
            1 => markers::ACTOR_BARRIER,
            _ => markers::TEMPORARY_BARRIER,
        };
        let _ = w.grid.set_marker(t, Layer::Back, name, "T");
    }
    for _ in 0..6 {
        let t = random_tile(rng);
        let _ = w.grid.set_tile(t, Layer::Buildings, Some(StaticTile::new(9)));
    }
    let origin = random_tile(rng);
    w.buildings.insert(Building {
        kind: "Coop".into(),
        origin,
        tiles_wide: 3,
        tiles_high: 2,
        human_door: Some(Tile::new(1, 1)),
        animal_door: None,
        housing: Some(Housing::Coop),
        allows_flooring_underneath: false,
    });
    for i in 0..4 {
        let t = random_tile(rng);
        w.animals
            .insert(FarmAnimal::new("Chicken", Housing::Coop, body_at(t, ts)));
        let t = random_tile(rng);
        w.characters
            .insert(CharacterActor::villager(&format!("Villager {}", i), body_at(t, ts)));
    }
    let me = w
        .players
        .insert(PlayerActor::new("Farmer", body_at(random_tile(rng), ts)));
    (w, ActorId::Player(me))
}

/// A candidate box up to a tile and a half away from the mover.
fn random_step(rng: &mut StdRng, from: Rect, ts: i32) -> Rect {
    let reach = ts * 3 / 2;
    Rect::new(
        from.x + rng.gen_range(-reach..=reach),
        from.y + rng.gen_range(-reach..=reach),
        from.width,
        from.height,
    )
}

// ── 3. Monotonicity ─────────────────────────────────────────────────────

fn sweep_monotonicity(engine: &CollisionEngine, rng: &mut StdRng, verbose: bool) -> Vec<TestResult> {
    println!("--- Gauntlet Monotonicity ---");
    let ts = engine.config().tile_size;
    let sim = SimulationContext::default();
    let mut queries = 0;
    let mut violations = Vec::new();
    let mut nondeterministic = 0;
    let mut by_step = vec![0usize; GauntletStep::ORDER.len()];

    for _ in 0..20 {
        let (world, me) = random_farm(rng, ts);
        let viewport = world.grid.pixel_bounds();
        let Some(from) = world.actor_box(me) else {
            continue;
        };
        for _ in 0..25 {
            let q = MoveQuery::walk(me, random_step(rng, from, ts), viewport);
            queries += 1;

            let mut first = Vec::new();
            let full = engine.resolve_verdict(&world, &sim, &q, &mut first);
            let mut second = Vec::new();
            if engine.resolve_verdict(&world, &sim, &q, &mut second) != full || first != second {
                nondeterministic += 1;
            }
            if let Some(step) = full.decided_by.filter(|_| full.blocked) {
                by_step[step.position()] += 1;
            }

            for step in GauntletStep::ORDER {
                let prefix = engine.resolve_through(&world, &sim, &q, &mut Discard, step);
                if prefix.blocked && !full.blocked {
                    violations.push(format!("{:?} at {:?}", q.candidate, step));
                }
            }
        }
    }

    if verbose {
        println!("  Blocking steps over {} queries:", queries);
        for (step, n) in GauntletStep::ORDER.iter().zip(&by_step) {
            if *n > 0 {
                println!("    {:18} {}", format!("{:?}", step), n);
            }
        }
    }

    vec![
        TestResult {
            name: "gauntlet_monotonic".into(),
            passed: violations.is_empty(),
            detail: if violations.is_empty() {
                format!("{} queries, every blocked prefix stays blocked", queries)
            } else {
                format!("{} violations, first {}", violations.len(), violations[0])
            },
        },
        TestResult {
            name: "gauntlet_deterministic".into(),
            passed: nondeterministic == 0,
            detail: format!("{} of {} queries differed on rerun", nondeterministic, queries),
        },
    ]
}

// ── 4. Placement symmetry ───────────────────────────────────────────────

/// A walkable item that fits somewhere a solid item does not must be
/// refused the solid item only because of actors standing there.
fn sweep_placement_symmetry(engine: &CollisionEngine, rng: &mut StdRng) -> Vec<TestResult> {
    println!("--- Placement Symmetry ---");
    let ts = engine.config().tile_size;
    let mut checked = 0;
    let mut asymmetric = 0;
    let mut failures = Vec::new();

    for _ in 0..20 {
        let (world, _) = random_farm(rng, ts);
        let mut empty = world.clone();
        empty.characters = BoxRegistry::new(world.characters.kind());
        empty.animals = BoxRegistry::new(world.animals.kind());
        empty.players = BoxRegistry::new(world.players.kind());

        for x in 0..SWEEP_SIZE {
            for y in 0..SWEEP_SIZE {
                let t = Tile::new(x, y);
                checked += 1;
                let soft = check_placement(&world, t, &PlacementRequest::passable_item());
                let solid = check_placement(&world, t, &PlacementRequest::default());
                if soft.is_ok() && solid == Err(PlacementDenial::Blocked) {
                    asymmetric += 1;
                    if check_placement(&empty, t, &PlacementRequest::default()).is_err() {
                        failures.push(t);
                    }
                }
            }
        }
    }

    vec![TestResult {
        name: "placement_soft_pass_symmetry".into(),
        passed: failures.is_empty(),
        detail: if failures.is_empty() {
            format!("{} tiles, {} refused solid items only for actors", checked, asymmetric)
        } else {
            format!("{} tiles refused for something other than actors, first {}", failures.len(), failures[0])
        },
    }]
}

// ── 5. Mirror ───────────────────────────────────────────────────────────

fn mirror(world: &WorldContext) -> Result<WorldContext, HarnessError> {
    let bytes = bincode::serialize(world)?;
    Ok(bincode::deserialize(&bytes)?)
}

fn validate_mirror(engine: &CollisionEngine, rng: &mut StdRng) -> Vec<TestResult> {
    println!("--- Host / Observer Mirror ---");
    let ts = engine.config().tile_size;
    let sim = SimulationContext::default();
    let (mut host, me) = random_farm(rng, ts);

    let mut observer = match mirror(&host) {
        Ok(m) => m,
        Err(e) => {
            return vec![TestResult {
                name: "mirror_roundtrip".into(),
                passed: false,
                detail: e.to_string(),
            }]
        }
    };

    let viewport = host.grid.pixel_bounds();
    let mut mismatches = 0;
    let mut applied = 0;
    let mut apply_errors = Vec::new();
    for _ in 0..100 {
        let Some(from) = host.actor_box(me) else {
            break;
        };
        let q = MoveQuery::walk(me, random_step(rng, from, ts), viewport);
        let mut host_fx = Vec::new();
        let mut obs_fx = Vec::new();
        let hv = engine.resolve_verdict(&host, &sim, &q, &mut host_fx);
        let ov = engine.resolve_verdict(&observer, &sim, &q, &mut obs_fx);
        if hv != ov || host_fx != obs_fx {
            mismatches += 1;
        }
        // both sides apply the host's effects, as a replicated owner would
        for world in [&mut host, &mut observer] {
            if let Err(e) = world.apply_effects(&host_fx) {
                apply_errors.push(e.to_string());
            }
        }
        applied += host_fx.len();
    }

    let converged = match (bincode::serialize(&host), bincode::serialize(&observer)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };

    vec![
        TestResult {
            name: "mirror_same_verdicts".into(),
            passed: mismatches == 0,
            detail: format!("{} of 100 queries disagreed", mismatches),
        },
        TestResult {
            name: "mirror_effects_apply".into(),
            passed: apply_errors.is_empty(),
            detail: if apply_errors.is_empty() {
                format!("{} effects applied on both sides", applied)
            } else {
                apply_errors[0].clone()
            },
        },
        TestResult {
            name: "mirror_converges".into(),
            passed: converged,
            detail: "host and observer encode identically after replay".into(),
        },
    ]
}

// ── 6. Subscriptions ────────────────────────────────────────────────────

/// Derived set of light-emitting furnishings, kept current from the
/// registry's change log instead of rescanning.
struct LightCache {
    sub: Subscription,
    lit: BTreeSet<EntryId>,
}

impl LightCache {
    fn new(reg: &BoxRegistry<Furnishing>) -> Self {
        Self {
            sub: reg.subscribe(),
            lit: reg
                .iter()
                .filter(|(_, f)| f.emits_light)
                .map(|(id, _)| id)
                .collect(),
        }
    }

    fn sync(&mut self, reg: &BoxRegistry<Furnishing>) {
        for event in reg.changes(&mut self.sub) {
            match event {
                RegistryEvent::Added(id) => {
                    if reg.get(id).is_some_and(|f| f.emits_light) {
                        self.lit.insert(id);
                    }
                }
                RegistryEvent::Removed(id) => {
                    self.lit.remove(&id);
                }
            }
        }
    }
}

fn validate_light_cache(rng: &mut StdRng) -> Vec<TestResult> {
    println!("--- Registry Subscriptions ---");
    let mut w = WorldContext::new(
        "FarmHouse",
        LocationKind::Interior,
        false,
        WorldGrid::with_ground(12, 12, 64),
    );
    w.furnishings.insert(Furnishing {
        kind: FurnishingKind::Lamp,
        bounds: Rect::new(64, 64, 64, 128),
        emits_light: true,
    });
    let mut cache = LightCache::new(&w.furnishings);
    let mut ids = Vec::new();

    for _ in 0..50 {
        if ids.is_empty() || rng.gen_bool(0.6) {
            let kind = match rng.gen_range(0..3) {
                0 => FurnishingKind::Lamp,
                1 => FurnishingKind::Rug,
                _ => FurnishingKind::Chair,
            };
            let bounds = Rect::new(rng.gen_range(0..640), rng.gen_range(0..640), 64, 64);
            let emits_light = kind == FurnishingKind::Lamp;
            ids.push(w.furnishings.insert(Furnishing {
                kind,
                bounds,
                emits_light,
            }));
        } else {
            let id = ids.swap_remove(rng.gen_range(0..ids.len()));
            let _ = w.furnishings.remove(id);
        }
        if rng.gen_bool(0.3) {
            cache.sync(&w.furnishings);
        }
    }
    cache.sync(&w.furnishings);

    let rescanned: BTreeSet<EntryId> = w
        .furnishings
        .iter()
        .filter(|(_, f)| f.emits_light)
        .map(|(id, _)| id)
        .collect();

    vec![TestResult {
        name: "light_cache_follows_changes".into(),
        passed: cache.lit == rescanned,
        detail: format!(
            "{} lights after 50 edits, registry version {}",
            rescanned.len(),
            w.furnishings.version()
        ),
    }]
}

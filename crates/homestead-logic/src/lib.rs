//! Pure occupancy and movement-collision logic for Homestead locations.
//!
//! Nothing here renders, does I/O, or keeps global state. A location is a
//! [`world::WorldContext`] (map grid plus entity registries); queries take it
//! by reference and return plain answers, so the same code runs on a host
//! and on every observer and yields identical results.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Engine tuning knobs and their validation |
//! | [`constants`] | Tile marker names and values |
//! | [`effects`] | Side-effect requests emitted by the resolver |
//! | [`entities`] | Objects, growths, buildings, furnishings, actors |
//! | [`error`] | Registry errors and per-query faults |
//! | [`geometry`] | Tiles, points, pixel rectangles |
//! | [`grid`] | Layered static tile grid with per-tile markers |
//! | [`mask`] | Collision category bit set |
//! | [`occupancy`] | Tile occupancy, blocked and placement predicates |
//! | [`registry`] | Point- and box-indexed entity stores with change logs |
//! | [`resolver`] | The ordered movement-collision gauntlet |
//! | [`sampler`] | Corner sampling with previous-box exclusion |
//! | [`world`] | Location context, actor handles, cutscene state |

pub mod config;
pub mod constants;
pub mod effects;
pub mod entities;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod mask;
pub mod occupancy;
pub mod registry;
pub mod resolver;
pub mod sampler;
pub mod world;

pub use resolver::{CollisionEngine, GauntletStep, MoveQuery, Verdict};

// hive_sim: host-agnostic drone colony controller.
//
// This crate holds the whole per-tick decision loop for a colony of drones
// in a Screeps-style world: durable memory, the task framework that carries
// multi-tick jobs across ticks, and the colony logic that spawns, assigns and
// defends. The host game is reached only through the `World` trait, so the
// controller can be driven by a real server binding or by the in-memory
// `Sandbox` shipped here for tests and the `hive` CLI.
//
// Module overview:
// - `types.rs`:     Position, Direction, ObjectId, resource/structure/body enums, Store, ReturnCode.
// - `object.rs`:    RoomObject snapshots and their kind-specific payloads.
// - `world.rs`:     The `World` trait: host queries and action calls.
// - `geometry.rs`:  Range and neighbourhood queries over positions and objects.
// - `memory.rs`:    Durable Memory (per-creep and per-colony records), JSON round-trip.
// - `config.rs`:    HiveConfig, every tunable threshold and body template.
// - `target.rs`:    TargetHandle, the persisted (id, position) reference to a task target.
// - `task.rs`:      Task lifecycle: validity, run, fork/finish chaining, descriptors.
// - `catalogue.rs`: The nine standard task kinds and their rules.
// - `registry.rs`:  Tag -> constructor registry; rehydrates tasks from memory.
// - `drone.rs`:     Per-tick Drone wrapper and primitive actions.
// - `colony.rs`:    Colony aggregation and the role handlers.
// - `game.rs`:      Game (per-tick context) and `run_tick`.
// - `sandbox.rs`:   Deterministic in-memory `World`.
//
// **Critical constraint: determinism.** Given the same world and memory, a
// tick issues the same actions in the same order. Iterate `BTreeMap`s or
// sorted vectors, never hash order, and never read a clock.

pub mod catalogue;
pub mod colony;
pub mod config;
pub mod drone;
pub mod game;
pub mod geometry;
pub mod memory;
pub mod object;
pub mod registry;
pub mod sandbox;
pub mod target;
pub mod task;
pub mod types;
pub mod world;

pub use catalogue::{Target, TaskKind};
pub use colony::{Colony, ColonyError};
pub use config::{ConfigError, HiveConfig};
pub use drone::Drone;
pub use game::{Game, TickReport, run_tick};
pub use memory::{Memory, MemoryError, Role};
pub use registry::{RegistryError, TaskRegistry};
pub use sandbox::{Intent, Sandbox};
pub use task::{Task, TaskDescriptor};
pub use world::{Find, MoveOpts, World};

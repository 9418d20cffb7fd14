// Tick driver and per-tick state.
//
// `Game` bundles what one tick works against: the host `World`, durable
// `Memory`, the read-only `HiveConfig` and `TaskRegistry`, and the drone
// registry (`drones`, every live creep wrapped as a `Drone`, keyed by name).
// It lives for exactly one tick. `Game::new` rebuilds the drone registry from
// the world; nothing in it outlives `run_tick`.
//
// `run_tick` is the whole loop body the host calls once per tick:
//   1. Drop memory records of units that no longer exist.
//   2. Rebuild the drone registry.
//   3. Build a `Colony` for every owned room, in room-name order. A room
//      that cannot form a colony is logged and skipped.
//   4. Run each colony: population, towers, role handlers, then every drone
//      executes its task once.
//
// **Critical constraint: determinism.** Every collection iterated here is a
// `BTreeMap` or a name-sorted `Vec`, so two runs over the same world and
// memory make the same calls in the same order.
//
// See also: `colony.rs` for the decision engine, `sandbox.rs` for an
// in-memory `World` to drive this with.

use crate::colony::Colony;
use crate::config::HiveConfig;
use crate::drone::Drone;
use crate::memory::Memory;
use crate::registry::TaskRegistry;
use crate::world::World;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// State of the tick in progress.
pub struct Game<'a> {
    pub world: &'a mut dyn World,
    pub memory: &'a mut Memory,
    pub config: &'a HiveConfig,
    pub registry: &'a TaskRegistry,
    /// Live drones by name, rebuilt at the start of the tick.
    pub drones: BTreeMap<String, Drone>,
    pub time: u64,
}

impl<'a> Game<'a> {
    pub fn new(
        world: &'a mut dyn World,
        memory: &'a mut Memory,
        config: &'a HiveConfig,
        registry: &'a TaskRegistry,
    ) -> Self {
        let time = world.time();
        let drones = world
            .my_creeps()
            .iter()
            .filter_map(|object| Drone::from_object(object, memory))
            .map(|drone| (drone.name.clone(), drone))
            .collect();
        Self {
            world,
            memory,
            config,
            registry,
            drones,
            time,
        }
    }

    pub fn drone(&self, name: &str) -> Option<&Drone> {
        self.drones.get(name)
    }
}

/// What one tick did, for the host's logs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub colonies: Vec<String>,
    pub drones: usize,
    /// Memory records dropped because their unit is gone.
    pub cleaned: Vec<String>,
    /// Rooms skipped because no colony could be formed there.
    pub skipped: Vec<String>,
}

/// Run one full controller pass.
pub fn run_tick(
    world: &mut dyn World,
    memory: &mut Memory,
    config: &HiveConfig,
    registry: &TaskRegistry,
) -> TickReport {
    let live: BTreeSet<String> = world
        .my_creeps()
        .iter()
        .filter_map(|object| object.creep().map(|info| info.name.clone()))
        .collect();
    let cleaned = memory.clean(&live);
    for name in &cleaned {
        debug!(drone = %name, "clearing memory of dead drone");
    }

    let mut game = Game::new(world, memory, config, registry);
    let mut report = TickReport {
        tick: game.time,
        drones: game.drones.len(),
        cleaned,
        ..TickReport::default()
    };

    let rooms: BTreeSet<String> = game.world.owned_rooms().into_iter().collect();
    let mut colonies = Vec::new();
    for room in rooms {
        match Colony::new(&room, &mut game) {
            Ok(colony) => colonies.push(colony),
            Err(err) => {
                warn!(colony = %room, error = %err, "skipping colony");
                report.skipped.push(room);
            }
        }
    }

    for colony in &colonies {
        colony.run(&mut game);
        report.colonies.push(colony.name.clone());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{CreepMemory, Role};
    use crate::sandbox::Sandbox;
    use crate::types::{Position, StructureType};

    #[test]
    fn dead_drone_memory_is_cleaned() {
        let mut sandbox = Sandbox::new();
        sandbox.add_room("W1N1");
        let mut memory = Memory::default();
        memory
            .creeps
            .insert("ghost".into(), CreepMemory::new("W1N1", Role::Hauler, None));

        let report = run_tick(&mut sandbox, &mut memory, &HiveConfig::default(), &TaskRegistry::standard());
        assert_eq!(report.cleaned, vec!["ghost".to_string()]);
        assert!(memory.creeps.is_empty());
    }

    #[test]
    fn room_without_controller_is_skipped() {
        let mut sandbox = Sandbox::new();
        sandbox.add_room("W1N1");
        sandbox.add_room("W2N1");
        sandbox.add_spawn(Position::new(20, 20, "W1N1"), 300);
        sandbox.add_controller(Position::new(30, 30, "W1N1"), 2, 5000);
        sandbox.add_spawn(Position::new(20, 20, "W2N1"), 300);
        sandbox.add_structure(Position::new(21, 20, "W2N1"), StructureType::Extension, true);

        let mut memory = Memory::default();
        let report = run_tick(&mut sandbox, &mut memory, &HiveConfig::default(), &TaskRegistry::standard());
        assert_eq!(report.colonies, vec!["W1N1".to_string()]);
        assert_eq!(report.skipped, vec!["W2N1".to_string()]);
        assert!(memory.colonies.contains_key("W1N1"));
    }

    #[test]
    fn game_wraps_every_creep() {
        let mut sandbox = Sandbox::new();
        sandbox.add_room("W1N1");
        sandbox.add_creep("a", Position::new(3, 3, "W1N1"), &[]);
        sandbox.add_creep("b", Position::new(4, 3, "W1N1"), &[]);
        let mut memory = Memory::default();
        let config = HiveConfig::default();
        let registry = TaskRegistry::standard();
        let game = Game::new(&mut sandbox, &mut memory, &config, &registry);
        assert_eq!(game.drones.keys().cloned().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(game.drone("a").is_some());
        assert_eq!(game.time, 0);
    }
}

// Drone: per-tick wrapper around one controllable unit.
//
// A `Drone` is a read-only snapshot of a creep (name, id, body, store,
// position, hit points) plus the role/colony/assignment fields of its durable
// record, rebuilt every tick by `Game::new`. It owns no state of its own:
// the active task lives in `Memory` and is rehydrated on demand by
// `Drone::task`, and every primitive action (`harvest`, `transfer`,
// `move_to`, ...) forwards straight to the `World`.
//
// Position snapshots go stale as soon as the unit moves within a tick; code
// that needs the current tile asks the world again.
//
// See also: `task.rs` for what drives these primitives, `colony.rs` for the
// role logic that assigns tasks to idle drones.

use crate::game::Game;
use crate::geometry::{available_neighbours, find_closest_by_range};
use crate::memory::{Memory, Role};
use crate::object::{ObjectKind, RoomObject};
use crate::task::Task;
use crate::types::{
    BodyPart, Direction, ObjectId, Position, ResourceType, ReturnCode, Store, StructureType, Terrain,
};
use crate::world::{MoveOpts, World};
use tracing::trace;

/// Spawn energy cost of a body.
pub fn body_cost(body: &[BodyPart]) -> u32 {
    body.iter().map(|part| part.cost()).sum()
}

#[derive(Clone, Debug, PartialEq)]
pub struct Drone {
    pub name: String,
    pub id: ObjectId,
    pub pos: Position,
    pub body: Vec<BodyPart>,
    pub store: Store,
    pub hits: u32,
    pub hits_max: u32,
    pub fatigue: u32,
    pub spawning: bool,
    pub role: Role,
    pub colony: String,
    /// Empty when unassigned.
    pub assignment: ObjectId,
}

impl Drone {
    /// Wrap a creep snapshot. `None` for anything that is not a creep. A
    /// creep without a memory record gets an empty `Other` role and no
    /// colony.
    pub fn from_object(object: &RoomObject, memory: &Memory) -> Option<Drone> {
        let ObjectKind::Creep(info) = &object.kind else {
            return None;
        };
        let record = memory.creeps.get(&info.name);
        Some(Drone {
            name: info.name.clone(),
            id: object.id.clone(),
            pos: object.pos.clone(),
            body: info.body.clone(),
            store: object.store.clone().unwrap_or_default(),
            hits: object.hits,
            hits_max: object.hits_max,
            fatigue: info.fatigue,
            spawning: info.spawning,
            role: record.map_or_else(Role::unassigned, |r| r.role.clone()),
            colony: record.map(|r| r.colony.clone()).unwrap_or_default(),
            assignment: record.map(|r| r.assignment.clone()).unwrap_or_default(),
        })
    }

    #[cfg(test)]
    pub(crate) fn detached(name: &str, pos: Position, store: Store) -> Drone {
        Drone {
            name: name.to_string(),
            id: ObjectId::new(format!("creep-{name}")),
            pos,
            body: Vec::new(),
            store,
            hits: 100,
            hits_max: 100,
            fatigue: 0,
            spawning: false,
            role: Role::unassigned(),
            colony: String::new(),
            assignment: ObjectId::default(),
        }
    }

    pub fn count_parts(&self, part: BodyPart) -> usize {
        self.body.iter().filter(|p| **p == part).count()
    }

    pub fn is_damaged(&self) -> bool {
        self.hits < self.hits_max
    }

    // -- Task ---------------------------------------------------------------

    /// The active task, rehydrated from memory.
    pub fn task(&self, game: &Game<'_>) -> Option<Task> {
        let desc = game.memory.task_of(&self.name)?;
        Some(game.registry.instantiate(desc, &*game.world))
    }

    /// Replace the active task (`None` leaves the drone idle).
    pub fn set_task(&self, game: &mut Game<'_>, task: Option<Task>) {
        let desc = task.map(|mut t| {
            t.set_drone(&self.name);
            trace!(drone = %self.name, task = t.name(), target = %t.target_handle().id, "task assigned");
            t.descriptor()
        });
        game.memory.set_task(&self.name, desc);
    }

    /// No task, or a task (and its whole parent chain) that no longer holds.
    pub fn is_idle(&self, game: &mut Game<'_>) -> bool {
        match self.task(game) {
            Some(mut task) => !task.is_valid(game),
            None => true,
        }
    }

    /// Re-validate the active task, then execute whatever is active after
    /// the check (it may have fallen back to a parent). `None` when idle.
    pub fn run(&self, game: &mut Game<'_>) -> Option<ReturnCode> {
        if !self.task(game)?.is_valid(game) {
            return None;
        }
        self.task(game)?.run(game)
    }

    // -- Primitives ---------------------------------------------------------

    pub fn move_by(&self, world: &mut dyn World, direction: Direction) -> ReturnCode {
        world.creep_move(&self.name, direction)
    }

    pub fn move_to(&self, world: &mut dyn World, goal: &Position, opts: &MoveOpts) -> ReturnCode {
        world.creep_move_to(&self.name, goal, opts)
    }

    pub fn harvest(&self, world: &mut dyn World, target: &ObjectId) -> ReturnCode {
        world.creep_harvest(&self.name, target)
    }

    pub fn build(&self, world: &mut dyn World, site: &ObjectId) -> ReturnCode {
        world.creep_build(&self.name, site)
    }

    pub fn repair(&self, world: &mut dyn World, target: &ObjectId) -> ReturnCode {
        world.creep_repair(&self.name, target)
    }

    pub fn upgrade_controller(&self, world: &mut dyn World, controller: &ObjectId) -> ReturnCode {
        world.creep_upgrade_controller(&self.name, controller)
    }

    pub fn transfer(
        &self,
        world: &mut dyn World,
        target: &ObjectId,
        resource: ResourceType,
        amount: Option<u32>,
    ) -> ReturnCode {
        world.creep_transfer(&self.name, target, resource, amount)
    }

    pub fn withdraw(
        &self,
        world: &mut dyn World,
        target: &ObjectId,
        resource: ResourceType,
        amount: Option<u32>,
    ) -> ReturnCode {
        world.creep_withdraw(&self.name, target, resource, amount)
    }

    pub fn pickup(&self, world: &mut dyn World, resource: &ObjectId) -> ReturnCode {
        world.creep_pickup(&self.name, resource)
    }

    pub fn drop(&self, world: &mut dyn World, resource: ResourceType, amount: Option<u32>) -> ReturnCode {
        world.creep_drop(&self.name, resource, amount)
    }

    pub fn attack(&self, world: &mut dyn World, target: &ObjectId) -> ReturnCode {
        world.creep_attack(&self.name, target)
    }

    pub fn heal(&self, world: &mut dyn World, target: &ObjectId) -> ReturnCode {
        world.creep_heal(&self.name, target)
    }

    pub fn say(&self, world: &mut dyn World, message: &str) -> ReturnCode {
        world.creep_say(&self.name, message)
    }

    /// Get off the road. If standing on a road, step to the nearest open
    /// neighbour (relative to `pos`) that is neither road nor swamp, without
    /// moving farther from `pos` when `maintain_distance` is set. With no such
    /// tile, fall back to moving toward `pos`. `Ok` when already off road.
    pub fn park(&self, world: &mut dyn World, pos: &Position, maintain_distance: bool) -> ReturnCode {
        let on_road = |world: &dyn World, at: &Position| {
            world
                .structures_at(at)
                .iter()
                .any(|s| s.is_structure(StructureType::Road))
        };
        let here = world
            .object(&self.id)
            .map_or_else(|| self.pos.clone(), |o| o.pos);
        if !on_road(&*world, &here) {
            return ReturnCode::Ok;
        }

        let current_range = here.range_to(pos);
        let mut candidates: Vec<Position> = available_neighbours(&*world, &here, false)
            .into_iter()
            .filter(|p| !maintain_distance || p.range_to(pos) <= current_range)
            .collect();
        // Stable sort keeps neighbour order among equally distant tiles.
        candidates.sort_by_key(|p| p.range_to(pos));

        let spot = candidates
            .into_iter()
            .find(|p| !on_road(&*world, p) && world.terrain(p) != Terrain::Swamp);
        match spot.and_then(|p| here.direction_to(&p)) {
            Some(direction) => self.move_by(world, direction),
            None => self.move_to(world, pos, &MoveOpts::default()),
        }
    }

    /// Closest of `candidates` to this drone.
    pub fn closest<'a>(&self, candidates: impl IntoIterator<Item = &'a RoomObject>) -> Option<&'a RoomObject> {
        find_closest_by_range(&self.pos, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::CreepMemory;
    use crate::sandbox::Sandbox;

    #[test]
    fn body_cost_sums_parts() {
        assert_eq!(body_cost(&[BodyPart::Work, BodyPart::Carry, BodyPart::Move]), 200);
        assert_eq!(body_cost(&[]), 0);
        assert_eq!(
            body_cost(&[BodyPart::Tough, BodyPart::Heal, BodyPart::RangedAttack, BodyPart::Attack]),
            490
        );
    }

    #[test]
    fn from_object_reads_memory_record() {
        let mut sandbox = Sandbox::new();
        sandbox.add_room("W1N1");
        let id = sandbox.add_creep("miner_1", Position::new(5, 5, "W1N1"), &[BodyPart::Work, BodyPart::Move]);
        let mut memory = Memory::default();
        memory.creeps.insert(
            "miner_1".into(),
            CreepMemory::new("W1N1", Role::Miner, Some(ObjectId::new("src"))),
        );
        let drone = Drone::from_object(&sandbox.object(&id).unwrap(), &memory).unwrap();
        assert_eq!(drone.role, Role::Miner);
        assert_eq!(drone.colony, "W1N1");
        assert_eq!(drone.assignment, ObjectId::new("src"));
        assert_eq!(drone.count_parts(BodyPart::Work), 1);

        let stranger = Drone::from_object(&sandbox.object(&id).unwrap(), &Memory::default()).unwrap();
        assert_eq!(stranger.role, Role::unassigned());
        assert!(stranger.assignment.is_empty());
    }

    #[test]
    fn park_is_noop_off_road() {
        let mut sandbox = Sandbox::new();
        sandbox.add_room("W1N1");
        let here = Position::new(10, 10, "W1N1");
        let id = sandbox.add_creep("w", here.clone(), &[BodyPart::Move]);
        let drone = Drone::from_object(&sandbox.object(&id).unwrap(), &Memory::default()).unwrap();
        assert_eq!(drone.park(&mut sandbox, &Position::new(12, 10, "W1N1"), true), ReturnCode::Ok);
        assert_eq!(sandbox.object(&id).unwrap().pos, here);
    }

    #[test]
    fn park_steps_off_road_keeping_range() {
        let mut sandbox = Sandbox::new();
        sandbox.add_room("W1N1");
        let here = Position::new(10, 10, "W1N1");
        let goal = Position::new(13, 10, "W1N1");
        sandbox.add_structure(here.clone(), StructureType::Road, true);
        // Roads on the two tiles closest to the goal.
        sandbox.add_structure(Position::new(11, 10, "W1N1"), StructureType::Road, true);
        sandbox.add_structure(Position::new(11, 9, "W1N1"), StructureType::Road, true);
        sandbox.set_terrain(&Position::new(11, 11, "W1N1"), Terrain::Swamp);
        let id = sandbox.add_creep("w", here.clone(), &[BodyPart::Move]);
        let drone = Drone::from_object(&sandbox.object(&id).unwrap(), &Memory::default()).unwrap();

        assert_eq!(drone.park(&mut sandbox, &goal, true), ReturnCode::Ok);
        let now = sandbox.object(&id).unwrap().pos;
        assert_ne!(now, here);
        assert!(now.range_to(&goal) <= here.range_to(&goal));
        assert!(sandbox.structures_at(&now).is_empty());
        assert_eq!(sandbox.terrain(&now), Terrain::Plain);
    }
}

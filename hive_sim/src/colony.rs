// Colony: one owned room and its per-tick decision engine.
//
// A `Colony` is rebuilt every tick from the world: structures grouped by
// type, sources, construction sites, damaged structures, hostiles, and the
// colony's drones indexed by role and by assignment. The indices are read
// only for the rest of the tick.
//
// Construction (`Colony::new`) also performs the room-level bookkeeping:
//   - maturity level, cached in `ColonyMemory::level` and recomputed only when
//     unset or every `level_interval_ticks`
//     (1: fewer containers than sources, 2: no storage,
//      3: controller below max level, 4: otherwise);
//   - output bootstrapping: a source with no container (or container site)
//     nearby gets a container site under its stationed miner;
//   - miner saturation: request a miner per source until
//     min(max_miners_per_source, open tiles around it) are assigned.
//
// `Colony::run` then does population control (hauler first, then workers),
// towers (attack > heal > repair), role handlers for idle miners, haulers and
// workers, and finally runs every drone's task once.
//
// See also: `game.rs` for where colonies are built and run, `catalogue.rs`
// for the tasks handed out here, `config.rs` for every threshold.

use crate::config::HiveConfig;
use crate::drone::{Drone, body_cost};
use crate::game::Game;
use crate::geometry::{available_neighbours, find_closest_by_range, find_in_range};
use crate::memory::{CreepMemory, Role};
use crate::object::{ObjectKind, RoomObject};
use crate::task::Task;
use crate::types::{BodyPart, ObjectId, ResourceType, ReturnCode, StructureType};
use crate::world::Find;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColonyError {
    #[error("room {room} has no controller")]
    NoController { room: String },
}

pub struct Colony {
    pub name: String,
    pub level: u8,
    pub controller: RoomObject,
    pub structures: FxHashMap<StructureType, Vec<RoomObject>>,
    pub sources: Vec<RoomObject>,
    pub construction_sites: Vec<RoomObject>,
    /// Damaged structures, walls excluded.
    pub repairables: Vec<RoomObject>,
    /// This colony's drones in name order.
    pub drones: Vec<Drone>,
    pub hostiles: Vec<RoomObject>,
    drones_by_role: FxHashMap<Role, Vec<usize>>,
    drones_by_assignment: FxHashMap<ObjectId, Vec<usize>>,
}

impl Colony {
    /// Index the room, refresh the cached level, bootstrap outputs and
    /// request missing miners.
    pub fn new(room: &str, game: &mut Game<'_>) -> Result<Colony, ColonyError> {
        let all_structures = game.world.find(room, Find::Structures);
        let controller = all_structures
            .iter()
            .find(|s| matches!(s.kind, ObjectKind::Controller { .. }))
            .cloned()
            .ok_or_else(|| ColonyError::NoController {
                room: room.to_string(),
            })?;

        let repairables = all_structures
            .iter()
            .filter(|s| !s.is_structure(StructureType::Wall) && s.is_damaged())
            .cloned()
            .collect();
        let mut structures: FxHashMap<StructureType, Vec<RoomObject>> = FxHashMap::default();
        for s in all_structures {
            if let Some(t) = s.structure_type() {
                structures.entry(t).or_default().push(s);
            }
        }

        let drones: Vec<Drone> = game
            .drones
            .values()
            .filter(|d| d.colony == room)
            .cloned()
            .collect();
        let mut drones_by_role: FxHashMap<Role, Vec<usize>> = FxHashMap::default();
        let mut drones_by_assignment: FxHashMap<ObjectId, Vec<usize>> = FxHashMap::default();
        for (i, drone) in drones.iter().enumerate() {
            drones_by_role.entry(drone.role.clone()).or_default().push(i);
            drones_by_assignment
                .entry(drone.assignment.clone())
                .or_default()
                .push(i);
        }

        let mut colony = Colony {
            name: room.to_string(),
            level: 0,
            controller,
            structures,
            sources: game.world.find(room, Find::Sources),
            construction_sites: game.world.find(room, Find::ConstructionSites),
            repairables,
            drones,
            hostiles: game.world.find(room, Find::HostileCreeps),
            drones_by_role,
            drones_by_assignment,
        };

        colony.refresh_level(game);
        colony.init(game);
        Ok(colony)
    }

    // -- Indices ------------------------------------------------------------

    pub fn structures_by_type(&self, structure_type: StructureType) -> &[RoomObject] {
        self.structures
            .get(&structure_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn spawns(&self) -> &[RoomObject] {
        self.structures_by_type(StructureType::Spawn)
    }

    pub fn extensions(&self) -> &[RoomObject] {
        self.structures_by_type(StructureType::Extension)
    }

    pub fn containers(&self) -> &[RoomObject] {
        self.structures_by_type(StructureType::Container)
    }

    pub fn towers(&self) -> &[RoomObject] {
        self.structures_by_type(StructureType::Tower)
    }

    pub fn storage(&self) -> Option<&RoomObject> {
        self.structures_by_type(StructureType::Storage).first()
    }

    pub fn drones_by_role(&self, role: Role) -> Vec<&Drone> {
        self.indexed(self.drones_by_role.get(&role))
    }

    pub fn drones_by_assignment(&self, id: &ObjectId) -> Vec<&Drone> {
        self.indexed(self.drones_by_assignment.get(id))
    }

    fn indexed(&self, indices: Option<&Vec<usize>>) -> Vec<&Drone> {
        indices
            .into_iter()
            .flatten()
            .filter_map(|&i| self.drones.get(i))
            .collect()
    }

    /// Pending container construction sites.
    fn container_sites(&self) -> impl Iterator<Item = &RoomObject> {
        self.construction_sites.iter().filter(|s| {
            matches!(
                s.kind,
                ObjectKind::ConstructionSite {
                    structure_type: StructureType::Container,
                    ..
                }
            )
        })
    }

    /// `(level, ticks_to_downgrade)` of the controller.
    fn controller_state(&self) -> (u8, u32) {
        match self.controller.kind {
            ObjectKind::Controller {
                level,
                ticks_to_downgrade,
                ..
            } => (level, ticks_to_downgrade),
            _ => (0, 0),
        }
    }

    /// Re-evaluate the maturity level when none is cached or on an
    /// evaluation tick, else keep the cached one. Returns the new level when
    /// an evaluation ran.
    fn refresh_level(&mut self, game: &mut Game<'_>) -> Option<u8> {
        let config = game.config;
        let record = game.memory.colony_mut(&self.name);
        let due = record.level == 0 || game.time % config.level_interval_ticks.max(1) == 0;
        let evaluated = due.then(|| self.evaluate(config));
        if let Some(level) = evaluated {
            if record.level != level {
                info!(colony = %self.name, from = record.level, to = level, "colony level changed");
            }
            record.level = level;
        }
        self.level = record.level;
        evaluated
    }

    /// Maturity tier from the current indices.
    pub fn evaluate(&self, config: &HiveConfig) -> u8 {
        if self.containers().len() < self.sources.len() {
            1
        } else if self.storage().is_none() {
            2
        } else if self.controller_state().0 < config.max_controller_level {
            3
        } else {
            4
        }
    }

    // -- Room-level bookkeeping ---------------------------------------------

    fn init(&self, game: &mut Game<'_>) {
        let config = game.config;
        for source in &self.sources {
            let radius = config.output_container_radius;
            let has_output = !find_in_range(&source.pos, self.containers(), radius).is_empty()
                || !find_in_range(&source.pos, self.container_sites(), radius).is_empty();
            if !has_output {
                if game.time % config.no_output_log_interval_ticks.max(1) == 0 {
                    info!(colony = %self.name, source = %source.id, "no output container for source");
                }
                let stationed = find_in_range(&source.pos, &self.drones, 1)
                    .into_iter()
                    .find(|d| d.role == Role::Miner && d.assignment == source.id);
                if let Some(miner) = stationed {
                    let code = game
                        .world
                        .create_construction_site(&miner.pos, StructureType::Container);
                    info!(
                        colony = %self.name,
                        source = %source.id,
                        pos = %miner.pos,
                        result = %code,
                        "placed output container site"
                    );
                }
            }

            let open = available_neighbours(&*game.world, &source.pos, true).len();
            let wanted = config.max_miners_per_source.min(open);
            if self.drones_by_assignment(&source.id).len() < wanted {
                self.spawn_drone(game, Role::Miner, &config.miner_body, Some(source.id.clone()));
            }
        }
    }

    /// Ask the first spawn for a new drone named `{role}_{tick}`. On success
    /// the drone's memory record is written immediately.
    pub fn spawn_drone(
        &self,
        game: &mut Game<'_>,
        role: Role,
        body: &[BodyPart],
        assignment: Option<ObjectId>,
    ) -> ReturnCode {
        let name = format!("{}_{}", role, game.time);
        let Some(spawn) = self.spawns().first() else {
            debug!(colony = %self.name, role = %role, "no spawn for drone request");
            return ReturnCode::NotFound;
        };
        let code = game.world.spawn_creep(&spawn.id, body, &name);
        if code.is_ok() {
            info!(
                colony = %self.name,
                drone = %name,
                cost = body_cost(body),
                "spawning drone"
            );
            game.memory
                .creeps
                .insert(name, CreepMemory::new(self.name.clone(), role, assignment));
        } else {
            debug!(colony = %self.name, drone = %name, result = %code, "spawn request failed");
        }
        code
    }

    // -- Per-tick pass ------------------------------------------------------

    pub fn run(&self, game: &mut Game<'_>) {
        self.check_population(game);
        for tower in self.towers() {
            self.handle_tower(game, tower);
        }
        for miner in self.drones_by_role(Role::Miner) {
            if miner.is_idle(game) {
                self.handle_miner(game, miner);
            }
        }
        for hauler in self.drones_by_role(Role::Hauler) {
            if hauler.is_idle(game) {
                self.handle_hauler(game, hauler);
            }
        }
        for worker in self.drones_by_role(Role::Worker) {
            if worker.is_idle(game) {
                self.handle_worker(game, worker);
            }
        }
        for drone in &self.drones {
            drone.run(game);
        }
    }

    /// One hauler before anything else; then workers once containers exist.
    pub fn check_population(&self, game: &mut Game<'_>) -> Option<ReturnCode> {
        let config = game.config;
        if self.drones_by_role(Role::Hauler).is_empty() {
            return Some(self.spawn_drone(game, Role::Hauler, &config.hauler_body, None));
        }
        if !self.containers().is_empty() && self.drones_by_role(Role::Worker).len() < config.worker_target {
            let controller = Some(self.controller.id.clone());
            return Some(self.spawn_drone(game, Role::Worker, &config.worker_body, controller));
        }
        None
    }

    pub fn handle_tower(&self, game: &mut Game<'_>, tower: &RoomObject) -> Option<ReturnCode> {
        if tower.stored(ResourceType::Energy) == 0 {
            return None;
        }
        if let Some(hostile) = find_closest_by_range(&tower.pos, &self.hostiles) {
            return Some(game.world.tower_attack(&tower.id, &hostile.id));
        }
        if let Some(patient) = find_closest_by_range(&tower.pos, self.drones.iter().filter(|d| d.is_damaged())) {
            return Some(game.world.tower_heal(&tower.id, &patient.id));
        }
        let ratio = game.config.repair_threshold;
        let worn = self.repairables.iter().filter(|s| below_ratio(s, ratio));
        if let Some(target) = find_closest_by_range(&tower.pos, worn) {
            return Some(game.world.tower_repair(&tower.id, &target.id));
        }
        None
    }

    pub fn handle_miner(&self, game: &mut Game<'_>, miner: &Drone) {
        let now = game.time;
        let source = if miner.assignment.is_empty() {
            None
        } else {
            game.world.object(&miner.assignment)
        };

        if miner.store.energy() == 0 {
            match source {
                Some(source) => miner.set_task(game, Some(Task::harvest(&source, now))),
                None => warn!(
                    colony = %self.name,
                    drone = %miner.name,
                    "miner has no source assignment; manual assignment needed"
                ),
            }
            return;
        }

        let container = source
            .as_ref()
            .and_then(|s| find_closest_by_range(&miner.pos, find_in_range(&s.pos, self.containers(), 1)))
            .or_else(|| find_closest_by_range(&miner.pos, find_in_range(&miner.pos, self.containers(), 2)));
        if let Some(container) = container {
            miner.set_task(game, Some(Task::transfer(container, now)));
            return;
        }
        let site = find_closest_by_range(&miner.pos, find_in_range(&miner.pos, self.container_sites(), 2));
        if let Some(site) = site {
            miner.set_task(game, Some(Task::build(site, now)));
            return;
        }
        if !self.drones_by_role(Role::Hauler).is_empty() {
            miner.set_task(game, Some(Task::drop_at(miner.pos.clone(), now)));
        }
    }

    pub fn handle_hauler(&self, game: &mut Game<'_>, hauler: &Drone) {
        let now = game.time;
        if hauler.store.energy() == 0 {
            let drops = game.world.find(&self.name, Find::DroppedResources);
            let energy_drops = drops.iter().filter(|d| {
                matches!(
                    d.kind,
                    ObjectKind::Resource {
                        resource_type: ResourceType::Energy,
                        amount,
                    } if amount > 0
                )
            });
            if let Some(drop) = hauler.closest(energy_drops) {
                hauler.set_task(game, Some(Task::pickup(drop, now)));
                return;
            }
            if let Some(container) = self.withdraw_source(hauler, game.config) {
                hauler.set_task(game, Some(Task::withdraw(container, now)));
            }
            return;
        }

        let refill = self
            .spawns()
            .iter()
            .chain(self.extensions())
            .filter(|s| s.free_capacity() > 0);
        let target = hauler
            .closest(refill)
            .or_else(|| hauler.closest(self.towers().iter().filter(|t| t.free_capacity() > 0)))
            .or_else(|| self.storage());
        if let Some(target) = target {
            hauler.set_task(game, Some(Task::transfer(target, now)));
        }
    }

    pub fn handle_worker(&self, game: &mut Game<'_>, worker: &Drone) {
        let config = game.config;
        let now = game.time;
        if worker.store.energy() == 0 {
            let source = self.withdraw_source(worker, config).or_else(|| self.storage());
            if let Some(source) = source {
                worker.set_task(game, Some(Task::withdraw(source, now)));
            }
            return;
        }

        let (level, ticks_to_downgrade) = self.controller_state();
        if level < config.urgent_controller_level || ticks_to_downgrade < config.downgrade_threshold_ticks {
            worker.set_task(game, Some(Task::upgrade(&self.controller, now)));
            return;
        }
        let worn = self
            .repairables
            .iter()
            .filter(|s| below_ratio(s, config.repair_threshold));
        if let Some(target) = worker.closest(worn) {
            worker.set_task(game, Some(Task::repair(target, now)));
            return;
        }
        if let Some(site) = worker.closest(&self.construction_sites) {
            worker.set_task(game, Some(Task::build(site, now)));
            return;
        }
        worker.set_task(game, Some(Task::upgrade(&self.controller, now)));
    }

    /// Closest container worth emptying: one holding more than
    /// `withdraw_fill_ratio` of the drone's free capacity, else any with
    /// energy in it.
    fn withdraw_source(&self, drone: &Drone, config: &HiveConfig) -> Option<&RoomObject> {
        let wanted = config.withdraw_fill_ratio * f64::from(drone.store.free_capacity());
        drone
            .closest(
                self.containers()
                    .iter()
                    .filter(|c| f64::from(c.stored(ResourceType::Energy)) > wanted),
            )
            .or_else(|| {
                drone.closest(
                    self.containers()
                        .iter()
                        .filter(|c| c.stored(ResourceType::Energy) > 0),
                )
            })
    }
}

fn below_ratio(structure: &RoomObject, ratio: f64) -> bool {
    f64::from(structure.hits) < ratio * f64::from(structure.hits_max)
}

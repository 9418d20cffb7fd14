// In-memory reference host.
//
// `Sandbox` implements `World` over a flat object table so the controller can
// be driven without a game server: the integration tests build small rooms
// with it, and `hive_cli` runs whole colonies on it. It is a stand-in, not a
// faithful engine. Actions resolve immediately rather than at tick end, and
// there is no pathfinding (a move-to takes one greedy step toward the goal).
// Rates and costs follow the host's published constants, simplified where
// the host has special cases.
//
// Successful actions are recorded as `Intent`s so tests can assert on what
// the controller did without inspecting object state.
//
// Object ids are allocated sequentially (`obj00001`, ...), so every query
// returns objects in creation order.
//
// **Critical constraint: determinism.** Everything is kept in `BTreeMap`s and
// nothing reads a clock, so the same build-up and the same calls always
// produce the same world.
//
// See also: `world.rs` for the trait this implements, `game.rs` for the tick
// driver that runs against it.

use crate::geometry::is_passable;
use crate::object::{CreepInfo, ObjectKind, RoomObject};
use crate::types::{
    BodyPart, Direction, ObjectId, Position, ROOM_MAX, ResourceType, ReturnCode, Store, StructureType, Terrain,
};
use crate::world::{Find, MoveOpts, World};
use std::collections::{BTreeMap, BTreeSet};

/// Energy harvested per WORK part per tick from a source.
const HARVEST_POWER: u32 = 2;
/// Mineral harvested per WORK part per tick.
const HARVEST_MINERAL_POWER: u32 = 1;
const BUILD_POWER: u32 = 5;
const REPAIR_POWER: u32 = 100;
const UPGRADE_POWER: u32 = 1;
const ATTACK_POWER: u32 = 30;
const HEAL_POWER: u32 = 12;
const CARRY_CAPACITY: u32 = 50;
const HITS_PER_PART: u32 = 100;
const TOWER_ENERGY_COST: u32 = 10;
const TOWER_ATTACK: u32 = 600;
const TOWER_HEAL: u32 = 400;
const TOWER_REPAIR: u32 = 800;
const SOURCE_CAPACITY: u32 = 3000;
const SOURCE_REGEN_TICKS: u64 = 300;
const SPAWN_CAPACITY: u32 = 300;
const CONTROLLER_DOWNGRADE: u32 = 20_000;
/// Progress needed to leave levels 1 through 7.
const CONTROLLER_LEVELS: [u32; 7] = [200, 45_000, 135_000, 405_000, 1_215_000, 3_645_000, 10_935_000];

/// A successful action, as recorded by the sandbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Move { creep: String, to: Position },
    Harvest { creep: String, target: ObjectId, amount: u32 },
    Build { creep: String, site: ObjectId, progress: u32 },
    Repair { creep: String, target: ObjectId },
    Upgrade { creep: String, controller: ObjectId },
    Transfer { creep: String, target: ObjectId, resource: ResourceType, amount: u32 },
    Withdraw { creep: String, target: ObjectId, resource: ResourceType, amount: u32 },
    Pickup { creep: String, target: ObjectId, amount: u32 },
    Drop { creep: String, resource: ResourceType, amount: u32 },
    Attack { creep: String, target: ObjectId },
    Heal { creep: String, target: ObjectId },
    Say { creep: String, message: String },
    TowerAttack { tower: ObjectId, target: ObjectId },
    TowerHeal { tower: ObjectId, target: ObjectId },
    TowerRepair { tower: ObjectId, target: ObjectId },
    Spawn { spawn: ObjectId, name: String, body: Vec<BodyPart> },
    PlaceSite { pos: Position, structure_type: StructureType },
}

/// The acting creep of a unit action.
struct Actor {
    id: ObjectId,
    pos: Position,
    body: Vec<BodyPart>,
}

impl Actor {
    fn parts(&self, part: BodyPart) -> u32 {
        self.body.iter().filter(|p| **p == part).count() as u32
    }

    fn require(&self, part: BodyPart) -> Result<u32, ReturnCode> {
        match self.parts(part) {
            0 => Err(ReturnCode::NoBodypart),
            n => Ok(n),
        }
    }

    fn reach(&self, target: &RoomObject, range: u32) -> Result<(), ReturnCode> {
        if self.pos.in_range_to(&target.pos, range) {
            Ok(())
        } else {
            Err(ReturnCode::NotInRange)
        }
    }
}

fn outcome(result: Result<(), ReturnCode>) -> ReturnCode {
    result.err().unwrap_or(ReturnCode::Ok)
}

#[derive(Clone, Debug, Default)]
pub struct Sandbox {
    time: u64,
    /// Non-plain terrain per room. A room exists once it has an entry.
    terrain: BTreeMap<String, BTreeMap<(i32, i32), Terrain>>,
    objects: BTreeMap<ObjectId, RoomObject>,
    /// Creep name -> object id.
    creeps: BTreeMap<String, ObjectId>,
    next_id: u64,
    busy_spawns: BTreeSet<ObjectId>,
    intents: Vec<Intent>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// A room with a spawn, a level-1 controller and `sources` sources spread
    /// along the top of the room.
    pub fn starter(room: &str, sources: usize) -> Self {
        let mut sandbox = Self::new();
        sandbox.add_room(room);
        sandbox.add_spawn(Position::new(25, 25, room), SPAWN_CAPACITY);
        sandbox.add_controller(Position::new(25, 40, room), 1, CONTROLLER_DOWNGRADE);
        for i in 0..sources {
            let x = 8 + (i as i32 * 12) % 36;
            let y = 8 + (i as i32 / 3) * 6;
            sandbox.add_source(Position::new(x, y, room), SOURCE_CAPACITY);
        }
        sandbox
    }

    // -- Building the world -------------------------------------------------

    pub fn add_room(&mut self, room: &str) {
        self.terrain.entry(room.to_string()).or_default();
    }

    pub fn set_time(&mut self, time: u64) {
        self.time = time;
    }

    pub fn set_terrain(&mut self, pos: &Position, terrain: Terrain) {
        let tiles = self.terrain.entry(pos.room.clone()).or_default();
        if terrain == Terrain::Plain {
            tiles.remove(&(pos.x, pos.y));
        } else {
            tiles.insert((pos.x, pos.y), terrain);
        }
    }

    fn insert(&mut self, pos: Position, kind: ObjectKind, my: bool, hits: u32, store: Option<Store>) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId::new(format!("obj{:05}", self.next_id));
        if let ObjectKind::Creep(info) = &kind {
            self.creeps.insert(info.name.clone(), id.clone());
        }
        self.objects.insert(
            id.clone(),
            RoomObject {
                id: id.clone(),
                pos,
                kind,
                my,
                hits,
                hits_max: hits,
                store,
            },
        );
        id
    }

    pub fn add_source(&mut self, pos: Position, energy: u32) -> ObjectId {
        let kind = ObjectKind::Source {
            energy,
            energy_capacity: SOURCE_CAPACITY.max(energy),
        };
        self.insert(pos, kind, false, 0, None)
    }

    pub fn add_mineral(&mut self, pos: Position, mineral_type: ResourceType, amount: u32) -> ObjectId {
        self.insert(pos, ObjectKind::Mineral { mineral_type, amount }, false, 0, None)
    }

    pub fn add_controller(&mut self, pos: Position, level: u8, ticks_to_downgrade: u32) -> ObjectId {
        let kind = ObjectKind::Controller {
            level,
            progress: 0,
            progress_total: progress_total_for(level),
            ticks_to_downgrade,
        };
        self.insert(pos, kind, true, 0, None)
    }

    pub fn add_spawn(&mut self, pos: Position, energy: u32) -> ObjectId {
        let id = self.add_structure(pos, StructureType::Spawn, true);
        if let Some(store) = self.store_mut(&id) {
            store.add(ResourceType::Energy, energy);
        }
        id
    }

    /// A structure at full hits with an empty store (for store-bearing types).
    pub fn add_structure(&mut self, pos: Position, structure_type: StructureType, my: bool) -> ObjectId {
        let store = store_capacity(structure_type).map(Store::with_capacity);
        self.insert(
            pos,
            ObjectKind::Structure { structure_type },
            my,
            structure_hits(structure_type),
            store,
        )
    }

    pub fn add_site(&mut self, pos: Position, structure_type: StructureType) -> ObjectId {
        let kind = ObjectKind::ConstructionSite {
            structure_type,
            progress: 0,
            progress_total: build_cost(structure_type),
        };
        self.insert(pos, kind, true, 0, None)
    }

    pub fn add_dropped(&mut self, pos: Position, resource_type: ResourceType, amount: u32) -> ObjectId {
        self.insert(pos, ObjectKind::Resource { resource_type, amount }, false, 0, None)
    }

    /// One of our creeps, idle and fully grown.
    pub fn add_creep(&mut self, name: &str, pos: Position, body: &[BodyPart]) -> ObjectId {
        let carry = body.iter().filter(|p| **p == BodyPart::Carry).count() as u32;
        let info = CreepInfo {
            name: name.to_string(),
            body: body.to_vec(),
            fatigue: 0,
            spawning: false,
            ticks_to_live: Some(1500),
        };
        self.insert(
            pos,
            ObjectKind::Creep(info),
            true,
            HITS_PER_PART * body.len() as u32,
            Some(Store::with_capacity(carry * CARRY_CAPACITY)),
        )
    }

    pub fn add_hostile(&mut self, pos: Position) -> ObjectId {
        let name = format!("invader_{}", self.next_id + 1);
        let info = CreepInfo {
            name: name.clone(),
            body: vec![BodyPart::Attack, BodyPart::Move],
            fatigue: 0,
            spawning: false,
            ticks_to_live: Some(1500),
        };
        let id = self.insert(pos, ObjectKind::Creep(info), false, 2 * HITS_PER_PART, None);
        // Hostiles are not part of the player's creep index.
        self.creeps.remove(&name);
        id
    }

    pub fn remove_object(&mut self, id: &ObjectId) -> Option<RoomObject> {
        let object = self.objects.remove(id)?;
        if let Some(info) = object.creep() {
            if self.creeps.get(&info.name) == Some(id) {
                self.creeps.remove(&info.name);
            }
        }
        Some(object)
    }

    pub fn object_mut(&mut self, id: &ObjectId) -> Option<&mut RoomObject> {
        self.objects.get_mut(id)
    }

    pub fn store_mut(&mut self, id: &ObjectId) -> Option<&mut Store> {
        self.objects.get_mut(id)?.store.as_mut()
    }

    pub fn set_hits(&mut self, id: &ObjectId, hits: u32) {
        if let Some(object) = self.objects.get_mut(id) {
            object.hits = hits.min(object.hits_max);
        }
    }

    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    pub fn clear_intents(&mut self) {
        self.intents.clear();
    }

    pub fn take_intents(&mut self) -> Vec<Intent> {
        std::mem::take(&mut self.intents)
    }

    /// End the tick: finish spawning, free spawns, decay controllers,
    /// regenerate sources and trickle energy into spawns.
    pub fn advance(&mut self) {
        self.time += 1;
        self.busy_spawns.clear();
        let regen = self.time % SOURCE_REGEN_TICKS == 0;
        for object in self.objects.values_mut() {
            match &mut object.kind {
                ObjectKind::Creep(info) => info.spawning = false,
                ObjectKind::Source {
                    energy,
                    energy_capacity,
                } if regen => *energy = *energy_capacity,
                ObjectKind::Controller {
                    ticks_to_downgrade, ..
                } => *ticks_to_downgrade = ticks_to_downgrade.saturating_sub(1),
                ObjectKind::Structure {
                    structure_type: StructureType::Spawn,
                } => {
                    if let Some(store) = object.store.as_mut() {
                        if store.energy() < SPAWN_CAPACITY {
                            store.add(ResourceType::Energy, 1);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // -- Internals ----------------------------------------------------------

    fn in_bounds(pos: &Position) -> bool {
        (0..=ROOM_MAX).contains(&pos.x) && (0..=ROOM_MAX).contains(&pos.y)
    }

    fn actor(&self, name: &str) -> Result<Actor, ReturnCode> {
        let id = self.creeps.get(name).ok_or(ReturnCode::NotFound)?;
        let object = self.objects.get(id).ok_or(ReturnCode::NotFound)?;
        let info = object.creep().ok_or(ReturnCode::NotFound)?;
        if info.spawning {
            return Err(ReturnCode::Busy);
        }
        Ok(Actor {
            id: id.clone(),
            pos: object.pos.clone(),
            body: info.body.clone(),
        })
    }

    fn target(&self, id: &ObjectId) -> Result<RoomObject, ReturnCode> {
        self.objects.get(id).cloned().ok_or(ReturnCode::InvalidTarget)
    }

    fn store_of(&mut self, id: &ObjectId) -> Result<&mut Store, ReturnCode> {
        self.store_mut(id).ok_or(ReturnCode::InvalidTarget)
    }

    fn relocate(&mut self, id: &ObjectId, to: Position) {
        if let Some(object) = self.objects.get_mut(id) {
            object.pos = to;
        }
    }

    /// Energy available for spawning in `room`: spawns then extensions.
    fn spawn_energy_sources(&self, room: &str) -> Vec<ObjectId> {
        let mut ids: Vec<(u8, ObjectId)> = self
            .objects
            .values()
            .filter(|o| o.my && o.pos.room == room)
            .filter_map(|o| match o.structure_type() {
                Some(StructureType::Spawn) => Some((0, o.id.clone())),
                Some(StructureType::Extension) => Some((1, o.id.clone())),
                _ => None,
            })
            .collect();
        ids.sort();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    fn move_creep(&mut self, creep: &str, direction: Direction) -> Result<(), ReturnCode> {
        let actor = self.actor(creep)?;
        actor.require(BodyPart::Move)?;
        let to = actor.pos.step(direction);
        if !Self::in_bounds(&to) {
            return Err(ReturnCode::InvalidArgs);
        }
        if is_passable(&*self, &to, false) {
            self.relocate(&actor.id, to.clone());
            self.intents.push(Intent::Move {
                creep: creep.to_string(),
                to,
            });
        }
        Ok(())
    }

    fn move_creep_to(&mut self, creep: &str, goal: &Position, opts: &MoveOpts) -> Result<(), ReturnCode> {
        let actor = self.actor(creep)?;
        if actor.pos.room != goal.room || !Self::in_bounds(goal) {
            return Err(ReturnCode::NoPath);
        }
        if actor.pos.in_range_to(goal, opts.range.unwrap_or(0)) {
            return Ok(());
        }
        actor.require(BodyPart::Move)?;
        // Greedy: the straight-line step if it is open, else the open
        // neighbour closest to the goal, ties in direction order.
        let step = actor
            .pos
            .direction_to(goal)
            .into_iter()
            .chain(Direction::ALL)
            .map(|d| actor.pos.step(d))
            .filter(|p| Self::in_bounds(p) && is_passable(&*self, p, false))
            .min_by_key(|p| p.range_to(goal))
            .ok_or(ReturnCode::NoPath)?;
        if step.range_to(goal) >= actor.pos.range_to(goal) {
            return Err(ReturnCode::NoPath);
        }
        self.relocate(&actor.id, step.clone());
        self.intents.push(Intent::Move {
            creep: creep.to_string(),
            to: step,
        });
        Ok(())
    }

    fn harvest(&mut self, creep: &str, target: &ObjectId) -> Result<(), ReturnCode> {
        let actor = self.actor(creep)?;
        let node = self.target(target)?;
        let (resource, power) = match node.kind {
            ObjectKind::Source { .. } => (ResourceType::Energy, HARVEST_POWER),
            ObjectKind::Mineral { mineral_type, .. } => (mineral_type, HARVEST_MINERAL_POWER),
            _ => return Err(ReturnCode::InvalidTarget),
        };
        actor.reach(&node, 1)?;
        let work = actor.require(BodyPart::Work)?;
        let available = node.remaining_yield().unwrap_or(0);
        if available == 0 {
            return Err(ReturnCode::NotEnoughResources);
        }
        let wanted = (work * power).min(available);
        let gained = self.store_of(&actor.id)?.add(resource, wanted);
        if let Some(object) = self.objects.get_mut(target) {
            match &mut object.kind {
                ObjectKind::Source { energy, .. } => *energy -= wanted,
                ObjectKind::Mineral { amount, .. } => *amount -= wanted,
                _ => {}
            }
        }
        // Overflow lands on the ground, as on the host.
        if gained < wanted {
            self.drop_on_ground(&actor.pos, resource, wanted - gained);
        }
        self.intents.push(Intent::Harvest {
            creep: creep.to_string(),
            target: target.clone(),
            amount: wanted,
        });
        Ok(())
    }

    fn build(&mut self, creep: &str, site: &ObjectId) -> Result<(), ReturnCode> {
        let actor = self.actor(creep)?;
        let target = self.target(site)?;
        let ObjectKind::ConstructionSite {
            structure_type,
            progress,
            progress_total,
        } = target.kind
        else {
            return Err(ReturnCode::InvalidTarget);
        };
        actor.reach(&target, 3)?;
        let work = actor.require(BodyPart::Work)?;
        let energy = self.store_of(&actor.id)?.energy();
        if energy == 0 {
            return Err(ReturnCode::NotEnoughResources);
        }
        let spent = (work * BUILD_POWER).min(energy).min(progress_total - progress);
        self.store_of(&actor.id)?.remove(ResourceType::Energy, spent);
        let now = progress + spent;
        if now >= progress_total {
            self.objects.remove(site);
            self.add_structure(target.pos.clone(), structure_type, true);
        } else if let Some(ObjectKind::ConstructionSite { progress, .. }) =
            self.objects.get_mut(site).map(|o| &mut o.kind)
        {
            *progress = now;
        }
        self.intents.push(Intent::Build {
            creep: creep.to_string(),
            site: site.clone(),
            progress: now,
        });
        Ok(())
    }

    fn repair(&mut self, creep: &str, target_id: &ObjectId) -> Result<(), ReturnCode> {
        let actor = self.actor(creep)?;
        let target = self.target(target_id)?;
        if target.structure_type().is_none() {
            return Err(ReturnCode::InvalidTarget);
        }
        actor.reach(&target, 3)?;
        let work = actor.require(BodyPart::Work)?;
        let energy = self.store_of(&actor.id)?.energy();
        if energy == 0 {
            return Err(ReturnCode::NotEnoughResources);
        }
        let spent = work.min(energy);
        self.store_of(&actor.id)?.remove(ResourceType::Energy, spent);
        if let Some(object) = self.objects.get_mut(target_id) {
            object.hits = (object.hits + spent * REPAIR_POWER).min(object.hits_max);
        }
        self.intents.push(Intent::Repair {
            creep: creep.to_string(),
            target: target_id.clone(),
        });
        Ok(())
    }

    fn upgrade(&mut self, creep: &str, controller: &ObjectId) -> Result<(), ReturnCode> {
        let actor = self.actor(creep)?;
        let target = self.target(controller)?;
        if !matches!(target.kind, ObjectKind::Controller { .. }) {
            return Err(ReturnCode::InvalidTarget);
        }
        if !target.my {
            return Err(ReturnCode::NotOwner);
        }
        actor.reach(&target, 3)?;
        let work = actor.require(BodyPart::Work)?;
        let energy = self.store_of(&actor.id)?.energy();
        if energy == 0 {
            return Err(ReturnCode::NotEnoughResources);
        }
        let spent = (work * UPGRADE_POWER).min(energy);
        self.store_of(&actor.id)?.remove(ResourceType::Energy, spent);
        if let Some(ObjectKind::Controller {
            level,
            progress,
            progress_total,
            ticks_to_downgrade,
        }) = self.objects.get_mut(controller).map(|o| &mut o.kind)
        {
            *ticks_to_downgrade = CONTROLLER_DOWNGRADE;
            if *level < 8 {
                *progress += spent;
                if *progress >= *progress_total {
                    *progress -= *progress_total;
                    *level += 1;
                    *progress_total = progress_total_for(*level);
                }
            }
        }
        self.intents.push(Intent::Upgrade {
            creep: creep.to_string(),
            controller: controller.clone(),
        });
        Ok(())
    }

    fn transfer(
        &mut self,
        creep: &str,
        target_id: &ObjectId,
        resource: ResourceType,
        amount: Option<u32>,
    ) -> Result<(), ReturnCode> {
        let actor = self.actor(creep)?;
        let target = self.target(target_id)?;
        let free = target.store.as_ref().ok_or(ReturnCode::InvalidTarget)?.free_capacity();
        actor.reach(&target, 1)?;
        let held = self.store_of(&actor.id)?.get(resource);
        if held == 0 || amount.is_some_and(|a| a > held) {
            return Err(ReturnCode::NotEnoughResources);
        }
        if free == 0 || amount.is_some_and(|a| a > free) {
            return Err(ReturnCode::Full);
        }
        let moved = amount.unwrap_or(held.min(free));
        self.store_of(&actor.id)?.remove(resource, moved);
        self.store_of(target_id)?.add(resource, moved);
        self.intents.push(Intent::Transfer {
            creep: creep.to_string(),
            target: target_id.clone(),
            resource,
            amount: moved,
        });
        Ok(())
    }

    fn withdraw(
        &mut self,
        creep: &str,
        target_id: &ObjectId,
        resource: ResourceType,
        amount: Option<u32>,
    ) -> Result<(), ReturnCode> {
        let actor = self.actor(creep)?;
        let target = self.target(target_id)?;
        if target.creep().is_some() {
            return Err(ReturnCode::InvalidTarget);
        }
        let held = target.store.as_ref().ok_or(ReturnCode::InvalidTarget)?.get(resource);
        actor.reach(&target, 1)?;
        if held == 0 || amount.is_some_and(|a| a > held) {
            return Err(ReturnCode::NotEnoughResources);
        }
        let free = self.store_of(&actor.id)?.free_capacity();
        if free == 0 || amount.is_some_and(|a| a > free) {
            return Err(ReturnCode::Full);
        }
        let moved = amount.unwrap_or(held.min(free));
        self.store_of(target_id)?.remove(resource, moved);
        self.store_of(&actor.id)?.add(resource, moved);
        self.intents.push(Intent::Withdraw {
            creep: creep.to_string(),
            target: target_id.clone(),
            resource,
            amount: moved,
        });
        Ok(())
    }

    fn pickup(&mut self, creep: &str, resource_id: &ObjectId) -> Result<(), ReturnCode> {
        let actor = self.actor(creep)?;
        let target = self.target(resource_id)?;
        let ObjectKind::Resource { resource_type, amount } = target.kind else {
            return Err(ReturnCode::InvalidTarget);
        };
        actor.reach(&target, 1)?;
        let gained = self.store_of(&actor.id)?.add(resource_type, amount);
        if gained == 0 {
            return Err(ReturnCode::Full);
        }
        if gained == amount {
            self.objects.remove(resource_id);
        } else if let Some(ObjectKind::Resource { amount, .. }) = self.objects.get_mut(resource_id).map(|o| &mut o.kind) {
            *amount -= gained;
        }
        self.intents.push(Intent::Pickup {
            creep: creep.to_string(),
            target: resource_id.clone(),
            amount: gained,
        });
        Ok(())
    }

    fn drop_resource(&mut self, creep: &str, resource: ResourceType, amount: Option<u32>) -> Result<(), ReturnCode> {
        let actor = self.actor(creep)?;
        let held = self.store_of(&actor.id)?.get(resource);
        if held == 0 || amount.is_some_and(|a| a > held) {
            return Err(ReturnCode::NotEnoughResources);
        }
        let moved = amount.unwrap_or(held);
        self.store_of(&actor.id)?.remove(resource, moved);
        self.drop_on_ground(&actor.pos, resource, moved);
        self.intents.push(Intent::Drop {
            creep: creep.to_string(),
            resource,
            amount: moved,
        });
        Ok(())
    }

    /// Merge into an existing pile of the same resource on `pos`, or start one.
    fn drop_on_ground(&mut self, pos: &Position, resource: ResourceType, amount: u32) {
        let pile = self.objects.values_mut().find_map(|o| match &mut o.kind {
            ObjectKind::Resource {
                resource_type,
                amount: existing,
            } if o.pos == *pos && *resource_type == resource => Some(existing),
            _ => None,
        });
        match pile {
            Some(existing) => *existing += amount,
            None => {
                self.add_dropped(pos.clone(), resource, amount);
            }
        }
    }

    /// Apply damage; destroyed objects are removed.
    fn damage(&mut self, id: &ObjectId, amount: u32) {
        let destroyed = match self.objects.get_mut(id) {
            Some(object) => {
                object.hits = object.hits.saturating_sub(amount);
                object.hits == 0
            }
            None => false,
        };
        if destroyed {
            self.remove_object(id);
        }
    }

    fn heal_hits(&mut self, id: &ObjectId, amount: u32) {
        if let Some(object) = self.objects.get_mut(id) {
            object.hits = (object.hits + amount).min(object.hits_max);
        }
    }

    fn attack(&mut self, creep: &str, target_id: &ObjectId) -> Result<(), ReturnCode> {
        let actor = self.actor(creep)?;
        let target = self.target(target_id)?;
        if target.hits_max == 0 {
            return Err(ReturnCode::InvalidTarget);
        }
        actor.reach(&target, 1)?;
        let parts = actor.require(BodyPart::Attack)?;
        self.damage(target_id, parts * ATTACK_POWER);
        self.intents.push(Intent::Attack {
            creep: creep.to_string(),
            target: target_id.clone(),
        });
        Ok(())
    }

    fn heal(&mut self, creep: &str, target_id: &ObjectId) -> Result<(), ReturnCode> {
        let actor = self.actor(creep)?;
        let target = self.target(target_id)?;
        if target.creep().is_none() {
            return Err(ReturnCode::InvalidTarget);
        }
        actor.reach(&target, 1)?;
        let parts = actor.require(BodyPart::Heal)?;
        self.heal_hits(target_id, parts * HEAL_POWER);
        self.intents.push(Intent::Heal {
            creep: creep.to_string(),
            target: target_id.clone(),
        });
        Ok(())
    }

    /// Common tower checks; charges the energy cost on success.
    fn tower_fire(&mut self, tower: &ObjectId, target: &ObjectId) -> Result<(), ReturnCode> {
        let object = self.target(tower)?;
        if !object.is_structure(StructureType::Tower) {
            return Err(ReturnCode::InvalidTarget);
        }
        if !object.my {
            return Err(ReturnCode::NotOwner);
        }
        if object.stored(ResourceType::Energy) < TOWER_ENERGY_COST {
            return Err(ReturnCode::NotEnoughResources);
        }
        self.target(target)?;
        self.store_of(tower)?.remove(ResourceType::Energy, TOWER_ENERGY_COST);
        Ok(())
    }

    fn spawn(&mut self, spawn: &ObjectId, body: &[BodyPart], name: &str) -> Result<(), ReturnCode> {
        let object = self.target(spawn)?;
        if !object.is_structure(StructureType::Spawn) {
            return Err(ReturnCode::InvalidTarget);
        }
        if !object.my {
            return Err(ReturnCode::NotOwner);
        }
        if body.is_empty() {
            return Err(ReturnCode::InvalidArgs);
        }
        if self.creeps.contains_key(name) {
            return Err(ReturnCode::NameExists);
        }
        if self.busy_spawns.contains(spawn) {
            return Err(ReturnCode::Busy);
        }
        let cost: u32 = body.iter().map(|p| p.cost()).sum();
        let sources = self.spawn_energy_sources(&object.pos.room);
        let available: u32 = sources
            .iter()
            .filter_map(|id| self.objects.get(id))
            .map(|o| o.stored(ResourceType::Energy))
            .sum();
        if available < cost {
            return Err(ReturnCode::NotEnoughResources);
        }
        let mut owed = cost;
        for id in &sources {
            if owed == 0 {
                break;
            }
            owed -= self.store_of(id)?.remove(ResourceType::Energy, owed);
        }

        let at = object
            .pos
            .neighbours()
            .into_iter()
            .find(|p| is_passable(&*self, p, false))
            .unwrap_or_else(|| object.pos.clone());
        let id = self.add_creep(name, at, body);
        if let Some(ObjectKind::Creep(info)) = self.objects.get_mut(&id).map(|o| &mut o.kind) {
            info.spawning = true;
        }
        self.busy_spawns.insert(spawn.clone());
        self.intents.push(Intent::Spawn {
            spawn: spawn.clone(),
            name: name.to_string(),
            body: body.to_vec(),
        });
        Ok(())
    }

    fn place_site(&mut self, pos: &Position, structure_type: StructureType) -> Result<(), ReturnCode> {
        if !self.terrain.contains_key(&pos.room) {
            return Err(ReturnCode::InvalidArgs);
        }
        if !Self::in_bounds(pos) || pos.is_edge() || self.terrain(pos) == Terrain::Wall {
            return Err(ReturnCode::InvalidTarget);
        }
        let occupied = self.objects.values().any(|o| {
            o.pos == *pos
                && (matches!(o.kind, ObjectKind::ConstructionSite { .. })
                    || o.structure_type() == Some(structure_type)
                    || o.structure_type().is_some_and(|t| !t.is_walkable()))
        });
        if occupied {
            return Err(ReturnCode::InvalidTarget);
        }
        self.add_site(pos.clone(), structure_type);
        self.intents.push(Intent::PlaceSite {
            pos: pos.clone(),
            structure_type,
        });
        Ok(())
    }
}

fn store_capacity(structure_type: StructureType) -> Option<u32> {
    match structure_type {
        StructureType::Spawn => Some(SPAWN_CAPACITY),
        StructureType::Extension => Some(50),
        StructureType::Container => Some(2000),
        StructureType::Storage => Some(1_000_000),
        StructureType::Tower => Some(1000),
        StructureType::Link => Some(800),
        _ => None,
    }
}

fn structure_hits(structure_type: StructureType) -> u32 {
    match structure_type {
        StructureType::Spawn => 5000,
        StructureType::Extension => 1000,
        StructureType::Road => 5000,
        StructureType::Wall | StructureType::Rampart => 1,
        StructureType::Container => 250_000,
        StructureType::Storage => 10_000,
        StructureType::Tower => 3000,
        StructureType::Link => 1000,
        StructureType::Controller => 0,
    }
}

fn build_cost(structure_type: StructureType) -> u32 {
    match structure_type {
        StructureType::Spawn => 15_000,
        StructureType::Extension => 3000,
        StructureType::Road => 300,
        StructureType::Wall | StructureType::Rampart => 1,
        StructureType::Container => 5000,
        StructureType::Storage => 30_000,
        StructureType::Tower => 5000,
        StructureType::Link => 5000,
        StructureType::Controller => 0,
    }
}

fn progress_total_for(level: u8) -> u32 {
    match level {
        1..=7 => CONTROLLER_LEVELS[usize::from(level) - 1],
        _ => 0,
    }
}

impl World for Sandbox {
    fn time(&self) -> u64 {
        self.time
    }

    fn object(&self, id: &ObjectId) -> Option<RoomObject> {
        self.objects.get(id).cloned()
    }

    fn owned_rooms(&self) -> Vec<String> {
        let rooms: BTreeSet<String> = self
            .objects
            .values()
            .filter(|o| o.my && o.is_structure(StructureType::Spawn))
            .map(|o| o.pos.room.clone())
            .collect();
        rooms.into_iter().collect()
    }

    fn my_creeps(&self) -> Vec<RoomObject> {
        self.creeps
            .values()
            .filter_map(|id| self.objects.get(id))
            .cloned()
            .collect()
    }

    fn find(&self, room: &str, query: Find) -> Vec<RoomObject> {
        self.objects
            .values()
            .filter(|o| o.pos.room == room)
            .filter(|o| match (&o.kind, query) {
                (ObjectKind::Structure { .. } | ObjectKind::Controller { .. }, Find::Structures) => true,
                (ObjectKind::Source { .. }, Find::Sources) => true,
                (ObjectKind::Mineral { .. }, Find::Minerals) => true,
                (ObjectKind::ConstructionSite { .. }, Find::ConstructionSites) => true,
                (ObjectKind::Resource { .. }, Find::DroppedResources) => true,
                (ObjectKind::Creep(_), Find::MyCreeps) => o.my,
                (ObjectKind::Creep(_), Find::HostileCreeps) => !o.my,
                _ => false,
            })
            .cloned()
            .collect()
    }

    fn terrain(&self, pos: &Position) -> Terrain {
        if !Self::in_bounds(pos) {
            return Terrain::Wall;
        }
        self.terrain
            .get(&pos.room)
            .and_then(|tiles| tiles.get(&(pos.x, pos.y)))
            .copied()
            .unwrap_or_default()
    }

    fn structures_at(&self, pos: &Position) -> Vec<RoomObject> {
        self.objects
            .values()
            .filter(|o| o.pos == *pos && o.structure_type().is_some())
            .cloned()
            .collect()
    }

    fn creeps_at(&self, pos: &Position) -> Vec<RoomObject> {
        self.objects
            .values()
            .filter(|o| o.pos == *pos && o.creep().is_some())
            .cloned()
            .collect()
    }

    fn creep_move(&mut self, creep: &str, direction: Direction) -> ReturnCode {
        outcome(self.move_creep(creep, direction))
    }

    fn creep_move_to(&mut self, creep: &str, goal: &Position, opts: &MoveOpts) -> ReturnCode {
        outcome(self.move_creep_to(creep, goal, opts))
    }

    fn creep_harvest(&mut self, creep: &str, target: &ObjectId) -> ReturnCode {
        outcome(self.harvest(creep, target))
    }

    fn creep_build(&mut self, creep: &str, site: &ObjectId) -> ReturnCode {
        outcome(self.build(creep, site))
    }

    fn creep_repair(&mut self, creep: &str, target: &ObjectId) -> ReturnCode {
        outcome(self.repair(creep, target))
    }

    fn creep_upgrade_controller(&mut self, creep: &str, controller: &ObjectId) -> ReturnCode {
        outcome(self.upgrade(creep, controller))
    }

    fn creep_transfer(
        &mut self,
        creep: &str,
        target: &ObjectId,
        resource: ResourceType,
        amount: Option<u32>,
    ) -> ReturnCode {
        outcome(self.transfer(creep, target, resource, amount))
    }

    fn creep_withdraw(
        &mut self,
        creep: &str,
        target: &ObjectId,
        resource: ResourceType,
        amount: Option<u32>,
    ) -> ReturnCode {
        outcome(self.withdraw(creep, target, resource, amount))
    }

    fn creep_pickup(&mut self, creep: &str, resource: &ObjectId) -> ReturnCode {
        outcome(self.pickup(creep, resource))
    }

    fn creep_drop(&mut self, creep: &str, resource: ResourceType, amount: Option<u32>) -> ReturnCode {
        outcome(self.drop_resource(creep, resource, amount))
    }

    fn creep_attack(&mut self, creep: &str, target: &ObjectId) -> ReturnCode {
        outcome(self.attack(creep, target))
    }

    fn creep_heal(&mut self, creep: &str, target: &ObjectId) -> ReturnCode {
        outcome(self.heal(creep, target))
    }

    fn creep_say(&mut self, creep: &str, message: &str) -> ReturnCode {
        outcome(self.actor(creep).map(|_| {
            self.intents.push(Intent::Say {
                creep: creep.to_string(),
                message: message.to_string(),
            });
        }))
    }

    fn tower_attack(&mut self, tower: &ObjectId, target: &ObjectId) -> ReturnCode {
        let result = self.tower_fire(tower, target).map(|()| {
            self.damage(target, TOWER_ATTACK);
            self.intents.push(Intent::TowerAttack {
                tower: tower.clone(),
                target: target.clone(),
            });
        });
        outcome(result)
    }

    fn tower_heal(&mut self, tower: &ObjectId, target: &ObjectId) -> ReturnCode {
        let result = self.tower_fire(tower, target).map(|()| {
            self.heal_hits(target, TOWER_HEAL);
            self.intents.push(Intent::TowerHeal {
                tower: tower.clone(),
                target: target.clone(),
            });
        });
        outcome(result)
    }

    fn tower_repair(&mut self, tower: &ObjectId, target: &ObjectId) -> ReturnCode {
        let result = self.tower_fire(tower, target).map(|()| {
            self.heal_hits(target, TOWER_REPAIR);
            self.intents.push(Intent::TowerRepair {
                tower: tower.clone(),
                target: target.clone(),
            });
        });
        outcome(result)
    }

    fn spawn_creep(&mut self, spawn: &ObjectId, body: &[BodyPart], name: &str) -> ReturnCode {
        outcome(self.spawn(spawn, body, name))
    }

    fn create_construction_site(&mut self, pos: &Position, structure_type: StructureType) -> ReturnCode {
        outcome(self.place_site(pos, structure_type))
    }
}

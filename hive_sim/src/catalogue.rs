// The closed set of task kinds.
//
// `TaskKind` enumerates every behaviour a drone can persist, and this file
// holds everything that differs between kinds: the type tag, the `TaskSpec`
// (range / work-off-road / one-shot), owner and target preconditions, and the
// single action `work` performs. Dispatch is a `match`; adding a kind means
// adding a variant, a tag, and an arm in each function below, plus a
// registration in `TaskRegistry::standard`.
//
// | kind     | range | off-road | one-shot | owner needs            | target needs            |
// |----------|-------|----------|----------|------------------------|-------------------------|
// | harvest  | 1     |          |          | free capacity          | yield > 0               |
// | build    | 3     | yes      |          | energy                 | own site, unfinished    |
// | repair   | 3     |          |          | energy                 | hits < max              |
// | upgrade  | 3     | yes      |          | energy                 | own controller          |
// | transfer | 1     |          | yes      | >= amount of resource  | free capacity > amount  |
// | withdraw | 1     |          | yes      | free capacity >= amount| holds > amount          |
// | pickup   | 1     |          |          | free capacity          | amount > 0              |
// | drop     | 1     |          | yes      | >= amount of resource  | (position)              |
// | goto     | 1     |          |          | not yet in range       | (position)              |
// | INVALID  |       |          |          | never                  | never                   |
//
// See also: `task.rs` for the kind-independent contract.

use crate::drone::Drone;
use crate::object::{ObjectKind, RoomObject};
use crate::target::TargetHandle;
use crate::task::{Task, TaskSpec};
use crate::types::{Position, ResourceType, ReturnCode};
use crate::world::{MoveOpts, World};

/// Every persisted task kind, plus the `Invalid` sentinel for unknown tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Harvest,
    Build,
    Repair,
    Upgrade,
    Transfer,
    Withdraw,
    Pickup,
    Drop,
    GoTo,
    Invalid,
}

/// A resolved task target.
#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    Object(RoomObject),
    Position(Position),
}

impl TaskKind {
    /// The nine kinds with a registered constructor.
    pub const STANDARD: [TaskKind; 9] = [
        TaskKind::Harvest,
        TaskKind::Build,
        TaskKind::Repair,
        TaskKind::Upgrade,
        TaskKind::Transfer,
        TaskKind::Withdraw,
        TaskKind::Pickup,
        TaskKind::Drop,
        TaskKind::GoTo,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            TaskKind::Harvest => "harvest",
            TaskKind::Build => "build",
            TaskKind::Repair => "repair",
            TaskKind::Upgrade => "upgrade",
            TaskKind::Transfer => "transfer",
            TaskKind::Withdraw => "withdraw",
            TaskKind::Pickup => "pickup",
            TaskKind::Drop => "drop",
            TaskKind::GoTo => "goto",
            TaskKind::Invalid => "INVALID",
        }
    }

    pub fn spec(self) -> TaskSpec {
        let base = TaskSpec::default();
        match self {
            TaskKind::Build | TaskKind::Upgrade => TaskSpec {
                range: 3,
                work_off_road: true,
                ..base
            },
            TaskKind::Repair => TaskSpec { range: 3, ..base },
            TaskKind::Transfer | TaskKind::Withdraw | TaskKind::Drop => TaskSpec {
                one_shot: true,
                ..base
            },
            _ => base,
        }
    }

    /// Kinds whose target is a bare tile rather than an object.
    pub fn targets_position(self) -> bool {
        matches!(self, TaskKind::Drop | TaskKind::GoTo)
    }

    pub(crate) fn is_valid_task(self, task: &Task, drone: &Drone) -> bool {
        match self {
            TaskKind::Harvest | TaskKind::Pickup => drone.store.free_capacity() > 0,
            TaskKind::Build | TaskKind::Repair | TaskKind::Upgrade => drone.store.energy() > 0,
            TaskKind::Transfer | TaskKind::Drop => {
                drone.store.get(task.data.resource()) >= task.data.min_amount()
            }
            TaskKind::Withdraw => drone.store.free_capacity() >= task.data.min_amount(),
            TaskKind::GoTo => !drone
                .pos
                .in_range_to(&task.target_handle().pos, task.spec().range),
            TaskKind::Invalid => false,
        }
    }

    pub(crate) fn is_valid_target(self, task: &Task, target: &Target) -> bool {
        let object = match target {
            Target::Position(_) => return self.targets_position(),
            Target::Object(object) => object,
        };
        match self {
            TaskKind::Harvest => object.remaining_yield().is_some_and(|y| y > 0),
            TaskKind::Build => match object.kind {
                ObjectKind::ConstructionSite {
                    progress,
                    progress_total,
                    ..
                } => object.my && progress < progress_total,
                _ => false,
            },
            TaskKind::Repair => object.is_damaged(),
            TaskKind::Upgrade => matches!(object.kind, ObjectKind::Controller { .. }) && object.my,
            TaskKind::Transfer => object.store.is_some() && object.free_capacity() > task.data.min_amount(),
            TaskKind::Withdraw => object.stored(task.data.resource()) > task.data.min_amount(),
            TaskKind::Pickup => matches!(object.kind, ObjectKind::Resource { amount, .. } if amount > 0),
            TaskKind::Drop | TaskKind::GoTo | TaskKind::Invalid => false,
        }
    }

    pub(crate) fn work(self, task: &Task, drone: &Drone, world: &mut dyn World) -> ReturnCode {
        let id = &task.target_handle().id;
        let data = &task.data;
        match self {
            TaskKind::Harvest => drone.harvest(world, id),
            TaskKind::Build => drone.build(world, id),
            TaskKind::Repair => drone.repair(world, id),
            TaskKind::Upgrade => drone.upgrade_controller(world, id),
            TaskKind::Transfer => drone.transfer(world, id, data.resource(), data.amount),
            TaskKind::Withdraw => drone.withdraw(world, id, data.resource(), data.amount),
            TaskKind::Pickup => drone.pickup(world, id),
            TaskKind::Drop => drone.drop(world, data.resource(), data.amount),
            TaskKind::GoTo => drone.move_to(world, &task.target_handle().pos, &MoveOpts::default()),
            TaskKind::Invalid => ReturnCode::Ok,
        }
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

impl Task {
    /// Mine a source or mineral until full.
    pub fn harvest(target: &RoomObject, tick: u64) -> Task {
        Task::new(TaskKind::Harvest, TargetHandle::of(target), tick)
    }

    pub fn build(site: &RoomObject, tick: u64) -> Task {
        Task::new(TaskKind::Build, TargetHandle::of(site), tick)
    }

    pub fn repair(target: &RoomObject, tick: u64) -> Task {
        Task::new(TaskKind::Repair, TargetHandle::of(target), tick)
    }

    pub fn upgrade(controller: &RoomObject, tick: u64) -> Task {
        Task::new(TaskKind::Upgrade, TargetHandle::of(controller), tick)
    }

    /// Hand energy to `target`. See `with_resource` for other resources or a
    /// fixed amount.
    pub fn transfer(target: &RoomObject, tick: u64) -> Task {
        Task::new(TaskKind::Transfer, TargetHandle::of(target), tick).with_resource(ResourceType::Energy, None)
    }

    pub fn withdraw(target: &RoomObject, tick: u64) -> Task {
        Task::new(TaskKind::Withdraw, TargetHandle::of(target), tick).with_resource(ResourceType::Energy, None)
    }

    pub fn pickup(resource: &RoomObject, tick: u64) -> Task {
        Task::new(TaskKind::Pickup, TargetHandle::of(resource), tick)
    }

    /// Drop carried energy on the owner's tile once next to `pos`.
    pub fn drop_at(pos: Position, tick: u64) -> Task {
        Task::new(TaskKind::Drop, TargetHandle::at(pos), tick).with_resource(ResourceType::Energy, None)
    }

    pub fn go_to(pos: Position, tick: u64) -> Task {
        Task::new(TaskKind::GoTo, TargetHandle::at(pos), tick)
    }

    /// Set the resource (and optionally a fixed amount) moved by
    /// transfer / withdraw / drop.
    pub fn with_resource(mut self, resource: ResourceType, amount: Option<u32>) -> Self {
        self.data.resource_type = Some(resource);
        self.data.amount = amount;
        self
    }
}

// The task state machine.
//
// A `Task` is one unit of drone behaviour bound to a target and an owner:
// "harvest this source", "transfer energy into that spawn", "go to this tile".
// Tasks do not live in RAM between ticks. The owning drone's durable record
// holds a `TaskDescriptor` (the wire shape), and every tick the registry
// rehydrates it into a `Task`, which checks its preconditions, acts once, and
// either stays put or finishes. Finishing hands control back to the parent
// descriptor nested inside it (or leaves the drone idle).
//
// Lifecycle of one task: pending (assigned, moving toward its target) ->
// executing (in range, calling `work` each tick) -> finished (descriptor
// replaced by its parent). Persistence across ticks is the only suspension
// mechanism; there is no blocking and no timeout.
//
// Behaviour per kind (range, preconditions, the action itself) lives in
// `catalogue.rs`. This file holds the kind-independent contract: validity
// with parent fallback, run/move/finish, fork, and (de)hydration.
//
// See also: `registry.rs` for tag -> constructor lookup, `memory.rs` for the
// record that stores descriptors, `drone.rs` for the primitives tasks call.
//
// **Critical constraint: determinism.** A task's decisions read only the
// world snapshot, durable memory, and its own descriptor.

use crate::catalogue::{Target, TaskKind};
use crate::drone::Drone;
use crate::game::Game;
use crate::object::RoomObject;
use crate::target::TargetHandle;
use crate::types::{Position, ResourceType, ReturnCode};
use crate::world::{MoveOpts, World};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// Name of the drone a task belongs to. Empty until the task is assigned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroneRef {
    pub name: String,
}

/// Caller-supplied movement options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskOpts {
    pub blind: bool,
    /// Where to step after the task finishes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_pos: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_opts: Option<MoveOpts>,
}

/// Per-task data. Unknown keys are preserved verbatim in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskData {
    pub quiet: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_energy: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for TaskData {
    fn default() -> Self {
        Self {
            quiet: true,
            resource_type: None,
            amount: None,
            signature: None,
            skip_energy: None,
            extra: BTreeMap::new(),
        }
    }
}

impl TaskData {
    /// Resource the task moves; energy unless set.
    pub fn resource(&self) -> ResourceType {
        self.resource_type.unwrap_or_default()
    }

    /// Amount used by precondition checks; 1 unless set (or set to 0).
    pub fn min_amount(&self) -> u32 {
        match self.amount {
            Some(n) if n > 0 => n,
            _ => 1,
        }
    }
}

/// Durable form of a task, stored in the owner's memory record.
///
/// `parent` nests the suspended task this one was forked from. The chain is
/// finite but not depth-capped: every `fork` adds one link.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub name: String,
    pub drone: DroneRef,
    pub target: TargetHandle,
    #[serde(default)]
    pub parent: Option<Box<TaskDescriptor>>,
    #[serde(default)]
    pub opts: TaskOpts,
    #[serde(default)]
    pub data: TaskData,
    pub tick: u64,
}

impl TaskDescriptor {
    /// Length of the parent chain, this descriptor included.
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.depth())
    }
}

/// Behavioural constants of a kind. Recomputed from the kind, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskSpec {
    /// The owner must be within this range of the target to `work`.
    pub range: u32,
    /// Step off roads before working so traffic can pass.
    pub work_off_road: bool,
    /// Finish immediately after the first successful `work`.
    pub one_shot: bool,
}

impl Default for TaskSpec {
    fn default() -> Self {
        Self {
            range: 1,
            work_off_road: false,
            one_shot: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A live, rehydrated task. Build one with the per-kind constructors in
/// `catalogue.rs` (`Task::harvest`, `Task::transfer`, ...) or with
/// `TaskRegistry::instantiate`.
#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    kind: TaskKind,
    /// Persisted type tag. The kind's own tag unless rehydrated from a custom
    /// registration.
    tag: String,
    spec: TaskSpec,
    drone: DroneRef,
    target: TargetHandle,
    parent: Option<Box<TaskDescriptor>>,
    pub opts: TaskOpts,
    pub data: TaskData,
    /// Tick the task was created on.
    pub tick: u64,
}

impl Task {
    pub fn new(kind: TaskKind, target: TargetHandle, tick: u64) -> Self {
        Self {
            kind,
            tag: kind.tag().to_string(),
            spec: kind.spec(),
            drone: DroneRef::default(),
            target,
            parent: None,
            opts: TaskOpts::default(),
            data: TaskData::default(),
            tick,
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// The type tag this task persists under.
    pub fn name(&self) -> &str {
        &self.tag
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn target_handle(&self) -> &TargetHandle {
        &self.target
    }

    pub fn drone_name(&self) -> &str {
        &self.drone.name
    }

    pub(crate) fn set_drone(&mut self, name: &str) {
        self.drone.name = name.to_string();
    }

    pub fn parent_descriptor(&self) -> Option<&TaskDescriptor> {
        self.parent.as_deref()
    }

    pub fn with_opts(mut self, opts: TaskOpts) -> Self {
        self.opts = opts;
        self
    }

    pub fn with_next_pos(mut self, pos: Position) -> Self {
        self.opts.next_pos = Some(pos);
        self
    }

    // -- Persistence --------------------------------------------------------

    /// Snapshot for durable storage.
    pub fn descriptor(&self) -> TaskDescriptor {
        TaskDescriptor {
            name: self.name().to_string(),
            drone: self.drone.clone(),
            target: self.target.clone(),
            parent: self.parent.clone(),
            opts: self.opts.clone(),
            data: self.data.clone(),
            tick: self.tick,
        }
    }

    pub(crate) fn set_tag(&mut self, tag: &str) {
        self.tag = tag.to_string();
    }

    /// Overwrite every persisted field from `desc`. Kind, tag and `TaskSpec`
    /// stay as constructed.
    pub(crate) fn restore(&mut self, desc: &TaskDescriptor) {
        self.drone = desc.drone.clone();
        self.target = desc.target.clone();
        self.parent = desc.parent.clone();
        self.opts = desc.opts.clone();
        self.data = desc.data.clone();
        self.tick = desc.tick;
    }

    // -- Accessors over the world -------------------------------------------

    /// What the task acts on, if it still exists. Position-only kinds resolve
    /// whenever the handle carries a real tile.
    pub fn target(&self, world: &dyn World) -> Option<Target> {
        if self.kind.targets_position() {
            return self
                .target
                .pos
                .is_real()
                .then(|| Target::Position(self.target.pos.clone()));
        }
        self.target.resolve(world).map(Target::Object)
    }

    /// Live target object, for kinds that target one.
    pub fn target_object(&self, world: &dyn World) -> Option<RoomObject> {
        match self.target(world)? {
            Target::Object(object) => Some(object),
            Target::Position(_) => None,
        }
    }

    /// Target position, refreshed from the live object when it resolves.
    pub fn target_pos(&mut self, world: &dyn World) -> Position {
        if !self.kind.targets_position() {
            self.target.refresh(world);
        }
        self.target.pos.clone()
    }

    /// The owning drone from this tick's drone registry.
    pub fn owner<'g>(&self, game: &'g Game<'_>) -> Option<&'g Drone> {
        game.drones.get(&self.drone.name)
    }

    /// Rehydrate the parent descriptor.
    pub fn parent(&self, game: &Game<'_>) -> Option<Task> {
        let desc = self.parent.as_deref()?;
        Some(game.registry.instantiate(desc, &*game.world))
    }

    /// Replace the parent link. When the owner resolves, the updated task is
    /// written back as its active task.
    pub fn set_parent(&mut self, parent: Option<&Task>, game: &mut Game<'_>) {
        self.parent = parent.map(|p| Box::new(p.descriptor()));
        if self.owner(game).is_some() {
            game.memory.set_task(&self.drone.name, Some(self.descriptor()));
        }
    }

    /// Suspend this task under `child`: `child` gets this task as its parent
    /// and becomes the owner's active task. Returns the child as assigned.
    pub fn fork(&self, mut child: Task, game: &mut Game<'_>) -> Task {
        child.set_parent(Some(self), game);
        if self.owner(game).is_some() {
            child.set_drone(&self.drone.name);
            game.memory.set_task(&self.drone.name, Some(child.descriptor()));
        }
        child
    }

    // -- Contract -----------------------------------------------------------

    /// Owner-side preconditions of this kind.
    pub fn is_valid_task(&self, game: &Game<'_>) -> bool {
        self.owner(game)
            .is_some_and(|drone| self.kind.is_valid_task(self, drone))
    }

    /// Target-side preconditions of this kind.
    pub fn is_valid_target(&self, game: &Game<'_>) -> bool {
        self.target(&*game.world)
            .is_some_and(|target| self.kind.is_valid_target(self, &target))
    }

    /// True when both sides hold. Otherwise the task finishes and the answer
    /// falls through to the parent chain (false at its end).
    pub fn is_valid(&mut self, game: &mut Game<'_>) -> bool {
        if self.is_valid_task(game) && self.is_valid_target(game) {
            return true;
        }
        debug!(
            task = self.name(),
            drone = %self.drone.name,
            target = %self.target.id,
            "task no longer valid"
        );
        self.finish(game);
        match self.parent(game) {
            Some(mut parent) => parent.is_valid(game),
            None => false,
        }
    }

    /// One step: act when in range (and off the room edge), else approach.
    /// Returns the action result, or `None` when the owner only moved (or
    /// does not exist).
    pub fn run(&mut self, game: &mut Game<'_>) -> Option<ReturnCode> {
        let Some(pos) = self.owner(game).map(|d| d.pos.clone()) else {
            warn!(task = self.name(), drone = %self.drone.name, "no drone executing task");
            return None;
        };
        let target_pos = self.target_pos(&*game.world);
        if pos.in_range_to(&target_pos, self.spec.range) && !pos.is_edge() {
            if self.spec.work_off_road {
                if let Some(drone) = game.drones.get(&self.drone.name) {
                    drone.park(&mut *game.world, &target_pos, true);
                }
            }
            let result = self.work(game);
            if self.spec.one_shot && result.is_ok() {
                self.finish(game);
            }
            Some(result)
        } else {
            self.move_to_target(game);
            None
        }
    }

    /// The kind's single world-affecting action.
    pub fn work(&self, game: &mut Game<'_>) -> ReturnCode {
        let Some(drone) = game.drones.get(&self.drone.name) else {
            return ReturnCode::NotFound;
        };
        self.kind.work(self, drone, &mut *game.world)
    }

    /// Move toward the cached target position. `move_opts.range` defaults to
    /// the kind's range.
    pub fn move_to_target(&self, game: &mut Game<'_>) -> ReturnCode {
        let mut opts = self.opts.move_opts.clone().unwrap_or_default();
        opts.range.get_or_insert(self.spec.range);
        let Some(drone) = game.drones.get(&self.drone.name) else {
            return ReturnCode::NotFound;
        };
        drone.move_to(&mut *game.world, &self.target.pos, &opts)
    }

    pub fn move_to_next_pos(&self, game: &mut Game<'_>) -> Option<ReturnCode> {
        let next = self.opts.next_pos.as_ref()?;
        let drone = game.drones.get(&self.drone.name)?;
        Some(drone.move_to(&mut *game.world, next, &MoveOpts::default()))
    }

    /// Step to `next_pos` if set, then hand the owner back to the parent task
    /// (or leave it idle).
    pub fn finish(&mut self, game: &mut Game<'_>) {
        self.move_to_next_pos(game);
        if self.owner(game).is_none() {
            warn!(task = self.name(), drone = %self.drone.name, "no drone executing task");
            return;
        }
        let parent = self.parent(game).map(|p| p.descriptor());
        debug!(
            task = self.name(),
            drone = %self.drone.name,
            resumes = parent.as_ref().map_or("idle", |p| p.name.as_str()),
            "task finished"
        );
        game.memory.set_task(&self.drone.name, parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectId;

    fn sample() -> Task {
        let target = TargetHandle {
            id: ObjectId::new("src1"),
            pos: Position::new(12, 30, "W1N1"),
        };
        let mut task = Task::new(TaskKind::Harvest, target, 77);
        task.set_drone("miner_5");
        task.opts.next_pos = Some(Position::new(11, 30, "W1N1"));
        task.data.extra.insert("custom".into(), Value::from(3));
        task
    }

    #[test]
    fn new_task_defaults() {
        let task = Task::new(TaskKind::Harvest, TargetHandle::empty(), 5);
        assert_eq!(task.name(), "harvest");
        assert_eq!(*task.spec(), TaskSpec::default());
        assert!(task.data.quiet);
        assert!(!task.opts.blind);
        assert!(task.parent_descriptor().is_none());
        assert_eq!(task.tick, 5);
        assert_eq!(task.target_handle().pos, Position::empty());
    }

    #[test]
    fn descriptor_json_roundtrip() {
        let mut child = Task::new(
            TaskKind::GoTo,
            TargetHandle::at(Position::new(3, 3, "W1N1")),
            80,
        );
        child.parent = Some(Box::new(sample().descriptor()));
        let desc = child.descriptor();

        let json = serde_json::to_string(&desc).unwrap();
        let back: TaskDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
        assert_eq!(back.depth(), 2);
        assert_eq!(back.parent.unwrap().data.extra["custom"], Value::from(3));
    }

    #[test]
    fn data_defaults_when_absent() {
        let json = r#"{"name":"pickup","drone":{"name":"h"},"target":{"id":"r1","pos":{"x":1,"y":2,"room":"W1N1"}},"tick":4}"#;
        let desc: TaskDescriptor = serde_json::from_str(json).unwrap();
        assert!(desc.data.quiet);
        assert!(desc.parent.is_none());
        assert_eq!(desc.opts, TaskOpts::default());
    }

    #[test]
    fn min_amount_defaults_to_one() {
        let mut data = TaskData::default();
        assert_eq!(data.min_amount(), 1);
        data.amount = Some(0);
        assert_eq!(data.min_amount(), 1);
        data.amount = Some(40);
        assert_eq!(data.min_amount(), 40);
        assert_eq!(data.resource(), ResourceType::Energy);
    }
}

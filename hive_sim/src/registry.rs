// Tag -> constructor lookup and task rehydration.
//
// `TaskRegistry` maps each persisted type tag to a constructor. `instantiate`
// turns a `TaskDescriptor` read from memory back into a live `Task`: resolve
// the stored target, construct the kind for the tag, then overwrite every
// persisted field from the descriptor. A tag with no constructor is logged and
// rehydrated as the `Invalid` sentinel, whose preconditions never hold, so
// the owner falls back to the parent task (or goes idle) on its next
// validity check instead of breaking the tick.
//
// The registry is built once (`TaskRegistry::standard()`) and shared
// read-only by every tick.

use crate::catalogue::TaskKind;
use crate::object::RoomObject;
use crate::target::TargetHandle;
use crate::task::{Task, TaskDescriptor};
use crate::world::World;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Builds a fresh task of one kind from its (possibly unresolved) target.
pub type TaskConstructor = fn(target: Option<&RoomObject>, handle: &TargetHandle, tick: u64) -> Task;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("task type {0:?} is already registered")]
    AlreadyRegistered(String),
}

#[derive(Clone, Default)]
pub struct TaskRegistry {
    constructors: BTreeMap<String, TaskConstructor>,
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.constructors.keys()).finish()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a constructor for every standard kind.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for kind in TaskKind::STANDARD {
            registry.constructors.insert(kind.tag().to_string(), constructor_for(kind));
        }
        registry
    }

    pub fn register(&mut self, tag: &str, constructor: TaskConstructor) -> Result<(), RegistryError> {
        if self.constructors.contains_key(tag) {
            return Err(RegistryError::AlreadyRegistered(tag.to_string()));
        }
        self.constructors.insert(tag.to_string(), constructor);
        Ok(())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Registered tags in sorted order.
    pub fn registered_types(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Rehydrate a persisted task.
    pub fn instantiate(&self, desc: &TaskDescriptor, world: &dyn World) -> Task {
        let live = desc.target.resolve(world);
        let mut task = match self.constructors.get(&desc.name) {
            Some(construct) => {
                let mut task = construct(live.as_ref(), &desc.target, desc.tick);
                task.set_tag(&desc.name);
                task
            }
            None => {
                warn!(
                    task = %desc.name,
                    drone = %desc.drone.name,
                    "unknown task type; replacing with INVALID"
                );
                Task::new(TaskKind::Invalid, desc.target.clone(), desc.tick)
            }
        };
        task.restore(desc);
        task
    }
}

/// Constructor of a standard kind: the handle of the live target when it
/// resolves, the stored handle otherwise.
fn constructor_for(kind: TaskKind) -> TaskConstructor {
    match kind {
        TaskKind::Harvest => |t, h, tick| Task::new(TaskKind::Harvest, handle(t, h), tick),
        TaskKind::Build => |t, h, tick| Task::new(TaskKind::Build, handle(t, h), tick),
        TaskKind::Repair => |t, h, tick| Task::new(TaskKind::Repair, handle(t, h), tick),
        TaskKind::Upgrade => |t, h, tick| Task::new(TaskKind::Upgrade, handle(t, h), tick),
        TaskKind::Transfer => |t, h, tick| Task::new(TaskKind::Transfer, handle(t, h), tick),
        TaskKind::Withdraw => |t, h, tick| Task::new(TaskKind::Withdraw, handle(t, h), tick),
        TaskKind::Pickup => |t, h, tick| Task::new(TaskKind::Pickup, handle(t, h), tick),
        TaskKind::Drop => |_, h, tick| Task::drop_at(h.pos.clone(), tick),
        TaskKind::GoTo => |_, h, tick| Task::go_to(h.pos.clone(), tick),
        TaskKind::Invalid => |_, h, tick| Task::new(TaskKind::Invalid, h.clone(), tick),
    }
}

fn handle(target: Option<&RoomObject>, stored: &TargetHandle) -> TargetHandle {
    target.map_or_else(|| stored.clone(), TargetHandle::of)
}

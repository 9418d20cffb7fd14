// Durable memory: the only state that survives between ticks.
//
// The host persists one `Memory` value (as JSON) across ticks. It holds a
// record per unit (`CreepMemory`: colony, assignment, role, active task
// descriptor) and a record per colony (`ColonyMemory`: cached maturity level
// plus free-form fields this controller does not interpret). Everything else
// (drones, colonies, indices) is rebuilt from the world each tick.
//
// A unit's record holds at most one active task descriptor; the descriptor's
// own `parent` chain is the only place suspended tasks live. Replacing
// `CreepMemory::task` is the only way to change what a unit does.
//
// See also: `task.rs` for `TaskDescriptor`, `game.rs` for the tick driver
// that formats and cleans this store before each pass.

use crate::task::TaskDescriptor;
use crate::types::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Errors encoding or decoding the durable store.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("failed to decode memory: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode memory: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Behavioural category of a unit, stored as a plain string. Roles this
/// controller does not know are kept verbatim in `Other` and left alone by
/// the decision engine.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Miner,
    Hauler,
    Worker,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Miner => "miner",
            Role::Hauler => "hauler",
            Role::Worker => "worker",
            Role::Other(name) => name,
        }
    }

    /// Role of a unit with no durable record.
    pub fn unassigned() -> Role {
        Role::Other(String::new())
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        match name.as_str() {
            "miner" => Role::Miner,
            "hauler" => Role::Hauler,
            "worker" => Role::Worker,
            _ => Role::Other(name),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable record of one unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreepMemory {
    pub colony: String,
    /// Object this unit is dedicated to (a source for miners, the controller
    /// for workers). Empty when unassigned.
    #[serde(default)]
    pub assignment: ObjectId,
    pub role: Role,
    #[serde(default)]
    pub task: Option<TaskDescriptor>,
}

impl CreepMemory {
    pub fn new(colony: impl Into<String>, role: Role, assignment: Option<ObjectId>) -> Self {
        Self {
            colony: colony.into(),
            assignment: assignment.unwrap_or_default(),
            role,
            task: None,
        }
    }
}

/// Durable record of one colony. Unknown keys round-trip untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColonyMemory {
    /// Cached maturity level; 0 means "not yet evaluated".
    #[serde(default)]
    pub level: u8,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The whole durable store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    #[serde(default)]
    pub creeps: BTreeMap<String, CreepMemory>,
    #[serde(default)]
    pub colonies: BTreeMap<String, ColonyMemory>,
}

impl Memory {
    pub fn to_json(&self) -> Result<String, MemoryError> {
        serde_json::to_string(self).map_err(MemoryError::Encode)
    }

    pub fn to_json_pretty(&self) -> Result<String, MemoryError> {
        serde_json::to_string_pretty(self).map_err(MemoryError::Encode)
    }

    /// Decode a stored memory blob. An empty string is a fresh store.
    pub fn from_json(json: &str) -> Result<Self, MemoryError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(MemoryError::Decode)
    }

    /// Drop records of units that no longer exist. Returns the removed names.
    pub fn clean(&mut self, live: &BTreeSet<String>) -> Vec<String> {
        let dead: Vec<String> = self
            .creeps
            .keys()
            .filter(|name| !live.contains(*name))
            .cloned()
            .collect();
        for name in &dead {
            self.creeps.remove(name);
        }
        dead
    }

    /// Colony record, created with level 0 on first access.
    pub fn colony_mut(&mut self, name: &str) -> &mut ColonyMemory {
        self.colonies.entry(name.to_string()).or_default()
    }

    pub fn task_of(&self, creep: &str) -> Option<&TaskDescriptor> {
        self.creeps.get(creep).and_then(|m| m.task.as_ref())
    }

    /// Replace a unit's active task. The descriptor's owner is rewritten to
    /// `creep`. Returns false (and stores nothing) when the unit has no
    /// record.
    pub fn set_task(&mut self, creep: &str, task: Option<TaskDescriptor>) -> bool {
        let Some(record) = self.creeps.get_mut(creep) else {
            return false;
        };
        record.task = task.map(|mut desc| {
            desc.drone.name = creep.to_string();
            desc
        });
        true
    }
}

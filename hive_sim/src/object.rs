// Snapshots of live host objects.
//
// The host hands the controller `RoomObject` values: a read-only copy of one
// object's state at the moment of the query. Snapshots are never written back;
// every change to the world goes through a `World` action. A snapshot taken
// before an action is stale after it, which is why tasks re-resolve their
// target each tick instead of caching the object.
//
// See also: `world.rs` for the trait that produces these snapshots,
// `target.rs` for the persistence-safe handle that points at one.

use crate::types::{BodyPart, ObjectId, Position, ResourceType, Store, StructureType};
use serde::{Deserialize, Serialize};

/// One live object as seen at query time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomObject {
    pub id: ObjectId,
    pub pos: Position,
    pub kind: ObjectKind,
    /// Owned by this player. Sources, minerals and dropped resources are
    /// never owned.
    pub my: bool,
    pub hits: u32,
    pub hits_max: u32,
    /// Present for store-bearing objects (units, spawns, containers, ...).
    pub store: Option<Store>,
}

/// Kind-specific state of a `RoomObject`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    Source {
        energy: u32,
        energy_capacity: u32,
    },
    Mineral {
        mineral_type: ResourceType,
        amount: u32,
    },
    Structure {
        structure_type: StructureType,
    },
    Controller {
        level: u8,
        progress: u32,
        progress_total: u32,
        ticks_to_downgrade: u32,
    },
    ConstructionSite {
        structure_type: StructureType,
        progress: u32,
        progress_total: u32,
    },
    Resource {
        resource_type: ResourceType,
        amount: u32,
    },
    Creep(CreepInfo),
}

/// Unit-specific fields of a creep snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreepInfo {
    pub name: String,
    pub body: Vec<BodyPart>,
    pub fatigue: u32,
    pub spawning: bool,
    pub ticks_to_live: Option<u32>,
}

impl RoomObject {
    /// Structure type for structures and the controller; `None` otherwise.
    pub fn structure_type(&self) -> Option<StructureType> {
        match &self.kind {
            ObjectKind::Structure { structure_type } => Some(*structure_type),
            ObjectKind::Controller { .. } => Some(StructureType::Controller),
            _ => None,
        }
    }

    pub fn is_structure(&self, structure_type: StructureType) -> bool {
        self.structure_type() == Some(structure_type)
    }

    pub fn creep(&self) -> Option<&CreepInfo> {
        match &self.kind {
            ObjectKind::Creep(info) => Some(info),
            _ => None,
        }
    }

    /// Resource held by a harvestable node: source energy or mineral amount.
    /// `None` for anything that is not a resource node.
    pub fn remaining_yield(&self) -> Option<u32> {
        match &self.kind {
            ObjectKind::Source { energy, .. } => Some(*energy),
            ObjectKind::Mineral { amount, .. } => Some(*amount),
            _ => None,
        }
    }

    /// Amount of `resource` in this object's store (0 without a store).
    pub fn stored(&self, resource: ResourceType) -> u32 {
        self.store.as_ref().map_or(0, |s| s.get(resource))
    }

    pub fn free_capacity(&self) -> u32 {
        self.store.as_ref().map_or(0, Store::free_capacity)
    }

    /// `hits < hits_max`, i.e. the object could use a repair.
    pub fn is_damaged(&self) -> bool {
        self.hits < self.hits_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(energy: u32) -> RoomObject {
        let mut store = Store::with_capacity(2000);
        store.add(ResourceType::Energy, energy);
        RoomObject {
            id: ObjectId::new("c1"),
            pos: Position::new(10, 10, "W1N1"),
            kind: ObjectKind::Structure {
                structure_type: StructureType::Container,
            },
            my: false,
            hits: 1000,
            hits_max: 5000,
            store: Some(store),
        }
    }

    #[test]
    fn structure_queries() {
        let c = container(300);
        assert!(c.is_structure(StructureType::Container));
        assert_eq!(c.stored(ResourceType::Energy), 300);
        assert_eq!(c.free_capacity(), 1700);
        assert!(c.is_damaged());
        assert_eq!(c.remaining_yield(), None);
        assert!(c.creep().is_none());
    }

    #[test]
    fn serialization_roundtrip() {
        let c = container(10);
        let json = serde_json::to_string(&c).unwrap();
        let back: RoomObject = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}

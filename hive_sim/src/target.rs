// Persistence-safe reference to a world object.
//
// A `TargetHandle` is an object identifier plus the object's last known
// position. It survives serialization and keeps pointing somewhere useful
// after the object itself is gone: `refresh` overwrites the cached position
// whenever the identifier still resolves, so a vanished target carries the
// spot it was last seen at.
//
// Position-only targets (drop spots, go-to destinations) have an empty id and
// a real position.

use crate::object::RoomObject;
use crate::types::{ObjectId, Position};
use crate::world::World;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetHandle {
    #[serde(default)]
    pub id: ObjectId,
    pub pos: Position,
}

impl Default for TargetHandle {
    fn default() -> Self {
        Self::empty()
    }
}

impl TargetHandle {
    /// No id, placeholder position `(-1, -1, "")`.
    pub fn empty() -> Self {
        Self {
            id: ObjectId::default(),
            pos: Position::empty(),
        }
    }

    pub fn of(object: &RoomObject) -> Self {
        Self {
            id: object.id.clone(),
            pos: object.pos.clone(),
        }
    }

    pub fn at(pos: Position) -> Self {
        Self {
            id: ObjectId::default(),
            pos,
        }
    }

    /// Live object, or `None` for an empty id or an object that is gone.
    pub fn resolve(&self, world: &dyn World) -> Option<RoomObject> {
        if self.id.is_empty() {
            return None;
        }
        world.object(&self.id)
    }

    /// Resolve and, on success, update the cached position.
    pub fn refresh(&mut self, world: &dyn World) -> Option<RoomObject> {
        let object = self.resolve(world)?;
        self.pos = object.pos.clone();
        Some(object)
    }
}

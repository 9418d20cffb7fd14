// The host collaborator interface.
//
// `World` is everything the controller needs from the simulation engine that
// actually runs the game: the clock, object resolution by identifier, room
// queries, terrain and look-ups, and the primitive actions of units, towers
// and spawns. The controller never mutates objects directly; it only issues
// actions and re-reads snapshots.
//
// Implementations: `sandbox::Sandbox` (in-memory, deterministic, used by the
// tests and the CLI). A live host binding would implement the same trait.
//
// Every action returns a `ReturnCode`; none of them panic on bad input. An
// unknown creep name or object id yields `NotFound` / `InvalidTarget`.
//
// See also: `object.rs` for the snapshot types, `geometry.rs` for the helpers
// layered on top of `terrain` / `structures_at` / `creeps_at`.

use crate::object::RoomObject;
use crate::types::{BodyPart, Direction, ObjectId, Position, ResourceType, ReturnCode, StructureType, Terrain};
use serde::{Deserialize, Serialize};

/// Room-level query kinds for `World::find`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Find {
    /// Every structure in the room, owned or not, including the controller.
    Structures,
    Sources,
    Minerals,
    ConstructionSites,
    DroppedResources,
    MyCreeps,
    HostileCreeps,
}

/// Options forwarded to the host's move-to primitive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOpts {
    /// Stop once within this range of the goal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<u32>,
    /// Ticks a computed path may be reused before recomputation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reuse_path: Option<u32>,
}

/// Host simulation engine as seen by the controller.
pub trait World {
    /// Current tick.
    fn time(&self) -> u64;

    /// Resolve a live object. `None` once the object is gone.
    fn object(&self, id: &ObjectId) -> Option<RoomObject>;

    /// Rooms this player controls a spawn in, in name order.
    fn owned_rooms(&self) -> Vec<String>;

    /// All of this player's creeps, across rooms, in name order.
    fn my_creeps(&self) -> Vec<RoomObject>;

    fn find(&self, room: &str, query: Find) -> Vec<RoomObject>;

    fn terrain(&self, pos: &Position) -> Terrain;

    fn structures_at(&self, pos: &Position) -> Vec<RoomObject>;

    fn creeps_at(&self, pos: &Position) -> Vec<RoomObject>;

    // -- Unit actions -------------------------------------------------------

    fn creep_move(&mut self, creep: &str, direction: Direction) -> ReturnCode;
    fn creep_move_to(&mut self, creep: &str, goal: &Position, opts: &MoveOpts) -> ReturnCode;
    fn creep_harvest(&mut self, creep: &str, target: &ObjectId) -> ReturnCode;
    fn creep_build(&mut self, creep: &str, site: &ObjectId) -> ReturnCode;
    fn creep_repair(&mut self, creep: &str, target: &ObjectId) -> ReturnCode;
    fn creep_upgrade_controller(&mut self, creep: &str, controller: &ObjectId) -> ReturnCode;
    fn creep_transfer(
        &mut self,
        creep: &str,
        target: &ObjectId,
        resource: ResourceType,
        amount: Option<u32>,
    ) -> ReturnCode;
    fn creep_withdraw(
        &mut self,
        creep: &str,
        target: &ObjectId,
        resource: ResourceType,
        amount: Option<u32>,
    ) -> ReturnCode;
    fn creep_pickup(&mut self, creep: &str, resource: &ObjectId) -> ReturnCode;
    fn creep_drop(&mut self, creep: &str, resource: ResourceType, amount: Option<u32>) -> ReturnCode;
    fn creep_attack(&mut self, creep: &str, target: &ObjectId) -> ReturnCode;
    fn creep_heal(&mut self, creep: &str, target: &ObjectId) -> ReturnCode;
    fn creep_say(&mut self, creep: &str, message: &str) -> ReturnCode;

    // -- Tower actions ------------------------------------------------------

    fn tower_attack(&mut self, tower: &ObjectId, target: &ObjectId) -> ReturnCode;
    fn tower_heal(&mut self, tower: &ObjectId, target: &ObjectId) -> ReturnCode;
    fn tower_repair(&mut self, tower: &ObjectId, target: &ObjectId) -> ReturnCode;

    // -- Colony actions -----------------------------------------------------

    /// Queue a new unit. The name must be unused; the spawn must be idle and
    /// hold enough energy for the body.
    fn spawn_creep(&mut self, spawn: &ObjectId, body: &[BodyPart], name: &str) -> ReturnCode;

    fn create_construction_site(&mut self, pos: &Position, structure_type: StructureType) -> ReturnCode;
}

// Core types shared across the hive controller.
//
// Defines room positions (`Position`), object identifiers (`ObjectId`),
// movement directions, resource/structure/body-part enums, the host action
// result code (`ReturnCode`), and the resource ledger (`Store`). All types
// derive `Serialize` and `Deserialize` because most of them end up inside
// durable memory records.
//
// Room geometry follows the host's 50x50 grid: tiles 0 and 49 on either axis
// are room edges (exits), and distances are Chebyshev (diagonal steps cost the
// same as orthogonal ones).
//
// See also: `geometry.rs` for passability and range queries built on these
// types, `object.rs` for the live object snapshots that carry them.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// Highest tile coordinate on either axis of a room.
pub const ROOM_MAX: i32 = 49;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// A tile in a named room.
///
/// `Position::empty()` (`(-1, -1, "")`) stands in for "no position" inside
/// target handles whose object was never known.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub room: String,
}

impl Position {
    pub fn new(x: i32, y: i32, room: impl Into<String>) -> Self {
        Self {
            x,
            y,
            room: room.into(),
        }
    }

    /// The placeholder position of an empty target handle.
    pub fn empty() -> Self {
        Self::new(-1, -1, "")
    }

    /// True for real tiles (as opposed to the empty placeholder).
    pub fn is_real(&self) -> bool {
        self.x >= 0 && self.y >= 0
    }

    /// Chebyshev distance. Positions in different rooms are infinitely far
    /// apart (`u32::MAX`).
    pub fn range_to(&self, other: &Position) -> u32 {
        if self.room != other.room {
            return u32::MAX;
        }
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    pub fn in_range_to(&self, other: &Position, range: u32) -> bool {
        self.range_to(other) <= range
    }

    pub fn is_near_to(&self, other: &Position) -> bool {
        self.in_range_to(other, 1)
    }

    /// Edge tiles are room exits; standing on one risks leaving the room.
    pub fn is_edge(&self) -> bool {
        self.x == 0 || self.x == ROOM_MAX || self.y == 0 || self.y == ROOM_MAX
    }

    /// The up-to-eight surrounding tiles that lie strictly inside the room
    /// (edges excluded). Passability is not checked here.
    pub fn neighbours(&self) -> SmallVec<[Position; 8]> {
        let mut out = SmallVec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let x = self.x + dx;
                let y = self.y + dy;
                if x > 0 && x < ROOM_MAX && y > 0 && y < ROOM_MAX {
                    out.push(Position::new(x, y, self.room.clone()));
                }
            }
        }
        out
    }

    /// Direction of the first step from `self` toward `other`. Returns `None`
    /// when the two positions coincide.
    pub fn direction_to(&self, other: &Position) -> Option<Direction> {
        let dx = (other.x - self.x).signum();
        let dy = (other.y - self.y).signum();
        Direction::from_offset(dx, dy)
    }

    /// The adjacent tile one step in `direction` (not clamped to the room).
    pub fn step(&self, direction: Direction) -> Position {
        let (dx, dy) = direction.offset();
        Position::new(self.x + dx, self.y + dy, self.room.clone())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {},{}]", self.room, self.x, self.y)
    }
}

/// The eight compass directions, numbered clockwise from top as the host
/// numbers them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Top = 1,
    TopRight = 2,
    Right = 3,
    BottomRight = 4,
    Bottom = 5,
    BottomLeft = 6,
    Left = 7,
    TopLeft = 8,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Top,
        Direction::TopRight,
        Direction::Right,
        Direction::BottomRight,
        Direction::Bottom,
        Direction::BottomLeft,
        Direction::Left,
        Direction::TopLeft,
    ];

    /// `(dx, dy)` of one step. Y grows downward.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Top => (0, -1),
            Direction::TopRight => (1, -1),
            Direction::Right => (1, 0),
            Direction::BottomRight => (1, 1),
            Direction::Bottom => (0, 1),
            Direction::BottomLeft => (-1, 1),
            Direction::Left => (-1, 0),
            Direction::TopLeft => (-1, -1),
        }
    }

    pub fn from_offset(dx: i32, dy: i32) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|d| d.offset() == (dx.signum(), dy.signum()))
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Host-assigned object identifier. Opaque to the controller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Game enums
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    #[default]
    Energy,
    Power,
    Hydrogen,
    Oxygen,
    Utrium,
    Keanium,
    Lemergium,
    Zynthium,
    Catalyst,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    Spawn,
    Extension,
    Road,
    Wall,
    Rampart,
    Container,
    Storage,
    Tower,
    Controller,
    Link,
}

impl StructureType {
    /// Whether units may stand on a structure of this type.
    pub fn is_walkable(self) -> bool {
        matches!(self, StructureType::Container | StructureType::Road)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Move,
    Work,
    Carry,
    Attack,
    RangedAttack,
    Heal,
    Claim,
    Tough,
}

impl BodyPart {
    /// Spawn energy cost of one part.
    pub fn cost(self) -> u32 {
        match self {
            BodyPart::Move => 50,
            BodyPart::Work => 100,
            BodyPart::Carry => 50,
            BodyPart::Attack => 80,
            BodyPart::RangedAttack => 150,
            BodyPart::Heal => 250,
            BodyPart::Claim => 600,
            BodyPart::Tough => 10,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    #[default]
    Plain,
    Swamp,
    Wall,
}

// ---------------------------------------------------------------------------
// Action results
// ---------------------------------------------------------------------------

/// Result of every host primitive (unit actions, tower actions, spawning,
/// site placement). Numeric values match the host's error constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnCode {
    Ok = 0,
    NotOwner = -1,
    NoPath = -2,
    NameExists = -3,
    Busy = -4,
    NotFound = -5,
    NotEnoughResources = -6,
    InvalidTarget = -7,
    Full = -8,
    NotInRange = -9,
    InvalidArgs = -10,
    Tired = -11,
    NoBodypart = -12,
    RclNotEnough = -14,
}

impl ReturnCode {
    pub fn is_ok(self) -> bool {
        self == ReturnCode::Ok
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, *self as i8)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Resource ledger of a unit or store-bearing structure. `capacity` is the
/// total across all resource types.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub capacity: u32,
    #[serde(default)]
    pub contents: BTreeMap<ResourceType, u32>,
}

impl Store {
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            capacity,
            contents: BTreeMap::new(),
        }
    }

    pub fn get(&self, resource: ResourceType) -> u32 {
        self.contents.get(&resource).copied().unwrap_or(0)
    }

    pub fn energy(&self) -> u32 {
        self.get(ResourceType::Energy)
    }

    pub fn used(&self) -> u32 {
        self.contents.values().sum()
    }

    pub fn free_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.used())
    }

    /// Add up to `amount`, bounded by free capacity. Returns what was added.
    pub fn add(&mut self, resource: ResourceType, amount: u32) -> u32 {
        let added = amount.min(self.free_capacity());
        if added > 0 {
            *self.contents.entry(resource).or_insert(0) += added;
        }
        added
    }

    /// Remove up to `amount`. Returns what was removed. Empty entries are
    /// dropped so that `contents` stays canonical.
    pub fn remove(&mut self, resource: ResourceType, amount: u32) -> u32 {
        let held = self.get(resource);
        let removed = amount.min(held);
        if removed == held {
            self.contents.remove(&resource);
        } else if let Some(v) = self.contents.get_mut(&resource) {
            *v -= removed;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_chebyshev() {
        let a = Position::new(10, 10, "W1N1");
        assert_eq!(a.range_to(&Position::new(13, 11, "W1N1")), 3);
        assert_eq!(a.range_to(&Position::new(9, 9, "W1N1")), 1);
        assert_eq!(a.range_to(&Position::new(10, 10, "W2N1")), u32::MAX);
    }

    #[test]
    fn edges_and_neighbours() {
        assert!(Position::new(0, 12, "r").is_edge());
        assert!(Position::new(12, 49, "r").is_edge());
        assert!(!Position::new(1, 1, "r").is_edge());

        assert_eq!(Position::new(25, 25, "r").neighbours().len(), 8);
        // Corner of the interior: only tiles with 0 < x,y < 49 survive.
        let corner = Position::new(1, 1, "r").neighbours();
        assert_eq!(corner.len(), 3);
        assert!(corner.iter().all(|p| !p.is_edge()));
    }

    #[test]
    fn direction_round_trip() {
        let origin = Position::new(5, 5, "r");
        for dir in Direction::ALL {
            assert_eq!(origin.direction_to(&origin.step(dir)), Some(dir));
        }
        assert_eq!(origin.direction_to(&origin), None);
        assert_eq!(
            origin.direction_to(&Position::new(9, 1, "r")),
            Some(Direction::TopRight)
        );
    }

    #[test]
    fn store_add_remove_bounds() {
        let mut store = Store::with_capacity(50);
        assert_eq!(store.add(ResourceType::Energy, 80), 50);
        assert_eq!(store.free_capacity(), 0);
        assert_eq!(store.remove(ResourceType::Energy, 20), 20);
        assert_eq!(store.energy(), 30);
        assert_eq!(store.remove(ResourceType::Energy, 100), 30);
        assert!(store.contents.is_empty());
    }

    #[test]
    fn body_part_costs() {
        let body = [BodyPart::Work, BodyPart::Work, BodyPart::Carry, BodyPart::Move];
        let total: u32 = body.iter().map(|p| p.cost()).sum();
        assert_eq!(total, 300);
        assert_eq!(BodyPart::Claim.cost(), 600);
    }
}

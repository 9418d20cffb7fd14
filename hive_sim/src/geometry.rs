// Spatial helpers over `World` queries.
//
// Free functions rather than methods on `Position`, since they need the
// world: passability (`is_passable`), open neighbour enumeration
// (`available_neighbours`), and nearest / in-range selection over any
// collection of positioned things (`find_closest_by_range`, `find_in_range`).
//
// Selection helpers are order-stable: among equally close candidates, the one
// that comes first in the input wins. Colony decisions depend on this for
// reproducible ticks.

use crate::drone::Drone;
use crate::object::RoomObject;
use crate::types::{Position, Terrain};
use crate::world::World;
use smallvec::SmallVec;

/// Anything that occupies a tile.
pub trait Positioned {
    fn pos(&self) -> &Position;
}

impl Positioned for Position {
    fn pos(&self) -> &Position {
        self
    }
}

impl Positioned for RoomObject {
    fn pos(&self) -> &Position {
        &self.pos
    }
}

impl Positioned for Drone {
    fn pos(&self) -> &Position {
        &self.pos
    }
}

impl<T: Positioned + ?Sized> Positioned for &T {
    fn pos(&self) -> &Position {
        (**self).pos()
    }
}

/// A unit could stand on `pos`: not a wall, no blocking structure, and (unless
/// `ignore_creeps`) no creep already there.
pub fn is_passable(world: &dyn World, pos: &Position, ignore_creeps: bool) -> bool {
    if world.terrain(pos) == Terrain::Wall {
        return false;
    }
    if !ignore_creeps && !world.creeps_at(pos).is_empty() {
        return false;
    }
    world
        .structures_at(pos)
        .iter()
        .all(|s| s.structure_type().is_some_and(|t| t.is_walkable()))
}

/// Passable interior neighbours of `pos`.
pub fn available_neighbours(world: &dyn World, pos: &Position, ignore_creeps: bool) -> SmallVec<[Position; 8]> {
    pos.neighbours()
        .into_iter()
        .filter(|p| is_passable(world, p, ignore_creeps))
        .collect()
}

/// Closest candidate by Chebyshev range; ties go to the earliest candidate.
pub fn find_closest_by_range<T, I>(from: &Position, candidates: I) -> Option<T>
where
    T: Positioned,
    I: IntoIterator<Item = T>,
{
    candidates
        .into_iter()
        .map(|c| (from.range_to(c.pos()), c))
        .filter(|(range, _)| *range != u32::MAX)
        .min_by_key(|(range, _)| *range)
        .map(|(_, c)| c)
}

/// Candidates within `range` of `center`, input order preserved.
pub fn find_in_range<T, I>(center: &Position, candidates: I, range: u32) -> Vec<T>
where
    T: Positioned,
    I: IntoIterator<Item = T>,
{
    candidates
        .into_iter()
        .filter(|c| center.in_range_to(c.pos(), range))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::Sandbox;
    use crate::types::StructureType;

    #[test]
    fn closest_prefers_first_on_tie() {
        let from = Position::new(10, 10, "r");
        let a = Position::new(12, 10, "r");
        let b = Position::new(8, 10, "r");
        let c = Position::new(10, 15, "r");
        let got = find_closest_by_range(&from, [&c, &a, &b]);
        assert_eq!(got, Some(&a));
    }

    #[test]
    fn closest_skips_other_rooms() {
        let from = Position::new(10, 10, "r");
        let far = Position::new(10, 10, "elsewhere");
        assert_eq!(find_closest_by_range(&from, [&far]), None);
    }

    #[test]
    fn in_range_filters() {
        let center = Position::new(10, 10, "r");
        let pts = [
            Position::new(11, 11, "r"),
            Position::new(13, 10, "r"),
            Position::new(12, 8, "r"),
        ];
        let got = find_in_range(&center, pts.iter(), 2);
        assert_eq!(got, vec![&pts[0], &pts[2]]);
    }

    #[test]
    fn passability_rules() {
        let mut sandbox = Sandbox::new();
        sandbox.add_room("r");
        let wall = Position::new(5, 5, "r");
        sandbox.set_terrain(&wall, Terrain::Wall);
        let road = Position::new(6, 5, "r");
        sandbox.add_structure(road.clone(), StructureType::Road, true);
        let ext = Position::new(7, 5, "r");
        sandbox.add_structure(ext.clone(), StructureType::Extension, true);
        let occupied = Position::new(8, 5, "r");
        sandbox.add_creep("someone", occupied.clone(), &[]);

        assert!(!is_passable(&sandbox, &wall, true));
        assert!(is_passable(&sandbox, &road, false));
        assert!(!is_passable(&sandbox, &ext, true));
        assert!(!is_passable(&sandbox, &occupied, false));
        assert!(is_passable(&sandbox, &occupied, true));
    }

    #[test]
    fn available_neighbours_excludes_walls() {
        let mut sandbox = Sandbox::new();
        sandbox.add_room("r");
        let center = Position::new(10, 10, "r");
        for p in center.neighbours().iter().take(5) {
            sandbox.set_terrain(p, Terrain::Wall);
        }
        assert_eq!(available_neighbours(&sandbox, &center, true).len(), 3);
    }
}

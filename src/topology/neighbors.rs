//! The 26-neighbor process topology of one rank.
//!
//! Neighbors are addressed by offsets `[di, dj, dk]` in `{-1, 0, 1}^3`. Slots are
//! stored z-major (`dk` slowest, `di` fastest), which is also the traversal order
//! of the halo index lists:
//!
//! ```text
//!   dk = +1:  24 25 26     dk = 0:  15 16 17     dk = -1:  6 7 8
//!             21 22 23              12 -- 14               3 4 5
//!             18 19 20               9 10 11               0 1 2
//! ```
//!
//! Each axis of the rank is classified by a [`FaceState`]; a single per-axis rule
//! keyed by `(delta, face state)` either steps the coordinate, wraps it (periodic
//! axis), or reports that no neighbor exists. Compounding the three axes covers
//! every interior, face, edge and corner case.

use crate::config::{Axis, Periodicity, StencilType};
use crate::partitioning::ProcessGrid;
use itertools::iproduct;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// `[di, dj, dk]`, each in `{-1, 0, 1}`.
pub type Offset = [i8; 3];

/// Slot of the rank itself.
pub const CENTER: usize = 13;

/// Slot index of `offset` (z-major).
pub const fn slot_index(offset: Offset) -> usize {
    ((offset[2] + 1) * 9 + (offset[1] + 1) * 3 + (offset[0] + 1)) as usize
}

/// Offset stored at `slot`.
pub const fn offset_of(slot: usize) -> Offset {
    let s = slot as i8;
    [s % 3 - 1, (s / 3) % 3 - 1, s / 9 - 1]
}

/// Edge and corner offsets: two or three nonzero components.
pub fn is_diagonal(offset: Offset) -> bool {
    offset.iter().filter(|&&d| d != 0).count() >= 2
}

/// All 27 offsets in slot order.
pub fn offsets() -> impl Iterator<Item = Offset> {
    iproduct!(-1i8..=1, -1i8..=1, -1i8..=1).map(|(dk, dj, di)| [di, dj, dk])
}

/// Contents of one neighbor slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeighborSlot {
    /// The neighboring process.
    Rank(usize),
    /// Non-periodic domain boundary: no process lies there.
    Boundary,
    /// Diagonal neighbor dropped by the star stencil.
    Suppressed,
}

impl NeighborSlot {
    /// Raw encoding of [`NeighborSlot::Boundary`].
    pub const BOUNDARY: i64 = -2;
    /// Raw encoding of [`NeighborSlot::Suppressed`].
    pub const SUPPRESSED: i64 = -1;

    pub fn rank(self) -> Option<usize> {
        match self {
            NeighborSlot::Rank(r) => Some(r),
            _ => None,
        }
    }

    /// Signed encoding: the rank, `-2` for a boundary, `-1` for a suppressed diagonal.
    pub fn to_raw(self) -> i64 {
        match self {
            NeighborSlot::Rank(r) => r as i64,
            NeighborSlot::Boundary => Self::BOUNDARY,
            NeighborSlot::Suppressed => Self::SUPPRESSED,
        }
    }
}

/// Where a rank sits along one axis of the process grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaceState {
    Interior,
    /// First process along the axis.
    Low,
    /// Last process along the axis.
    High,
    /// Only process along the axis: both faces are domain faces.
    Both,
}

impl FaceState {
    pub fn of(coord: usize, count: usize) -> Self {
        match (coord == 0, coord + 1 == count) {
            (true, true) => FaceState::Both,
            (true, false) => FaceState::Low,
            (false, true) => FaceState::High,
            (false, false) => FaceState::Interior,
        }
    }
}

/// Coordinate of the neighbor `delta` steps away along one axis.
fn step(coord: usize, count: usize, delta: i8, face: FaceState, periodic: bool) -> Option<usize> {
    match (delta, face) {
        (0, _) => Some(coord),
        (-1, FaceState::Low | FaceState::Both) => periodic.then(|| count - 1),
        (1, FaceState::High | FaceState::Both) => periodic.then_some(0),
        (-1, _) => Some(coord - 1),
        _ => Some(coord + 1),
    }
}

/// 26 neighbor slots plus the rank itself at [`CENTER`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborTable {
    rank: usize,
    slots: [NeighborSlot; 27],
}

impl NeighborTable {
    /// Rank this table belongs to.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn get(&self, offset: Offset) -> NeighborSlot {
        self.slots[slot_index(offset)]
    }

    /// The 26 neighbor slots in slot order, skipping the rank itself.
    pub fn iter(&self) -> impl Iterator<Item = (Offset, NeighborSlot)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|&(slot, _)| slot != CENTER)
            .map(|(slot, &n)| (offset_of(slot), n))
    }

    /// Signed encoding of the 26 neighbors in slot order.
    pub fn to_raw(&self) -> [i64; 26] {
        let mut raw = [0i64; 26];
        for (dst, (_, n)) in raw.iter_mut().zip(self.iter()) {
            *dst = n.to_raw();
        }
        raw
    }

    /// Distinct neighbor ranks. May contain the rank itself on periodic axes
    /// with a single process.
    pub fn neighbor_ranks(&self) -> BTreeSet<usize> {
        self.iter().filter_map(|(_, n)| n.rank()).collect()
    }

    /// Copy with every edge and corner slot marked [`NeighborSlot::Suppressed`].
    pub fn narrowed(&self) -> Self {
        let mut slots = self.slots;
        for (slot, n) in slots.iter_mut().enumerate() {
            if is_diagonal(offset_of(slot)) {
                *n = NeighborSlot::Suppressed;
            }
        }
        Self {
            rank: self.rank,
            slots,
        }
    }
}

/// Neighbor tables of one rank: the full (box) table and its star view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborTopology {
    faces: [FaceState; 3],
    full: NeighborTable,
    narrow: NeighborTable,
}

impl NeighborTopology {
    /// Resolve all 26 neighbors of `rank` in `grid`.
    pub fn resolve(grid: &ProcessGrid, rank: usize, periodicity: Periodicity) -> Self {
        let coords = grid.coords(rank);
        let counts = grid.counts();
        let faces = Axis::ALL.map(|a| FaceState::of(coords[a.index()], counts[a.index()]));

        let mut slots = [NeighborSlot::Boundary; 27];
        for (slot, offset) in offsets().enumerate() {
            let mut target = [0usize; 3];
            let mut exists = true;
            for axis in Axis::ALL {
                let a = axis.index();
                match step(
                    coords[a],
                    counts[a],
                    offset[a],
                    faces[a],
                    periodicity.is_periodic(axis),
                ) {
                    Some(c) => target[a] = c,
                    None => exists = false,
                }
            }
            if exists {
                slots[slot] = NeighborSlot::Rank(grid.rank_of(target));
            }
        }

        let full = NeighborTable { rank, slots };
        let narrow = full.narrowed();
        log::debug!("rank {rank}: faces {faces:?}, neighbors {:?}", full.to_raw());
        Self {
            faces,
            full,
            narrow,
        }
    }

    /// Table including edge and corner neighbors.
    pub fn full(&self) -> &NeighborTable {
        &self.full
    }

    /// Table with edge and corner neighbors suppressed.
    pub fn narrow(&self) -> &NeighborTable {
        &self.narrow
    }

    /// Table matching the stencil shape.
    pub fn view(&self, stencil: StencilType) -> &NeighborTable {
        match stencil {
            StencilType::Box => &self.full,
            StencilType::Star => &self.narrow,
        }
    }

    pub fn faces(&self) -> [FaceState; 3] {
        self.faces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_order_matches_offsets() {
        for (slot, off) in offsets().enumerate() {
            assert_eq!(slot_index(off), slot);
            assert_eq!(offset_of(slot), off);
        }
        assert_eq!(offset_of(CENTER), [0, 0, 0]);
        assert_eq!(offset_of(0), [-1, -1, -1]);
        assert_eq!(offset_of(26), [1, 1, 1]);
    }

    #[test]
    fn corner_rank_without_periodicity() {
        let grid = ProcessGrid::new(2, 2, 2);
        let topo = NeighborTopology::resolve(&grid, 0, Periodicity::NONE);
        let star = topo.narrow();
        assert_eq!(star.get([1, 0, 0]), NeighborSlot::Rank(1));
        assert_eq!(star.get([0, 1, 0]), NeighborSlot::Rank(2));
        assert_eq!(star.get([0, 0, 1]), NeighborSlot::Rank(4));
        assert_eq!(star.get([-1, 0, 0]), NeighborSlot::Boundary);
        assert_eq!(star.get([0, -1, 0]), NeighborSlot::Boundary);
        assert_eq!(star.get([0, 0, -1]), NeighborSlot::Boundary);
        assert_eq!(star.get([1, 1, 1]), NeighborSlot::Suppressed);
        assert_eq!(topo.full().get([1, 1, 1]), NeighborSlot::Rank(7));
    }

    #[test]
    fn corner_rank_fully_periodic() {
        let grid = ProcessGrid::new(2, 2, 2);
        let topo = NeighborTopology::resolve(&grid, 0, Periodicity::XYZ);
        let star = topo.narrow();
        assert_eq!(star.get([-1, 0, 0]), NeighborSlot::Rank(1));
        assert_eq!(star.get([0, -1, 0]), NeighborSlot::Rank(2));
        assert_eq!(star.get([0, 0, -1]), NeighborSlot::Rank(4));
        assert!(topo.full().iter().all(|(_, n)| n != NeighborSlot::Boundary));
        assert_eq!(topo.full().get([-1, -1, -1]), NeighborSlot::Rank(7));
    }

    #[test]
    fn interior_star_has_six_face_neighbors() {
        let grid = ProcessGrid::new(3, 3, 3);
        let topo = NeighborTopology::resolve(&grid, 13, Periodicity::NONE);
        let faces: Vec<_> = topo
            .narrow()
            .iter()
            .filter_map(|(_, n)| n.rank())
            .collect();
        assert_eq!(faces, vec![4, 10, 12, 14, 16, 22]);
        assert_eq!(topo.full().neighbor_ranks().len(), 26);
    }

    #[test]
    fn raw_encoding_follows_the_classic_wrap_formulas() {
        // rank 0 of a 3x2x2 grid, periodic in z only
        let grid = ProcessGrid::new(3, 2, 2);
        let topo = NeighborTopology::resolve(&grid, 0, Periodicity::Z);
        let raw = topo.full().to_raw();
        // n4: directly below wraps to the top layer: size - m*n + rank
        assert_eq!(raw[4], 6);
        // n5: below and right
        assert_eq!(raw[5], 7);
        // n3: below and left, x is a true boundary
        assert_eq!(raw[3], NeighborSlot::BOUNDARY);
        // n14: right neighbor in the same layer
        assert_eq!(raw[13], 1);
    }

    #[test]
    fn single_process_axis_wraps_onto_itself() {
        let grid = ProcessGrid::new(1, 2, 1);
        let topo = NeighborTopology::resolve(&grid, 1, Periodicity::X);
        assert_eq!(topo.faces()[0], FaceState::Both);
        assert_eq!(topo.full().get([-1, 0, 0]), NeighborSlot::Rank(1));
        assert_eq!(topo.full().get([1, 0, 0]), NeighborSlot::Rank(1));
        assert_eq!(topo.full().get([0, -1, 0]), NeighborSlot::Rank(0));
        assert_eq!(topo.full().get([0, 1, 0]), NeighborSlot::Boundary);
    }
}

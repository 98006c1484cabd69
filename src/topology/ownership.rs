//! Ownership record of one process.
//!
//! The [`OwnershipRecord`] holds the owned node ranges and the ghost-extended
//! ranges along each axis. Ranges are kept in node coordinates; the `*_dims`
//! helpers report the x extent scaled by `dof`, which is the layout the flat
//! storage blocks use.

use crate::config::{Axis, Periodicity};
use crate::partitioning::AxisDistribution;
use crate::topology::ghost::{GhostRange, ghost_range};
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRecord {
    /// Process-grid coordinates `[i, j, k]`.
    pub coords: [usize; 3],
    /// Owned node ranges `[xs, xe) x [ys, ye) x [zs, ze)`.
    pub owned: [Range<usize>; 3],
    /// Ghost-extended node ranges `[Xs, Xe) x [Ys, Ye) x [Zs, Ze)`.
    pub ghost: [GhostRange; 3],
    pub dof: usize,
}

impl OwnershipRecord {
    /// Owned and ghost ranges of the process at `coords`.
    pub fn new(
        coords: [usize; 3],
        dists: &[AxisDistribution; 3],
        width: usize,
        periodicity: Periodicity,
        dof: usize,
    ) -> Self {
        let owned = Axis::ALL.map(|axis| dists[axis.index()].range(coords[axis.index()]));
        let ghost = Axis::ALL.map(|axis| {
            let d = &dists[axis.index()];
            ghost_range(
                &owned[axis.index()],
                width,
                periodicity.is_periodic(axis),
                d.extent(),
            )
        });
        Self {
            coords,
            owned,
            ghost,
            dof,
        }
    }

    /// Owned block dimensions `[x*dof, y, z]`.
    pub fn owned_dims(&self) -> [usize; 3] {
        [
            self.owned[0].len() * self.dof,
            self.owned[1].len(),
            self.owned[2].len(),
        ]
    }

    /// Ghosted block dimensions `[(Xe-Xs)*dof, Ye-Ys, Ze-Zs]`.
    pub fn ghost_dims(&self) -> [usize; 3] {
        [
            self.ghost[0].len() * self.dof,
            self.ghost[1].len(),
            self.ghost[2].len(),
        ]
    }

    /// Position of the owned block's first entry inside the ghosted block, per
    /// axis, with x scaled by `dof`.
    pub fn owned_offset(&self) -> [usize; 3] {
        [
            self.ghost[0].low_width(&self.owned[0]) * self.dof,
            self.ghost[1].low_width(&self.owned[1]),
            self.ghost[2].low_width(&self.owned[2]),
        ]
    }

    pub fn owned_volume(&self) -> usize {
        self.owned_dims().iter().product()
    }

    pub fn ghost_volume(&self) -> usize {
        self.ghost_dims().iter().product()
    }

    /// Owned x range in dof-scaled coordinates.
    pub fn x_scaled(&self) -> Range<usize> {
        self.owned[0].start * self.dof..self.owned[0].end * self.dof
    }

    /// Ghost x range in dof-scaled coordinates.
    pub fn ghost_x_scaled(&self) -> GhostRange {
        let dof = self.dof as isize;
        GhostRange {
            start: self.ghost[0].start * dof,
            end: self.ghost[0].end * dof,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dists(extents: [usize; 3], counts: [usize; 3]) -> [AxisDistribution; 3] {
        [0, 1, 2].map(|a| AxisDistribution::uniform(extents[a], counts[a]))
    }

    #[test]
    fn corner_process_on_non_periodic_cube() {
        let d = dists([4, 4, 4], [2, 2, 2]);
        let rec = OwnershipRecord::new([0, 0, 0], &d, 1, Periodicity::NONE, 1);
        assert_eq!(rec.owned, [0..2, 0..2, 0..2]);
        assert_eq!(rec.ghost_dims(), [3, 3, 3]);
        assert_eq!(rec.owned_offset(), [0, 0, 0]);
        assert_eq!(rec.owned_volume(), 8);
        assert_eq!(rec.ghost_volume(), 27);
    }

    #[test]
    fn dof_scales_only_x() {
        let d = dists([4, 4, 4], [2, 2, 2]);
        let rec = OwnershipRecord::new([1, 1, 0], &d, 1, Periodicity::XYZ, 3);
        assert_eq!(rec.owned_dims(), [6, 2, 2]);
        assert_eq!(rec.ghost_dims(), [12, 4, 4]);
        assert_eq!(rec.owned_offset(), [3, 1, 1]);
        assert_eq!(rec.x_scaled(), 6..12);
        assert_eq!(rec.ghost_x_scaled(), GhostRange { start: 3, end: 15 });
    }
}

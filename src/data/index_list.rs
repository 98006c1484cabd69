//! Ordered halo index lists.
//!
//! The ghosted block of a process is laid out z-major, then y, then x (x scaled
//! by `dof`). Walking it plane by plane and row by row, each row crosses up to
//! three regions of the 3x3x3 neighborhood (`di = -1, 0, +1`); every region that
//! has a neighbor contributes one contiguous run of global indices, taken from
//! that neighbor's owned block in the partition-contiguous numbering.
//!
//! [`for_each_run`] is the single traversal. The public builders only differ in
//! which end of each run they record:
//! * [`build_index_list`]: global indices (scatter source for global-to-local),
//! * [`ghost_positions`]: positions inside the ghosted block (scatter target),
//! * [`owned_positions`]: positions of the owned interior (local-to-global).
//!
//! Regions whose slot is [`NeighborSlot::Boundary`] or
//! [`NeighborSlot::Suppressed`] contribute nothing.
//!
//! [`NeighborSlot::Boundary`]: crate::topology::neighbors::NeighborSlot::Boundary
//! [`NeighborSlot::Suppressed`]: crate::topology::neighbors::NeighborSlot::Suppressed

use crate::grid_error::GridError;
use crate::partitioning::{AxisDistribution, ProcessGrid};
use crate::topology::neighbors::NeighborTable;
use crate::topology::ownership::OwnershipRecord;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Start of every rank's owned block in the partition-contiguous numbering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseOffsets {
    starts: Vec<usize>,
    total: usize,
}

impl BaseOffsets {
    /// Prefix sums over the owned volume of each rank.
    pub fn from_volumes(volumes: &[usize]) -> Self {
        let mut starts = Vec::with_capacity(volumes.len());
        let mut total = 0usize;
        for &v in volumes {
            starts.push(total);
            total += v;
        }
        Self { starts, total }
    }

    /// First global index owned by `rank`.
    pub fn get(&self, rank: usize) -> usize {
        self.starts[rank]
    }

    /// Global index range owned by `rank`.
    pub fn range(&self, rank: usize) -> Range<usize> {
        let end = self.starts.get(rank + 1).copied().unwrap_or(self.total);
        self.starts[rank]..end
    }

    /// Number of global indices over all ranks.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Everything the traversal needs to know about the partition.
#[derive(Copy, Clone, Debug)]
pub struct IndexContext<'a> {
    pub grid: ProcessGrid,
    pub dists: &'a [AxisDistribution; 3],
    pub record: &'a OwnershipRecord,
    pub bases: &'a BaseOffsets,
    pub width: usize,
}

impl IndexContext<'_> {
    /// Owned block dimensions `[x*dof, y, z]` of `rank`.
    fn owned_dims_of(&self, rank: usize) -> [usize; 3] {
        let [i, j, k] = self.grid.coords(rank);
        [
            self.dists[0].size(i) * self.record.dof,
            self.dists[1].size(j),
            self.dists[2].size(k),
        ]
    }
}

/// One contiguous stretch of the ghosted block filled from one neighbor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Run {
    /// Rank owning the entries.
    pub neighbor: usize,
    /// Position of the first entry in the ghosted block.
    pub local: usize,
    /// Global index of the first entry.
    pub global: usize,
    pub len: usize,
}

/// Span of one region along an axis: `(count, first ghost position, first
/// position inside the neighbor's owned block)`.
fn span(
    delta: i8,
    owned: usize,
    low: usize,
    halo: usize,
    neighbor_owned: usize,
) -> (usize, usize, usize) {
    match delta {
        -1 => (halo, low - halo, neighbor_owned - halo),
        0 => (owned, low, 0),
        _ => (halo, low + owned, 0),
    }
}

/// Visit every run of the ghosted block in layout order.
pub fn for_each_run(ctx: &IndexContext<'_>, table: &NeighborTable, mut visit: impl FnMut(Run)) {
    let rec = ctx.record;
    let [x, y, z] = rec.owned_dims();
    let [gx, gy, _] = rec.ghost_dims();
    let [left, bottom, down] = rec.owned_offset();
    let sx = ctx.width * rec.dof;
    let w = ctx.width;

    for dk in -1i8..=1 {
        let planes = if dk == 0 { z } else { w };
        for kk in 0..planes {
            for dj in -1i8..=1 {
                let rows = if dj == 0 { y } else { w };
                for jj in 0..rows {
                    for di in -1i8..=1 {
                        let Some(nbr) = table.get([di, dj, dk]).rank() else {
                            continue;
                        };
                        let [nx, ny, nz] = ctx.owned_dims_of(nbr);
                        let (run, lcol, ncol) = span(di, x, left, sx, nx);
                        let (_, lrow, nrow) = span(dj, y, bottom, w, ny);
                        let (_, lplane, nplane) = span(dk, z, down, w, nz);
                        let global = ctx.bases.get(nbr)
                            + (nplane + kk) * nx * ny
                            + (nrow + jj) * nx
                            + ncol;
                        visit(Run {
                            neighbor: nbr,
                            local: (lplane + kk) * gx * gy + (lrow + jj) * gx + lcol,
                            global,
                            len: run,
                        });
                    }
                }
            }
        }
    }
}

/// Global indices of every ghosted-block entry reachable through `table`, in
/// layout order.
pub fn build_index_list(ctx: &IndexContext<'_>, table: &NeighborTable) -> Vec<usize> {
    let mut out = Vec::with_capacity(ctx.record.ghost_volume());
    for_each_run(ctx, table, |run| out.extend(run.global..run.global + run.len));
    out
}

/// Ghosted-block positions matching [`build_index_list`] entry for entry.
/// For a full table this is `0..ghost volume`.
pub fn ghost_positions(ctx: &IndexContext<'_>, table: &NeighborTable) -> Vec<usize> {
    let mut out = Vec::with_capacity(ctx.record.ghost_volume());
    for_each_run(ctx, table, |run| out.extend(run.local..run.local + run.len));
    out
}

/// Positions of the owned entries inside the ghosted block, in owned
/// (partition-contiguous) order.
pub fn owned_positions(record: &OwnershipRecord) -> Vec<usize> {
    let [x, y, z] = record.owned_dims();
    let [gx, gy, _] = record.ghost_dims();
    let [left, bottom, down] = record.owned_offset();
    let mut out = Vec::with_capacity(x * y * z);
    for k in down..down + z {
        for j in bottom..bottom + y {
            let row = k * gx * gy + j * gx + left;
            out.extend(row..row + x);
        }
    }
    out
}

/// Paired index lists for one scatter: entry `i` of `from` moves to entry `i`
/// of `to`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScatterLists {
    pub from: Vec<usize>,
    pub to: Vec<usize>,
}

impl ScatterLists {
    pub fn len(&self) -> usize {
        self.from.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_empty()
    }
}

/// Global index of every slot of the ghosted block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostedIndexMap {
    dims: [usize; 3],
    indices: Vec<usize>,
}

impl GhostedIndexMap {
    /// Build from the full (box) neighbor table so every slot is covered.
    pub fn build(ctx: &IndexContext<'_>, full: &NeighborTable) -> Result<Self, GridError> {
        let dims = ctx.record.ghost_dims();
        let indices = build_index_list(ctx, full);
        let expected = dims.iter().product::<usize>();
        if indices.len() != expected {
            return Err(GridError::InvalidPartition(format!(
                "ghosted block of rank {} has {expected} slots but {} were mapped",
                full.rank(),
                indices.len()
            )));
        }
        Ok(Self { dims, indices })
    }

    /// Ghosted block dimensions `[(Xe-Xs)*dof, Ye-Ys, Ze-Zs]`.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Global index of the slot at flat position `local`.
    pub fn global(&self, local: usize) -> Option<usize> {
        self.indices.get(local).copied()
    }

    /// Global index of the slot at block coordinates `[x, y, z]` (x scaled by `dof`).
    pub fn at(&self, coords: [usize; 3]) -> Option<usize> {
        let [gx, gy, gz] = self.dims;
        let [x, y, z] = coords;
        if x >= gx || y >= gy || z >= gz {
            return None;
        }
        self.global(z * gx * gy + y * gx + x)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Periodicity;
    use crate::topology::neighbors::NeighborTopology;

    struct Fixture {
        grid: ProcessGrid,
        dists: [AxisDistribution; 3],
        bases: BaseOffsets,
        dof: usize,
        width: usize,
        periodicity: Periodicity,
    }

    impl Fixture {
        fn new(
            extents: [usize; 3],
            grid: ProcessGrid,
            dof: usize,
            width: usize,
            periodicity: Periodicity,
        ) -> Self {
            let counts = grid.counts();
            let dists = [0, 1, 2].map(|a| AxisDistribution::uniform(extents[a], counts[a]));
            let volumes: Vec<usize> = (0..grid.total())
                .map(|r| {
                    let [i, j, k] = grid.coords(r);
                    dists[0].size(i) * dof * dists[1].size(j) * dists[2].size(k)
                })
                .collect();
            let bases = BaseOffsets::from_volumes(&volumes);
            Self {
                grid,
                dists,
                bases,
                dof,
                width,
                periodicity,
            }
        }

        fn record(&self, rank: usize) -> OwnershipRecord {
            OwnershipRecord::new(
                self.grid.coords(rank),
                &self.dists,
                self.width,
                self.periodicity,
                self.dof,
            )
        }

        fn topology(&self, rank: usize) -> NeighborTopology {
            NeighborTopology::resolve(&self.grid, rank, self.periodicity)
        }

        fn ctx<'a>(&'a self, record: &'a OwnershipRecord) -> IndexContext<'a> {
            IndexContext {
                grid: self.grid,
                dists: &self.dists,
                record,
                bases: &self.bases,
                width: self.width,
            }
        }
    }

    #[test]
    fn base_offsets_are_prefix_sums() {
        let b = BaseOffsets::from_volumes(&[4, 0, 3]);
        assert_eq!(b.get(0), 0);
        assert_eq!(b.get(2), 4);
        assert_eq!(b.range(2), 4..7);
        assert_eq!(b.total(), 7);
    }

    #[test]
    fn single_rank_list_is_the_identity() {
        let f = Fixture::new([3, 2, 2], ProcessGrid::new(1, 1, 1), 2, 1, Periodicity::NONE);
        let rec = f.record(0);
        let topo = f.topology(0);
        let list = build_index_list(&f.ctx(&rec), topo.full());
        // 3 x 2 x 2 nodes with two dofs each
        assert_eq!(list, (0..24).collect::<Vec<_>>());
        assert_eq!(owned_positions(&rec), (0..24).collect::<Vec<_>>());
    }

    #[test]
    fn one_dimensional_halo_picks_neighbor_edges() {
        // 9 nodes over 3 ranks along x, width 1
        let f = Fixture::new([9, 1, 1], ProcessGrid::new(3, 1, 1), 1, 1, Periodicity::NONE);
        let rec = f.record(1);
        let topo = f.topology(1);
        let list = build_index_list(&f.ctx(&rec), topo.narrow());
        assert_eq!(list, vec![2, 3, 4, 5, 6]);
        assert_eq!(owned_positions(&rec), vec![1, 2, 3]);

        let rec0 = f.record(0);
        let topo0 = f.topology(0);
        assert_eq!(build_index_list(&f.ctx(&rec0), topo0.narrow()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn periodic_x_wraps_to_the_far_end() {
        let f = Fixture::new([9, 1, 1], ProcessGrid::new(3, 1, 1), 2, 1, Periodicity::X);
        let rec = f.record(0);
        let topo = f.topology(0);
        let list = build_index_list(&f.ctx(&rec), topo.narrow());
        // one node of rank 2 (two dofs), own three nodes, one node of rank 1
        assert_eq!(list, vec![16, 17, 0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn box_positions_cover_the_whole_block() {
        let f = Fixture::new([4, 4, 4], ProcessGrid::new(2, 2, 2), 1, 1, Periodicity::XYZ);
        for rank in 0..8 {
            let rec = f.record(rank);
            let topo = f.topology(rank);
            let ctx = f.ctx(&rec);
            let pos = ghost_positions(&ctx, topo.full());
            assert_eq!(pos, (0..rec.ghost_volume()).collect::<Vec<_>>());
            assert_eq!(build_index_list(&ctx, topo.full()).len(), 64);
        }
    }

    #[test]
    fn star_list_skips_edges_and_corners() {
        let f = Fixture::new([4, 4, 4], ProcessGrid::new(2, 2, 2), 1, 1, Periodicity::NONE);
        let rec = f.record(0);
        let topo = f.topology(0);
        let ctx = f.ctx(&rec);
        let list = build_index_list(&ctx, topo.narrow());
        let pos = ghost_positions(&ctx, topo.narrow());
        // 8 owned plus one face of 4 on each of the three high sides
        assert_eq!(list.len(), 20);
        assert_eq!(pos.len(), 20);
        assert!(list.iter().all(|&g| g < f.bases.total()));
        // first row: two owned entries, then the +x ghost
        assert_eq!(&pos[..3], &[0, 1, 2]);
    }

    #[test]
    fn ghosted_map_matches_owned_range() {
        let f = Fixture::new([6, 4, 2], ProcessGrid::new(3, 2, 1), 1, 1, Periodicity::NONE);
        let rec = f.record(4);
        let topo = f.topology(4);
        let ctx = f.ctx(&rec);
        let map = GhostedIndexMap::build(&ctx, topo.full()).unwrap();
        let owned = f.bases.range(4);
        let got: Vec<usize> = owned_positions(&rec)
            .into_iter()
            .map(|p| map.global(p).unwrap())
            .collect();
        assert_eq!(got, owned.collect::<Vec<_>>());
        assert_eq!(map.at([9, 0, 0]), None);
    }
}

//! Entry-point for structured partitioning.
//!
//! [`solve_process_grid`] factors the process count into an `m x n x p` process
//! grid, and [`ranges`] deals the nodes along each axis out to the processes of
//! that axis.

pub mod ranges;

pub use self::ranges::{AxisDistribution, uniform_range};

use crate::config::Axis;
use crate::grid_error::GridError;
use serde::{Deserialize, Serialize};

/// Process counts per axis. Ranks are numbered `rank = k*m*n + j*m + i`, x fastest.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessGrid {
    pub m: usize,
    pub n: usize,
    pub p: usize,
}

impl ProcessGrid {
    pub const fn new(m: usize, n: usize, p: usize) -> Self {
        Self { m, n, p }
    }

    /// Total number of processes.
    pub const fn total(&self) -> usize {
        self.m * self.n * self.p
    }

    /// Counts as `[m, n, p]`.
    pub const fn counts(&self) -> [usize; 3] {
        [self.m, self.n, self.p]
    }

    /// Process-grid coordinates `[i, j, k]` of `rank`.
    pub const fn coords(&self, rank: usize) -> [usize; 3] {
        let layer = self.m * self.n;
        [rank % self.m, (rank % layer) / self.m, rank / layer]
    }

    /// Rank at process-grid coordinates `[i, j, k]`.
    pub const fn rank_of(&self, coords: [usize; 3]) -> usize {
        coords[2] * self.m * self.n + coords[1] * self.m + coords[0]
    }
}

/// `round(v)` with a floor of one, the seed for every squarish search below.
fn seed(v: f64) -> usize {
    ((0.5 + v) as usize).max(1)
}

/// Largest `a <= start` such that `a * b * fixed == size` for `b = size / (a * fixed)`.
fn search_down(start: usize, fixed: usize, size: usize) -> Option<(usize, usize)> {
    (1..=start).rev().find_map(|a| {
        let b = size / (a * fixed);
        (a * b * fixed == size).then_some((a, b))
    })
}

/// Split `size` processes over two free axes with the third fixed at `fixed`.
///
/// `lead`/`other` are the extents of the two free axes; the lead axis count is
/// seeded at `sqrt(lead * size / (other * fixed))` and searched downward. The
/// larger factor goes to the larger extent.
fn squarish_pair(
    size: usize,
    lead: usize,
    other: usize,
    fixed: usize,
    fixed_axis: &str,
) -> Result<(usize, usize), GridError> {
    let start = seed(((lead as f64) * (size as f64) / ((other * fixed) as f64)).sqrt());
    let (mut a, mut b) = search_down(start, fixed, size).ok_or_else(|| {
        GridError::InvalidPartition(format!("bad {fixed_axis} value: {fixed_axis} = {fixed}"))
    })?;
    if lead > other && a < b {
        std::mem::swap(&mut a, &mut b);
    }
    Ok((a, b))
}

/// Reject inputs no process grid can be solved for: an empty communicator, an
/// empty axis, or a requested axis count outside `1..=size`.
pub fn check_process_counts(
    size: usize,
    extents: [usize; 3],
    requested: [Option<usize>; 3],
) -> Result<(), GridError> {
    if size == 0 {
        return Err(GridError::InvalidArgument(
            "communicator has no processes".into(),
        ));
    }
    for axis in Axis::ALL {
        if extents[axis.index()] == 0 {
            return Err(GridError::InvalidArgument(format!(
                "global {axis} extent must be positive"
            )));
        }
        match requested[axis.index()] {
            Some(0) => {
                return Err(GridError::InvalidArgument(format!(
                    "Non-positive number of processors in {axis} direction: 0"
                )));
            }
            Some(count) if count > size => {
                return Err(GridError::InvalidArgument(format!(
                    "Too many processors in {axis} direction: {count} {size}"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Choose per-axis process counts for `size` processes over a grid of `extents`.
///
/// `requested` holds the counts fixed by the caller (`None` = decide). Fails with
/// [`GridError::InvalidArgument`] on inputs [`check_process_counts`] rejects, and
/// with [`GridError::InvalidPartition`] when no factorization reproduces `size` or when
/// an axis would get more processes than nodes.
pub fn solve_process_grid(
    size: usize,
    extents: [usize; 3],
    requested: [Option<usize>; 3],
) -> Result<ProcessGrid, GridError> {
    check_process_counts(size, extents, requested)?;
    let [mx, ny, pz] = extents;
    let (m, n, p) = match requested {
        [Some(m), Some(n), Some(p)] => {
            if m * n * p != size {
                return Err(GridError::InvalidPartition(format!(
                    "Given bad partition: {m} x {n} x {p} != {size}"
                )));
            }
            (m, n, p)
        }
        [None, Some(n), Some(p)] => (size / (n * p), n, p),
        [Some(m), None, Some(p)] => (m, size / (m * p), p),
        [Some(m), Some(n), None] => (m, n, size / (m * n)),
        [None, None, Some(p)] => {
            let (m, n) = squarish_pair(size, mx, ny, p, "p")?;
            (m, n, p)
        }
        [None, Some(n), None] => {
            let (m, p) = squarish_pair(size, mx, pz, n, "n")?;
            (m, n, p)
        }
        [Some(m), None, None] => {
            let (n, p) = squarish_pair(size, ny, pz, m, "m")?;
            (m, n, p)
        }
        [None, None, None] => {
            let start = seed(
                ((ny as f64) * (ny as f64) * (size as f64) / ((pz * mx) as f64)).cbrt(),
            );
            let n = (1..=start).rev().find(|&n| size % n == 0).unwrap_or(1);
            let (m, p) = squarish_pair(size, mx, pz, n, "n")?;
            (m, n, p)
        }
    };

    let grid = ProcessGrid::new(m, n, p);
    if grid.total() != size {
        return Err(GridError::InvalidPartition(format!(
            "Could not find good partition: {m} x {n} x {p} != {size}"
        )));
    }
    for (name, extent, count) in [("x", mx, m), ("y", ny, n), ("z", pz, p)] {
        if extent < count {
            return Err(GridError::InvalidPartition(format!(
                "Partition in {name} direction is too fine! {extent} {count}"
            )));
        }
    }
    log::debug!("partitioned {size} processes as {m} x {n} x {p} over {mx} x {ny} x {pz}");
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_processes_on_a_cube() {
        let g = solve_process_grid(8, [4, 4, 4], [None; 3]).unwrap();
        assert_eq!(g, ProcessGrid::new(2, 2, 2));
    }

    #[test]
    fn one_fixed_axis_fills_the_rest() {
        let g = solve_process_grid(3, [9, 1, 1], [Some(3), None, None]).unwrap();
        assert_eq!(g, ProcessGrid::new(3, 1, 1));
        let g = solve_process_grid(12, [8, 8, 8], [None, Some(2), Some(3)]).unwrap();
        assert_eq!(g, ProcessGrid::new(2, 2, 3));
    }

    #[test]
    fn larger_extent_gets_larger_factor() {
        let g = solve_process_grid(8, [64, 8, 8], [None, None, Some(1)]).unwrap();
        assert_eq!(g.total(), 8);
        assert!(g.m >= g.n, "{g:?}");
    }

    #[test]
    fn explicit_counts_must_multiply_out() {
        let err = solve_process_grid(8, [4, 4, 4], [Some(2), Some(2), Some(3)]).unwrap_err();
        assert!(matches!(err, GridError::InvalidPartition(_)));
    }

    #[test]
    fn non_divisible_remainder_is_rejected() {
        let err = solve_process_grid(6, [8, 8, 8], [None, Some(4), Some(1)]).unwrap_err();
        assert!(matches!(err, GridError::InvalidPartition(_)));
    }

    #[test]
    fn too_fine_partition_is_rejected() {
        let err = solve_process_grid(4, [2, 8, 8], [Some(4), Some(1), Some(1)]).unwrap_err();
        assert!(matches!(err, GridError::InvalidPartition(_)));
    }

    #[test]
    fn out_of_range_axis_counts_are_invalid_arguments() {
        for requested in [
            [None, Some(0), Some(1)],
            [Some(0), None, None],
            [None, None, Some(0)],
            [Some(5), None, None],
            [Some(1), Some(1), Some(9)],
        ] {
            let err = solve_process_grid(4, [4, 4, 4], requested).unwrap_err();
            assert!(matches!(err, GridError::InvalidArgument(_)), "{requested:?}: {err}");
        }
    }

    #[test]
    fn empty_world_or_axis_is_an_invalid_argument() {
        let err = solve_process_grid(0, [4, 4, 4], [None; 3]).unwrap_err();
        assert!(matches!(err, GridError::InvalidArgument(_)));
        let err = solve_process_grid(2, [4, 0, 4], [None; 3]).unwrap_err();
        assert!(matches!(err, GridError::InvalidArgument(_)));
    }

    #[test]
    fn rank_coordinates_round_trip() {
        let g = ProcessGrid::new(3, 2, 4);
        for rank in 0..g.total() {
            assert_eq!(g.rank_of(g.coords(rank)), rank);
        }
        assert_eq!(g.coords(7), [1, 0, 1]);
    }
}

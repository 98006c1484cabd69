//! Construction inputs for a distributed structured grid.
//!
//! [`GridConfig`] collects everything the construction pipeline consumes: global
//! extents, degrees of freedom per node, stencil width and shape, periodicity,
//! optional per-axis process counts and optional explicit per-axis distributions.
//! Every rank must build from an identical configuration.

use crate::grid_error::GridError;
use crate::partitioning::check_process_counts;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three logical axes. `X` varies fastest in every flattened numbering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in storage order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Position of this axis in `[x, y, z]` arrays.
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Stencil shape.
///
/// `Star` with width 1 is the 7-point stencil: only face neighbors contribute ghost
/// data. `Box` with width 1 is the 27-point stencil including edge and corner
/// neighbors.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StencilType {
    #[default]
    Star,
    Box,
}

/// Per-axis periodicity flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Periodicity {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl Periodicity {
    pub const NONE: Periodicity = Periodicity::new(false, false, false);
    pub const X: Periodicity = Periodicity::new(true, false, false);
    pub const Y: Periodicity = Periodicity::new(false, true, false);
    pub const Z: Periodicity = Periodicity::new(false, false, true);
    pub const XY: Periodicity = Periodicity::new(true, true, false);
    pub const XZ: Periodicity = Periodicity::new(true, false, true);
    pub const YZ: Periodicity = Periodicity::new(false, true, true);
    pub const XYZ: Periodicity = Periodicity::new(true, true, true);

    pub const fn new(x: bool, y: bool, z: bool) -> Self {
        Self { x, y, z }
    }

    /// Whether `axis` wraps around.
    pub const fn is_periodic(self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// How nodes along an axis are dealt out to processes when no explicit list is given.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistributionPolicy {
    /// `extent div count` nodes each, the first `extent mod count` processes get one more.
    #[default]
    Uniform,
    /// Block-aligned chunks. Recognized but not implemented.
    BlockComm,
    /// Remainder nodes placed on the last processes. Recognized but not implemented.
    NodesAtEnd,
}

/// Full description of a grid to construct.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Global node counts `[M, N, P]`.
    pub extents: [usize; 3],
    /// Scalar fields per node.
    pub dof: usize,
    /// Ghost layers on each side.
    pub stencil_width: usize,
    pub stencil_type: StencilType,
    pub periodicity: Periodicity,
    /// Requested process counts per axis; `None` lets the partition solver decide.
    pub procs: [Option<usize>; 3],
    /// Explicit owned sizes per process along each axis.
    pub sizes: [Option<Vec<usize>>; 3],
    pub policy: DistributionPolicy,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            extents: [1, 1, 1],
            dof: 1,
            stencil_width: 1,
            stencil_type: StencilType::Star,
            periodicity: Periodicity::NONE,
            procs: [None, None, None],
            sizes: [None, None, None],
            policy: DistributionPolicy::Uniform,
        }
    }
}

impl GridConfig {
    /// A grid of `m x n x p` nodes with default settings otherwise.
    pub fn new(m: usize, n: usize, p: usize) -> Self {
        Self {
            extents: [m, n, p],
            ..Default::default()
        }
    }

    pub fn with_dof(mut self, dof: usize) -> Self {
        self.dof = dof;
        self
    }

    pub fn with_stencil(mut self, stencil_type: StencilType, width: usize) -> Self {
        self.stencil_type = stencil_type;
        self.stencil_width = width;
        self
    }

    pub fn with_periodicity(mut self, periodicity: Periodicity) -> Self {
        self.periodicity = periodicity;
        self
    }

    /// Fix the number of processes along `axis`.
    pub fn with_procs(mut self, axis: Axis, count: usize) -> Self {
        self.procs[axis.index()] = Some(count);
        self
    }

    /// Give the owned node count of every process along `axis`.
    pub fn with_sizes(mut self, axis: Axis, sizes: Vec<usize>) -> Self {
        self.sizes[axis.index()] = Some(sizes);
        self
    }

    pub fn with_policy(mut self, policy: DistributionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn extent(&self, axis: Axis) -> usize {
        self.extents[axis.index()]
    }

    /// Check the rank-independent preconditions against a communicator of `size` ranks.
    pub fn validate(&self, size: usize) -> Result<(), GridError> {
        check_process_counts(size, self.extents, self.procs)?;
        if self.dof < 1 {
            return Err(GridError::InvalidArgument(format!(
                "Must have 1 or more degrees of freedom per node: {}",
                self.dof
            )));
        }
        for axis in Axis::ALL {
            if self.sizes[axis.index()].is_some() && self.procs[axis.index()].is_none() {
                return Err(GridError::InvalidArgument(format!(
                    "explicit {axis} sizes require a fixed process count along {axis}"
                )));
            }
        }
        Ok(())
    }
}

#![cfg_attr(docsrs, feature(doc_cfg))]
//! # halo-grid
//!
//! halo-grid builds the geometry and communication plan of a distributed
//! structured 3-D grid. Given global extents, degrees of freedom per node, a
//! stencil width and shape, periodicity and a communicator, every rank computes:
//!
//! - the process grid `m x n x p` and the owned node ranges along each axis,
//! - its ghost-extended region and the 26-neighbor process topology,
//! - the ordered index lists that drive global-to-local (halo fill) and
//!   local-to-global scatters, and the local remap list,
//! - the permutation between partition-contiguous and natural ordering.
//!
//! Data movement itself is left to the caller; this crate only produces the
//! index lists.
//!
//! ## Usage
//!
//! ```
//! use halo_grid::prelude::*;
//!
//! let cfg = GridConfig::new(8, 8, 8)
//!     .with_dof(2)
//!     .with_stencil(StencilType::Box, 1)
//!     .with_periodicity(Periodicity::XYZ);
//! let grid = DistributedGrid::build(&cfg, &NoComm)?;
//! assert_eq!(grid.global_size(), 8 * 8 * 8 * 2);
//! # Ok::<(), GridError>(())
//! ```
//!
//! Multi-rank runs use `RayonComm::world(n)` (one thread per rank) or `MpiComm`
//! with the `mpi-support` feature.

pub mod algs;
pub mod config;
pub mod data;
pub mod grid;
pub mod grid_error;
pub mod partitioning;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{CommTag, Communicator, GridCommTags, NoComm, RayonComm};
    pub use crate::config::{Axis, DistributionPolicy, GridConfig, Periodicity, StencilType};
    pub use crate::data::index_list::{BaseOffsets, GhostedIndexMap, ScatterLists};
    pub use crate::data::natural::NaturalOrdering;
    pub use crate::grid::{DistributedGrid, GridInfo, GridLayout};
    pub use crate::grid_error::GridError;
    pub use crate::partitioning::{AxisDistribution, ProcessGrid, solve_process_grid};
    pub use crate::topology::neighbors::{NeighborSlot, NeighborTable, NeighborTopology};
    pub use crate::topology::ownership::OwnershipRecord;
}

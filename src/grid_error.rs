//! GridError: Unified error type for halo-grid public APIs
//!
//! Every construction stage reports failures through this type. Construction is
//! all-or-nothing, so any error aborts the grid build on the rank that detects it.

use crate::config::{Axis, DistributionPolicy};
use thiserror::Error;

/// Unified error type for grid construction and queries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    /// A configuration value is out of range (dof, process counts, extents).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// No process grid reproduces the process count, or an axis is partitioned too finely.
    #[error("Invalid partition: {0}")]
    InvalidPartition(String),
    /// An owned chunk along `axis` is narrower than the stencil width.
    #[error("{axis} width {width} is too thin for stencil width {stencil}")]
    StencilTooWide {
        axis: Axis,
        width: usize,
        stencil: usize,
    },
    /// The selected distribution policy is recognized but not implemented.
    #[error("Distribution policy {0:?} is not supported")]
    UnsupportedDistribution(DistributionPolicy),
    /// A collective exchange with `neighbor` delivered no data or malformed data.
    #[error("Communication error with rank {neighbor}: {message}")]
    CommError { neighbor: usize, message: String },
    /// A permutation lookup fell outside the global index space.
    #[error("Index {index} is out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
}

//! Ownership ranges along one axis.
//!
//! An [`AxisDistribution`] records the owned node count of every process along an
//! axis together with the prefix-sum starts, so both "my range" and "neighbor's
//! width" lookups are O(1).

use crate::config::{Axis, DistributionPolicy};
use crate::grid_error::GridError;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Closed-form uniform range of process `coord` out of `count` along an axis of
/// `extent` nodes: the first `extent mod count` processes own one extra node.
pub fn uniform_range(extent: usize, count: usize, coord: usize) -> Range<usize> {
    let base = extent / count;
    let rem = extent % count;
    let start = coord * base + coord.min(rem);
    let len = base + usize::from(coord < rem);
    start..start + len
}

/// Owned sizes and starts of every process along one axis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisDistribution {
    sizes: Vec<usize>,
    starts: Vec<usize>,
}

impl AxisDistribution {
    fn from_sizes(sizes: Vec<usize>) -> Self {
        let starts = sizes
            .iter()
            .scan(0usize, |acc, &s| {
                let start = *acc;
                *acc += s;
                Some(start)
            })
            .collect();
        Self { sizes, starts }
    }

    /// Default distribution of `extent` nodes over `count` processes.
    pub fn uniform(extent: usize, count: usize) -> Self {
        Self::from_sizes(
            (0..count)
                .map(|i| uniform_range(extent, count, i).len())
                .collect(),
        )
    }

    /// User-supplied owned sizes. The list must have one positive entry per
    /// process and sum to `extent`.
    pub fn explicit(
        axis: Axis,
        extent: usize,
        count: usize,
        sizes: &[usize],
    ) -> Result<Self, GridError> {
        if sizes.len() != count {
            return Err(GridError::InvalidArgument(format!(
                "{axis} distribution lists {} sizes for {count} processes",
                sizes.len()
            )));
        }
        if let Some(i) = sizes.iter().position(|&s| s == 0) {
            return Err(GridError::InvalidPartition(format!(
                "process {i} along {axis} would own no nodes"
            )));
        }
        let total: usize = sizes.iter().sum();
        if total != extent {
            return Err(GridError::InvalidPartition(format!(
                "{axis} distribution sums to {total}, expected {extent}"
            )));
        }
        Ok(Self::from_sizes(sizes.to_vec()))
    }

    /// Distribution for one axis: an explicit list wins, otherwise `policy` decides.
    pub fn resolve(
        axis: Axis,
        extent: usize,
        count: usize,
        explicit: Option<&[usize]>,
        policy: DistributionPolicy,
    ) -> Result<Self, GridError> {
        if policy != DistributionPolicy::Uniform {
            return Err(GridError::UnsupportedDistribution(policy));
        }
        match explicit {
            Some(sizes) => Self::explicit(axis, extent, count, sizes),
            None => Ok(Self::uniform(extent, count)),
        }
    }

    /// Number of processes along the axis.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Owned node count of process `coord`.
    pub fn size(&self, coord: usize) -> usize {
        self.sizes[coord]
    }

    /// Owned node range of process `coord`.
    pub fn range(&self, coord: usize) -> Range<usize> {
        let start = self.starts[coord];
        start..start + self.sizes[coord]
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Total nodes along the axis.
    pub fn extent(&self) -> usize {
        self.sizes.iter().sum()
    }

    /// Every process must own at least `width` nodes so the halo only ever
    /// reaches the adjacent process.
    pub fn check_stencil(&self, axis: Axis, width: usize) -> Result<(), GridError> {
        match self.sizes.iter().copied().find(|&s| s < width) {
            Some(thin) => Err(GridError::StencilTooWide {
                axis,
                width: thin,
                stencil: width,
            }),
            None => Ok(()),
        }
    }
}

//! Natural (lexicographic) ordering of the global index space.
//!
//! The partition-contiguous numbering gives each rank one contiguous block. The
//! natural numbering is `i + j*M*dof + k*M*N*dof` over raw array coordinates
//! (`i` already scaled by `dof`), independent of the partition. Every rank
//! enumerates its owned entries, computes their natural indices and the lists
//! are all-gathered into the full permutation.

use crate::algs::communicator::{CommTag, Communicator};
use crate::grid_error::GridError;
use crate::topology::ownership::OwnershipRecord;
use serde::{Deserialize, Serialize};

/// Natural index of every owned entry, in partition-contiguous order.
pub fn local_natural_indices(record: &OwnershipRecord, extents: [usize; 3]) -> Vec<usize> {
    let row = extents[0] * record.dof;
    let layer = row * extents[1];
    let mut out = Vec::with_capacity(record.owned_volume());
    for k in record.owned[2].clone() {
        for j in record.owned[1].clone() {
            let base = j * row + k * layer;
            out.extend(record.x_scaled().map(|i| base + i));
        }
    }
    out
}

/// Bijection between partition-contiguous and natural global indices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NaturalOrdering {
    to_natural: Vec<usize>,
    to_partition: Vec<usize>,
}

impl NaturalOrdering {
    /// Collective: gather every rank's natural indices. `volumes[r]` is the
    /// owned volume of rank `r`.
    pub fn build<C: Communicator + ?Sized>(
        comm: &C,
        tag: CommTag,
        record: &OwnershipRecord,
        extents: [usize; 3],
        volumes: &[usize],
    ) -> Result<Self, GridError> {
        let local: Vec<u64> = local_natural_indices(record, extents)
            .into_iter()
            .map(|i| i as u64)
            .collect();
        let gathered = comm.all_gather_varcount(tag, &local, volumes)?;
        Self::from_gathered(gathered.into_iter().map(|i| i as usize).collect())
    }

    /// Build from the full partition-to-natural table, checking that it is a
    /// permutation.
    pub fn from_gathered(to_natural: Vec<usize>) -> Result<Self, GridError> {
        let len = to_natural.len();
        let mut to_partition = vec![usize::MAX; len];
        for (p, &nat) in to_natural.iter().enumerate() {
            let slot = to_partition
                .get_mut(nat)
                .ok_or(GridError::IndexOutOfRange { index: nat, len })?;
            if *slot != usize::MAX {
                return Err(GridError::InvalidPartition(format!(
                    "natural index {nat} is owned by partition indices {} and {p}",
                    *slot
                )));
            }
            *slot = p;
        }
        Ok(Self {
            to_natural,
            to_partition,
        })
    }

    /// Natural index of partition index `p`.
    pub fn to_natural(&self, p: usize) -> Result<usize, GridError> {
        self.to_natural
            .get(p)
            .copied()
            .ok_or(GridError::IndexOutOfRange {
                index: p,
                len: self.len(),
            })
    }

    /// Partition index of natural index `n`.
    pub fn to_partition(&self, n: usize) -> Result<usize, GridError> {
        self.to_partition
            .get(n)
            .copied()
            .ok_or(GridError::IndexOutOfRange {
                index: n,
                len: self.len(),
            })
    }

    pub fn partition_to_natural(&self, indices: &[usize]) -> Result<Vec<usize>, GridError> {
        indices.iter().map(|&p| self.to_natural(p)).collect()
    }

    pub fn natural_to_partition(&self, indices: &[usize]) -> Result<Vec<usize>, GridError> {
        indices.iter().map(|&n| self.to_partition(n)).collect()
    }

    /// Partition-to-natural table, indexed by partition index.
    pub fn as_slice(&self) -> &[usize] {
        &self.to_natural
    }

    pub fn len(&self) -> usize {
        self.to_natural.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_natural.is_empty()
    }
}

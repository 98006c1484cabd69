//! Distributed structured grid: construction pipeline and descriptor.
//!
//! [`GridLayout`] is the purely local part (process grid, per-axis distributions,
//! ownership record and neighbor topology); every rank computes it from the
//! shared configuration without communication. [`DistributedGrid::build`] then
//! runs the two collectives (owned volumes, natural indices) and derives every
//! index list handed to the scatter machinery.

use crate::algs::communicator::{Communicator, GridCommTags};
use crate::config::{Axis, GridConfig, Periodicity, StencilType};
use crate::data::index_list::{
    BaseOffsets, GhostedIndexMap, IndexContext, ScatterLists, build_index_list, ghost_positions,
    owned_positions,
};
use crate::data::natural::NaturalOrdering;
use crate::grid_error::GridError;
use crate::partitioning::{AxisDistribution, ProcessGrid, solve_process_grid};
use crate::topology::ghost::GhostRange;
use crate::topology::neighbors::{NeighborTable, NeighborTopology};
use crate::topology::ownership::OwnershipRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Communication-free part of the construction, identical in shape on every rank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    pub procs: ProcessGrid,
    pub dists: [AxisDistribution; 3],
    pub record: OwnershipRecord,
    pub neighbors: NeighborTopology,
}

impl GridLayout {
    /// Partition, distribute and resolve the neighborhood of `rank` out of `size`.
    pub fn new(config: &GridConfig, size: usize, rank: usize) -> Result<Self, GridError> {
        config.validate(size)?;
        if rank >= size {
            return Err(GridError::InvalidArgument(format!(
                "rank {rank} outside a communicator of {size}"
            )));
        }
        let procs = solve_process_grid(size, config.extents, config.procs)?;

        let explicit: Vec<Axis> = Axis::ALL
            .into_iter()
            .filter(|a| config.sizes[a.index()].is_some())
            .collect();
        if !explicit.is_empty() && explicit.len() < Axis::ALL.len() {
            log::warn!(
                "explicit distributions given for {explicit:?} only; remaining axes use the uniform distribution"
            );
        }

        let counts = procs.counts();
        let [dx, dy, dz] = Axis::ALL.map(|axis| -> Result<AxisDistribution, GridError> {
            let a = axis.index();
            let dist = AxisDistribution::resolve(
                axis,
                config.extents[a],
                counts[a],
                config.sizes[a].as_deref(),
                config.policy,
            )?;
            dist.check_stencil(axis, config.stencil_width)?;
            Ok(dist)
        });
        let dists = [dx?, dy?, dz?];

        let record = OwnershipRecord::new(
            procs.coords(rank),
            &dists,
            config.stencil_width,
            config.periodicity,
            config.dof,
        );
        log::debug!(
            "rank {rank}: owned {:?}, ghost {:?}",
            record.owned,
            record.ghost
        );
        let neighbors = NeighborTopology::resolve(&procs, rank, config.periodicity);
        Ok(Self {
            procs,
            dists,
            record,
            neighbors,
        })
    }

    /// Owned volume (entries, `dof` included) of every rank.
    pub fn volumes(&self) -> Vec<usize> {
        (0..self.procs.total())
            .map(|r| {
                let [i, j, k] = self.procs.coords(r);
                self.dists[0].size(i)
                    * self.dists[1].size(j)
                    * self.dists[2].size(k)
                    * self.record.dof
            })
            .collect()
    }
}

/// Descriptive values of one rank's grid, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridInfo {
    pub rank: usize,
    /// `[M, N, P]`.
    pub extents: [usize; 3],
    /// `[m, n, p]`.
    pub procs: [usize; 3],
    pub dof: usize,
    pub stencil_width: usize,
    pub stencil_type: StencilType,
    pub periodicity: Periodicity,
    /// Owned ranges, x scaled by `dof`.
    pub owned: [Range<usize>; 3],
    /// Ghost ranges, x scaled by `dof`.
    pub ghost: [GhostRange; 3],
}

impl fmt::Display for GridInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [mx, ny, pz] = self.extents;
        let [m, n, p] = self.procs;
        writeln!(
            f,
            "Processor [{}] M {mx} N {ny} P {pz} m {m} n {n} p {p} w {} s {}",
            self.rank, self.dof, self.stencil_width
        )?;
        let [x, y, z] = &self.owned;
        write!(
            f,
            "X range: {} {}, Y range: {} {}, Z range: {} {}",
            x.start, x.end, y.start, y.end, z.start, z.end
        )
    }
}

/// One rank's view of a distributed structured grid.
#[derive(Clone, Debug)]
pub struct DistributedGrid {
    config: GridConfig,
    rank: usize,
    layout: GridLayout,
    bases: BaseOffsets,
    global_to_local: ScatterLists,
    local_to_global: ScatterLists,
    remap: Vec<usize>,
    ghosted: GhostedIndexMap,
    natural: NaturalOrdering,
}

impl DistributedGrid {
    /// Collective: every rank of `comm` must call this with an identical `config`.
    pub fn build<C>(config: &GridConfig, comm: &C) -> Result<Self, GridError>
    where
        C: Communicator + ?Sized,
    {
        Self::build_with_tags(config, comm, GridCommTags::default())
    }

    /// [`DistributedGrid::build`] with explicit message tags.
    pub fn build_with_tags<C: Communicator + ?Sized>(
        config: &GridConfig,
        comm: &C,
        tags: GridCommTags,
    ) -> Result<Self, GridError> {
        let rank = comm.rank();
        let layout = GridLayout::new(config, comm.size(), rank)?;
        let volumes = layout.volumes();

        let gathered = comm.all_gather(tags.volumes, volumes[rank] as u64)?;
        for (peer, (&got, &want)) in gathered.iter().zip(&volumes).enumerate() {
            if got as usize != want {
                return Err(GridError::CommError {
                    neighbor: peer,
                    message: format!(
                        "rank {peer} owns {got} entries but {want} were expected; configurations differ"
                    ),
                });
            }
        }
        let bases = BaseOffsets::from_volumes(&volumes);

        let ctx = IndexContext {
            grid: layout.procs,
            dists: &layout.dists,
            record: &layout.record,
            bases: &bases,
            width: config.stencil_width,
        };
        let view = layout.neighbors.view(config.stencil_type);
        let global_to_local = ScatterLists {
            from: build_index_list(&ctx, view),
            to: ghost_positions(&ctx, view),
        };
        let owned = owned_positions(&layout.record);
        let local_to_global = ScatterLists {
            from: owned.clone(),
            to: bases.range(rank).collect(),
        };
        let ghosted = GhostedIndexMap::build(&ctx, layout.neighbors.full())?;
        log::debug!(
            "rank {rank}: {} halo entries, {} owned, {} ghosted",
            global_to_local.len(),
            local_to_global.len(),
            ghosted.len()
        );

        let natural =
            NaturalOrdering::build(comm, tags.natural, &layout.record, config.extents, &volumes)?;

        let [m, n, p] = layout.procs.counts();
        log::info!(
            "rank {rank}: built {}x{}x{} grid on {m}x{n}x{p} processes ({} entries)",
            config.extents[0],
            config.extents[1],
            config.extents[2],
            bases.total()
        );
        Ok(Self {
            config: config.clone(),
            rank,
            layout,
            bases,
            global_to_local,
            local_to_global,
            remap: owned,
            ghosted,
            natural,
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn process_grid(&self) -> ProcessGrid {
        self.layout.procs
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Owned node counts of the processes along x.
    pub fn lx(&self) -> &[usize] {
        self.layout.dists[0].sizes()
    }

    /// Owned node counts of the processes along y.
    pub fn ly(&self) -> &[usize] {
        self.layout.dists[1].sizes()
    }

    /// Owned node counts of the processes along z.
    pub fn lz(&self) -> &[usize] {
        self.layout.dists[2].sizes()
    }

    pub fn ownership(&self) -> &OwnershipRecord {
        &self.layout.record
    }

    /// Neighbor table filtered by the stencil shape.
    pub fn neighbors(&self) -> &NeighborTable {
        self.layout.neighbors.view(self.config.stencil_type)
    }

    /// Both neighbor tables.
    pub fn topology(&self) -> &NeighborTopology {
        &self.layout.neighbors
    }

    pub fn base_offsets(&self) -> &BaseOffsets {
        &self.bases
    }

    /// Global indices (`from`) filling ghosted-block positions (`to`).
    pub fn global_to_local(&self) -> &ScatterLists {
        &self.global_to_local
    }

    /// Owned ghosted-block positions (`from`) and their global indices (`to`).
    pub fn local_to_global(&self) -> &ScatterLists {
        &self.local_to_global
    }

    /// Owned positions inside the ghosted block, used to remap local-to-local plans.
    pub fn remap(&self) -> &[usize] {
        &self.remap
    }

    pub fn ghosted_map(&self) -> &GhostedIndexMap {
        &self.ghosted
    }

    pub fn natural(&self) -> &NaturalOrdering {
        &self.natural
    }

    /// Entries over all ranks.
    pub fn global_size(&self) -> usize {
        self.bases.total()
    }

    pub fn info(&self) -> GridInfo {
        let rec = &self.layout.record;
        GridInfo {
            rank: self.rank,
            extents: self.config.extents,
            procs: self.layout.procs.counts(),
            dof: self.config.dof,
            stencil_width: self.config.stencil_width,
            stencil_type: self.config.stencil_type,
            periodicity: self.config.periodicity,
            owned: [rec.x_scaled(), rec.owned[1].clone(), rec.owned[2].clone()],
            ghost: [rec.ghost_x_scaled(), rec.ghost[1], rec.ghost[2]],
        }
    }
}

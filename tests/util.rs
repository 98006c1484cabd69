#![allow(dead_code)]
use halo_grid::prelude::*;
use std::thread;

/// Build `cfg` on every rank of a fresh in-process world, one thread per rank.
pub fn build_world(cfg: &GridConfig, size: usize) -> Vec<Result<DistributedGrid, GridError>> {
    let world = RayonComm::world(size);
    thread::scope(|s| {
        let handles: Vec<_> = world
            .iter()
            .map(|comm| s.spawn(move || DistributedGrid::build(cfg, comm)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank thread panicked"))
            .collect()
    })
}

/// Like [`build_world`], panicking on the first rank that fails.
pub fn build_all(cfg: &GridConfig, size: usize) -> Vec<DistributedGrid> {
    build_world(cfg, size)
        .into_iter()
        .enumerate()
        .map(|(rank, r)| r.unwrap_or_else(|e| panic!("rank {rank}: {e}")))
        .collect()
}

/// Natural index of field `field` at node `node`, wrapping periodic axes.
/// `None` when the node lies outside a non-periodic domain.
pub fn natural_index(cfg: &GridConfig, node: [isize; 3], field: usize) -> Option<usize> {
    let mut wrapped = [0usize; 3];
    for axis in Axis::ALL {
        let a = axis.index();
        let extent = cfg.extents[a] as isize;
        wrapped[a] = if (0..extent).contains(&node[a]) {
            node[a] as usize
        } else if cfg.periodicity.is_periodic(axis) {
            node[a].rem_euclid(extent) as usize
        } else {
            return None;
        };
    }
    let [m, n, _] = cfg.extents;
    let dof = cfg.dof;
    Some(wrapped[0] * dof + field + wrapped[1] * m * dof + wrapped[2] * m * n * dof)
}

/// Every halo entry of `grid` must carry the global index of the node that sits
/// at its ghosted-block position.
pub fn assert_halo_matches_natural(cfg: &GridConfig, grid: &DistributedGrid) {
    let rec = grid.ownership();
    let dof = rec.dof as isize;
    let [gx, gy, _] = rec.ghost_dims();
    let lists = grid.global_to_local();
    assert_eq!(lists.from.len(), lists.to.len());
    for (&g, &pos) in lists.from.iter().zip(&lists.to) {
        let x = rec.ghost[0].start * dof + (pos % gx) as isize;
        let y = rec.ghost[1].start + ((pos / gx) % gy) as isize;
        let z = rec.ghost[2].start + (pos / (gx * gy)) as isize;
        let node = [x.div_euclid(dof), y, z];
        let want = natural_index(cfg, node, x.rem_euclid(dof) as usize)
            .unwrap_or_else(|| panic!("rank {}: position {pos} lies outside the domain", grid.rank()));
        assert_eq!(
            grid.natural().to_natural(g).unwrap(),
            want,
            "rank {} position {pos} global {g}",
            grid.rank()
        );
    }
}

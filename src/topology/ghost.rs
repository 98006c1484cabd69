//! Ghost-region extension of an owned range.
//!
//! Along a non-periodic axis the ghost range is clipped to the domain, so a
//! process on the boundary gets no ghost layers on that side. Along a periodic
//! axis the ghost range always extends by the full width; coordinates outside
//! `[0, extent)` are realized through the wrapped neighbor ranks, never by
//! wrapping the coordinates themselves.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Half-open ghost-extended range in node coordinates. May start below zero or
/// end past the extent on a periodic axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GhostRange {
    pub start: isize,
    pub end: isize,
}

impl GhostRange {
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether the node range `owned` lies inside this ghost range.
    pub fn contains_range(&self, owned: &Range<usize>) -> bool {
        self.start <= owned.start as isize && owned.end as isize <= self.end
    }

    /// Ghost layers below the owned range.
    pub fn low_width(&self, owned: &Range<usize>) -> usize {
        (owned.start as isize - self.start) as usize
    }

    /// Ghost layers above the owned range.
    pub fn high_width(&self, owned: &Range<usize>) -> usize {
        (self.end - owned.end as isize) as usize
    }
}

/// Extend `owned` by `width` nodes on both sides along an axis of `extent` nodes.
pub fn ghost_range(owned: &Range<usize>, width: usize, periodic: bool, extent: usize) -> GhostRange {
    let (start, end) = (owned.start as isize, owned.end as isize);
    let w = width as isize;
    if periodic {
        GhostRange {
            start: start - w,
            end: end + w,
        }
    } else {
        GhostRange {
            start: (start - w).max(0),
            end: (end + w).min(extent as isize),
        }
    }
}

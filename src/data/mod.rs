//! Index data produced for the halo exchange and natural-order output.

pub mod index_list;
pub mod natural;

pub use index_list::{BaseOffsets, GhostedIndexMap, IndexContext, ScatterLists, build_index_list};
pub use natural::NaturalOrdering;

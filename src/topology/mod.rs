//! Topology module: ownership, ghost regions and process neighborhoods.

pub mod ghost;
pub mod neighbors;
pub mod ownership;

pub use ghost::{GhostRange, ghost_range};
pub use neighbors::{NeighborSlot, NeighborTable, NeighborTopology};
pub use ownership::OwnershipRecord;

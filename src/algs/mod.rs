//! Communication layer used during grid construction.

pub mod collective;
pub mod communicator;
pub mod wire;

pub use communicator::{CommTag, Communicator, GridCommTags, NoComm, RayonComm, Wait};

//! Data models for containers, blobs, snapshots and blocks.

mod blob;
mod block;
mod container;
mod listing;

pub use blob::*;
pub use block::*;
pub use container::*;
pub use listing::*;

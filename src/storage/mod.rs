//! Storage layer backing the in-memory blob service.

mod extent;
mod gc;
mod metadata;

pub use extent::*;
pub use gc::*;
pub use metadata::*;

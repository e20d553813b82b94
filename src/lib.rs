//! Blob snapshot sample.
//!
//! Commits a block blob, snapshots it, rewrites one block, reads the frozen
//! snapshot back and deletes it, all through the [`BlobService`] trait. The
//! crate ships [`MemoryBlobService`], an in-memory model of the block-blob and
//! snapshot contract.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use blob_snapshot_sample::{Config, MemoryBlobService, SnapshotSample, SNAPSHOT_SEQUENCE};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let service = MemoryBlobService::from_config(&config).unwrap();
//!     let mut sample = SnapshotSample::new(Arc::new(service), config);
//!     let outputs = sample.run(&SNAPSHOT_SEQUENCE).await.unwrap();
//!     sample.verify_outcome(&outputs).unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod sample;
pub mod service;
pub mod storage;

// Re-exports for convenience
pub use config::{Args, BlockPlan, Config, DEFAULT_ACCOUNT, DEFAULT_BLOB, DEFAULT_CONTAINER};
pub use error::{ErrorCode, SampleError, SampleResult, StorageError, StorageResult};
pub use sample::{SampleState, SnapshotSample, Step, StepOutput, SNAPSHOT_SEQUENCE};
pub use service::{BlobService, MemoryBlobService, MemoryBlobServiceBuilder};
pub use storage::{
    ExtentStore, GarbageCollector, GcReport, MemoryExtentStore, MemoryMetadataStore, MetadataStore,
};

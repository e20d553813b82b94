//! The blob service the sample talks to.
//!
//! [`BlobService`] is the collaborator seam: the sample only ever calls these
//! operations. [`MemoryBlobService`] implements them over the in-memory
//! metadata and extent stores.

mod commit;
mod memory;

pub use commit::resolve_block_list;
pub use memory::{MemoryBlobService, MemoryBlobServiceBuilder};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::models::{
    BlobItem, BlockList, BlockListType, BlockListing, DeleteBlobOptions, ListBlobsOptions,
};

/// Blob service operations consumed by the snapshot sample.
#[async_trait]
pub trait BlobService: Send + Sync {
    /// Creates the container unless it exists. Returns whether it was created.
    async fn create_container_if_not_exists(&self, container: &str) -> StorageResult<bool>;

    /// Deletes the container with all of its blobs and snapshots.
    async fn delete_container(&self, container: &str) -> StorageResult<()>;

    /// Stages a block for a later commit. Does not change the blob's content.
    async fn stage_block(
        &self,
        container: &str,
        blob: &str,
        block_id: &str,
        content: Bytes,
    ) -> StorageResult<()>;

    /// Replaces the blob's content with the concatenation of the listed blocks.
    async fn commit_block_list(
        &self,
        container: &str,
        blob: &str,
        block_list: &BlockList,
    ) -> StorageResult<()>;

    /// Reports the blob's committed and/or staged blocks.
    async fn get_block_list(
        &self,
        container: &str,
        blob: &str,
        list_type: BlockListType,
    ) -> StorageResult<BlockListing>;

    /// Writes the whole blob in one call, discarding any staged blocks.
    async fn upload_blob(&self, container: &str, blob: &str, content: Bytes) -> StorageResult<()>;

    /// Reads the current content, or a snapshot's content when a token is given.
    async fn read_blob(
        &self,
        container: &str,
        blob: &str,
        snapshot: Option<&str>,
    ) -> StorageResult<Bytes>;

    /// Reads the content as UTF-8 text.
    async fn read_text(
        &self,
        container: &str,
        blob: &str,
        snapshot: Option<&str>,
    ) -> StorageResult<String> {
        let content = self.read_blob(container, blob, snapshot).await?;
        String::from_utf8(content.to_vec()).map_err(|_| {
            StorageError::with_message(ErrorCode::InvalidInput, "Blob content is not valid UTF-8")
        })
    }

    /// Freezes the blob's current content and returns the snapshot token.
    async fn create_snapshot(&self, container: &str, blob: &str) -> StorageResult<String>;

    /// Deletes the blob, one of its snapshots, or its snapshots.
    async fn delete_blob(
        &self,
        container: &str,
        blob: &str,
        options: &DeleteBlobOptions,
    ) -> StorageResult<()>;

    /// Lists the container's blobs, optionally with one entry per snapshot.
    async fn list_blobs(
        &self,
        container: &str,
        options: &ListBlobsOptions,
    ) -> StorageResult<Vec<BlobItem>>;
}

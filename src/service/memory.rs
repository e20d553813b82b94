//! In-memory blob service.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::config::{Config, DEFAULT_ACCOUNT, DEFAULT_BLOB_ENDPOINT};
use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::models::{
    validate_blob_name, validate_container_name, BlobItem, BlobModel, BlockInfo, BlockList,
    BlockListType, BlockListing, BlockModel, BlockState, ContainerModel, DeleteBlobOptions,
    DeleteSnapshots, ListBlobsOptions, MAX_BLOCK_ID_LENGTH,
};
use crate::storage::{
    read_chunks, ExtentStore, GarbageCollector, GcReport, MemoryExtentStore,
    MemoryMetadataStore, MetadataStore,
};

use super::{resolve_block_list, BlobService};

/// Blob service backed by the in-memory metadata and extent stores.
pub struct MemoryBlobService {
    account: String,
    endpoint: Url,
    metadata: Arc<dyn MetadataStore>,
    extents: Arc<dyn ExtentStore>,
    gc: GarbageCollector,
}

impl MemoryBlobService {
    /// Creates a service with fresh in-memory stores for the configured account.
    pub fn from_config(config: &Config) -> StorageResult<Self> {
        MemoryBlobServiceBuilder::new()
            .account(&config.account)
            .endpoint(&config.endpoint)
            .build()
    }

    /// Creates a service over the given stores.
    pub fn with_storage(
        account: impl Into<String>,
        endpoint: Url,
        metadata: Arc<dyn MetadataStore>,
        extents: Arc<dyn ExtentStore>,
    ) -> Self {
        let gc = GarbageCollector::new(metadata.clone(), extents.clone());
        Self {
            account: account.into(),
            endpoint,
            metadata,
            extents,
            gc,
        }
    }

    /// Returns the account this service stores blobs under.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Bytes currently held by the extent store.
    pub async fn stored_bytes(&self) -> u64 {
        self.extents.total_size().await
    }

    /// Runs one garbage collection pass over the extent store.
    pub async fn collect_garbage(&self) -> GcReport {
        self.gc.collect().await
    }

    /// Builds the URL of a listing entry.
    fn blob_url(&self, blob: &BlobModel) -> String {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&self.account)
                .push(&blob.container)
                .extend(blob.name.split('/'));
        }
        if blob.is_snapshot() {
            url.set_query(Some(&format!("snapshot={}", blob.snapshot)));
        }
        url.to_string()
    }

    async fn blob_content(&self, blob: &BlobModel) -> StorageResult<Bytes> {
        read_chunks(self.extents.as_ref(), &blob.extent_chunks).await
    }

    async fn delete_snapshots_of(&self, container: &str, blob: &str) -> StorageResult<usize> {
        let snapshots = self
            .metadata
            .list_snapshots(&self.account, container, blob)
            .await?;
        for snapshot in &snapshots {
            self.metadata
                .delete_blob(&self.account, container, blob, &snapshot.snapshot)
                .await?;
        }
        Ok(snapshots.len())
    }
}

#[async_trait]
impl BlobService for MemoryBlobService {
    async fn create_container_if_not_exists(&self, container: &str) -> StorageResult<bool> {
        validate_container_name(container)?;

        if self.metadata.container_exists(&self.account, container).await {
            return Ok(false);
        }

        let model = ContainerModel::new(self.account.clone(), container.to_string());
        match self.metadata.create_container(model).await {
            Ok(()) => {
                debug!(container, "Created container");
                Ok(true)
            }
            Err(e) if e.code == ErrorCode::ContainerAlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete_container(&self, container: &str) -> StorageResult<()> {
        self.metadata.delete_container(&self.account, container).await
    }

    async fn stage_block(
        &self,
        container: &str,
        blob: &str,
        block_id: &str,
        content: Bytes,
    ) -> StorageResult<()> {
        validate_blob_name(blob)?;
        if block_id.is_empty() || block_id.len() > MAX_BLOCK_ID_LENGTH {
            return Err(StorageError::with_message(
                ErrorCode::InvalidBlockId,
                format!("Block ID must be 1 to {} bytes", MAX_BLOCK_ID_LENGTH),
            ));
        }
        if !self.metadata.container_exists(&self.account, container).await {
            return Err(StorageError::new(ErrorCode::ContainerNotFound));
        }

        let size = content.len() as u64;
        let extent_chunk = self.extents.write(content).await?;
        let block = BlockModel::new(
            self.account.clone(),
            container.to_string(),
            blob.to_string(),
            block_id.to_string(),
            size,
            extent_chunk,
        );
        self.metadata.stage_block(block).await?;

        debug!(container, blob, block_id, size, "Staged block");
        Ok(())
    }

    async fn commit_block_list(
        &self,
        container: &str,
        blob: &str,
        block_list: &BlockList,
    ) -> StorageResult<()> {
        validate_blob_name(blob)?;

        let existing = match self.metadata.get_blob(&self.account, container, blob, "").await {
            Ok(existing) => Some(existing),
            Err(e) if e.code == ErrorCode::BlobNotFound => None,
            Err(e) => return Err(e),
        };
        let staged = self
            .metadata
            .get_staged_blocks(&self.account, container, blob)
            .await?;
        let committed = existing
            .as_ref()
            .map(|b| b.committed_blocks.as_slice())
            .unwrap_or_default();

        let blocks = resolve_block_list(block_list, &staged, committed)?;

        let mut model = existing.unwrap_or_else(|| {
            BlobModel::new(self.account.clone(), container.to_string(), blob.to_string())
        });
        model.extent_chunks = blocks.iter().map(|b| b.extent_chunk.clone()).collect();
        model.committed_blocks = blocks;

        let content = self.blob_content(&model).await?;
        model.properties.set_content(&content);
        model.properties.update_etag();

        // Single insert publishes the new content to readers
        self.metadata.put_blob(model).await?;
        self.metadata
            .delete_staged_blocks(&self.account, container, blob)
            .await?;

        debug!(
            container,
            blob,
            blocks = block_list.len(),
            size = content.len(),
            "Committed block list"
        );
        Ok(())
    }

    async fn get_block_list(
        &self,
        container: &str,
        blob: &str,
        list_type: BlockListType,
    ) -> StorageResult<BlockListing> {
        let existing = match self.metadata.get_blob(&self.account, container, blob, "").await {
            Ok(existing) => Some(existing),
            Err(e) if e.code == ErrorCode::BlobNotFound => None,
            Err(e) => return Err(e),
        };
        let staged = self
            .metadata
            .get_staged_blocks(&self.account, container, blob)
            .await?;

        if existing.is_none() && staged.is_empty() {
            return Err(StorageError::new(ErrorCode::BlobNotFound));
        }

        let mut listing = BlockListing::default();
        if list_type.includes_committed() {
            listing.committed = existing
                .iter()
                .flat_map(|b| b.committed_blocks.iter())
                .map(|b| BlockInfo {
                    block_id: b.block_id.clone(),
                    size: b.size,
                    state: BlockState::Committed,
                })
                .collect();
        }
        if list_type.includes_uncommitted() {
            listing.uncommitted = staged
                .into_iter()
                .map(|b| BlockInfo {
                    block_id: b.block_id,
                    size: b.size,
                    state: BlockState::Uncommitted,
                })
                .collect();
        }
        Ok(listing)
    }

    async fn upload_blob(&self, container: &str, blob: &str, content: Bytes) -> StorageResult<()> {
        validate_blob_name(blob)?;
        if !self.metadata.container_exists(&self.account, container).await {
            return Err(StorageError::new(ErrorCode::ContainerNotFound));
        }

        let mut model =
            BlobModel::new(self.account.clone(), container.to_string(), blob.to_string());
        model.properties.set_content(&content);
        if !content.is_empty() {
            model.extent_chunks = vec![self.extents.write(content).await?];
        }

        self.metadata.put_blob(model).await?;
        self.metadata
            .delete_staged_blocks(&self.account, container, blob)
            .await?;
        Ok(())
    }

    async fn read_blob(
        &self,
        container: &str,
        blob: &str,
        snapshot: Option<&str>,
    ) -> StorageResult<Bytes> {
        let model = self
            .metadata
            .get_blob(&self.account, container, blob, snapshot.unwrap_or(""))
            .await?;
        self.blob_content(&model).await
    }

    async fn create_snapshot(&self, container: &str, blob: &str) -> StorageResult<String> {
        let snapshot = self
            .metadata
            .create_snapshot(&self.account, container, blob)
            .await?;
        debug!(container, blob, snapshot = %snapshot.snapshot, "Created snapshot");
        Ok(snapshot.snapshot)
    }

    async fn delete_blob(
        &self,
        container: &str,
        blob: &str,
        options: &DeleteBlobOptions,
    ) -> StorageResult<()> {
        match (options.snapshot.as_deref(), options.delete_snapshots) {
            (Some(_), Some(_)) => Err(StorageError::with_message(
                ErrorCode::InvalidQueryParameterValue,
                "A snapshot token cannot be combined with a delete-snapshots option",
            )),
            (Some(token), None) => {
                self.metadata
                    .delete_blob(&self.account, container, blob, token)
                    .await
            }
            (None, None) => {
                self.metadata
                    .delete_blob(&self.account, container, blob, "")
                    .await
            }
            (None, Some(policy)) => {
                // The base blob must exist for either policy
                self.metadata
                    .get_blob(&self.account, container, blob, "")
                    .await?;
                let removed = self.delete_snapshots_of(container, blob).await?;
                if policy == DeleteSnapshots::Include {
                    self.metadata
                        .delete_blob(&self.account, container, blob, "")
                        .await?;
                }
                debug!(
                    container,
                    blob,
                    policy = policy.as_str(),
                    snapshots = removed,
                    "Deleted snapshots"
                );
                Ok(())
            }
        }
    }

    async fn list_blobs(
        &self,
        container: &str,
        options: &ListBlobsOptions,
    ) -> StorageResult<Vec<BlobItem>> {
        let blobs = self
            .metadata
            .list_blobs(
                &self.account,
                container,
                options.prefix.as_deref(),
                options.include_snapshots,
            )
            .await?;

        Ok(blobs
            .iter()
            .map(|blob| BlobItem::from_model(blob, self.blob_url(blob)))
            .collect())
    }
}

/// Builder for creating an in-memory blob service.
pub struct MemoryBlobServiceBuilder {
    account: String,
    endpoint: String,
    metadata: Option<Arc<dyn MetadataStore>>,
    extents: Option<Arc<dyn ExtentStore>>,
}

impl MemoryBlobServiceBuilder {
    /// Creates a new builder for the development account.
    pub fn new() -> Self {
        Self {
            account: DEFAULT_ACCOUNT.to_string(),
            endpoint: DEFAULT_BLOB_ENDPOINT.to_string(),
            metadata: None,
            extents: None,
        }
    }

    /// Sets the account name.
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    /// Sets the endpoint used in listing URLs.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the metadata store.
    pub fn metadata(mut self, metadata: Arc<dyn MetadataStore>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Sets the extent store.
    pub fn extents(mut self, extents: Arc<dyn ExtentStore>) -> Self {
        self.extents = Some(extents);
        self
    }

    /// Builds the service.
    pub fn build(self) -> StorageResult<MemoryBlobService> {
        let endpoint = Url::parse(&self.endpoint)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                StorageError::with_message(
                    ErrorCode::InvalidInput,
                    format!("Invalid blob endpoint: {}", self.endpoint),
                )
            })?;
        let metadata = self
            .metadata
            .unwrap_or_else(|| Arc::new(MemoryMetadataStore::new()));
        let extents = self
            .extents
            .unwrap_or_else(|| Arc::new(MemoryExtentStore::new()));

        Ok(MemoryBlobService::with_storage(
            self.account,
            endpoint,
            metadata,
            extents,
        ))
    }
}

impl Default for MemoryBlobServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Metadata store for containers, blobs, snapshots, and blocks.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::models::{format_snapshot_time, BlobModel, BlockModel, ContainerModel};

/// Trait for metadata storage operations.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    // Container operations
    async fn create_container(&self, container: ContainerModel) -> StorageResult<()>;
    /// Removes the container together with its blobs, snapshots and staged blocks.
    async fn delete_container(&self, account: &str, name: &str) -> StorageResult<()>;
    async fn container_exists(&self, account: &str, name: &str) -> bool;

    // Blob operations
    /// Inserts or replaces the blob record keyed by its name and snapshot.
    async fn put_blob(&self, blob: BlobModel) -> StorageResult<()>;
    async fn get_blob(
        &self,
        account: &str,
        container: &str,
        name: &str,
        snapshot: &str,
    ) -> StorageResult<BlobModel>;
    async fn delete_blob(
        &self,
        account: &str,
        container: &str,
        name: &str,
        snapshot: &str,
    ) -> StorageResult<()>;
    /// Freezes the current base blob under a fresh, strictly increasing token.
    async fn create_snapshot(
        &self,
        account: &str,
        container: &str,
        name: &str,
    ) -> StorageResult<BlobModel>;
    /// Snapshots of one blob, oldest first.
    async fn list_snapshots(
        &self,
        account: &str,
        container: &str,
        name: &str,
    ) -> StorageResult<Vec<BlobModel>>;
    /// Blobs sorted by name; each name's snapshots come before its base blob.
    async fn list_blobs(
        &self,
        account: &str,
        container: &str,
        prefix: Option<&str>,
        include_snapshots: bool,
    ) -> StorageResult<Vec<BlobModel>>;

    // Block operations
    async fn stage_block(&self, block: BlockModel) -> StorageResult<()>;
    async fn get_staged_blocks(
        &self,
        account: &str,
        container: &str,
        blob: &str,
    ) -> StorageResult<Vec<BlockModel>>;
    async fn delete_staged_blocks(
        &self,
        account: &str,
        container: &str,
        blob: &str,
    ) -> StorageResult<()>;

    /// Every extent ID referenced by a blob, snapshot or staged block.
    async fn referenced_extents(&self) -> HashSet<String>;
}

/// Key type for containers - uses Arc<str> to avoid allocations.
type ContainerKey = (Arc<str>, Arc<str>);

/// Key type for blobs: (account, container, name, snapshot).
type BlobKey = (Arc<str>, Arc<str>, Arc<str>, Arc<str>);

/// Key type for blocks: (account, container, blob, block_id).
type BlockKey = (Arc<str>, Arc<str>, Arc<str>, Arc<str>);

/// Key type for per-blob indexes: (account, container, blob).
type BlobNameKey = (Arc<str>, Arc<str>, Arc<str>);

/// In-memory implementation of the metadata store.
pub struct MemoryMetadataStore {
    /// Containers indexed by (account, name).
    containers: DashMap<ContainerKey, ContainerModel>,

    /// Blobs and snapshots indexed by (account, container, name, snapshot).
    blobs: DashMap<BlobKey, BlobModel>,

    /// Secondary index: account+container -> names with a base blob or a snapshot.
    blob_index: DashMap<ContainerKey, BTreeSet<Arc<str>>>,

    /// Secondary index: account+container+blob -> snapshot tokens.
    snapshot_index: DashMap<BlobNameKey, BTreeSet<Arc<str>>>,

    /// Staged (uncommitted) blocks indexed by (account, container, blob, block_id).
    blocks: DashMap<BlockKey, BlockModel>,

    /// Secondary index: account+container+blob -> set of block_ids.
    block_index: DashMap<BlobNameKey, BTreeSet<Arc<str>>>,

    /// Time of the most recently issued snapshot token.
    snapshot_clock: Mutex<DateTime<Utc>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self {
            containers: DashMap::new(),
            blobs: DashMap::new(),
            blob_index: DashMap::new(),
            snapshot_index: DashMap::new(),
            blocks: DashMap::new(),
            block_index: DashMap::new(),
            snapshot_clock: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Create an Arc<str> key from a string slice.
    #[inline]
    fn arc_str(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    #[inline]
    fn container_key(account: &str, name: &str) -> ContainerKey {
        (Self::arc_str(account), Self::arc_str(name))
    }

    #[inline]
    fn blob_key(account: &str, container: &str, name: &str, snapshot: &str) -> BlobKey {
        (
            Self::arc_str(account),
            Self::arc_str(container),
            Self::arc_str(name),
            Self::arc_str(snapshot),
        )
    }

    #[inline]
    fn blob_name_key(account: &str, container: &str, name: &str) -> BlobNameKey {
        (
            Self::arc_str(account),
            Self::arc_str(container),
            Self::arc_str(name),
        )
    }

    #[inline]
    fn block_key(account: &str, container: &str, blob: &str, block_id: &str) -> BlockKey {
        (
            Self::arc_str(account),
            Self::arc_str(container),
            Self::arc_str(blob),
            Self::arc_str(block_id),
        )
    }

    /// Issues the next snapshot time, at least one token tick after the previous one.
    fn next_snapshot_time(&self) -> DateTime<Utc> {
        let mut last = self.snapshot_clock.lock();
        let next = advance_snapshot_clock(*last, Utc::now());
        *last = next;
        next
    }

    async fn ensure_container(&self, account: &str, container: &str) -> StorageResult<()> {
        if self.container_exists(account, container).await {
            Ok(())
        } else {
            Err(StorageError::new(ErrorCode::ContainerNotFound))
        }
    }

    /// Drops a name from the container index once no base blob or snapshot remains.
    fn prune_blob_name(&self, account: &str, container: &str, name: &str) {
        let name_key = Self::blob_name_key(account, container, name);
        let has_snapshots = self
            .snapshot_index
            .get(&name_key)
            .map(|tokens| !tokens.is_empty())
            .unwrap_or(false);
        if !has_snapshots {
            self.snapshot_index.remove(&name_key);
        }

        let has_base = self
            .blobs
            .contains_key(&Self::blob_key(account, container, name, ""));
        if !has_base && !has_snapshots {
            if let Some(mut names) = self
                .blob_index
                .get_mut(&Self::container_key(account, container))
            {
                names.remove(name);
            }
        }
    }
}

/// Resolution of a snapshot token.
const SNAPSHOT_TICK_NANOS: i64 = 100;

/// Truncates `now` to a token tick and keeps it strictly after `last`.
fn advance_snapshot_clock(last: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let sub_tick = i64::from(now.timestamp_subsec_nanos()) % SNAPSHOT_TICK_NANOS;
    let now = now - Duration::nanoseconds(sub_tick);
    let after_last = last + Duration::nanoseconds(SNAPSHOT_TICK_NANOS);
    now.max(after_last)
}

impl Default for MemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn create_container(&self, container: ContainerModel) -> StorageResult<()> {
        let key = Self::container_key(&container.account, &container.name);
        match self.containers.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(StorageError::new(ErrorCode::ContainerAlreadyExists))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(container);
                Ok(())
            }
        }
    }

    async fn delete_container(&self, account: &str, name: &str) -> StorageResult<()> {
        let key = Self::container_key(account, name);
        if self.containers.remove(&key).is_none() {
            return Err(StorageError::new(ErrorCode::ContainerNotFound));
        }

        let in_container =
            |acct: &Arc<str>, cont: &Arc<str>| acct.as_ref() == account && cont.as_ref() == name;

        self.blobs.retain(|(acct, cont, _, _), _| !in_container(acct, cont));
        self.blocks.retain(|(acct, cont, _, _), _| !in_container(acct, cont));
        self.snapshot_index
            .retain(|(acct, cont, _), _| !in_container(acct, cont));
        self.block_index
            .retain(|(acct, cont, _), _| !in_container(acct, cont));
        self.blob_index.remove(&key);

        debug!(account, container = name, "Deleted container and its blobs");
        Ok(())
    }

    async fn container_exists(&self, account: &str, name: &str) -> bool {
        self.containers
            .contains_key(&Self::container_key(account, name))
    }

    async fn put_blob(&self, blob: BlobModel) -> StorageResult<()> {
        self.ensure_container(&blob.account, &blob.container).await?;

        let key = Self::blob_key(&blob.account, &blob.container, &blob.name, &blob.snapshot);
        let index_key = Self::container_key(&blob.account, &blob.container);

        self.blob_index
            .entry(index_key)
            .or_default()
            .insert(Self::arc_str(&blob.name));

        if blob.is_snapshot() {
            self.snapshot_index
                .entry(Self::blob_name_key(&blob.account, &blob.container, &blob.name))
                .or_default()
                .insert(Self::arc_str(&blob.snapshot));
        }

        self.blobs.insert(key, blob);
        Ok(())
    }

    async fn get_blob(
        &self,
        account: &str,
        container: &str,
        name: &str,
        snapshot: &str,
    ) -> StorageResult<BlobModel> {
        self.ensure_container(account, container).await?;

        let key = Self::blob_key(account, container, name, snapshot);
        self.blobs
            .get(&key)
            .map(|b| b.value().clone())
            .ok_or_else(|| StorageError::new(ErrorCode::BlobNotFound))
    }

    async fn delete_blob(
        &self,
        account: &str,
        container: &str,
        name: &str,
        snapshot: &str,
    ) -> StorageResult<()> {
        self.ensure_container(account, container).await?;

        let key = Self::blob_key(account, container, name, snapshot);
        if self.blobs.remove(&key).is_none() {
            return Err(StorageError::new(ErrorCode::BlobNotFound));
        }

        if !snapshot.is_empty() {
            if let Some(mut tokens) = self
                .snapshot_index
                .get_mut(&Self::blob_name_key(account, container, name))
            {
                tokens.remove(snapshot);
            }
        }
        self.prune_blob_name(account, container, name);

        Ok(())
    }

    async fn create_snapshot(
        &self,
        account: &str,
        container: &str,
        name: &str,
    ) -> StorageResult<BlobModel> {
        let base = self.get_blob(account, container, name, "").await?;
        let token = format_snapshot_time(&self.next_snapshot_time());
        let snapshot = base.create_snapshot(token);
        self.put_blob(snapshot.clone()).await?;
        Ok(snapshot)
    }

    async fn list_snapshots(
        &self,
        account: &str,
        container: &str,
        name: &str,
    ) -> StorageResult<Vec<BlobModel>> {
        self.ensure_container(account, container).await?;

        let tokens: Vec<Arc<str>> = self
            .snapshot_index
            .get(&Self::blob_name_key(account, container, name))
            .map(|entry| entry.iter().cloned().collect())
            .unwrap_or_default();

        Ok(tokens
            .iter()
            .filter_map(|token| {
                self.blobs
                    .get(&Self::blob_key(account, container, name, token))
                    .map(|b| b.value().clone())
            })
            .collect())
    }

    async fn list_blobs(
        &self,
        account: &str,
        container: &str,
        prefix: Option<&str>,
        include_snapshots: bool,
    ) -> StorageResult<Vec<BlobModel>> {
        self.ensure_container(account, container).await?;

        // Collect matching names first (minimal lock time)
        let names: Vec<Arc<str>> = self
            .blob_index
            .get(&Self::container_key(account, container))
            .map(|entry| {
                entry
                    .iter()
                    .filter(|name| prefix.map_or(true, |p| name.starts_with(p)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let mut blobs = Vec::new();
        for name in &names {
            if include_snapshots {
                blobs.extend(self.list_snapshots(account, container, name).await?);
            }
            if let Some(entry) = self.blobs.get(&Self::blob_key(account, container, name, "")) {
                blobs.push(entry.value().clone());
            }
        }

        Ok(blobs)
    }

    async fn stage_block(&self, block: BlockModel) -> StorageResult<()> {
        self.ensure_container(&block.account, &block.container).await?;

        let key = Self::block_key(
            &block.account,
            &block.container,
            &block.blob,
            &block.block_id,
        );
        let index_key = Self::blob_name_key(&block.account, &block.container, &block.blob);

        self.block_index
            .entry(index_key)
            .or_default()
            .insert(Self::arc_str(&block.block_id));

        self.blocks.insert(key, block);
        Ok(())
    }

    async fn get_staged_blocks(
        &self,
        account: &str,
        container: &str,
        blob: &str,
    ) -> StorageResult<Vec<BlockModel>> {
        self.ensure_container(account, container).await?;

        let block_ids: Vec<Arc<str>> = self
            .block_index
            .get(&Self::blob_name_key(account, container, blob))
            .map(|entry| entry.iter().cloned().collect())
            .unwrap_or_default();

        Ok(block_ids
            .iter()
            .filter_map(|block_id| {
                self.blocks
                    .get(&Self::block_key(account, container, blob, block_id))
                    .map(|b| b.value().clone())
            })
            .collect())
    }

    async fn delete_staged_blocks(
        &self,
        account: &str,
        container: &str,
        blob: &str,
    ) -> StorageResult<()> {
        let block_ids: Vec<Arc<str>> = self
            .block_index
            .remove(&Self::blob_name_key(account, container, blob))
            .map(|(_, set)| set.into_iter().collect())
            .unwrap_or_default();

        for block_id in block_ids {
            self.blocks
                .remove(&Self::block_key(account, container, blob, &block_id));
        }

        Ok(())
    }

    async fn referenced_extents(&self) -> HashSet<String> {
        let mut referenced: HashSet<String> = self
            .blobs
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .extent_ids()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
        referenced.extend(
            self.blocks
                .iter()
                .map(|entry| entry.value().extent_chunk.id.clone()),
        );
        referenced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "devstoreaccount1";

    async fn store_with_blob(container: &str, name: &str) -> MemoryMetadataStore {
        let store = MemoryMetadataStore::new();
        store
            .create_container(ContainerModel::new(ACCOUNT.into(), container.into()))
            .await
            .unwrap();
        store
            .put_blob(BlobModel::new(ACCOUNT.into(), container.into(), name.into()))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_snapshot_tokens_strictly_increase() {
        let store = store_with_blob("tokens", "blob").await;
        let mut tokens = Vec::new();
        for _ in 0..20 {
            let snapshot = store.create_snapshot(ACCOUNT, "tokens", "blob").await.unwrap();
            tokens.push(snapshot.snapshot);
        }
        let mut sorted = tokens.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, tokens);
    }

    #[test]
    fn test_snapshot_clock_never_repeats_a_tick() {
        use chrono::TimeZone;

        let base = Utc.with_ymd_and_hms(2024, 1, 27, 12, 34, 56).unwrap();
        let last = base + Duration::nanoseconds(100);

        // Later by 50ns but inside the same tick
        let next = advance_snapshot_clock(last, last + Duration::nanoseconds(50));
        assert_eq!(next, base + Duration::nanoseconds(200));
        assert_ne!(format_snapshot_time(&next), format_snapshot_time(&last));

        // A clock that went backwards still moves forward
        let next = advance_snapshot_clock(last, base);
        assert_eq!(next, base + Duration::nanoseconds(200));

        // Far enough ahead: truncated wall time
        let next = advance_snapshot_clock(last, base + Duration::nanoseconds(1_234));
        assert_eq!(next, base + Duration::nanoseconds(1_200));
    }

    #[tokio::test]
    async fn test_base_delete_keeps_name_while_snapshots_remain() {
        let store = store_with_blob("prune", "blob").await;
        let snapshot = store.create_snapshot(ACCOUNT, "prune", "blob").await.unwrap();

        store.delete_blob(ACCOUNT, "prune", "blob", "").await.unwrap();
        let listed = store.list_blobs(ACCOUNT, "prune", None, true).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].snapshot, snapshot.snapshot);

        store
            .delete_blob(ACCOUNT, "prune", "blob", &snapshot.snapshot)
            .await
            .unwrap();
        assert!(store.list_blobs(ACCOUNT, "prune", None, true).await.unwrap().is_empty());
        assert!(store.blob_index.get(&MemoryMetadataStore::container_key(ACCOUNT, "prune"))
            .map(|names| names.is_empty())
            .unwrap_or(true));
    }

    #[tokio::test]
    async fn test_duplicate_container() {
        let store = store_with_blob("dup", "blob").await;
        let err = store
            .create_container(ContainerModel::new(ACCOUNT.into(), "dup".into()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ContainerAlreadyExists);
    }

    #[tokio::test]
    async fn test_delete_container_cascades() {
        let store = store_with_blob("cascade", "blob").await;
        store.create_snapshot(ACCOUNT, "cascade", "blob").await.unwrap();
        store.delete_container(ACCOUNT, "cascade").await.unwrap();

        assert!(store.blobs.is_empty());
        assert!(store.snapshot_index.is_empty());
        let err = store.get_blob(ACCOUNT, "cascade", "blob", "").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ContainerNotFound);
    }
}

//! Extent store for blob and block data.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::models::ExtentChunk;

/// Trait for extent (blob data) storage operations.
///
/// Extents are immutable once written.
#[async_trait]
pub trait ExtentStore: Send + Sync {
    /// Writes data to the extent store and returns an ExtentChunk reference.
    async fn write(&self, data: Bytes) -> StorageResult<ExtentChunk>;

    /// Reads data from the extent store.
    async fn read(&self, chunk: &ExtentChunk) -> StorageResult<Bytes>;

    /// Deletes an extent from the store.
    async fn delete(&self, extent_id: &str) -> StorageResult<()>;

    /// Returns the IDs of every stored extent.
    async fn extent_ids(&self) -> Vec<String>;

    /// Returns the total size of all extents.
    async fn total_size(&self) -> u64;
}

/// Reads the chunks in order and concatenates them.
pub async fn read_chunks(
    extents: &dyn ExtentStore,
    chunks: &[ExtentChunk],
) -> StorageResult<Bytes> {
    match chunks {
        [] => Ok(Bytes::new()),
        [chunk] => extents.read(chunk).await,
        _ => {
            let total: u64 = chunks.iter().map(|c| c.count).sum();
            let mut result = Vec::with_capacity(total as usize);
            for chunk in chunks {
                let data = extents.read(chunk).await?;
                result.extend_from_slice(&data);
            }
            Ok(Bytes::from(result))
        }
    }
}

/// Number of shards for the extent store (must be power of 2).
const NUM_SHARDS: usize = 16;

/// Sharded in-memory implementation of the extent store.
pub struct MemoryExtentStore {
    /// Sharded extents - each shard handles a subset of extent IDs.
    shards: Vec<DashMap<Arc<str>, Bytes>>,
    /// Current total size in bytes.
    current_size: AtomicU64,
}

impl MemoryExtentStore {
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| DashMap::new()).collect();
        Self {
            shards,
            current_size: AtomicU64::new(0),
        }
    }

    /// Get the shard for a given extent ID.
    #[inline]
    fn get_shard(&self, extent_id: &str) -> &DashMap<Arc<str>, Bytes> {
        let hash = extent_id
            .bytes()
            .take(8)
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        &self.shards[hash % NUM_SHARDS]
    }
}

impl Default for MemoryExtentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtentStore for MemoryExtentStore {
    async fn write(&self, data: Bytes) -> StorageResult<ExtentChunk> {
        let size = data.len() as u64;
        let extent_id = Uuid::new_v4().to_string();
        let extent_id_arc: Arc<str> = Arc::from(extent_id.as_str());

        self.get_shard(&extent_id).insert(extent_id_arc, data);
        self.current_size.fetch_add(size, Ordering::Relaxed);

        Ok(ExtentChunk::new(extent_id, 0, size))
    }

    async fn read(&self, chunk: &ExtentChunk) -> StorageResult<Bytes> {
        let shard = self.get_shard(&chunk.id);
        let extent = shard.get(chunk.id.as_str()).ok_or_else(|| {
            StorageError::with_message(
                ErrorCode::InternalError,
                format!("Extent {} is missing", chunk.id),
            )
        })?;

        let start = chunk.offset as usize;
        let end = start + chunk.count as usize;

        if end > extent.len() {
            return Err(StorageError::with_message(
                ErrorCode::InternalError,
                format!("Extent {} is shorter than the requested chunk", chunk.id),
            ));
        }

        Ok(extent.slice(start..end))
    }

    async fn delete(&self, extent_id: &str) -> StorageResult<()> {
        let shard = self.get_shard(extent_id);
        if let Some((_, data)) = shard.remove(extent_id) {
            self.current_size
                .fetch_sub(data.len() as u64, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn extent_ids(&self) -> Vec<String> {
        self.shards
            .iter()
            .flat_map(|shard| {
                shard
                    .iter()
                    .map(|entry| entry.key().to_string())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    async fn total_size(&self) -> u64 {
        self.current_size.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_delete() {
        let store = MemoryExtentStore::new();
        let chunk = store.write(Bytes::from_static(b"content1")).await.unwrap();
        assert_eq!(chunk.count, 8);
        assert_eq!(store.total_size().await, 8);
        assert_eq!(store.read(&chunk).await.unwrap(), Bytes::from_static(b"content1"));

        store.delete(&chunk.id).await.unwrap();
        assert_eq!(store.total_size().await, 0);
        let err = store.read(&chunk).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalError);
    }

    #[tokio::test]
    async fn test_read_chunks_concatenates_in_order() {
        let store = MemoryExtentStore::new();
        let a = store.write(Bytes::from_static(b"content1")).await.unwrap();
        let b = store.write(Bytes::from_static(b"content2")).await.unwrap();

        let data = read_chunks(&store, &[b.clone(), a.clone()]).await.unwrap();
        assert_eq!(&data[..], b"content2content1");
        assert!(read_chunks(&store, &[]).await.unwrap().is_empty());

        let mut ids = store.extent_ids().await;
        ids.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(ids, expected);
    }
}

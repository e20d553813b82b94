//! Common test utilities.

#![allow(dead_code)]

use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use blob_snapshot_sample::models::BlockList;
use blob_snapshot_sample::{BlobService, Config, MemoryBlobService, SnapshotSample};

static CONTAINER_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Returns a container name no other test uses.
pub fn unique_container(prefix: &str) -> String {
    let n = CONTAINER_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}{}", prefix, n)
}

/// Test service wrapper.
pub struct TestService {
    pub service: Arc<MemoryBlobService>,
    pub config: Config,
}

impl TestService {
    /// Creates a fresh in-memory service with a unique container configured.
    pub fn start(prefix: &str) -> Self {
        let config = Config::for_container(unique_container(prefix));
        let service = Arc::new(MemoryBlobService::from_config(&config).unwrap());
        Self { service, config }
    }

    /// Creates the configured container.
    pub async fn with_container(prefix: &str) -> Self {
        let test = Self::start(prefix);
        assert!(test
            .service
            .create_container_if_not_exists(test.container())
            .await
            .unwrap());
        test
    }

    pub fn container(&self) -> &str {
        &self.config.container
    }

    pub fn blob(&self) -> &str {
        &self.config.blob
    }

    /// Returns a sample runner sharing this service.
    pub fn sample(&self) -> SnapshotSample {
        SnapshotSample::new(self.service.clone(), self.config.clone())
    }

    /// Stages the given blocks and commits them as latest blocks.
    pub async fn commit_blocks(&self, blob: &str, blocks: &[(&str, &str)]) {
        for (id, content) in blocks {
            self.service
                .stage_block(self.container(), blob, id, Bytes::from(content.to_string()))
                .await
                .unwrap();
        }
        let list = BlockList::latest(blocks.iter().map(|(id, _)| *id));
        self.service
            .commit_block_list(self.container(), blob, &list)
            .await
            .unwrap();
    }

    /// Reads the blob (or snapshot) as text.
    pub async fn read(&self, blob: &str, snapshot: Option<&str>) -> String {
        self.service
            .read_text(self.container(), blob, snapshot)
            .await
            .unwrap()
    }
}

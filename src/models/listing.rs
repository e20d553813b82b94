//! Blob listing models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::blob::BlobModel;

/// Options for listing the blobs in a container.
#[derive(Debug, Clone, Default)]
pub struct ListBlobsOptions {
    /// Only list blobs whose name starts with this prefix.
    pub prefix: Option<String>,
    /// Include one entry per snapshot.
    pub include_snapshots: bool,
}

impl ListBlobsOptions {
    /// Lists everything, snapshots included.
    pub fn with_snapshots() -> Self {
        Self {
            prefix: None,
            include_snapshots: true,
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// One entry of a blob listing: a live blob or one of its snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobItem {
    pub name: String,
    pub url: String,
    /// Snapshot token, for snapshot entries.
    pub snapshot: Option<String>,
    pub content_length: u64,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

impl BlobItem {
    pub fn from_model(blob: &BlobModel, url: String) -> Self {
        Self {
            name: blob.name.clone(),
            url,
            snapshot: blob.is_snapshot().then(|| blob.snapshot.clone()),
            content_length: blob.properties.content_length,
            etag: blob.properties.etag.clone(),
            last_modified: blob.properties.last_modified,
        }
    }

    pub fn is_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }
}

//! Blob and snapshot data models.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::block::CommittedBlock;

/// Reference to data stored in an extent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtentChunk {
    /// UUID of the extent containing this data.
    pub id: String,
    /// Byte offset within the extent.
    pub offset: u64,
    /// Number of bytes.
    pub count: u64,
}

impl ExtentChunk {
    pub fn new(id: String, offset: u64, count: u64) -> Self {
        Self { id, offset, count }
    }
}

/// Blob properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobProperties {
    pub content_length: u64,
    /// Base64 MD5 of the committed content.
    pub content_md5: Option<String>,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
    pub created_on: DateTime<Utc>,
}

impl Default for BlobProperties {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            content_length: 0,
            content_md5: None,
            etag: new_etag(),
            last_modified: now,
            created_on: now,
        }
    }
}

impl BlobProperties {
    /// Updates the ETag and last modified time.
    pub fn update_etag(&mut self) {
        self.etag = new_etag();
        self.last_modified = Utc::now();
    }

    /// Records the length and MD5 of freshly committed content.
    pub fn set_content(&mut self, content: &[u8]) {
        self.content_length = content.len() as u64;
        self.content_md5 = Some(BASE64.encode(Md5::digest(content)));
    }
}

/// Complete blob model stored in the metadata store.
///
/// The base blob carries an empty `snapshot`; snapshot records carry their
/// token and never change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobModel {
    /// Account name.
    pub account: String,
    /// Container name.
    pub container: String,
    /// Blob name (full path).
    pub name: String,
    /// Snapshot token (empty for base blob).
    pub snapshot: String,
    /// Blob properties.
    pub properties: BlobProperties,
    /// User-defined metadata.
    pub metadata: HashMap<String, String>,
    /// References to extent data chunks, in content order.
    pub extent_chunks: Vec<ExtentChunk>,
    /// Committed block list (empty for blobs written in a single upload).
    pub committed_blocks: Vec<CommittedBlock>,
}

impl BlobModel {
    /// Creates a new base blob model.
    pub fn new(account: String, container: String, name: String) -> Self {
        Self {
            account,
            container,
            name,
            snapshot: String::new(),
            properties: BlobProperties::default(),
            metadata: HashMap::new(),
            extent_chunks: Vec::new(),
            committed_blocks: Vec::new(),
        }
    }

    /// Whether this record is a snapshot rather than the base blob.
    pub fn is_snapshot(&self) -> bool {
        !self.snapshot.is_empty()
    }

    /// Creates a snapshot of this blob under the given token.
    ///
    /// Extent chunks are shared with the base blob; extents are immutable, so
    /// later commits to the base never reach the snapshot.
    pub fn create_snapshot(&self, token: String) -> Self {
        let mut snapshot = self.clone();
        snapshot.snapshot = token;
        snapshot
    }

    /// Iterates over every extent ID this record references.
    pub fn extent_ids(&self) -> impl Iterator<Item = &str> {
        self.extent_chunks
            .iter()
            .map(|c| c.id.as_str())
            .chain(self.committed_blocks.iter().map(|b| b.extent_chunk.id.as_str()))
    }
}

/// Formats a timestamp as a snapshot token: `2024-01-27T12:34:56.1234567Z`.
pub fn format_snapshot_time(dt: &DateTime<Utc>) -> String {
    // Seven fractional digits: 100-nanosecond units
    format!(
        "{}.{:07}Z",
        dt.format("%Y-%m-%dT%H:%M:%S"),
        dt.timestamp_subsec_nanos() / 100
    )
}

fn new_etag() -> String {
    format!("\"0x{}\"", uuid::Uuid::new_v4().simple())
}

/// Which snapshots a blob delete also removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteSnapshots {
    /// Remove the base blob together with all its snapshots.
    Include,
    /// Remove only the snapshots, keeping the base blob.
    Only,
}

impl DeleteSnapshots {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteSnapshots::Include => "include",
            DeleteSnapshots::Only => "only",
        }
    }
}

/// Options for deleting a blob or one of its snapshots.
#[derive(Debug, Clone, Default)]
pub struct DeleteBlobOptions {
    /// Delete only the snapshot with this token.
    pub snapshot: Option<String>,
    /// Also (or only) delete the blob's snapshots.
    pub delete_snapshots: Option<DeleteSnapshots>,
}

impl DeleteBlobOptions {
    /// Targets a single snapshot.
    pub fn snapshot(token: impl Into<String>) -> Self {
        Self {
            snapshot: Some(token.into()),
            delete_snapshots: None,
        }
    }

    /// Targets the base blob and applies the given snapshot policy.
    pub fn with_snapshots(delete_snapshots: DeleteSnapshots) -> Self {
        Self {
            snapshot: None,
            delete_snapshots: Some(delete_snapshots),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_time_format() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 27, 12, 34, 56).unwrap()
            + chrono::Duration::nanoseconds(123_456_700);
        assert_eq!(format_snapshot_time(&dt), "2024-01-27T12:34:56.1234567Z");

        let whole = Utc.with_ymd_and_hms(2024, 1, 27, 12, 34, 56).unwrap();
        assert_eq!(format_snapshot_time(&whole), "2024-01-27T12:34:56.0000000Z");

        // Sub-100ns digits are dropped
        let fine = whole + chrono::Duration::nanoseconds(99);
        assert_eq!(format_snapshot_time(&fine), "2024-01-27T12:34:56.0000000Z");
    }

    #[test]
    fn test_snapshot_shares_content() {
        let mut blob = BlobModel::new(
            "acct".to_string(),
            "container".to_string(),
            "blob".to_string(),
        );
        blob.extent_chunks = vec![ExtentChunk::new("extent-1".to_string(), 0, 8)];
        let snapshot = blob.create_snapshot("2024-01-27T12:34:56.0000000Z".to_string());

        assert!(snapshot.is_snapshot());
        assert!(!blob.is_snapshot());
        assert_eq!(snapshot.extent_chunks, blob.extent_chunks);
        assert_eq!(snapshot.properties.etag, blob.properties.etag);
    }

    #[test]
    fn test_set_content_md5() {
        let mut props = BlobProperties::default();
        props.set_content(b"");
        assert_eq!(props.content_length, 0);
        assert_eq!(props.content_md5.as_deref(), Some("1B2M2Y8AsgTpgAmY7PhCfg=="));
    }
}

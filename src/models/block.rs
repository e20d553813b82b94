//! Block data models for block blobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::blob::ExtentChunk;

/// Maximum length of a block ID in bytes.
pub const MAX_BLOCK_ID_LENGTH: usize = 64;

/// Block state in a block list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockState {
    /// Block has been staged but not committed.
    Uncommitted,
    /// Block is part of the blob's committed block list.
    Committed,
}

/// Block list type for the get-block-list operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockListType {
    Committed,
    Uncommitted,
    #[default]
    All,
}

impl BlockListType {
    pub fn includes_committed(&self) -> bool {
        matches!(self, BlockListType::Committed | BlockListType::All)
    }

    pub fn includes_uncommitted(&self) -> bool {
        matches!(self, BlockListType::Uncommitted | BlockListType::All)
    }
}

/// A staged (uncommitted) block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockModel {
    /// Account name.
    pub account: String,
    /// Container name.
    pub container: String,
    /// Blob name.
    pub blob: String,
    /// Client-chosen block ID.
    pub block_id: String,
    /// Block size in bytes.
    pub size: u64,
    /// Reference to extent data.
    pub extent_chunk: ExtentChunk,
    /// When the block was staged.
    pub staged_time: DateTime<Utc>,
}

impl BlockModel {
    /// Creates a new block model.
    pub fn new(
        account: String,
        container: String,
        blob: String,
        block_id: String,
        size: u64,
        extent_chunk: ExtentChunk,
    ) -> Self {
        Self {
            account,
            container,
            blob,
            block_id,
            size,
            extent_chunk,
            staged_time: Utc::now(),
        }
    }
}

/// Block entry in a committed block list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedBlock {
    pub block_id: String,
    pub size: u64,
    pub extent_chunk: ExtentChunk,
}

impl From<BlockModel> for CommittedBlock {
    fn from(block: BlockModel) -> Self {
        Self {
            block_id: block.block_id,
            size: block.size,
            extent_chunk: block.extent_chunk,
        }
    }
}

/// One entry of a commit manifest, naming where the block is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockListEntry {
    /// Staged block if present, otherwise the committed one.
    Latest(String),
    /// Only the committed block list.
    Committed(String),
    /// Only the staged blocks.
    Uncommitted(String),
}

impl BlockListEntry {
    pub fn block_id(&self) -> &str {
        match self {
            BlockListEntry::Latest(id)
            | BlockListEntry::Committed(id)
            | BlockListEntry::Uncommitted(id) => id,
        }
    }
}

/// Ordered commit manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockList {
    pub entries: Vec<BlockListEntry>,
}

impl BlockList {
    /// Builds a manifest that commits every ID as a latest block.
    pub fn latest<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: ids
                .into_iter()
                .map(|id| BlockListEntry::Latest(id.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, entry: BlockListEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A block as reported by the get-block-list operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub block_id: String,
    pub size: u64,
    pub state: BlockState,
}

/// Result of the get-block-list operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockListing {
    /// Committed blocks, in commit order.
    pub committed: Vec<BlockInfo>,
    /// Staged blocks, ordered by block ID.
    pub uncommitted: Vec<BlockInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_manifest_keeps_order() {
        let list = BlockList::latest(["b3", "b1", "b2"]);
        let ids: Vec<_> = list.entries.iter().map(|e| e.block_id()).collect();
        assert_eq!(ids, ["b3", "b1", "b2"]);
        assert!(list
            .entries
            .iter()
            .all(|e| matches!(e, BlockListEntry::Latest(_))));
    }

    #[test]
    fn test_block_list_type_filters() {
        assert!(BlockListType::All.includes_committed());
        assert!(!BlockListType::Committed.includes_uncommitted());
    }
}

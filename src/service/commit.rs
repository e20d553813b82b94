//! Commit manifest resolution.

use crate::error::{ErrorCode, StorageError, StorageResult};
use crate::models::{BlockList, BlockListEntry, BlockModel, CommittedBlock};

/// Resolves every manifest entry to a concrete block, in manifest order.
///
/// `Latest` entries prefer the staged block and fall back to the committed
/// one. Any entry that resolves to nothing fails the whole commit.
pub fn resolve_block_list(
    block_list: &BlockList,
    staged: &[BlockModel],
    committed: &[CommittedBlock],
) -> StorageResult<Vec<CommittedBlock>> {
    let find_staged = |id: &str| {
        staged
            .iter()
            .find(|b| b.block_id == id)
            .map(|b| CommittedBlock::from(b.clone()))
    };
    let find_committed = |id: &str| committed.iter().find(|b| b.block_id == id).cloned();

    block_list
        .entries
        .iter()
        .map(|entry| {
            let id = entry.block_id();
            let resolved = match entry {
                BlockListEntry::Latest(_) => find_staged(id).or_else(|| find_committed(id)),
                BlockListEntry::Uncommitted(_) => find_staged(id),
                BlockListEntry::Committed(_) => find_committed(id),
            };
            resolved.ok_or_else(|| {
                StorageError::with_message(
                    ErrorCode::InvalidBlockList,
                    format!("Block {} not found", id),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtentChunk;

    fn staged(id: &str, extent: &str) -> BlockModel {
        BlockModel::new(
            "acct".to_string(),
            "container".to_string(),
            "blob".to_string(),
            id.to_string(),
            8,
            ExtentChunk::new(extent.to_string(), 0, 8),
        )
    }

    fn committed(id: &str, extent: &str) -> CommittedBlock {
        CommittedBlock::from(staged(id, extent))
    }

    fn extents(blocks: &[CommittedBlock]) -> Vec<&str> {
        blocks.iter().map(|b| b.extent_chunk.id.as_str()).collect()
    }

    #[test]
    fn test_latest_prefers_staged_block() {
        let list = BlockList::latest(["b1", "b2", "b3"]);
        let resolved = resolve_block_list(
            &list,
            &[staged("b2", "new-b2")],
            &[committed("b1", "e1"), committed("b2", "e2"), committed("b3", "e3")],
        )
        .unwrap();
        assert_eq!(extents(&resolved), ["e1", "new-b2", "e3"]);
    }

    #[test]
    fn test_committed_and_uncommitted_entries_are_strict() {
        let mut list = BlockList::default();
        list.push(BlockListEntry::Committed("b1".to_string()));
        let err = resolve_block_list(&list, &[staged("b1", "s1")], &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidBlockList);

        let mut list = BlockList::default();
        list.push(BlockListEntry::Uncommitted("b1".to_string()));
        let err = resolve_block_list(&list, &[], &[committed("b1", "c1")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidBlockList);
        assert_eq!(err.message, "Block b1 not found");
    }

    #[test]
    fn test_repeated_ids_repeat_content() {
        let list = BlockList::latest(["b1", "b1"]);
        let resolved = resolve_block_list(&list, &[staged("b1", "s1")], &[]).unwrap();
        assert_eq!(extents(&resolved), ["s1", "s1"]);
    }

    #[test]
    fn test_empty_manifest_resolves_to_nothing() {
        let resolved = resolve_block_list(&BlockList::default(), &[], &[]).unwrap();
        assert!(resolved.is_empty());
    }
}

//! Block pool — hands out block ids and keeps the free list.

use std::collections::BTreeSet;

use crate::types::BlockId;

/// Allocates and reclaims block ids for every chain in one index.
///
/// Ids are never retired: `num_blocks` only grows, and an id freed by one
/// entity is handed to the next allocation request from any entity.
#[derive(Debug, Clone, Default)]
pub struct BlockPool {
    /// Count of block ids ever allocated.
    num_blocks: u32,
    /// Allocated ids currently unused.
    deleted: BTreeSet<BlockId>,
}

impl BlockPool {
    /// Create a new, empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from pre-existing state (used by reader).
    pub fn from_parts(num_blocks: u32, deleted: impl IntoIterator<Item = BlockId>) -> Self {
        Self {
            num_blocks,
            deleted: deleted.into_iter().collect(),
        }
    }

    /// Hand out a block id, reusing a freed one before growing.
    pub fn allocate(&mut self) -> BlockId {
        if let Some(id) = self.deleted.pop_first() {
            return id;
        }
        let id = self.num_blocks;
        self.num_blocks += 1;
        id
    }

    /// Return a block id to the free list.
    pub fn free(&mut self, id: BlockId) {
        debug_assert!(id < self.num_blocks, "freeing unallocated block {}", id);
        self.deleted.insert(id);
    }

    /// Count of block ids ever allocated.
    pub fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    /// Ids available for reuse.
    pub fn deleted_block_ids(&self) -> &BTreeSet<BlockId> {
        &self.deleted
    }

    /// Whether `id` is on the free list.
    pub fn is_deleted(&self, id: BlockId) -> bool {
        self.deleted.contains(&id)
    }

    /// Blocks currently holding postings.
    pub fn live_blocks(&self) -> u32 {
        self.num_blocks - self.deleted.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_grows_then_reuses() {
        let mut pool = BlockPool::new();
        assert_eq!(pool.allocate(), 0);
        assert_eq!(pool.allocate(), 1);
        assert_eq!(pool.allocate(), 2);
        assert_eq!(pool.num_blocks(), 3);

        pool.free(1);
        assert_eq!(pool.num_blocks(), 3);
        assert!(pool.is_deleted(1));
        assert_eq!(pool.live_blocks(), 2);

        assert_eq!(pool.allocate(), 1);
        assert!(pool.deleted_block_ids().is_empty());
        assert_eq!(pool.allocate(), 3);
        assert_eq!(pool.num_blocks(), 4);
    }

    #[test]
    fn test_free_is_idempotent() {
        let mut pool = BlockPool::new();
        let id = pool.allocate();
        pool.free(id);
        pool.free(id);
        assert_eq!(pool.deleted_block_ids().len(), 1);
        assert_eq!(pool.live_blocks(), 0);
    }
}

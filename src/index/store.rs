//! Block storage: the arena that chains are read from.

use std::borrow::Cow;

use crate::types::{Block, BlockId, BoosterError, BoosterResult};

/// Anything blocks can be loaded from by id.
///
/// Implemented by the in-memory arena and by the memory-mapped file reader,
/// so chain decoding does not care where pages live.
pub trait BlockSource {
    /// Load one block.
    fn load_block(&self, id: BlockId) -> BoosterResult<Cow<'_, Block>>;

    /// Number of addressable block ids.
    fn block_count(&self) -> u32;
}

/// Flat in-memory arena of blocks keyed by block id.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    blocks: Vec<Block>,
}

impl MemoryBlockStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from pre-existing blocks (used by reader).
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Get a block by id.
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id as usize)
    }

    /// Overwrite a block, growing the arena if `id` is new.
    pub fn write(&mut self, id: BlockId, block: Block) {
        let idx = id as usize;
        if idx >= self.blocks.len() {
            self.blocks.resize_with(idx + 1, Block::default);
        }
        self.blocks[idx] = block;
    }

    /// Reset a block to empty.
    pub fn clear(&mut self, id: BlockId) {
        if let Some(block) = self.blocks.get_mut(id as usize) {
            *block = Block::default();
        }
    }

    /// All blocks in id order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}

impl BlockSource for MemoryBlockStore {
    fn load_block(&self, id: BlockId) -> BoosterResult<Cow<'_, Block>> {
        self.get(id)
            .map(Cow::Borrowed)
            .ok_or_else(|| BoosterError::corrupt_chain(id, "block id beyond arena"))
    }

    fn block_count(&self) -> u32 {
        self.blocks.len() as u32
    }
}

//! Reads .bidx files into an in-memory index.

use std::io::Read;
use std::path::Path;

use crate::index::{BlockPool, GameEntityIndex, MemoryBlockStore};
use crate::types::error::{BoosterError, BoosterResult};
use crate::types::header::{le_u32, FileHeader, HEADER_SIZE};
use crate::types::BlockId;

use super::compression::decompress_section;
use super::layout::{page_size, parse_heads, parse_page};

/// Reader for .bidx binary files.
pub struct IndexReader;

impl IndexReader {
    /// Read a .bidx file into a GameEntityIndex.
    pub fn read_from_file(path: &Path) -> BoosterResult<GameEntityIndex> {
        let data = std::fs::read(path)?;
        let mut cursor = std::io::Cursor::new(data);
        let index = Self::read_from(&mut cursor)?;
        log::info!(
            "Loaded {} ({} blocks, {} deleted)",
            path.display(),
            index.num_blocks(),
            index.deleted_block_ids().len()
        );
        Ok(index)
    }

    /// Read from any reader into a GameEntityIndex.
    pub fn read_from(reader: &mut impl Read) -> BoosterResult<GameEntityIndex> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        if data.len() < HEADER_SIZE as usize {
            return Err(BoosterError::Truncated);
        }
        let header = FileHeader::read_from(&mut std::io::Cursor::new(&data[..HEADER_SIZE as usize]))?;
        let capacity = header.block_capacity as usize;

        // Head table
        let heads_bytes = section(&data, header.head_table_offset, header.block_table_offset)?;
        let heads = parse_heads(&decompress_section(heads_bytes)?, header.type_count as usize)?;

        // Block pages
        let page = page_size(capacity);
        let pages = section(&data, header.block_table_offset, header.deleted_table_offset)?;
        let pages_end = table_end(
            header.block_table_offset,
            header.num_blocks,
            page as u64,
            NUM_BLOCKS_FIELD,
        )?;
        if header.num_blocks > u32::MAX as u64 || pages_end != header.deleted_table_offset {
            return Err(BoosterError::Corrupt(NUM_BLOCKS_FIELD));
        }
        let mut blocks = Vec::with_capacity(header.num_blocks as usize);
        let mut flagged: Vec<BlockId> = Vec::new();
        for (i, raw) in pages.chunks_exact(page).enumerate() {
            let (block, deleted) = parse_page(raw, i as BlockId, capacity)?;
            if deleted {
                flagged.push(i as BlockId);
            }
            blocks.push(block);
        }

        // Deleted list must agree with the page flags
        let deleted_end = table_end(
            header.deleted_table_offset,
            header.deleted_count,
            4,
            DELETED_COUNT_FIELD,
        )?;
        let deleted_bytes = section(&data, header.deleted_table_offset, deleted_end)?;
        let mut deleted = Vec::with_capacity(header.deleted_count as usize);
        for i in 0..header.deleted_count as usize {
            deleted.push(le_u32(deleted_bytes, i * 4)?);
        }
        let mut sorted = deleted.clone();
        sorted.sort_unstable();
        if sorted != flagged {
            return Err(BoosterError::Corrupt(header.deleted_table_offset));
        }

        let pool = BlockPool::from_parts(header.num_blocks as u32, deleted);
        let store = MemoryBlockStore::from_blocks(blocks);
        let index = GameEntityIndex::from_parts(capacity, pool, heads, store)?;
        index.verify()?;
        Ok(index)
    }
}

/// Header byte offset of `num_blocks`.
pub(crate) const NUM_BLOCKS_FIELD: u64 = 0x10;

/// Header byte offset of `deleted_count`.
pub(crate) const DELETED_COUNT_FIELD: u64 = 0x18;

/// End offset of a table of `count` entries of `entry_size` bytes at `start`.
/// Overflow means the header field at `field` is corrupt.
pub(crate) fn table_end(start: u64, count: u64, entry_size: u64, field: u64) -> BoosterResult<u64> {
    count
        .checked_mul(entry_size)
        .and_then(|len| start.checked_add(len))
        .ok_or(BoosterError::Corrupt(field))
}

/// Slice `data[start..end]`, failing if the range is out of bounds.
pub(crate) fn section(data: &[u8], start: u64, end: u64) -> BoosterResult<&[u8]> {
    if start > end {
        return Err(BoosterError::Corrupt(start));
    }
    data.get(start as usize..end as usize)
        .ok_or(BoosterError::Truncated)
}

//! Memory-mapped file access for .bidx files.

use std::borrow::Cow;
use std::path::Path;

use memmap2::Mmap;

use crate::index::{expand_postings, BlockSource, EntityHeadTable, PostingCodec};
use crate::types::error::{BoosterError, BoosterResult};
use crate::types::header::{le_u32, FileHeader, HEADER_SIZE};
use crate::types::{Block, BlockId, EntityId, EntityType, GameId, Posting};

use super::compression::decompress_section;
use super::layout::{page_size, parse_heads, parse_page};
use super::reader::{section, table_end, DELETED_COUNT_FIELD, NUM_BLOCKS_FIELD};

/// Read-only memory-mapped access to a .bidx file.
///
/// Only the head table is decoded up front; block pages are parsed when a
/// chain walks through them.
pub struct MmapReader {
    mmap: Mmap,
    header: FileHeader,
    heads: EntityHeadTable,
    codec: PostingCodec,
}

impl MmapReader {
    /// Open a .bidx file for memory-mapped read access.
    pub fn open(path: &Path) -> BoosterResult<Self> {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < HEADER_SIZE as usize {
            return Err(BoosterError::Truncated);
        }
        let header = FileHeader::read_from(&mut std::io::Cursor::new(&mmap[..HEADER_SIZE as usize]))?;
        if header.block_capacity == 0 {
            return Err(BoosterError::Corrupt(8));
        }

        let heads_bytes = section(&mmap, header.head_table_offset, header.block_table_offset)?;
        let heads = parse_heads(&decompress_section(heads_bytes)?, header.type_count as usize)?;

        if header.num_blocks > u32::MAX as u64 {
            return Err(BoosterError::Corrupt(NUM_BLOCKS_FIELD));
        }
        let pages_end = table_end(
            header.block_table_offset,
            header.num_blocks,
            page_size(header.block_capacity as usize) as u64,
            NUM_BLOCKS_FIELD,
        )?;
        let deleted_end = table_end(
            header.deleted_table_offset,
            header.deleted_count,
            4,
            DELETED_COUNT_FIELD,
        )?;
        if pages_end.max(deleted_end) > mmap.len() as u64 {
            return Err(BoosterError::Truncated);
        }

        let codec = PostingCodec::new(header.block_capacity as usize);
        Ok(Self {
            mmap,
            header,
            heads,
            codec,
        })
    }

    /// Get the file header.
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Configured entity types.
    pub fn entity_types(&self) -> &[EntityType] {
        self.heads.entity_types()
    }

    /// Number of entity ids introduced for a type.
    pub fn known_count(&self, entity_type: EntityType) -> BoosterResult<u32> {
        self.heads.known_count(entity_type)
    }

    /// Head block of an entity's chain.
    pub fn head_of(
        &self,
        entity_id: EntityId,
        entity_type: EntityType,
    ) -> BoosterResult<Option<BlockId>> {
        self.heads.head_of(entity_type, entity_id)
    }

    /// The raw posting list of one entity, read from the mapped pages.
    pub fn postings(
        &self,
        entity_id: EntityId,
        entity_type: EntityType,
    ) -> BoosterResult<Vec<Posting>> {
        let head = self.heads.head_of(entity_type, entity_id)?;
        self.codec.decode(self, head)
    }

    /// Games `entity_id` appears in, ascending; repeated per count with `expand`.
    pub fn get_game_ids(
        &self,
        entity_id: EntityId,
        entity_type: EntityType,
        expand: bool,
    ) -> BoosterResult<Vec<GameId>> {
        let postings = self.postings(entity_id, entity_type)?;
        Ok(expand_postings(&postings, expand))
    }

    /// Count of block ids ever allocated.
    pub fn num_blocks(&self) -> u32 {
        self.header.num_blocks as u32
    }

    /// Allocated block ids currently unused, ascending.
    pub fn deleted_block_ids(&self) -> BoosterResult<Vec<BlockId>> {
        let start = self.header.deleted_table_offset;
        let end = table_end(start, self.header.deleted_count, 4, DELETED_COUNT_FIELD)?;
        let bytes = section(&self.mmap, start, end)?;
        let mut ids = Vec::with_capacity(self.header.deleted_count as usize);
        for i in 0..self.header.deleted_count as usize {
            ids.push(le_u32(bytes, i * 4)?);
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

impl BlockSource for MmapReader {
    fn load_block(&self, id: BlockId) -> BoosterResult<Cow<'_, Block>> {
        if id >= self.num_blocks() {
            return Err(BoosterError::corrupt_chain(id, "block id beyond file"));
        }
        let page = page_size(self.header.block_capacity as usize);
        let start = self.header.block_table_offset as usize + id as usize * page;
        let raw = self
            .mmap
            .get(start..start + page)
            .ok_or(BoosterError::Truncated)?;
        let (block, _) = parse_page(raw, id, self.header.block_capacity as usize)?;
        Ok(Cow::Owned(block))
    }

    fn block_count(&self) -> u32 {
        self.num_blocks()
    }
}

//! On-disk layout of block pages and the head table section.

use std::io::Write;

use crate::index::EntityHeadTable;
use crate::types::error::{BoosterError, BoosterResult};
use crate::types::header::{le_u16, le_u32};
use crate::types::{Block, BlockId, EntityType, Posting, NO_BLOCK};

/// Bytes before the postings of a page.
pub const PAGE_HEADER_SIZE: usize = 16;

/// Bytes per posting on disk.
pub const POSTING_SIZE: usize = 8;

/// Page flag: block id is on the free list.
const FLAG_DELETED: u16 = 0x0001;

/// Size of one block page for the given capacity.
pub fn page_size(block_capacity: usize) -> usize {
    PAGE_HEADER_SIZE + block_capacity * POSTING_SIZE
}

/// Write one fixed-size page.
///
/// Layout (all little-endian):
/// - 0x00..0x04: next block id (u32, `NO_BLOCK` for none)
/// - 0x04..0x06: posting count (u16)
/// - 0x06..0x08: flags (u16)
/// - 0x08..0x0C: crc32 of the posting bytes (u32)
/// - 0x0C..0x10: _reserved (u32, written as 0)
/// - then `count` × (game_id u32, count u32), zero-padded to capacity
pub fn write_page(
    writer: &mut impl Write,
    block: &Block,
    deleted: bool,
    block_capacity: usize,
) -> BoosterResult<()> {
    let mut body = Vec::with_capacity(block.len() * POSTING_SIZE);
    for p in &block.postings {
        body.extend_from_slice(&p.game_id.to_le_bytes());
        body.extend_from_slice(&p.count.to_le_bytes());
    }
    let flags = if deleted { FLAG_DELETED } else { 0 };

    writer.write_all(&block.next.unwrap_or(NO_BLOCK).to_le_bytes())?;
    writer.write_all(&(block.len() as u16).to_le_bytes())?;
    writer.write_all(&flags.to_le_bytes())?;
    writer.write_all(&crc32fast::hash(&body).to_le_bytes())?;
    writer.write_all(&0u32.to_le_bytes())?; // _reserved
    writer.write_all(&body)?;
    let padding = block_capacity.saturating_sub(block.len()) * POSTING_SIZE;
    writer.write_all(&vec![0u8; padding])?;
    Ok(())
}

/// Parse one page. Returns the block and whether it is flagged deleted.
pub fn parse_page(page: &[u8], id: BlockId, block_capacity: usize) -> BoosterResult<(Block, bool)> {
    let next = le_u32(page, 0)?;
    let len = le_u16(page, 4)? as usize;
    let flags = le_u16(page, 6)?;
    let crc = le_u32(page, 8)?;

    if len > block_capacity {
        return Err(BoosterError::corrupt_chain(
            id,
            format!("page claims {} postings, capacity {}", len, block_capacity),
        ));
    }
    let body = page
        .get(PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + len * POSTING_SIZE)
        .ok_or(BoosterError::Truncated)?;
    if crc32fast::hash(body) != crc {
        log::warn!("Checksum mismatch in block {}", id);
        return Err(BoosterError::ChecksumMismatch(id));
    }

    let mut postings = Vec::with_capacity(len);
    for i in 0..len {
        let offset = i * POSTING_SIZE;
        postings.push(Posting::new(le_u32(body, offset)?, le_u32(body, offset + 4)?));
    }
    let next = (next != NO_BLOCK).then_some(next);
    Ok((Block::new(postings, next), flags & FLAG_DELETED != 0))
}

/// Serialize the head table: per type, `u8` tag, `u32` known count, heads.
pub fn encode_heads(heads: &EntityHeadTable) -> BoosterResult<Vec<u8>> {
    let mut buf = Vec::new();
    for &entity_type in heads.entity_types() {
        let rows = heads.rows(entity_type)?;
        buf.push(entity_type as u8);
        buf.extend_from_slice(&(rows.len() as u32).to_le_bytes());
        for head in rows {
            buf.extend_from_slice(&head.unwrap_or(NO_BLOCK).to_le_bytes());
        }
    }
    Ok(buf)
}

/// Parse a head table written by [`encode_heads`].
pub fn parse_heads(data: &[u8], type_count: usize) -> BoosterResult<EntityHeadTable> {
    let mut types = Vec::with_capacity(type_count);
    let mut rows = Vec::with_capacity(type_count);
    let mut pos = 0usize;

    for _ in 0..type_count {
        let tag = *data.get(pos).ok_or(BoosterError::Truncated)?;
        let entity_type = EntityType::from_u8(tag).ok_or(BoosterError::Corrupt(pos as u64))?;
        if types.contains(&entity_type) {
            return Err(BoosterError::Corrupt(pos as u64));
        }
        let known_count = le_u32(data, pos + 1)? as usize;
        pos += 5;

        let mut heads = Vec::with_capacity(known_count.min(data.len().saturating_sub(pos) / 4));
        for _ in 0..known_count {
            let head = le_u32(data, pos)?;
            heads.push((head != NO_BLOCK).then_some(head));
            pos += 4;
        }
        types.push(entity_type);
        rows.push(heads);
    }

    if pos != data.len() {
        return Err(BoosterError::Corrupt(pos as u64));
    }
    Ok(EntityHeadTable::from_parts(types, rows))
}

//! Writes .bidx files from an in-memory index.

use std::io::Write;
use std::path::Path;

use crate::index::GameEntityIndex;
use crate::types::error::BoosterResult;
use crate::types::header::{FileHeader, HEADER_SIZE};
use crate::types::{now_micros, Block};

use super::compression::compress_section;
use super::layout::{encode_heads, page_size, write_page};

/// Writer for .bidx binary files.
#[derive(Debug, Default)]
pub struct IndexWriter;

impl IndexWriter {
    /// Create a new writer.
    pub fn new() -> Self {
        Self
    }

    /// Write a complete index to a .bidx file.
    pub fn write_to_file(&self, index: &GameEntityIndex, path: &Path) -> BoosterResult<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_to(index, &mut writer)?;
        log::info!(
            "Wrote {} ({} blocks, {} deleted)",
            path.display(),
            index.num_blocks(),
            index.deleted_block_ids().len()
        );
        Ok(())
    }

    /// Write a complete index to any writer.
    pub fn write_to(&self, index: &GameEntityIndex, writer: &mut impl Write) -> BoosterResult<()> {
        let capacity = index.block_capacity();
        let num_blocks = index.num_blocks() as u64;
        let deleted = index.deleted_block_ids();

        // Step 1: Compress the head table
        let heads = compress_section(&encode_heads(index.heads())?);

        // Step 2: Calculate section offsets
        let head_table_offset = HEADER_SIZE;
        let block_table_offset = head_table_offset + heads.len() as u64;
        let deleted_table_offset = block_table_offset + num_blocks * page_size(capacity) as u64;

        // Step 3: Write header
        let header = FileHeader {
            num_blocks,
            deleted_count: deleted.len() as u64,
            head_table_offset,
            block_table_offset,
            deleted_table_offset,
            created_at: now_micros(),
            ..FileHeader::new(capacity as u32, index.entity_types().len() as u32)
        };
        header.write_to(writer)?;

        // Step 4: Write head table
        writer.write_all(&heads)?;

        // Step 5: Write one page per allocated block id
        let empty = Block::default();
        for id in 0..index.num_blocks() {
            let block = index.store().get(id).unwrap_or(&empty);
            write_page(writer, block, deleted.contains(&id), capacity)?;
        }

        // Step 6: Write deleted list
        for id in deleted {
            writer.write_all(&id.to_le_bytes())?;
        }

        writer.flush()?;
        Ok(())
    }
}

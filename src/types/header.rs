//! File header for .bidx binary files.

use std::io::{Read, Write};

use crate::types::error::{BoosterError, BoosterResult};
use crate::types::{BIDX_MAGIC, FORMAT_VERSION};

/// Header of a .bidx file. Fixed size: 64 bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileHeader {
    /// Magic bytes: [0x42, 0x49, 0x44, 0x58] ("BIDX").
    pub magic: [u8; 4],
    /// Format version (currently 1).
    pub version: u32,
    /// Postings per block.
    pub block_capacity: u32,
    /// Number of configured entity types.
    pub type_count: u32,
    /// Block ids ever allocated.
    pub num_blocks: u64,
    /// Block ids currently on the free list.
    pub deleted_count: u64,
    /// Byte offset of the compressed head table.
    pub head_table_offset: u64,
    /// Byte offset of the first block page.
    pub block_table_offset: u64,
    /// Byte offset of the deleted-block list.
    pub deleted_table_offset: u64,
    /// When the file was written (Unix epoch microseconds).
    pub created_at: u64,
}

/// The fixed size of a FileHeader on disk: 64 bytes.
pub const HEADER_SIZE: u64 = 64;

impl FileHeader {
    /// Create a new header with default magic and version.
    pub fn new(block_capacity: u32, type_count: u32) -> Self {
        Self {
            magic: BIDX_MAGIC,
            version: FORMAT_VERSION,
            block_capacity,
            type_count,
            num_blocks: 0,
            deleted_count: 0,
            head_table_offset: HEADER_SIZE,
            block_table_offset: HEADER_SIZE,
            deleted_table_offset: HEADER_SIZE,
            created_at: 0,
        }
    }

    /// Write this header to the given writer. Writes exactly 64 bytes.
    ///
    /// Layout (all little-endian):
    /// - 0x00..0x04: magic (4 bytes)
    /// - 0x04..0x08: version (u32)
    /// - 0x08..0x0C: block_capacity (u32)
    /// - 0x0C..0x10: type_count (u32)
    /// - 0x10..0x18: num_blocks (u64)
    /// - 0x18..0x20: deleted_count (u64)
    /// - 0x20..0x28: head_table_offset (u64)
    /// - 0x28..0x30: block_table_offset (u64)
    /// - 0x30..0x38: deleted_table_offset (u64)
    /// - 0x38..0x40: created_at (u64)
    pub fn write_to(&self, writer: &mut impl Write) -> BoosterResult<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.block_capacity.to_le_bytes())?;
        writer.write_all(&self.type_count.to_le_bytes())?;
        writer.write_all(&self.num_blocks.to_le_bytes())?;
        writer.write_all(&self.deleted_count.to_le_bytes())?;
        writer.write_all(&self.head_table_offset.to_le_bytes())?;
        writer.write_all(&self.block_table_offset.to_le_bytes())?;
        writer.write_all(&self.deleted_table_offset.to_le_bytes())?;
        writer.write_all(&self.created_at.to_le_bytes())?;
        Ok(())
    }

    /// Read a header from the given reader. Reads exactly 64 bytes.
    pub fn read_from(reader: &mut impl Read) -> BoosterResult<Self> {
        let mut buf = [0u8; 64];
        reader.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                BoosterError::Truncated
            } else {
                BoosterError::Io(e)
            }
        })?;

        let magic = [buf[0], buf[1], buf[2], buf[3]];
        if magic != BIDX_MAGIC {
            return Err(BoosterError::InvalidMagic);
        }

        let version = le_u32(&buf, 4)?;
        if version != FORMAT_VERSION {
            return Err(BoosterError::UnsupportedVersion(version));
        }

        Ok(Self {
            magic,
            version,
            block_capacity: le_u32(&buf, 8)?,
            type_count: le_u32(&buf, 12)?,
            num_blocks: le_u64(&buf, 16)?,
            deleted_count: le_u64(&buf, 24)?,
            head_table_offset: le_u64(&buf, 32)?,
            block_table_offset: le_u64(&buf, 40)?,
            deleted_table_offset: le_u64(&buf, 48)?,
            created_at: le_u64(&buf, 56)?,
        })
    }
}

/// Read a little-endian u16 at `offset`.
pub(crate) fn le_u16(data: &[u8], offset: usize) -> BoosterResult<u16> {
    data.get(offset..offset + 2)
        .and_then(|b| b.try_into().ok())
        .map(u16::from_le_bytes)
        .ok_or(BoosterError::Truncated)
}

/// Read a little-endian u32 at `offset`.
pub(crate) fn le_u32(data: &[u8], offset: usize) -> BoosterResult<u32> {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(BoosterError::Truncated)
}

/// Read a little-endian u64 at `offset`.
pub(crate) fn le_u64(data: &[u8], offset: usize) -> BoosterResult<u64> {
    data.get(offset..offset + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or(BoosterError::Truncated)
}

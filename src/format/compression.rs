//! LZ4 compression of variable-size file sections.

use crate::types::error::{BoosterError, BoosterResult};

/// Compress a section with LZ4 (prepend size for decompression).
pub fn compress_section(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}

/// Decompress a section written by [`compress_section`].
pub fn decompress_section(data: &[u8]) -> BoosterResult<Vec<u8>> {
    lz4_flex::decompress_size_prepended(data).map_err(|e| BoosterError::Compression(e.to_string()))
}

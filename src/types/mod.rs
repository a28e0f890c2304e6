//! All data types for the booster index.

pub mod block;
pub mod config;
pub mod entity;
pub mod error;
pub mod header;

pub use block::{Block, Posting};
pub use config::IndexConfig;
pub use entity::EntityType;
pub use error::{BoosterError, BoosterResult};
pub use header::{FileHeader, HEADER_SIZE};

/// Identifier of a game in the enclosing database.
pub type GameId = u32;

/// Identifier of an entity within its catalog (player #42, tournament #7, ...).
pub type EntityId = u32;

/// Handle of a block in the block pool.
pub type BlockId = u32;

/// Magic bytes at the start of every .bidx file.
pub const BIDX_MAGIC: [u8; 4] = [0x42, 0x49, 0x44, 0x58]; // "BIDX"

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Default number of postings per block. Gives a 1024-byte page on disk.
pub const DEFAULT_BLOCK_CAPACITY: usize = 126;

/// Largest block capacity the page header can describe.
pub const MAX_BLOCK_CAPACITY: usize = u16::MAX as usize;

/// On-disk marker for "no block" in head and link fields.
pub const NO_BLOCK: u32 = u32::MAX;

/// Returns the current time as Unix epoch microseconds.
pub fn now_micros() -> u64 {
    chrono::Utc::now().timestamp_micros() as u64
}

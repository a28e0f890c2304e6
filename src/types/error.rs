//! Error types for the booster index.

use thiserror::Error;

use super::{BlockId, EntityId, EntityType};

/// All errors that can occur in the booster index.
#[derive(Error, Debug)]
pub enum BoosterError {
    /// Entity id lies beyond the type's known extent.
    #[error("Entity id {entity_id} out of range for {entity_type}: known extent is {known_count}")]
    EntityOutOfRange {
        entity_type: EntityType,
        entity_id: EntityId,
        known_count: u32,
    },

    /// Entity type not configured for this index.
    #[error("Entity type {0} is not configured for this index")]
    UnknownEntityType(EntityType),

    /// A posting chain violates its structural invariants.
    #[error("Corrupt chain at block {block_id}: {reason}")]
    CorruptChain { block_id: BlockId, reason: String },

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Change records could not be parsed.
    #[error("Invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid magic bytes in file header.
    #[error("Invalid magic bytes in file header")]
    InvalidMagic,

    /// Unsupported format version.
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    /// File is empty or truncated.
    #[error("File is empty or truncated")]
    Truncated,

    /// Corrupt data at a given offset.
    #[error("Corrupt data at offset {0}")]
    Corrupt(u64),

    /// Page checksum does not match its contents.
    #[error("Checksum mismatch in block {0}")]
    ChecksumMismatch(BlockId),

    /// Compression error.
    #[error("Compression error: {0}")]
    Compression(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BoosterError {
    pub(crate) fn corrupt_chain(block_id: BlockId, reason: impl Into<String>) -> Self {
        Self::CorruptChain {
            block_id,
            reason: reason.into(),
        }
    }
}

/// Convenience result type for booster index operations.
pub type BoosterResult<T> = Result<T, BoosterError>;

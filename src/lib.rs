//! Game-entity posting lists for chess databases.
//!
//! Maps `(entity type, entity id)` (players, sources, tournaments, annotators,
//! teams, game tags) to the ascending list of games the entity appears in,
//! with a per-game role count. Posting lists live in chains of fixed-capacity
//! blocks that are updated in place, split on overflow and reclaimed when
//! they empty.

pub mod cli;
pub mod engine;
pub mod format;
pub mod index;
pub mod types;

// Re-export commonly used types at the crate root
pub use engine::{GameChange, GameEntities, QueryEngine, UpdateReport, WriteEngine};
pub use format::{IndexReader, IndexWriter, MmapReader};
pub use index::{
    BlockPool, BlockSource, EntityHeadTable, GameEntityIndex, IndexStats, PostingCodec, TypeStats,
};
pub use types::{
    Block, BlockId, BoosterError, BoosterResult, EntityId, EntityType, FileHeader, GameId,
    IndexConfig, Posting, DEFAULT_BLOCK_CAPACITY,
};

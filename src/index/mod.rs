//! The game-entity index: block pool, posting codec, head table and the
//! index that ties them together.

pub mod codec;
pub mod game_entity;
pub mod head_table;
pub mod pool;
pub mod store;

pub use codec::{merge_postings, EncodeOutcome, PostingCodec, Run};
pub use game_entity::{expand_postings, GameEntityIndex, IndexStats, TypeStats};
pub use head_table::EntityHeadTable;
pub use pool::BlockPool;
pub use store::{BlockSource, MemoryBlockStore};

//! Postings and the blocks that hold them.

use serde::Serialize;

use super::{BlockId, GameId};

/// How many times an entity appears in one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Posting {
    /// The game the entity appears in.
    pub game_id: GameId,
    /// Role count; never zero once stored.
    pub count: u32,
}

impl Posting {
    pub fn new(game_id: GameId, count: u32) -> Self {
        Self { game_id, count }
    }
}

/// A fixed-capacity run of one entity's postings plus the link to the next block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    /// Postings, strictly ascending by game id.
    pub postings: Vec<Posting>,
    /// Next block in the chain, or None for the last block.
    pub next: Option<BlockId>,
}

impl Block {
    pub fn new(postings: Vec<Posting>, next: Option<BlockId>) -> Self {
        Self { postings, next }
    }

    /// Number of postings held.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Whether the block holds no postings.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Game id of the first posting, if any.
    pub fn first_game(&self) -> Option<GameId> {
        self.postings.first().map(|p| p.game_id)
    }
}

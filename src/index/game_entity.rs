//! Game-entity index — which games each player, source, tournament, ... appears in.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::types::{
    Block, BlockId, BoosterError, BoosterResult, EntityId, EntityType, GameId, IndexConfig,
    Posting,
};

use super::codec::{merge_postings, PostingCodec, Run};
use super::head_table::EntityHeadTable;
use super::pool::BlockPool;
use super::store::{BlockSource, MemoryBlockStore};

/// Per-type counters reported by [`GameEntityIndex::stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeStats {
    pub entity_type: EntityType,
    /// Entity ids introduced.
    pub known_count: u32,
    /// Entities with at least one posting.
    pub non_empty: u32,
    /// Postings across all entities of this type.
    pub postings: u64,
}

/// Space and volume summary of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub block_capacity: usize,
    pub types: Vec<TypeStats>,
    pub total_postings: u64,
    pub num_blocks: u32,
    pub deleted_blocks: u32,
    pub live_blocks: u32,
    /// Blocks in the longest chain.
    pub longest_chain: usize,
}

/// Maps `(entity type, entity id)` to the games that entity appears in.
///
/// Each entity's postings live in a chain of fixed-capacity blocks drawn
/// from one shared [`BlockPool`]. Not internally synchronized: callers
/// serialize writers.
#[derive(Debug, Clone)]
pub struct GameEntityIndex {
    pool: BlockPool,
    heads: EntityHeadTable,
    store: MemoryBlockStore,
    codec: PostingCodec,
}

impl GameEntityIndex {
    /// Create an empty index.
    pub fn new(config: IndexConfig) -> BoosterResult<Self> {
        config.validate()?;
        Ok(Self {
            pool: BlockPool::new(),
            heads: EntityHeadTable::new(&config.entity_types),
            store: MemoryBlockStore::new(),
            codec: PostingCodec::new(config.block_capacity),
        })
    }

    /// Create an empty index over the given types with the default block capacity.
    pub fn with_types(entity_types: &[EntityType]) -> BoosterResult<Self> {
        Self::new(IndexConfig::with_types(entity_types))
    }

    /// Create from pre-existing parts (used by reader). Call [`verify`](Self::verify)
    /// before trusting the result.
    pub fn from_parts(
        block_capacity: usize,
        pool: BlockPool,
        heads: EntityHeadTable,
        store: MemoryBlockStore,
    ) -> BoosterResult<Self> {
        let config = IndexConfig {
            entity_types: heads.entity_types().to_vec(),
            block_capacity,
        };
        config.validate()?;
        Ok(Self {
            pool,
            heads,
            store,
            codec: PostingCodec::new(block_capacity),
        })
    }

    /// Set the counts of `entity_id` in the given games.
    ///
    /// Each `(game, count)` replaces the stored count; zero removes the game.
    /// `entity_id` may be at most the type's known count, which introduces it.
    /// On error nothing has been changed.
    pub fn update_entity(
        &mut self,
        entity_id: EntityId,
        entity_type: EntityType,
        changes: &BTreeMap<GameId, u32>,
    ) -> BoosterResult<()> {
        self.heads.check_extent(entity_type, entity_id)?;

        let head = self.heads.head_of(entity_type, entity_id)?;
        let chain = self.codec.decode_chain(&self.store, head)?;
        let runs = route_changes(&chain, changes);

        self.heads.ensure_extent(entity_type, entity_id)?;
        let outcome = self.codec.encode(&chain, runs, &mut self.pool);

        log::debug!(
            "{} {}: {} changes, {} blocks written, {} allocated, {} freed",
            entity_type,
            entity_id,
            changes.len(),
            outcome.writes.len(),
            outcome.allocated.len(),
            outcome.freed.len()
        );

        for (id, block) in outcome.writes {
            self.store.write(id, block);
        }
        for id in outcome.freed {
            self.store.clear(id);
            self.pool.free(id);
        }
        self.heads.set_head(entity_type, entity_id, outcome.head)
    }

    /// Games `entity_id` appears in, ascending.
    ///
    /// With `expand`, each game id is repeated `count` times. Entities never
    /// given a posting (or never introduced) yield an empty list.
    pub fn get_game_ids(
        &self,
        entity_id: EntityId,
        entity_type: EntityType,
        expand: bool,
    ) -> BoosterResult<Vec<GameId>> {
        let postings = self.postings(entity_id, entity_type)?;
        Ok(expand_postings(&postings, expand))
    }

    /// The raw posting list of one entity.
    pub fn postings(
        &self,
        entity_id: EntityId,
        entity_type: EntityType,
    ) -> BoosterResult<Vec<Posting>> {
        let head = self.heads.head_of(entity_type, entity_id)?;
        self.codec.decode(&self.store, head)
    }

    /// Walk one entity's chain without copying it. Returns the chain length,
    /// or the `CorruptChain` error an update of this entity would hit.
    pub fn check_chain(&self, entity_id: EntityId, entity_type: EntityType) -> BoosterResult<usize> {
        let head = self.heads.head_of(entity_type, entity_id)?;
        self.codec.walk(&self.store, head, |_, _| {})
    }

    /// Count of block ids ever allocated.
    pub fn num_blocks(&self) -> u32 {
        self.pool.num_blocks()
    }

    /// Allocated block ids currently unused.
    pub fn deleted_block_ids(&self) -> &BTreeSet<BlockId> {
        self.pool.deleted_block_ids()
    }

    /// Number of entity ids introduced for a type.
    pub fn known_count(&self, entity_type: EntityType) -> BoosterResult<u32> {
        self.heads.known_count(entity_type)
    }

    /// Configured entity types, in construction order.
    pub fn entity_types(&self) -> &[EntityType] {
        self.heads.entity_types()
    }

    /// Postings per block.
    pub fn block_capacity(&self) -> usize {
        self.codec.capacity()
    }

    /// Block pool state (for serialization).
    pub fn pool(&self) -> &BlockPool {
        &self.pool
    }

    /// Head table (for serialization).
    pub fn heads(&self) -> &EntityHeadTable {
        &self.heads
    }

    /// Block arena (for serialization).
    pub fn store(&self) -> &MemoryBlockStore {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut MemoryBlockStore {
        &mut self.store
    }

    /// Collect volume and space counters.
    pub fn stats(&self) -> BoosterResult<IndexStats> {
        let mut types = Vec::with_capacity(self.entity_types().len());
        let mut longest_chain = 0;
        for &entity_type in self.entity_types() {
            let mut non_empty = 0;
            let mut postings = 0u64;
            for head in self.heads.rows(entity_type)?.iter().copied().flatten() {
                let mut len = 0;
                let blocks = self.codec.walk(&self.store, Some(head), |_, block| {
                    len += block.len() as u64
                })?;
                longest_chain = longest_chain.max(blocks);
                non_empty += 1;
                postings += len;
            }
            types.push(TypeStats {
                entity_type,
                known_count: self.heads.known_count(entity_type)?,
                non_empty,
                postings,
            });
        }

        Ok(IndexStats {
            block_capacity: self.block_capacity(),
            total_postings: types.iter().map(|t| t.postings).sum(),
            types,
            num_blocks: self.pool.num_blocks(),
            deleted_blocks: self.pool.deleted_block_ids().len() as u32,
            live_blocks: self.pool.live_blocks(),
            longest_chain,
        })
    }

    /// Check that every live block belongs to exactly one chain and no chain
    /// touches a deleted block.
    pub fn verify(&self) -> BoosterResult<()> {
        let num_blocks = self.pool.num_blocks();
        if self.store.block_count() > num_blocks {
            return Err(BoosterError::corrupt_chain(
                num_blocks,
                "arena larger than allocated block range",
            ));
        }
        if let Some(&id) = self.pool.deleted_block_ids().range(num_blocks..).next() {
            return Err(BoosterError::corrupt_chain(id, "deleted id never allocated"));
        }

        let mut reached = vec![false; num_blocks as usize];
        for (entity_type, entity_id, head) in self.heads.chains() {
            let mut fault: Option<(BlockId, &str)> = None;
            self.codec.walk(&self.store, Some(head), |id, _| {
                if fault.is_some() {
                    return;
                }
                if self.pool.is_deleted(id) {
                    fault = Some((id, "chain references deleted block"));
                } else if std::mem::replace(&mut reached[id as usize], true) {
                    fault = Some((id, "block shared by two chains"));
                }
            })?;
            if let Some((id, reason)) = fault {
                log::warn!("{} {} chain fails verification", entity_type, entity_id);
                return Err(BoosterError::corrupt_chain(id, reason));
            }
        }

        let orphan = (0..num_blocks).find(|&id| !reached[id as usize] && !self.pool.is_deleted(id));
        if let Some(id) = orphan {
            return Err(BoosterError::corrupt_chain(
                id,
                "live block not reachable from any entity",
            ));
        }
        Ok(())
    }
}

/// Route ascending changes to the chain blocks whose game range covers them
/// and merge them in. Block `i` covers every game below the first game of
/// block `i + 1`.
fn route_changes(chain: &[(BlockId, Block)], changes: &BTreeMap<GameId, u32>) -> Vec<Run> {
    let mut pending = changes.iter().map(|(&g, &c)| (g, c)).peekable();

    if chain.is_empty() {
        let fresh: Vec<(GameId, u32)> = pending.collect();
        return vec![Run::new(None, merge_postings(&[], &fresh))];
    }

    let mut runs = Vec::with_capacity(chain.len());
    for (i, (id, block)) in chain.iter().enumerate() {
        let upper = chain.get(i + 1).and_then(|(_, next)| next.first_game());
        let mut local = Vec::new();
        while let Some(&(game_id, count)) = pending.peek() {
            if upper.is_some_and(|u| game_id >= u) {
                break;
            }
            local.push((game_id, count));
            pending.next();
        }
        runs.push(Run::new(Some(*id), merge_postings(&block.postings, &local)));
    }
    runs
}

/// Turn postings into game ids, repeating each `count` times when `expand`.
pub fn expand_postings(postings: &[Posting], expand: bool) -> Vec<GameId> {
    if !expand {
        return postings.iter().map(|p| p.game_id).collect();
    }
    let total: usize = postings.iter().map(|p| p.count as usize).sum();
    let mut ids = Vec::with_capacity(total);
    for p in postings {
        ids.extend(std::iter::repeat(p.game_id).take(p.count as usize));
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changes(pairs: &[(GameId, u32)]) -> BTreeMap<GameId, u32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_route_changes_to_covering_blocks() {
        let chain = vec![
            (7, Block::new(vec![Posting::new(10, 1), Posting::new(20, 1)], Some(3))),
            (3, Block::new(vec![Posting::new(30, 1)], None)),
        ];
        let runs = route_changes(&chain, &changes(&[(5, 1), (25, 2), (30, 0), (40, 1)]));
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].origin, Some(7));
        assert_eq!(
            runs[0].postings,
            vec![Posting::new(5, 1), Posting::new(10, 1), Posting::new(20, 1), Posting::new(25, 2)]
        );
        assert_eq!(runs[1].origin, Some(3));
        assert_eq!(runs[1].postings, vec![Posting::new(40, 1)]);
    }

    #[test]
    fn test_failed_update_changes_nothing() {
        let mut index = GameEntityIndex::with_types(&[EntityType::Player]).unwrap();
        index.update_entity(0, EntityType::Player, &changes(&[(1, 1)])).unwrap();

        let err = index
            .update_entity(5, EntityType::Player, &changes(&[(1, 1)]))
            .unwrap_err();
        assert!(matches!(err, BoosterError::EntityOutOfRange { known_count: 1, .. }));
        assert_eq!(index.num_blocks(), 1);
        assert!(index.deleted_block_ids().is_empty());
        assert_eq!(index.known_count(EntityType::Player).unwrap(), 1);
    }

    #[test]
    fn test_corrupt_chain_is_reported_not_repaired() {
        let mut index = GameEntityIndex::with_types(&[EntityType::Source]).unwrap();
        index.update_entity(0, EntityType::Source, &changes(&[(4, 1), (8, 1)])).unwrap();
        index.store.write(0, Block::new(vec![Posting::new(8, 1), Posting::new(4, 1)], None));

        assert!(matches!(
            index.get_game_ids(0, EntityType::Source, false),
            Err(BoosterError::CorruptChain { block_id: 0, .. })
        ));
        assert!(index
            .update_entity(0, EntityType::Source, &changes(&[(9, 1)]))
            .is_err());
        assert_eq!(index.store.block_count(), 1);
    }

    #[test]
    fn test_expand_postings() {
        let postings = vec![Posting::new(2, 1), Posting::new(4, 3)];
        assert_eq!(expand_postings(&postings, true), vec![2, 4, 4, 4]);
        assert_eq!(expand_postings(&postings, false), vec![2, 4]);
    }
}

//! Posting codec — packs posting lists into block chains and reads them back.

use std::collections::HashMap;

use crate::types::{Block, BlockId, BoosterError, BoosterResult, GameId, Posting};

use super::pool::BlockPool;
use super::store::BlockSource;

/// A contiguous run of postings and the block it was read from, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// Block that held this run before the update.
    pub origin: Option<BlockId>,
    /// Postings, strictly ascending by game id.
    pub postings: Vec<Posting>,
}

impl Run {
    pub fn new(origin: Option<BlockId>, postings: Vec<Posting>) -> Self {
        Self { origin, postings }
    }
}

/// What an encode decided: the new head and the block-level side effects.
#[derive(Debug, Default)]
pub struct EncodeOutcome {
    /// New chain head, None when the list became empty.
    pub head: Option<BlockId>,
    /// Blocks whose contents or link changed, to be written.
    pub writes: Vec<(BlockId, Block)>,
    /// Ids taken from the pool for this chain.
    pub allocated: Vec<BlockId>,
    /// Ids the chain no longer needs, to be returned to the pool.
    pub freed: Vec<BlockId>,
}

/// Splits posting lists into fixed-capacity blocks.
#[derive(Debug, Clone, Copy)]
pub struct PostingCodec {
    capacity: usize,
}

impl PostingCodec {
    /// Create a codec for blocks of `capacity` postings.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self { capacity }
    }

    /// Postings per block.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read a whole chain as one ordered posting list.
    pub fn decode<S: BlockSource + ?Sized>(
        &self,
        source: &S,
        head: Option<BlockId>,
    ) -> BoosterResult<Vec<Posting>> {
        let mut postings = Vec::new();
        self.walk(source, head, |_, block| {
            postings.extend_from_slice(&block.postings)
        })?;
        Ok(postings)
    }

    /// Read a chain block by block, keeping block ids.
    pub fn decode_chain<S: BlockSource + ?Sized>(
        &self,
        source: &S,
        head: Option<BlockId>,
    ) -> BoosterResult<Vec<(BlockId, Block)>> {
        let mut chain = Vec::new();
        self.walk(source, head, |id, block| chain.push((id, block.clone())))?;
        Ok(chain)
    }

    /// Follow links from `head`, validating every block on the way.
    /// Returns the chain length.
    pub fn walk<S: BlockSource + ?Sized>(
        &self,
        source: &S,
        head: Option<BlockId>,
        mut visit: impl FnMut(BlockId, &Block),
    ) -> BoosterResult<usize> {
        let limit = source.block_count();
        let mut next = head;
        let mut steps = 0usize;
        let mut last: Option<GameId> = None;

        while let Some(id) = next {
            if id >= limit {
                return Err(corrupt(id, format!("link beyond {} blocks", limit)));
            }
            steps += 1;
            if steps > limit as usize {
                return Err(corrupt(id, "cycle in chain"));
            }

            let block = source.load_block(id)?;
            if block.is_empty() {
                return Err(corrupt(id, "empty block linked into chain"));
            }
            if block.len() > self.capacity {
                return Err(corrupt(
                    id,
                    format!("{} postings exceed capacity {}", block.len(), self.capacity),
                ));
            }
            for p in &block.postings {
                if p.count == 0 {
                    return Err(corrupt(id, format!("zero count for game {}", p.game_id)));
                }
                if let Some(prev) = last {
                    if p.game_id <= prev {
                        return Err(corrupt(
                            id,
                            format!("game {} does not follow game {}", p.game_id, prev),
                        ));
                    }
                }
                last = Some(p.game_id);
            }

            visit(id, &*block);
            next = block.next;
        }
        Ok(steps)
    }

    /// Pack merged runs back into blocks.
    ///
    /// Oversized runs are split evenly, neighbours that fit one block are
    /// coalesced, and empty runs disappear. Runs keep the block they came
    /// from; new runs take ids released by this chain before asking the pool.
    /// Leftover ids of the old chain are reported in `freed`.
    pub fn encode(
        &self,
        existing: &[(BlockId, Block)],
        runs: Vec<Run>,
        pool: &mut BlockPool,
    ) -> EncodeOutcome {
        let mut spare: Vec<BlockId> = Vec::new();

        let mut packed: Vec<Run> = Vec::with_capacity(runs.len());
        for run in runs {
            if run.postings.is_empty() {
                spare.extend(run.origin);
            } else if run.postings.len() <= self.capacity {
                packed.push(run);
            } else {
                self.split_into(run, &mut packed);
            }
        }

        let mut merged: Vec<Run> = Vec::with_capacity(packed.len());
        for run in packed {
            match merged.last_mut() {
                Some(prev) if prev.postings.len() + run.postings.len() <= self.capacity => {
                    prev.postings.extend(run.postings);
                    match (prev.origin, run.origin) {
                        (None, Some(id)) => prev.origin = Some(id),
                        (Some(_), Some(id)) => spare.push(id),
                        _ => {}
                    }
                }
                _ => merged.push(run),
            }
        }

        // Lowest spare ids first.
        spare.sort_unstable_by(|a, b| b.cmp(a));
        let mut allocated = Vec::new();
        let mut ids = Vec::with_capacity(merged.len());
        for run in &merged {
            let id = match run.origin.or_else(|| spare.pop()) {
                Some(id) => id,
                None => {
                    let id = pool.allocate();
                    allocated.push(id);
                    id
                }
            };
            ids.push(id);
        }

        let previous: HashMap<BlockId, &Block> =
            existing.iter().map(|(id, block)| (*id, block)).collect();
        let mut writes = Vec::new();
        for (i, run) in merged.into_iter().enumerate() {
            let block = Block::new(run.postings, ids.get(i + 1).copied());
            if previous.get(&ids[i]).is_some_and(|old| **old == block) {
                continue;
            }
            writes.push((ids[i], block));
        }

        EncodeOutcome {
            head: ids.first().copied(),
            writes,
            allocated,
            freed: spare,
        }
    }

    /// Split an oversized run into `ceil(len / capacity)` runs of near-equal size.
    fn split_into(&self, run: Run, out: &mut Vec<Run>) {
        let len = run.postings.len();
        let pieces = len.div_ceil(self.capacity);
        let base = len / pieces;
        let extra = len % pieces;

        let mut origin = run.origin;
        let mut rest = run.postings;
        for i in 0..pieces {
            let size = base + usize::from(i < extra);
            let tail = rest.split_off(size);
            out.push(Run::new(origin.take(), rest));
            rest = tail;
        }
    }
}

/// Apply set-count changes to one ascending run.
///
/// `changes` must be ascending by game id. A zero count removes the game;
/// any other count replaces or inserts it.
pub fn merge_postings(postings: &[Posting], changes: &[(GameId, u32)]) -> Vec<Posting> {
    let mut out = Vec::with_capacity(postings.len() + changes.len());
    let mut i = 0;
    for &(game_id, count) in changes {
        while i < postings.len() && postings[i].game_id < game_id {
            out.push(postings[i]);
            i += 1;
        }
        if i < postings.len() && postings[i].game_id == game_id {
            i += 1;
        }
        if count > 0 {
            out.push(Posting::new(game_id, count));
        }
    }
    out.extend_from_slice(&postings[i..]);
    out
}

fn corrupt(block_id: BlockId, reason: impl Into<String>) -> BoosterError {
    let err = BoosterError::corrupt_chain(block_id, reason);
    log::warn!("{}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::store::MemoryBlockStore;

    fn postings(ids: std::ops::Range<u32>) -> Vec<Posting> {
        ids.map(|g| Posting::new(g, 1)).collect()
    }

    fn apply(store: &mut MemoryBlockStore, pool: &mut BlockPool, outcome: &EncodeOutcome) {
        for (id, block) in &outcome.writes {
            store.write(*id, block.clone());
        }
        for id in &outcome.freed {
            store.clear(*id);
            pool.free(*id);
        }
    }

    #[test]
    fn test_merge_postings_set_semantics() {
        let current = vec![Posting::new(2, 1), Posting::new(5, 2), Posting::new(9, 1)];
        let merged = merge_postings(&current, &[(1, 3), (5, 1), (9, 0), (12, 1)]);
        assert_eq!(
            merged,
            vec![
                Posting::new(1, 3),
                Posting::new(2, 1),
                Posting::new(5, 1),
                Posting::new(12, 1),
            ]
        );
    }

    #[test]
    fn test_encode_splits_evenly() {
        let codec = PostingCodec::new(4);
        let mut pool = BlockPool::new();
        let outcome = codec.encode(&[], vec![Run::new(None, postings(0..9))], &mut pool);

        assert_eq!(outcome.allocated, vec![0, 1, 2]);
        assert_eq!(outcome.head, Some(0));
        let sizes: Vec<usize> = outcome.writes.iter().map(|(_, b)| b.len()).collect();
        assert_eq!(sizes, vec![3, 3, 3]);
        assert_eq!(outcome.writes[0].1.next, Some(1));
        assert_eq!(outcome.writes[2].1.next, None);
    }

    #[test]
    fn test_encode_roundtrip_through_store() {
        let codec = PostingCodec::new(3);
        let mut pool = BlockPool::new();
        let mut store = MemoryBlockStore::new();
        let outcome = codec.encode(&[], vec![Run::new(None, postings(10..20))], &mut pool);
        apply(&mut store, &mut pool, &outcome);

        let decoded = codec.decode(&store, outcome.head).unwrap();
        assert_eq!(decoded, postings(10..20));
        assert_eq!(codec.decode(&store, None).unwrap(), Vec::new());
    }

    #[test]
    fn test_encode_reuses_chain_and_skips_unchanged() {
        let codec = PostingCodec::new(4);
        let mut pool = BlockPool::new();
        let mut store = MemoryBlockStore::new();
        let first = codec.encode(&[], vec![Run::new(None, postings(0..8))], &mut pool);
        apply(&mut store, &mut pool, &first);

        let chain = codec.decode_chain(&store, first.head).unwrap();
        assert_eq!(chain.len(), 2);
        let runs: Vec<Run> = chain
            .iter()
            .map(|(id, b)| Run::new(Some(*id), b.postings.clone()))
            .collect();
        let mut runs = runs;
        runs[1].postings.pop();

        let second = codec.encode(&chain, runs, &mut pool);
        assert!(second.allocated.is_empty());
        assert!(second.freed.is_empty());
        assert_eq!(second.writes.len(), 1);
        assert_eq!(second.writes[0].0, chain[1].0);
    }

    #[test]
    fn test_encode_empty_frees_everything() {
        let codec = PostingCodec::new(2);
        let mut pool = BlockPool::new();
        let mut store = MemoryBlockStore::new();
        let first = codec.encode(&[], vec![Run::new(None, postings(0..5))], &mut pool);
        apply(&mut store, &mut pool, &first);

        let chain = codec.decode_chain(&store, first.head).unwrap();
        let runs = chain
            .iter()
            .map(|(id, _)| Run::new(Some(*id), Vec::new()))
            .collect();
        let second = codec.encode(&chain, runs, &mut pool);
        assert_eq!(second.head, None);
        assert!(second.writes.is_empty());
        assert_eq!(second.freed.len(), 3);
    }

    #[test]
    fn test_decode_rejects_unordered_chain() {
        let codec = PostingCodec::new(4);
        let mut store = MemoryBlockStore::new();
        store.write(0, Block::new(vec![Posting::new(5, 1)], Some(1)));
        store.write(1, Block::new(vec![Posting::new(3, 1)], None));
        assert!(matches!(
            codec.decode(&store, Some(0)),
            Err(BoosterError::CorruptChain { block_id: 1, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_cycle() {
        let codec = PostingCodec::new(4);
        let mut store = MemoryBlockStore::new();
        store.write(0, Block::new(vec![Posting::new(1, 1)], Some(0)));
        assert!(matches!(
            codec.decode(&store, Some(0)),
            Err(BoosterError::CorruptChain { .. })
        ));
    }
}

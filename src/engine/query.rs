//! Query executor — combines entity game lists for search filters.

use crate::index::GameEntityIndex;
use crate::types::{BoosterResult, EntityId, EntityType, GameId};

/// Answers game-search filters from the entity index instead of scanning headers.
pub struct QueryEngine;

impl QueryEngine {
    /// Create a new query engine.
    pub fn new() -> Self {
        Self
    }

    /// Games referencing every one of `filters`, ascending. Empty filters match nothing.
    pub fn games_with_all(
        &self,
        index: &GameEntityIndex,
        filters: &[(EntityType, EntityId)],
    ) -> BoosterResult<Vec<GameId>> {
        let mut lists = Vec::with_capacity(filters.len());
        for &(entity_type, entity_id) in filters {
            lists.push(index.get_game_ids(entity_id, entity_type, false)?);
        }
        // Start from the shortest list to keep the intersection small.
        lists.sort_by_key(|l| l.len());

        let mut iter = lists.into_iter();
        let Some(mut result) = iter.next() else {
            return Ok(Vec::new());
        };
        for list in iter {
            if result.is_empty() {
                break;
            }
            result = intersect_sorted(&result, &list);
        }
        Ok(result)
    }

    /// Games referencing any of `filters`, merged and sorted.
    pub fn games_with_any(
        &self,
        index: &GameEntityIndex,
        filters: &[(EntityType, EntityId)],
    ) -> BoosterResult<Vec<GameId>> {
        let mut result: Vec<GameId> = Vec::new();
        for &(entity_type, entity_id) in filters {
            result.extend(index.get_game_ids(entity_id, entity_type, false)?);
        }
        result.sort_unstable();
        result.dedup();
        Ok(result)
    }

    /// Total role count of an entity across all games.
    pub fn appearance_count(
        &self,
        index: &GameEntityIndex,
        entity_id: EntityId,
        entity_type: EntityType,
    ) -> BoosterResult<u64> {
        let postings = index.postings(entity_id, entity_type)?;
        Ok(postings.iter().map(|p| p.count as u64).sum())
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn intersect_sorted(a: &[GameId], b: &[GameId]) -> Vec<GameId> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_sorted() {
        assert_eq!(intersect_sorted(&[1, 3, 5, 7], &[2, 3, 7, 9]), vec![3, 7]);
        assert!(intersect_sorted(&[1, 2], &[]).is_empty());
    }
}

//! Phase 2 tests: GameEntityIndex update and lookup behavior.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use booster_index::index::GameEntityIndex;
use booster_index::types::{BoosterError, EntityType, GameId, IndexConfig};

// ==================== Helpers ====================

fn changes(pairs: &[(GameId, u32)]) -> BTreeMap<GameId, u32> {
    pairs.iter().copied().collect()
}

fn player_source_index() -> GameEntityIndex {
    GameEntityIndex::with_types(&[EntityType::Player, EntityType::Source]).unwrap()
}

fn small_block_index(capacity: usize) -> GameEntityIndex {
    let config =
        IndexConfig::with_types(&[EntityType::Player, EntityType::Source]).block_capacity(capacity);
    GameEntityIndex::new(config).unwrap()
}

/// Every chain of the index, for before/after comparisons.
fn snapshot(index: &GameEntityIndex) -> Vec<(EntityType, u32, Vec<GameId>)> {
    let mut out = Vec::new();
    for &et in index.entity_types() {
        for id in 0..index.known_count(et).unwrap() {
            out.push((et, id, index.get_game_ids(id, et, true).unwrap()));
        }
    }
    out
}

// ==================== Basic Updates ====================

#[test]
fn test_update_sets_counts_and_skips_zeroes() {
    let mut index = player_source_index();
    index
        .update_entity(0, EntityType::Player, &changes(&[(2, 1), (3, 0), (4, 2)]))
        .unwrap();

    assert_eq!(index.get_game_ids(0, EntityType::Player, true).unwrap(), vec![2, 4, 4]);
    assert_eq!(index.get_game_ids(0, EntityType::Player, false).unwrap(), vec![2, 4]);
    assert_eq!(index.num_blocks(), 1);
}

#[test]
fn test_untouched_entities_are_empty() {
    let mut index = player_source_index();
    index
        .update_entity(0, EntityType::Player, &changes(&[(2, 1), (3, 0), (4, 2)]))
        .unwrap();

    assert!(index.get_game_ids(0, EntityType::Source, true).unwrap().is_empty());
    assert!(index.get_game_ids(1, EntityType::Player, true).unwrap().is_empty());
    assert!(index.get_game_ids(500, EntityType::Player, false).unwrap().is_empty());
}

#[test]
fn test_lookups_do_not_mutate() {
    let mut index = small_block_index(2);
    let games: Vec<(GameId, u32)> = (0..7).map(|g| (g, 1 + g % 2)).collect();
    index
        .update_entity(0, EntityType::Player, &changes(&games))
        .unwrap();
    index
        .update_entity(1, EntityType::Player, &changes(&[(3, 1)]))
        .unwrap();
    index
        .update_entity(1, EntityType::Player, &changes(&[(3, 0)]))
        .unwrap();

    let blocks = index.num_blocks();
    let deleted = index.deleted_block_ids().clone();
    let known = index.known_count(EntityType::Player).unwrap();

    let first = index.get_game_ids(0, EntityType::Player, true).unwrap();
    let second = index.get_game_ids(0, EntityType::Player, true).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        index.get_game_ids(0, EntityType::Player, false).unwrap(),
        index.get_game_ids(0, EntityType::Player, false).unwrap()
    );
    // Lookups past the extent stay empty and introduce nothing.
    assert!(index.get_game_ids(9, EntityType::Player, true).unwrap().is_empty());
    assert!(index.get_game_ids(0, EntityType::Source, true).unwrap().is_empty());

    assert_eq!(index.num_blocks(), blocks);
    assert_eq!(index.deleted_block_ids(), &deleted);
    assert_eq!(index.known_count(EntityType::Player).unwrap(), known);
    assert_eq!(index.known_count(EntityType::Source).unwrap(), 0);
}

#[test]
fn test_entity_beyond_extent_is_rejected() {
    let mut index = player_source_index();
    let err = index
        .update_entity(1, EntityType::Player, &changes(&[(2, 1)]))
        .unwrap_err();
    assert!(matches!(
        err,
        BoosterError::EntityOutOfRange {
            entity_type: EntityType::Player,
            entity_id: 1,
            known_count: 0,
        }
    ));
    assert_eq!(index.known_count(EntityType::Player).unwrap(), 0);
    assert_eq!(index.num_blocks(), 0);
}

#[test]
fn test_unconfigured_type_is_rejected() {
    let mut index = player_source_index();
    assert!(matches!(
        index.update_entity(0, EntityType::Team, &changes(&[(1, 1)])),
        Err(BoosterError::UnknownEntityType(EntityType::Team))
    ));
    assert!(index.get_game_ids(0, EntityType::Team, false).is_err());
}

#[test]
fn test_incremental_updates() {
    let mut index = player_source_index();
    for (game, count) in [(2, 1), (9, 1), (5, 2), (3, 1)] {
        index
            .update_entity(0, EntityType::Player, &changes(&[(game, count)]))
            .unwrap();
    }
    assert_eq!(
        index.get_game_ids(0, EntityType::Player, true).unwrap(),
        vec![2, 3, 5, 5, 9]
    );

    index
        .update_entity(0, EntityType::Player, &changes(&[(5, 1)]))
        .unwrap();
    assert_eq!(index.get_game_ids(0, EntityType::Player, true).unwrap(), vec![2, 3, 5, 9]);

    index
        .update_entity(0, EntityType::Player, &changes(&[(8, 1)]))
        .unwrap();
    index
        .update_entity(0, EntityType::Player, &changes(&[(2, 0), (5, 0)]))
        .unwrap();
    assert_eq!(index.get_game_ids(0, EntityType::Player, true).unwrap(), vec![3, 8, 9]);
}

#[test]
fn test_removing_absent_game_is_noop() {
    let mut index = player_source_index();
    index
        .update_entity(0, EntityType::Player, &changes(&[(4, 1)]))
        .unwrap();
    index
        .update_entity(0, EntityType::Player, &changes(&[(7, 0)]))
        .unwrap();
    assert_eq!(index.get_game_ids(0, EntityType::Player, true).unwrap(), vec![4]);
    assert_eq!(index.num_blocks(), 1);
}

#[test]
fn test_empty_change_set_introduces_entity() {
    let mut index = player_source_index();
    index
        .update_entity(0, EntityType::Source, &BTreeMap::new())
        .unwrap();
    assert_eq!(index.known_count(EntityType::Source).unwrap(), 1);
    assert_eq!(index.num_blocks(), 0);
    assert!(index.get_game_ids(0, EntityType::Source, true).unwrap().is_empty());
}

// ==================== Block Accounting ====================

#[test]
fn test_block_reuse_across_entities() {
    let mut index = small_block_index(4);
    for et in [EntityType::Player, EntityType::Source] {
        for id in 0..3 {
            index
                .update_entity(id, et, &changes(&[(10 + id, 1)]))
                .unwrap();
        }
    }
    assert_eq!(index.num_blocks(), 6);
    assert!(index.deleted_block_ids().is_empty());

    index
        .update_entity(1, EntityType::Player, &changes(&[(11, 0)]))
        .unwrap();
    index
        .update_entity(1, EntityType::Source, &changes(&[(11, 0)]))
        .unwrap();
    assert_eq!(index.deleted_block_ids().len(), 2);
    assert_eq!(index.num_blocks(), 6);

    // Ten postings need three blocks; two come from the free set.
    let games: Vec<(GameId, u32)> = (100..110).map(|g| (g, 1)).collect();
    index
        .update_entity(3, EntityType::Player, &changes(&games))
        .unwrap();
    assert_eq!(index.num_blocks(), 7);
    assert!(index.deleted_block_ids().is_empty());
    assert_eq!(
        index.get_game_ids(3, EntityType::Player, false).unwrap(),
        (100..110).collect::<Vec<_>>()
    );
    index.verify().unwrap();
}

#[test]
fn test_num_blocks_never_decreases() {
    let mut index = small_block_index(2);
    let mut high_water = 0;
    for round in 0..20u32 {
        let games: Vec<(GameId, u32)> = (0..(round % 7) * 3).map(|g| (g, 1)).collect();
        let mut update = changes(&games);
        for g in (round % 7) * 3..21 {
            update.insert(g, 0);
        }
        index.update_entity(0, EntityType::Player, &update).unwrap();
        assert!(index.num_blocks() >= high_water);
        high_water = index.num_blocks();
        assert!(index.deleted_block_ids().iter().all(|&id| id < index.num_blocks()));
        index.verify().unwrap();
    }
}

#[test]
fn test_failed_update_leaves_index_unchanged() {
    let mut index = small_block_index(3);
    index
        .update_entity(0, EntityType::Player, &changes(&[(1, 1), (2, 1), (3, 1), (4, 1)]))
        .unwrap();
    index
        .update_entity(0, EntityType::Source, &changes(&[(5, 2)]))
        .unwrap();
    index
        .update_entity(0, EntityType::Source, &changes(&[(5, 0)]))
        .unwrap();

    let before = snapshot(&index);
    let blocks_before = index.num_blocks();
    let deleted_before = index.deleted_block_ids().clone();

    assert!(index
        .update_entity(4, EntityType::Player, &changes(&[(9, 1)]))
        .is_err());

    assert_eq!(snapshot(&index), before);
    assert_eq!(index.num_blocks(), blocks_before);
    assert_eq!(index.deleted_block_ids(), &deleted_before);
}

#[test]
fn test_long_list_respects_capacity() {
    let mut index = small_block_index(5);
    let games: Vec<(GameId, u32)> = (0..53).map(|g| (g * 2, 1 + g % 3)).collect();
    index
        .update_entity(0, EntityType::Player, &changes(&games))
        .unwrap();

    let stats = index.stats().unwrap();
    assert_eq!(stats.total_postings, 53);
    assert_eq!(stats.live_blocks, 11);
    assert_eq!(stats.longest_chain, 11);

    let expected: Vec<GameId> = games
        .iter()
        .flat_map(|&(g, c)| std::iter::repeat(g).take(c as usize))
        .collect();
    assert_eq!(index.get_game_ids(0, EntityType::Player, true).unwrap(), expected);
}

// ==================== Randomized Model Check ====================

#[test]
fn test_random_batches_match_reference_model() {
    const CAPACITY: usize = 8;
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut index = small_block_index(CAPACITY);
    let mut model: BTreeMap<GameId, u32> = BTreeMap::new();

    for _ in 0..400 {
        let batch_len = rng.gen_range(1..40);
        let mut batch = BTreeMap::new();
        for _ in 0..batch_len {
            let game = rng.gen_range(0..300);
            // Bias towards removals so the list both grows and shrinks.
            let count = if rng.gen_bool(0.4) { 0 } else { rng.gen_range(1..4) };
            batch.insert(game, count);
        }
        index.update_entity(0, EntityType::Player, &batch).unwrap();
        for (&game, &count) in &batch {
            if count == 0 {
                model.remove(&game);
            } else {
                model.insert(game, count);
            }
        }

        let expected: Vec<GameId> = model
            .iter()
            .flat_map(|(&g, &c)| std::iter::repeat(g).take(c as usize))
            .collect();
        assert_eq!(index.get_game_ids(0, EntityType::Player, true).unwrap(), expected);

        // Neighbouring blocks never both fit into one.
        let postings = model.len();
        let live = index.num_blocks() as usize - index.deleted_block_ids().len();
        assert!(live >= postings.div_ceil(CAPACITY));
        assert!(live * CAPACITY <= 2 * postings + CAPACITY);
    }
    index.verify().unwrap();
}

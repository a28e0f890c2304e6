//! Write engine — turns game header changes into entity index updates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::index::GameEntityIndex;
use crate::types::{BoosterError, BoosterResult, EntityId, EntityType, GameId};

/// The catalog entities one game header references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameEntities {
    pub white: Option<EntityId>,
    pub black: Option<EntityId>,
    pub white_team: Option<EntityId>,
    pub black_team: Option<EntityId>,
    pub source: Option<EntityId>,
    pub tournament: Option<EntityId>,
    pub annotators: Vec<EntityId>,
    pub tags: Vec<EntityId>,
}

impl GameEntities {
    /// A game with no entity references.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both players.
    pub fn players(mut self, white: EntityId, black: EntityId) -> Self {
        self.white = Some(white);
        self.black = Some(black);
        self
    }

    /// Set both teams.
    pub fn teams(mut self, white: EntityId, black: EntityId) -> Self {
        self.white_team = Some(white);
        self.black_team = Some(black);
        self
    }

    pub fn source(mut self, id: EntityId) -> Self {
        self.source = Some(id);
        self
    }

    pub fn tournament(mut self, id: EntityId) -> Self {
        self.tournament = Some(id);
        self
    }

    pub fn annotator(mut self, id: EntityId) -> Self {
        self.annotators.push(id);
        self
    }

    pub fn tag(mut self, id: EntityId) -> Self {
        self.tags.push(id);
        self
    }

    /// Role count of every referenced entity. A player on both sides counts 2.
    pub fn entity_counts(&self) -> BTreeMap<(EntityType, EntityId), u32> {
        let mut counts = BTreeMap::new();
        let refs = [
            (EntityType::Player, self.white),
            (EntityType::Player, self.black),
            (EntityType::Team, self.white_team),
            (EntityType::Team, self.black_team),
            (EntityType::Source, self.source),
            (EntityType::Tournament, self.tournament),
        ];
        for (entity_type, id) in refs {
            if let Some(id) = id {
                *counts.entry((entity_type, id)).or_insert(0) += 1;
            }
        }
        for &id in &self.annotators {
            *counts.entry((EntityType::Annotator, id)).or_insert(0) += 1;
        }
        for &id in &self.tags {
            *counts.entry((EntityType::GameTag, id)).or_insert(0) += 1;
        }
        counts
    }
}

/// One game's header before and after a transaction step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameChange {
    pub game_id: GameId,
    /// Header before the step; None for an added game.
    #[serde(default)]
    pub old: Option<GameEntities>,
    /// Header after the step; None for a deleted game.
    #[serde(default)]
    pub new: Option<GameEntities>,
}

/// Result of applying a batch of game changes.
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Entities whose posting lists were rewritten, in update order.
    pub updated: Vec<(EntityType, EntityId)>,
    /// Individual `(game, count)` changes applied.
    pub postings_changed: usize,
}

/// Drives `update_entity` calls for added, edited and deleted games.
pub struct WriteEngine;

impl WriteEngine {
    /// Create a new write engine.
    pub fn new() -> Self {
        Self
    }

    /// Index a newly added game.
    pub fn add_game(
        &self,
        index: &mut GameEntityIndex,
        game_id: GameId,
        entities: &GameEntities,
    ) -> BoosterResult<UpdateReport> {
        self.apply(
            index,
            &[GameChange {
                game_id,
                old: None,
                new: Some(entities.clone()),
            }],
        )
    }

    /// Remove a deleted game from every entity it referenced.
    pub fn remove_game(
        &self,
        index: &mut GameEntityIndex,
        game_id: GameId,
        entities: &GameEntities,
    ) -> BoosterResult<UpdateReport> {
        self.apply(
            index,
            &[GameChange {
                game_id,
                old: Some(entities.clone()),
                new: None,
            }],
        )
    }

    /// Re-index a game whose header was edited.
    pub fn replace_game(
        &self,
        index: &mut GameEntityIndex,
        game_id: GameId,
        old: &GameEntities,
        new: &GameEntities,
    ) -> BoosterResult<UpdateReport> {
        self.apply(
            index,
            &[GameChange {
                game_id,
                old: Some(old.clone()),
                new: Some(new.clone()),
            }],
        )
    }

    /// Apply one transaction step: each affected entity is updated once with
    /// all of its changed games.
    ///
    /// Every entity id is checked against its type's extent and every affected
    /// chain is walked before the first update, so an out-of-range reference
    /// or a corrupt chain leaves the index untouched.
    pub fn apply(
        &self,
        index: &mut GameEntityIndex,
        changes: &[GameChange],
    ) -> BoosterResult<UpdateReport> {
        let mut per_entity: BTreeMap<(EntityType, EntityId), BTreeMap<GameId, u32>> =
            BTreeMap::new();
        for change in changes {
            let old = change
                .old
                .as_ref()
                .map(GameEntities::entity_counts)
                .unwrap_or_default();
            let new = change
                .new
                .as_ref()
                .map(GameEntities::entity_counts)
                .unwrap_or_default();

            for (key, &count) in &new {
                if old.get(key) != Some(&count) {
                    per_entity.entry(*key).or_default().insert(change.game_id, count);
                }
            }
            for key in old.keys() {
                if !new.contains_key(key) {
                    per_entity.entry(*key).or_default().insert(change.game_id, 0);
                }
            }
        }

        check_extents(index, per_entity.keys().copied())?;
        for &(entity_type, entity_id) in per_entity.keys() {
            index.check_chain(entity_id, entity_type)?;
        }

        let mut report = UpdateReport::default();
        for ((entity_type, entity_id), games) in per_entity {
            index.update_entity(entity_id, entity_type, &games)?;
            report.postings_changed += games.len();
            report.updated.push((entity_type, entity_id));
        }
        log::debug!(
            "Applied {} game changes to {} entities",
            changes.len(),
            report.updated.len()
        );
        Ok(report)
    }
}

impl Default for WriteEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that `keys` (ascending by type, then id) can be introduced in order.
fn check_extents(
    index: &GameEntityIndex,
    keys: impl Iterator<Item = (EntityType, EntityId)>,
) -> BoosterResult<()> {
    let mut current: Option<(EntityType, u32)> = None;
    for (entity_type, entity_id) in keys {
        let known_count = match current {
            Some((t, known)) if t == entity_type => known,
            _ => index.known_count(entity_type)?,
        };
        if entity_id > known_count {
            return Err(BoosterError::EntityOutOfRange {
                entity_type,
                entity_id,
                known_count,
            });
        }
        let known_count = known_count.max(entity_id + 1);
        current = Some((entity_type, known_count));
    }
    Ok(())
}

//! Entity head table — chain heads and known extents per entity type.

use crate::types::{BlockId, BoosterError, BoosterResult, EntityId, EntityType};

/// Per `(entity type, entity id)` head block of the posting chain.
///
/// The row count of a type is its known extent: ids are introduced one at a
/// time, in order, exactly like the entity catalogs allocate them.
#[derive(Debug, Clone)]
pub struct EntityHeadTable {
    /// Configured types, in construction order.
    types: Vec<EntityType>,
    /// One row vector per configured type, parallel to `types`.
    rows: Vec<Vec<Option<BlockId>>>,
}

impl EntityHeadTable {
    /// Create a table with empty extents for the given types.
    pub fn new(types: &[EntityType]) -> Self {
        Self {
            types: types.to_vec(),
            rows: vec![Vec::new(); types.len()],
        }
    }

    /// Create from pre-existing rows (used by reader). `rows` parallels `types`.
    pub fn from_parts(types: Vec<EntityType>, rows: Vec<Vec<Option<BlockId>>>) -> Self {
        debug_assert_eq!(types.len(), rows.len());
        Self { types, rows }
    }

    /// Configured entity types.
    pub fn entity_types(&self) -> &[EntityType] {
        &self.types
    }

    fn slot(&self, entity_type: EntityType) -> BoosterResult<usize> {
        self.types
            .iter()
            .position(|t| *t == entity_type)
            .ok_or(BoosterError::UnknownEntityType(entity_type))
    }

    /// All rows of one type (for serialization).
    pub fn rows(&self, entity_type: EntityType) -> BoosterResult<&[Option<BlockId>]> {
        let slot = self.slot(entity_type)?;
        Ok(&self.rows[slot])
    }

    /// Head block of an entity's chain. Ids beyond the extent have no chain.
    pub fn head_of(
        &self,
        entity_type: EntityType,
        entity_id: EntityId,
    ) -> BoosterResult<Option<BlockId>> {
        let slot = self.slot(entity_type)?;
        Ok(self.rows[slot].get(entity_id as usize).copied().flatten())
    }

    /// Point an entity at a new chain head. The entity must be within the extent.
    pub fn set_head(
        &mut self,
        entity_type: EntityType,
        entity_id: EntityId,
        head: Option<BlockId>,
    ) -> BoosterResult<()> {
        let slot = self.slot(entity_type)?;
        let known_count = self.rows[slot].len() as u32;
        match self.rows[slot].get_mut(entity_id as usize) {
            Some(row) => {
                *row = head;
                Ok(())
            }
            None => Err(BoosterError::EntityOutOfRange {
                entity_type,
                entity_id,
                known_count,
            }),
        }
    }

    /// Number of entity ids introduced for a type.
    pub fn known_count(&self, entity_type: EntityType) -> BoosterResult<u32> {
        let slot = self.slot(entity_type)?;
        Ok(self.rows[slot].len() as u32)
    }

    /// Fail if `entity_id` could not be addressed right now. Never mutates.
    pub fn check_extent(&self, entity_type: EntityType, entity_id: EntityId) -> BoosterResult<()> {
        let known_count = self.known_count(entity_type)?;
        if entity_id > known_count {
            return Err(BoosterError::EntityOutOfRange {
                entity_type,
                entity_id,
                known_count,
            });
        }
        Ok(())
    }

    /// Introduce `entity_id` if it is the next id of its type.
    pub fn ensure_extent(&mut self, entity_type: EntityType, entity_id: EntityId) -> BoosterResult<()> {
        self.check_extent(entity_type, entity_id)?;
        let slot = self.slot(entity_type)?;
        if entity_id as usize == self.rows[slot].len() {
            self.rows[slot].push(None);
        }
        Ok(())
    }

    /// Iterate over `(type, entity id, head)` for every entity with a chain.
    pub fn chains(&self) -> impl Iterator<Item = (EntityType, EntityId, BlockId)> + '_ {
        self.types
            .iter()
            .zip(&self.rows)
            .flat_map(|(et, rows)| {
                rows.iter()
                    .enumerate()
                    .filter_map(move |(id, head)| head.map(|h| (*et, id as EntityId, h)))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_grows_one_at_a_time() {
        let mut table = EntityHeadTable::new(&[EntityType::Player, EntityType::Source]);
        assert_eq!(table.known_count(EntityType::Player).unwrap(), 0);

        table.ensure_extent(EntityType::Player, 0).unwrap();
        table.ensure_extent(EntityType::Player, 0).unwrap();
        assert_eq!(table.known_count(EntityType::Player).unwrap(), 1);

        let err = table.ensure_extent(EntityType::Player, 2).unwrap_err();
        assert!(matches!(
            err,
            BoosterError::EntityOutOfRange {
                entity_id: 2,
                known_count: 1,
                ..
            }
        ));
        assert_eq!(table.known_count(EntityType::Player).unwrap(), 1);
        assert_eq!(table.known_count(EntityType::Source).unwrap(), 0);
    }

    #[test]
    fn test_heads_and_unknown_type() {
        let mut table = EntityHeadTable::new(&[EntityType::Player]);
        table.ensure_extent(EntityType::Player, 0).unwrap();
        assert_eq!(table.head_of(EntityType::Player, 0).unwrap(), None);
        assert_eq!(table.head_of(EntityType::Player, 9).unwrap(), None);

        table.set_head(EntityType::Player, 0, Some(4)).unwrap();
        assert_eq!(table.head_of(EntityType::Player, 0).unwrap(), Some(4));
        assert!(table.set_head(EntityType::Player, 1, Some(5)).is_err());

        assert!(matches!(
            table.head_of(EntityType::Team, 0),
            Err(BoosterError::UnknownEntityType(EntityType::Team))
        ));
        assert_eq!(
            table.chains().collect::<Vec<_>>(),
            vec![(EntityType::Player, 0, 4)]
        );
    }
}

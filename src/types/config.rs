//! Index configuration with TOML persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{BoosterError, BoosterResult};
use super::{EntityType, DEFAULT_BLOCK_CAPACITY, MAX_BLOCK_CAPACITY};

/// Construction parameters of a game-entity index.
///
/// ```toml
/// entity_types = ["player", "source", "tournament"]
/// block_capacity = 126
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Entity types this index handles, fixed for its lifetime.
    pub entity_types: Vec<EntityType>,

    /// Postings per block.
    pub block_capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            entity_types: EntityType::ALL.to_vec(),
            block_capacity: DEFAULT_BLOCK_CAPACITY,
        }
    }
}

impl IndexConfig {
    /// Config for the given types with the default block capacity.
    pub fn with_types(entity_types: &[EntityType]) -> Self {
        Self {
            entity_types: entity_types.to_vec(),
            ..Self::default()
        }
    }

    /// Override the block capacity.
    pub fn block_capacity(mut self, capacity: usize) -> Self {
        self.block_capacity = capacity;
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> BoosterResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> BoosterResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject configurations the index cannot be built from.
    pub fn validate(&self) -> BoosterResult<()> {
        if self.entity_types.is_empty() {
            return Err(BoosterError::InvalidConfig(
                "at least one entity type is required".into(),
            ));
        }
        for (i, et) in self.entity_types.iter().enumerate() {
            if self.entity_types[..i].contains(et) {
                return Err(BoosterError::InvalidConfig(format!(
                    "entity type {} listed twice",
                    et
                )));
            }
        }
        if self.block_capacity == 0 || self.block_capacity > MAX_BLOCK_CAPACITY {
            return Err(BoosterError::InvalidConfig(format!(
                "block capacity {} outside 1..={}",
                self.block_capacity, MAX_BLOCK_CAPACITY
            )));
        }
        Ok(())
    }
}

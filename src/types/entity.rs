//! Entity categories referenced by games.

use serde::{Deserialize, Serialize};

/// The catalog an entity id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EntityType {
    /// A player, counted once per color played.
    Player = 0,
    /// The source (publication, database) a game came from.
    Source = 1,
    /// The tournament or match a game was played in.
    Tournament = 2,
    /// Someone who annotated the game.
    Annotator = 3,
    /// A team, counted once per side.
    Team = 4,
    /// A free-form tag attached to the game.
    GameTag = 5,
}

impl EntityType {
    /// Every entity type, in tag order.
    pub const ALL: [EntityType; 6] = [
        Self::Player,
        Self::Source,
        Self::Tournament,
        Self::Annotator,
        Self::Team,
        Self::GameTag,
    ];

    /// Convert a u8 value to an EntityType, returning None for invalid values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Player),
            1 => Some(Self::Source),
            2 => Some(Self::Tournament),
            3 => Some(Self::Annotator),
            4 => Some(Self::Team),
            5 => Some(Self::GameTag),
            _ => None,
        }
    }

    /// Return a human-readable name for this entity type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Source => "source",
            Self::Tournament => "tournament",
            Self::Annotator => "annotator",
            Self::Team => "team",
            Self::GameTag => "game_tag",
        }
    }

    /// Parse an entity type from a string name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "player" => Some(Self::Player),
            "source" => Some(Self::Source),
            "tournament" => Some(Self::Tournament),
            "annotator" => Some(Self::Annotator),
            "team" => Some(Self::Team),
            "game_tag" | "gametag" | "tag" => Some(Self::GameTag),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for et in EntityType::ALL {
            assert_eq!(EntityType::from_u8(et as u8), Some(et));
            assert_eq!(EntityType::from_name(et.name()), Some(et));
        }
        assert!(EntityType::from_u8(6).is_none());
        assert!(EntityType::from_name("opening").is_none());
    }
}

//! Error types for level model operations.

use std::fmt;

use dustkit_core::{CoreError, ObjectId};

use crate::tile::TileSpriteSet;

/// Errors arising from building or editing a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelError {
    /// A prop or entity with this id is already present.
    DuplicateId {
        /// The id that was already taken.
        id: ObjectId,
    },
    /// The id is too large to be stored in a level file.
    IdOutOfRange {
        /// The rejected id.
        id: ObjectId,
    },
    /// The sprite set has no dustblock tile.
    NoDustblock {
        /// The tile's sprite set.
        sprite_set: TileSpriteSet,
    },
    /// A tile shape byte outside `0..=20`.
    InvalidShape {
        /// The raw shape value.
        value: u8,
    },
    /// A sprite set nibble outside `0..=7`.
    InvalidSpriteSet {
        /// The raw sprite set value.
        value: u8,
    },
    /// A typed variable access failed.
    Core(CoreError),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId { id } => write!(f, "object id {id} is already in use"),
            Self::IdOutOfRange { id } => {
                write!(f, "object id {id} is above the largest storable id")
            }
            Self::NoDustblock { sprite_set } => {
                write!(f, "sprite set {sprite_set:?} has no dustblock tile")
            }
            Self::InvalidShape { value } => write!(f, "invalid tile shape {value}"),
            Self::InvalidSpriteSet { value } => write!(f, "invalid sprite set {value}"),
            Self::Core(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Core(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CoreError> for LevelError {
    fn from(e: CoreError) -> Self {
        Self::Core(e)
    }
}

//! Dustkit: read, write and transform Dustforce level files.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! dustkit sub-crates. For most users, adding `dustkit` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use dustkit::prelude::*;
//!
//! // A one-tile level with a solid floor.
//! let mut level = Level::new();
//! level.set_name("First steps");
//! let mut tile = Tile::new(TileShape::Full);
//! tile.edges[TileSide::Top.index()].solid = true;
//! level.add_tile(19, 0, 0, tile);
//! level.add_entity(24.0, -48.0, Entity::from_tag("enemy_wolf"), None).unwrap();
//!
//! // Write it out, read it back and turn it on its side.
//! let bytes = write_level(&level).unwrap();
//! let mut decoded = read_level(&bytes).unwrap();
//! assert_eq!(decoded, level);
//! decoded.rotate(1);
//! assert!(decoded.tiles[&(19, -1, 0)].edges[TileSide::Right.index()].solid);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`bitio`] | `dustkit-bitio` | LSB-first bit reader and writer |
//! | [`types`] | `dustkit-core` | Variables, ids, transforms, JSON projection |
//! | [`level`] | `dustkit-level` | Tiles, props, entities and the level container |
//! | [`format`] | `dustkit-format` | `DF_LVL` and variable file codecs |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Bit-granular I/O (`dustkit-bitio`).
///
/// [`bitio::BitWriter::reserve`] is the back-patching primitive the level
/// writer is built on.
pub use dustkit_bitio as bitio;

/// Core value types (`dustkit-core`).
///
/// Contains the [`types::Variable`] tree, [`types::ObjectId`], the affine
/// [`types::TxMatrix`] and the JSON projection used by inspection tools.
pub use dustkit_core as types;

/// The level model (`dustkit-level`).
///
/// [`level::Level`] plus its tiles, props, entities and backdrop.
pub use dustkit_level as level;

/// Binary codecs (`dustkit-format`).
///
/// [`format::read_level`] and [`format::write_level`] for whole levels,
/// [`format::LevelReader`] for metadata-only edits, and the variable file
/// functions for stats, config and fog files.
pub use dustkit_format as format;

/// Common imports for typical dustkit usage.
///
/// ```rust
/// use dustkit::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use dustkit_core::{
        ObjectId, Transformable, TxMatrix, Variable, VariableArray, VariableMap, VariableType,
    };

    // Level model
    pub use dustkit_level::{
        Entity, EntityKind, Level, LevelType, Prop, Tile, TileEdge, TileShape, TileSide,
        TileSpriteSet,
    };

    // Codecs
    pub use dustkit_format::{
        read_level, read_level_with, read_var_file, write_level, write_var_file, LevelReader,
        LevelWriter, ReadOptions, VarFileKind, WriteOptions,
    };

    // Errors
    pub use dustkit_core::CoreError;
    pub use dustkit_format::FormatError;
    pub use dustkit_level::LevelError;
}

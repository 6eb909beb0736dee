//! In-memory model of a Dustforce level.
//!
//! A [`Level`] holds tiles keyed by `(layer, x, y)`, props and entities
//! keyed by [`ObjectId`](dustkit_core::ObjectId), a bag of global variables
//! and an optional [`Backdrop`]. Every spatial object implements
//! [`Transformable`](dustkit_core::Transformable) so whole levels can be
//! flipped, rotated, translated and upscaled.
//!
//! This crate knows nothing about the binary format; see `dustkit-format`
//! for reading and writing `DF_LVL` files.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod entity;
pub mod error;
pub mod level;
pub mod prop;
pub mod tile;

pub use entity::{Entity, EntityClass, EntityKind};
pub use error::LevelError;
pub use level::{Backdrop, Level, LevelType, PlacedEntity, PlacedProp, PropMap, TileKey, TileMap};
pub use prop::Prop;
pub use tile::{Tile, TileEdge, TileShape, TileSide, TileSpriteSet};

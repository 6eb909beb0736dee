//! Binary reader and writer for Dustforce level and variable files.
//!
//! Reads and writes `DF_LVL` levels into the [`Level`](dustkit_level::Level)
//! model, plus the `DF_STA`, `DF_CFG` and `DF_FOG` files that wrap a single
//! variable struct.
//!
//! # Architecture
//!
//! - [`read_level`] and [`write_level`] cover the common case
//! - [`LevelReader`] stops after the region directory so metadata can be
//!   edited and re-emitted with [`LevelWriter::write_raw`] without decoding
//!   any region
//! - [`RegionMap`] buckets a level into regions and segments for writing
//! - [`WriteOptions`] sets the zlib level and the region worker count
//!
//! # Format
//!
//! ```text
//! ["DF_LVL"] [version:16] [file_size:32] [num_regions:32]
//! ["DF_MTD"] [version:16] [region_offset:32] [entity_uid:32]
//!            [prop_uid:32] [save_uid:32] [region_uid:32]
//! version > 43: [sshot_len:32] [sshot bytes]
//! [variables] [region offset:32]*num_regions [align]
//! [region]*num_regions
//! ```
//!
//! All fields are LSB-first bit fields. Region offsets are relative to the
//! first region. Regions are sorted with negative coordinates after all
//! positive ones.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod error;
pub mod partition;
pub mod reader;
pub mod region;
pub mod segment;
pub mod varfile;
pub mod variable;
pub mod writer;

pub use config::{ConfigError, ReadOptions, WriteOptions};
pub use error::FormatError;
pub use partition::RegionMap;
pub use reader::{read_level, read_level_with, LevelHeader, LevelReader, Metadata, RawRegions};
pub use varfile::{read_var_file, write_var_file, VarFileKind};
pub use writer::{write_level, LevelWriter};

/// Magic bytes at the start of every level file.
pub const LEVEL_MAGIC: &[u8; 6] = b"DF_LVL";

/// Magic bytes of the metadata block.
pub const METADATA_MAGIC: &[u8; 6] = b"DF_MTD";

/// Level format version written.
///
/// History:
/// - 43: no screenshot
/// - 44: screenshot length and bytes follow the metadata block
pub const LEVEL_VERSION: u16 = 44;

/// Oldest level format version accepted.
pub const MIN_LEVEL_VERSION: u16 = 43;

/// Metadata block version written.
pub const METADATA_VERSION: u16 = 4;

/// Region format version written.
pub const REGION_VERSION: u16 = 14;

/// Segment format version written.
pub const SEGMENT_VERSION: u16 = 8;

/// Version field of written variable files.
pub const VAR_FILE_VERSION: u16 = 1;

/// Bits of the level header before the metadata block, counting the
/// screenshot length but not the screenshot itself.
pub const LEVEL_HEADER_BITS: u64 = 160;

/// Bits of the metadata block.
pub const METADATA_BITS: u64 = 224;

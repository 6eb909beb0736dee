//! Level file reader.
//!
//! [`LevelReader::open`] parses everything up to the region data: header,
//! metadata block, screenshot, global variables and the region directory.
//! From there the caller can decode the regions into a full [`Level`] or
//! take the region bytes verbatim for a metadata-only rewrite.

use dustkit_bitio::{BitReader, BitWriter};
use dustkit_core::ObjectId;
use dustkit_level::Level;

use crate::codec::read_magic;
use crate::config::ReadOptions;
use crate::error::FormatError;
use crate::region::read_region;
use crate::variable::read_var_map;
use crate::{LEVEL_MAGIC, METADATA_MAGIC, METADATA_VERSION, MIN_LEVEL_VERSION};

/// The `DF_MTD` block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Block version.
    pub version: u16,
    /// Unused by the game.
    pub region_offset: u32,
    /// Next free entity id.
    pub entity_uid: u32,
    /// Next free prop id.
    pub prop_uid: u32,
    /// Deprecated.
    pub save_uid: u32,
    /// Deprecated.
    pub region_uid: u32,
}

impl Metadata {
    /// The block the writer stores for `level`.
    pub fn for_level(level: &Level) -> Self {
        Self {
            version: METADATA_VERSION,
            entity_uid: level.max_id(false) + 1,
            ..Self::default()
        }
    }

    fn read(r: &mut BitReader<'_>) -> Result<Self, FormatError> {
        read_magic(r, METADATA_MAGIC)?;
        Ok(Self {
            version: r.read(16)? as u16,
            region_offset: r.read(32)? as u32,
            entity_uid: r.read(32)? as u32,
            prop_uid: r.read(32)? as u32,
            save_uid: r.read(32)? as u32,
            region_uid: r.read(32)? as u32,
        })
    }

    pub(crate) fn write(&self, w: &mut BitWriter) {
        w.write_bytes(METADATA_MAGIC);
        w.write(16, u64::from(self.version));
        w.write(32, u64::from(self.region_offset));
        w.write(32, u64::from(self.entity_uid));
        w.write(32, u64::from(self.prop_uid));
        w.write(32, u64::from(self.save_uid));
        w.write(32, u64::from(self.region_uid));
    }
}

/// Fixed fields at the start of a level file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelHeader {
    /// File format version.
    pub version: u16,
    /// Total file size in bytes.
    pub file_size: u32,
    /// Number of regions.
    pub num_regions: u32,
    /// The metadata block.
    pub metadata: Metadata,
}

/// Region data copied out of a level file without decoding it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawRegions {
    /// Byte offset of each region from the start of `data`, followed by the
    /// total length of `data`.
    pub offsets: Vec<u32>,
    /// The concatenated region records.
    pub data: Vec<u8>,
}

impl RawRegions {
    /// Number of regions.
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Whether there are no regions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A level file opened up to its region data.
///
/// # Examples
///
/// ```
/// use dustkit_format::{write_level, LevelReader, LevelWriter};
/// use dustkit_level::{Level, Tile};
///
/// let mut level = Level::new();
/// level.set_name("Downhill");
/// level.add_tile(19, 0, 0, Tile::default());
/// let bytes = write_level(&level).unwrap();
///
/// // Rename without touching the region data.
/// let reader = LevelReader::open(&bytes).unwrap();
/// let raw = reader.raw_regions().unwrap();
/// let mut meta = reader.into_level();
/// meta.set_name("Uphill");
/// let renamed = LevelWriter::default().write_raw(&meta, &raw).unwrap();
///
/// let reread = dustkit_format::read_level(&renamed).unwrap();
/// assert_eq!(reread.name(), b"Uphill".to_vec());
/// assert_eq!(reread.tiles.len(), 1);
/// ```
#[derive(Debug)]
pub struct LevelReader<'a> {
    reader: BitReader<'a>,
    header: LevelHeader,
    level: Level,
    region_offsets: Vec<u32>,
}

impl<'a> LevelReader<'a> {
    /// Parse `data` up to the start of the region data.
    pub fn open(data: &'a [u8]) -> Result<Self, FormatError> {
        let mut r = BitReader::new(data);
        let start = r.bit_tell();
        read_magic(&mut r, LEVEL_MAGIC)?;

        let version = r.read(16)? as u16;
        if version < MIN_LEVEL_VERSION {
            return Err(FormatError::UnsupportedVersion { found: version });
        }
        let file_size = r.read(32)? as u32;
        let num_regions = r.read(32)? as u32;
        let metadata = Metadata::read(&mut r)?;

        let mut level = Level::empty();
        if version > 43 {
            let len = r.read(32)? as usize;
            level.sshot = r.read_bytes(len)?;
        }
        level.set_next_id(ObjectId(metadata.entity_uid));
        level.variables = read_var_map(&mut r)?;

        let mut region_offsets = Vec::with_capacity(num_regions as usize + 1);
        for _ in 0..num_regions {
            region_offsets.push(r.read(32)? as u32);
        }
        r.align();
        let consumed = (r.bit_tell() - start) / 8;
        region_offsets.push(u64::from(file_size).saturating_sub(consumed) as u32);

        log::debug!(
            "opened level v{version}: {num_regions} regions, {file_size} bytes, {} byte screenshot",
            level.sshot.len()
        );
        Ok(Self {
            reader: r,
            header: LevelHeader {
                version,
                file_size,
                num_regions,
                metadata,
            },
            level,
            region_offsets,
        })
    }

    /// The fixed header fields.
    pub fn header(&self) -> &LevelHeader {
        &self.header
    }

    /// The level as read so far: variables, screenshot and id allocator.
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Region offsets relative to the start of the region data, followed by
    /// the length of the region data.
    pub fn region_offsets(&self) -> &[u32] {
        &self.region_offsets
    }

    /// Copy out the undecoded region data.
    pub fn raw_regions(&self) -> Result<RawRegions, FormatError> {
        let mut r = self.reader.clone();
        let len = self.region_offsets.last().copied().unwrap_or(0);
        Ok(RawRegions {
            offsets: self.region_offsets.clone(),
            data: r.read_bytes(len as usize)?,
        })
    }

    /// Stop here and return the metadata-only level.
    pub fn into_level(self) -> Level {
        self.level
    }

    /// Decode every region and return the complete level.
    pub fn read_regions(mut self) -> Result<Level, FormatError> {
        for _ in 0..self.header.num_regions {
            read_region(&mut self.reader, &mut self.level)?;
        }
        log::debug!(
            "read {} tiles, {} props, {} entities",
            self.level.tiles.len(),
            self.level.props.len(),
            self.level.entities.len()
        );
        Ok(self.level)
    }
}

/// Read a complete level.
pub fn read_level(data: &[u8]) -> Result<Level, FormatError> {
    read_level_with(data, &ReadOptions::default())
}

/// Read a level with explicit options.
pub fn read_level_with(data: &[u8], options: &ReadOptions) -> Result<Level, FormatError> {
    let reader = LevelReader::open(data)?;
    if options.metadata_only {
        return Ok(reader.into_level());
    }
    reader.read_regions()
}

//! Level file writer.
//!
//! The header, metadata and screenshot are reserved up front and filled in
//! last, once the file size and region count are known. The region
//! directory is reserved the same way between the variables and the region
//! data.
//!
//! Region bodies are independent, so [`WriteOptions::region_workers`] can
//! spread their encoding over a scoped thread pool. Workers pull region
//! indices from a bounded channel and send encoded records back; the calling
//! thread places them in directory order, so the output never depends on
//! scheduling.

use dustkit_bitio::BitWriter;
use dustkit_level::Level;

use crate::config::WriteOptions;
use crate::error::FormatError;
use crate::partition::{Region, RegionMap};
use crate::reader::{Metadata, RawRegions};
use crate::region::encode_region;
use crate::variable::write_var_map;
use crate::{LEVEL_HEADER_BITS, LEVEL_MAGIC, LEVEL_VERSION, METADATA_BITS};

/// Serializes levels to `DF_LVL` bytes.
///
/// # Examples
///
/// ```
/// use dustkit_format::{read_level, LevelWriter, WriteOptions};
/// use dustkit_level::{Level, Tile};
///
/// let mut level = Level::new();
/// level.add_tile(19, 3, 4, Tile::default());
///
/// let writer = LevelWriter::new(WriteOptions {
///     compression_level: 9,
///     ..WriteOptions::default()
/// })
/// .unwrap();
/// let bytes = writer.write(&level).unwrap();
/// assert_eq!(read_level(&bytes).unwrap().tiles, level.tiles);
/// ```
#[derive(Clone, Debug, Default)]
pub struct LevelWriter {
    options: WriteOptions,
}

impl LevelWriter {
    /// Create a writer after validating `options`.
    pub fn new(options: WriteOptions) -> Result<Self, FormatError> {
        options.validate()?;
        Ok(Self { options })
    }

    /// The options in effect.
    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Serialize a complete level.
    pub fn write(&self, level: &Level) -> Result<Vec<u8>, FormatError> {
        let map = RegionMap::from_level(level);
        let regions = map.sorted();
        let encoded = self.encode_regions(&regions)?;

        self.write_framed(level, |w| {
            let directory = w.reserve(32 * encoded.len() as u64);
            w.align();
            let data_start = w.bit_tell();
            let mut offsets = Vec::with_capacity(encoded.len());
            for record in &encoded {
                w.align();
                offsets.push((w.bit_tell() - data_start) / 8);
                w.write_bytes(record);
            }
            w.fill_with(directory, |w| {
                for &offset in &offsets {
                    w.write(32, offset);
                }
            });
            Ok(encoded.len() as u32)
        })
    }

    /// Serialize the metadata of `level` around region data taken verbatim
    /// from [`LevelReader::raw_regions`](crate::LevelReader::raw_regions).
    ///
    /// The tiles, props and entities of `level` are ignored.
    pub fn write_raw(&self, level: &Level, raw: &RawRegions) -> Result<Vec<u8>, FormatError> {
        self.write_framed(level, |w| {
            let count = raw.len();
            for &offset in &raw.offsets[..count] {
                w.write(32, u64::from(offset));
            }
            w.align();
            w.write_bytes(&raw.data);

            let expected = raw.offsets.last().copied().map_or(0, u64::from);
            let found = raw.data.len() as u64;
            if expected != found {
                return Err(FormatError::RegionDataMismatch { expected, found });
            }
            Ok(count as u32)
        })
    }

    /// Write the header, variables and `body`, then fill the header in.
    /// `body` returns the number of regions it wrote.
    fn write_framed<F>(&self, level: &Level, body: F) -> Result<Vec<u8>, FormatError>
    where
        F: FnOnce(&mut BitWriter) -> Result<u32, FormatError>,
    {
        let mut w = BitWriter::new();
        let header = w.reserve(LEVEL_HEADER_BITS + METADATA_BITS + level.sshot.len() as u64 * 8);
        write_var_map(&mut w, &level.variables)?;
        let num_regions = body(&mut w)?;
        w.align();

        let file_size = w.bit_tell() / 8;
        w.fill_with(header, |w| {
            w.write_bytes(LEVEL_MAGIC);
            w.write(16, u64::from(LEVEL_VERSION));
            w.write(32, file_size);
            w.write(32, u64::from(num_regions));
            Metadata::for_level(level).write(w);
            w.write(32, level.sshot.len() as u64);
            w.write_bytes(&level.sshot);
        });
        log::debug!(
            "wrote level v{LEVEL_VERSION}: {num_regions} regions, {file_size} bytes, {} byte screenshot",
            level.sshot.len()
        );
        Ok(w.into_bytes())
    }

    fn encode_regions(
        &self,
        regions: &[((i32, i32), &Region<'_>)],
    ) -> Result<Vec<Vec<u8>>, FormatError> {
        let level = self.options.compression_level;
        let workers = self.options.resolved_worker_count().min(regions.len());
        if workers <= 1 {
            return regions
                .iter()
                .map(|&(key, region)| encode_region(key, region, level))
                .collect();
        }

        log::trace!("encoding {} regions on {workers} threads", regions.len());
        let mut slots: Vec<Option<Result<Vec<u8>, FormatError>>> =
            (0..regions.len()).map(|_| None).collect();

        std::thread::scope(|scope| {
            let (task_tx, task_rx) = crossbeam_channel::bounded::<usize>(workers * 4);
            let (done_tx, done_rx) = crossbeam_channel::unbounded();
            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for index in task_rx.iter() {
                        let (key, region) = regions[index];
                        if done_tx.send((index, encode_region(key, region, level))).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(task_rx);
            drop(done_tx);

            for index in 0..regions.len() {
                if task_tx.send(index).is_err() {
                    break;
                }
            }
            drop(task_tx);

            for (index, encoded) in done_rx.iter() {
                slots[index] = Some(encoded);
            }
        });

        // Report the first failure in directory order.
        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Ok(Vec::new())))
            .collect()
    }
}

/// Serialize a level with default options.
pub fn write_level(level: &Level) -> Result<Vec<u8>, FormatError> {
    LevelWriter::default().write(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::LevelReader;
    use crate::{read_level, ConfigError};
    use dustkit_bitio::BitReader;
    use dustkit_core::{ObjectId, Variable};
    use dustkit_level::{Prop, Tile};

    #[test]
    fn empty_level_layout() {
        let level = Level::empty();
        let bytes = write_level(&level).unwrap();
        // Header, metadata, screenshot length, then a lone null tag.
        assert_eq!(bytes.len(), 49);

        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_bytes(6).unwrap(), LEVEL_MAGIC.to_vec());
        assert_eq!(r.read(16).unwrap(), u64::from(LEVEL_VERSION));
        assert_eq!(r.read(32).unwrap(), bytes.len() as u64);
        assert_eq!(r.read(32).unwrap(), 0);

        let reader = LevelReader::open(&bytes).unwrap();
        assert_eq!(reader.header().metadata.entity_uid, 101);
        assert_eq!(reader.region_offsets(), &[0]);
    }

    #[test]
    fn directory_points_at_each_region() {
        let mut level = Level::new();
        level.add_tile(19, 0, 0, Tile::default());
        level.add_tile(19, 1000, 0, Tile::default());
        level.add_tile(19, -1000, 0, Tile::default());
        let bytes = write_level(&level).unwrap();

        let reader = LevelReader::open(&bytes).unwrap();
        assert_eq!(reader.header().num_regions, 3);
        let offsets = reader.region_offsets().to_vec();
        assert_eq!(offsets[0], 0);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));

        let raw = reader.raw_regions().unwrap();
        for window in offsets.windows(2) {
            let record = &raw.data[window[0] as usize..];
            let len = u32::from_le_bytes([record[0], record[1], record[2], record[3]]);
            assert_eq!(len, window[1] - window[0]);
        }
    }

    #[test]
    fn screenshot_and_variables_survive() {
        let mut level = Level::new();
        level.sshot = vec![0x89, b'P', b'N', b'G', 0, 1, 2];
        level.set_name("Screens");
        level
            .variables
            .insert("sky_mid".into(), Variable::UInt(0xFF33_2211));
        level.add_tile(0, 5, 5, Tile::default());

        let decoded = read_level(&write_level(&level).unwrap()).unwrap();
        assert_eq!(decoded.sshot, level.sshot);
        assert_eq!(decoded.variables, level.variables);
    }

    #[test]
    fn next_id_follows_the_highest_id() {
        let mut level = Level::new();
        level
            .add_prop(1, 0.0, 0.0, Prop::default(), Some(ObjectId(5000)))
            .unwrap();
        let decoded = read_level(&write_level(&level).unwrap()).unwrap();
        assert_eq!(decoded.next_id(), ObjectId(5001));
        assert!(decoded.props.contains_key(&ObjectId(5000)));
    }

    #[test]
    fn raw_length_mismatch_is_rejected() {
        let raw = RawRegions {
            offsets: vec![0, 10],
            data: vec![0; 4],
        };
        assert!(matches!(
            LevelWriter::default().write_raw(&Level::new(), &raw),
            Err(FormatError::RegionDataMismatch {
                expected: 10,
                found: 4
            })
        ));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let err = LevelWriter::new(WriteOptions {
            compression_level: 12,
            ..WriteOptions::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            FormatError::Config(ConfigError::InvalidCompressionLevel { value: 12 })
        ));
    }

    #[test]
    fn worker_count_does_not_change_output() {
        let mut level = Level::new();
        for i in 0..12 {
            level.add_tile(19, i * 300, -i * 200, Tile::default());
        }
        let serial = write_level(&level).unwrap();
        let parallel = LevelWriter::new(WriteOptions {
            region_workers: Some(4),
            ..WriteOptions::default()
        })
        .unwrap()
        .write(&level)
        .unwrap();
        assert_eq!(serial, parallel);
    }
}

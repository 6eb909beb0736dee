//! Region records: a zlib-compressed run of segments.
//!
//! # Format
//!
//! ```text
//! [len:32] [raw_len:32] [x:16s] [y:16s] [version:16] [segments:16] [backdrop:8]
//! [zlib body: segment* (byte-aligned) + optional backdrop segment]
//! ```
//!
//! `len` counts the 17 header bytes plus the compressed body. Region
//! coordinates are in region units; segments inside add their own offset.

use std::io::{Read, Write};

use dustkit_bitio::{BitReader, BitWriter};
use dustkit_level::Level;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::FormatError;
use crate::partition::{Region, REGION_TILES, SEGMENT_TILES};
use crate::segment::{read_segment, write_segment, SegmentTarget};
use crate::REGION_VERSION;

/// Bytes in a region header.
pub const REGION_HEADER_BYTES: u32 = 17;

/// Decoded region header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionHeader {
    /// Total record length in bytes, header included.
    pub len: u32,
    /// Length of the decompressed body.
    pub raw_len: u32,
    /// Region x in region units.
    pub x: i16,
    /// Region y in region units.
    pub y: i16,
    /// Format version.
    pub version: u16,
    /// Number of level segments in the body.
    pub segments: u16,
    /// Whether a backdrop segment follows the level segments.
    pub has_backdrop: bool,
}

impl RegionHeader {
    fn read(r: &mut BitReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            len: r.read(32)? as u32,
            raw_len: r.read(32)? as u32,
            x: r.read_signed(16)? as i16,
            y: r.read_signed(16)? as i16,
            version: r.read(16)? as u16,
            segments: r.read(16)? as u16,
            has_backdrop: r.read(8)? != 0,
        })
    }

    fn write(&self, w: &mut BitWriter) {
        w.write(32, u64::from(self.len));
        w.write(32, u64::from(self.raw_len));
        w.write_signed(16, i64::from(self.x));
        w.write_signed(16, i64::from(self.y));
        w.write(16, u64::from(self.version));
        w.write(16, u64::from(self.segments));
        w.write(8, u64::from(self.has_backdrop));
    }
}

/// Read one region into `level`, leaving the reader just past it.
pub fn read_region(r: &mut BitReader<'_>, level: &mut Level) -> Result<RegionHeader, FormatError> {
    let header = RegionHeader::read(r)?;
    let compressed = r.read_bytes(header.len.saturating_sub(REGION_HEADER_BYTES) as usize)?;

    let mut body = Vec::with_capacity(header.raw_len as usize);
    ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut body)?;
    log::trace!(
        "region ({}, {}): {} segments, {} -> {} bytes",
        header.x,
        header.y,
        header.segments,
        compressed.len(),
        body.len()
    );

    let x = i32::from(header.x);
    let y = i32::from(header.y);
    let mut sub = BitReader::new(&body);
    for _ in 0..header.segments {
        sub.align();
        read_segment(
            &mut sub,
            level,
            SegmentTarget::Level,
            x * REGION_TILES,
            y * REGION_TILES,
        )?;
    }
    if header.has_backdrop {
        sub.align();
        read_segment(
            &mut sub,
            level,
            SegmentTarget::Backdrop,
            x * SEGMENT_TILES,
            y * SEGMENT_TILES,
        )?;
    }
    Ok(header)
}

/// Encode a complete region record, header included.
///
/// Regions are independent, so callers may encode several at once.
pub fn encode_region(
    key: (i32, i32),
    region: &Region<'_>,
    compression_level: u32,
) -> Result<Vec<u8>, FormatError> {
    let mut body = BitWriter::new();
    for (&(sx, sy), segment) in &region.segments {
        write_segment(&mut body, sx, sy, segment)?;
    }
    if let Some(backdrop) = &region.backdrop {
        write_segment(&mut body, 0, 0, backdrop)?;
    }
    let raw = body.into_bytes();

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(compression_level));
    encoder.write_all(&raw)?;
    let compressed = encoder.finish()?;

    let header = RegionHeader {
        len: REGION_HEADER_BYTES + compressed.len() as u32,
        raw_len: raw.len() as u32,
        x: region_coord(key.0, "region x")?,
        y: region_coord(key.1, "region y")?,
        version: REGION_VERSION,
        segments: region.segments.len() as u16,
        has_backdrop: region.backdrop.is_some(),
    };
    let mut w = BitWriter::with_capacity(header.len as usize);
    header.write(&mut w);
    w.write_bytes(&compressed);
    log::trace!(
        "encoded region {key:?}: {} segments, {} -> {} bytes",
        header.segments,
        raw.len(),
        compressed.len()
    );
    Ok(w.into_bytes())
}

fn region_coord(v: i32, field: &'static str) -> Result<i16, FormatError> {
    i16::try_from(v).map_err(|_| FormatError::FieldOverflow {
        field,
        value: i64::from(v),
        bits: 16,
    })
}

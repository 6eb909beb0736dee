//! Segment records: the tiles, dust, props and entities of a 16×16 tile
//! area.
//!
//! # Format
//!
//! ```text
//! [size:32] [version:16] [seg_x:8] [seg_y:8] [width:8]
//! version > 4: [uid:32] [dust_filth:16] [enemy_filth:16]
//! version > 5: [tile_surface:16] [dustblock_filth:16]
//! [flags:32]                      1 tiles, 2 dust, 4 entities, 8 props
//! tiles:    [layers:8] ([layer:8] [count:10] ([x:5] [y:5] [shape:5] [flags:3] [data:12B])*)*
//! dust:     [count:10] ([x:5] [y:5] [data:12B])*
//! props:    [count:16] ([id:32s] [layer:8] [layer_sub:8] position [rotation:16]
//!            [flip_x:1] [flip_y:1] [set:8] [group:12] [index:12] [palette:8])*
//! entities: [count:16] ([id:32s] [tag:6-bit] [x:float 32.8] [y:float 32.8]
//!            [rotation:16] [layer:8] [face_x:1] [face_y:1] [visible:1] [variables])*
//!           [extended tags] [align] [distance back to extended tags:32]
//! ```
//!
//! A negative id marks a deleted record; nothing follows it. Entity face bits
//! are stored inverted. The header counters are recomputed on every write
//! and ignored on read. Tags that do not fit a 6-bit string are written as
//! `entity` with the real tag in the extended table at the segment end.

use dustkit_bitio::{BitReader, BitWriter};
use dustkit_core::ObjectId;
use dustkit_level::{
    Entity, EntityKind, Level, LevelError, LevelType, PlacedEntity, PlacedProp, Prop, Tile,
    TileKey, TileShape, TileSpriteSet,
};
use indexmap::IndexMap;

use crate::codec::{read_6bit_str, read_float, write_6bit_str, write_bounded, write_float};
use crate::error::FormatError;
use crate::partition::Segment;
use crate::variable::{read_var_map, write_var_map};
use crate::SEGMENT_VERSION;

/// Layer whose tiles may carry dust.
pub const DUST_LAYER: u8 = 19;

/// Bits in a written segment header.
pub const HEADER_BITS: u64 = 200;

/// Tag marking an entity whose real tag is in the extended table.
pub const EXTENDED_TAG: &str = "entity";

const FLAG_TILES: u64 = 1;
const FLAG_DUST: u64 = 2;
const FLAG_ENTITIES: u64 = 4;
const FLAG_PROPS: u64 = 8;

/// Which part of a level a segment belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentTarget {
    /// The level itself.
    Level,
    /// The level's backdrop.
    Backdrop,
}

// ── Reading ─────────────────────────────────────────────────────

fn tiles_mut(level: &mut Level, target: SegmentTarget) -> &mut IndexMap<TileKey, Tile> {
    match target {
        SegmentTarget::Level => &mut level.tiles,
        SegmentTarget::Backdrop => &mut level.backdrop.tiles,
    }
}

/// Read one segment into `level`, leaving the reader just past it.
///
/// `xoffset`/`yoffset` locate the segment's region in tiles. Duplicate prop
/// and entity ids replace earlier records.
pub fn read_segment(
    r: &mut BitReader<'_>,
    level: &mut Level,
    target: SegmentTarget,
    xoffset: i32,
    yoffset: i32,
) -> Result<(), FormatError> {
    let start = r.bit_tell();

    let size = r.read(32)?;
    let version = r.read(16)?;
    let xoffset = xoffset + r.read(8)? as i32 * 16;
    let yoffset = yoffset + r.read(8)? as i32 * 16;
    let _width = r.read(8)?;
    if version > 4 {
        // uid, dust_filth, enemy_filth
        r.skip(64)?;
    }
    if version > 5 {
        // tile_surface, dustblock_filth
        r.skip(32)?;
    }
    let flags = r.read(32)?;
    log::trace!(
        "segment at ({xoffset}, {yoffset}): version {version}, {size} bytes, flags {flags:#x}"
    );

    if flags & FLAG_TILES != 0 {
        read_tiles(r, tiles_mut(level, target), xoffset, yoffset)?;
    }
    if flags & FLAG_DUST != 0 {
        read_dust(r, tiles_mut(level, target), xoffset, yoffset)?;
    }
    if flags & FLAG_PROPS != 0 {
        let scaled = version > 6 || level.level_type() == Some(LevelType::Dustmod);
        read_props(r, level, target, scaled)?;
    }
    if flags & FLAG_ENTITIES != 0 {
        read_entities(r, level, target, start, size, version)?;
    }

    r.bit_seek(start + size * 8);
    Ok(())
}

fn read_tiles(
    r: &mut BitReader<'_>,
    tiles: &mut IndexMap<TileKey, Tile>,
    xoffset: i32,
    yoffset: i32,
) -> Result<(), FormatError> {
    let layers = r.read(8)?;
    for _ in 0..layers {
        let layer = r.read(8)? as u8;
        let count = r.read(10)?;
        for _ in 0..count {
            let x = r.read(5)? as i32;
            let y = r.read(5)? as i32;
            let raw_shape = (r.read(5)? & 0x1F) as u8;
            let flags = r.read(3)? as u8;
            let data = r.read_array::<12>()?;
            let shape = TileShape::from_u8(raw_shape)
                .ok_or(LevelError::InvalidShape { value: raw_shape })?;
            let tile = Tile::from_packed(shape, flags, &data)?;
            tiles.insert((layer, xoffset + x, yoffset + y), tile);
        }
    }
    Ok(())
}

fn read_dust(
    r: &mut BitReader<'_>,
    tiles: &mut IndexMap<TileKey, Tile>,
    xoffset: i32,
    yoffset: i32,
) -> Result<(), FormatError> {
    let count = r.read(10)?;
    for _ in 0..count {
        let x = xoffset + r.read(5)? as i32;
        let y = yoffset + r.read(5)? as i32;
        let data = r.read_array::<12>()?;
        match tiles.get_mut(&(DUST_LAYER, x, y)) {
            Some(tile) => tile.unpack_dust_data(&data),
            None => log::warn!("dropping dust at ({x}, {y}) with no tile on layer {DUST_LAYER}"),
        }
    }
    Ok(())
}

/// `50^((code - 32) / 24)`, the inverse of [`scale_code`].
fn scale_from_code(x_code: u64, y_code: u64) -> f64 {
    let code = ((x_code & 7) ^ 4) * 7 + ((y_code & 7) ^ 4);
    50f64.powf((code as f64 - 32.0) / 24.0)
}

/// Split a prop scale into its x and y nibbles.
fn scale_code(scale: f64) -> (u64, u64) {
    let lg = (scale.ln() / 50f64.ln() * 24.0).round_ties_even() as i64;
    let lg = lg.saturating_add(32);
    (
        (lg.div_euclid(7) ^ 4) as u64 & 0xF,
        (lg.rem_euclid(7) ^ 4) as u64 & 0xF,
    )
}

fn read_props(
    r: &mut BitReader<'_>,
    level: &mut Level,
    target: SegmentTarget,
    scaled: bool,
) -> Result<(), FormatError> {
    let count = r.read(16)?;
    for _ in 0..count {
        let id = r.read_signed(32)?;
        if id < 0 {
            continue;
        }
        let layer = r.read(8)? as u8;
        let layer_sub = r.read(8)? as u8;

        let (x, y, scale) = if scaled {
            let x_neg = r.read_bool()?;
            let x_int = r.read(27)? as f64;
            let x_code = r.read(4)?;
            let y_neg = r.read_bool()?;
            let y_int = r.read(27)? as f64;
            let y_code = r.read(4)?;
            let x = if x_neg { -x_int } else { x_int };
            let y = if y_neg { -y_int } else { y_int };
            (x, y, scale_from_code(x_code, y_code))
        } else {
            let x = read_float(r, 28, 4)?;
            let y = read_float(r, 28, 4)?;
            (x, y, 1.0)
        };

        let prop = Prop {
            layer_sub,
            rotation: r.read(16)? as u16,
            flip_x: r.read_bool()?,
            flip_y: r.read_bool()?,
            scale,
            prop_set: r.read(8)? as u8,
            prop_group: r.read(12)? as u16,
            prop_index: r.read(12)? as u16,
            palette: r.read(8)? as u8,
        };
        let placed = PlacedProp { layer, x, y, prop };
        let id = ObjectId(id as u32);
        match target {
            SegmentTarget::Level => level.replace_prop(id, placed),
            SegmentTarget::Backdrop => level.replace_backdrop_prop(id, placed),
        }
    }
    Ok(())
}

fn read_entities(
    r: &mut BitReader<'_>,
    level: &mut Level,
    target: SegmentTarget,
    start: u64,
    size: u64,
    version: u64,
) -> Result<(), FormatError> {
    let count = r.read(16)?;
    let mut extended = false;
    let mut pending = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let id = r.read_signed(32)?;
        if id < 0 {
            continue;
        }
        let tag = read_6bit_str(r)?;
        if tag == EXTENDED_TAG && version > 7 {
            extended = true;
        }
        let x = read_float(r, 32, 8)?;
        let y = read_float(r, 32, 8)?;
        let rotation = r.read(16)? as u16;
        let layer = r.read(8)? as u8;
        let flip_x = !r.read_bool()?;
        let flip_y = !r.read_bool()?;
        let visible = r.read_bool()?;
        let variables = read_var_map(r)?;
        let entity = Entity {
            kind: EntityKind::Other(String::new()),
            variables,
            rotation,
            layer,
            flip_x,
            flip_y,
            visible,
        };
        pending.push((ObjectId(id as u32), tag, x, y, entity));
    }

    if extended {
        r.bit_seek(start + size.saturating_sub(4) * 8);
        let back = r.read(32)? as i64;
        r.skip(-back - 32)?;
    }

    for (id, mut tag, x, y, mut entity) in pending {
        if extended && tag == EXTENDED_TAG {
            tag = read_6bit_str(r)?;
        }
        entity.kind = EntityKind::from_tag(&tag);
        if target == SegmentTarget::Backdrop {
            log::warn!("dropping {tag} entity {id} found in a backdrop segment");
            continue;
        }
        level.replace_entity(id, PlacedEntity { x, y, entity });
    }
    Ok(())
}

// ── Writing ─────────────────────────────────────────────────────

#[derive(Default)]
struct Counters {
    dust_filth: u64,
    enemy_filth: u64,
    tile_surface: u64,
    dustblock_filth: u64,
}

impl Counters {
    fn check(&self) -> Result<(), FormatError> {
        for (field, value) in [
            ("dust filth counter", self.dust_filth),
            ("enemy filth counter", self.enemy_filth),
            ("tile surface counter", self.tile_surface),
            ("dustblock filth counter", self.dustblock_filth),
        ] {
            if value > 0xFFFF {
                return Err(FormatError::FieldOverflow {
                    field,
                    value: value as i64,
                    bits: 16,
                });
            }
        }
        Ok(())
    }

    fn count_tile(&mut self, tile: &Tile) {
        if tile.is_dustblock() {
            self.dustblock_filth += 1;
        }
        for edge in tile.edges.iter().filter(|e| !e.filth_spike) {
            if edge.filth_sprite_set != TileSpriteSet::None0 {
                self.dust_filth += 1;
            }
            if edge.solid && edge.visible {
                self.tile_surface += 1;
            }
        }
    }
}

/// Write `segment` at the (byte-aligned) writer position, ending aligned.
///
/// # Panics
///
/// Panics if the writer is not byte-aligned.
pub fn write_segment(
    w: &mut BitWriter,
    seg_x: u8,
    seg_y: u8,
    segment: &Segment<'_>,
) -> Result<(), FormatError> {
    assert!(w.is_aligned(), "segments must start on a byte boundary");
    let start = w.bit_tell();
    let header = w.reserve(HEADER_BITS);

    let mut flags = 0;
    let mut counters = Counters::default();

    if !segment.tiles.is_empty() {
        flags |= FLAG_TILES;
        let dust = write_tiles(w, segment, &mut counters)?;
        if !dust.is_empty() {
            flags |= FLAG_DUST;
            w.write(10, dust.len() as u64);
            for (x, y, tile) in dust {
                w.write(5, u64::from(x));
                w.write(5, u64::from(y));
                w.write_bytes(&tile.pack_dust_data());
            }
        }
    }

    if !segment.props.is_empty() {
        flags |= FLAG_PROPS;
        write_props(w, segment)?;
    }

    if !segment.entities.is_empty() {
        flags |= FLAG_ENTITIES;
        write_entities(w, segment, &mut counters)?;
    }

    w.align();
    let size = (w.bit_tell() - start) / 8;
    counters.check()?;
    w.fill_with(header, |w| {
        w.write(32, size);
        w.write(16, u64::from(SEGMENT_VERSION));
        w.write(8, u64::from(seg_x));
        w.write(8, u64::from(seg_y));
        w.write(8, 16);
        w.write(32, 0);
        w.write(16, counters.dust_filth);
        w.write(16, counters.enemy_filth);
        w.write(16, counters.tile_surface);
        w.write(16, counters.dustblock_filth);
        w.write(32, flags);
    });
    Ok(())
}

fn write_tiles<'a>(
    w: &mut BitWriter,
    segment: &Segment<'a>,
    counters: &mut Counters,
) -> Result<Vec<(u8, u8, &'a Tile)>, FormatError> {
    let mut dust = Vec::new();
    write_bounded(w, 8, segment.tiles.len() as u64, "layer count")?;
    for (&layer, tiles) in &segment.tiles {
        let mut tiles = tiles.clone();
        tiles.sort_by_key(|&(x, y, _)| (y, x));

        w.write(8, u64::from(layer));
        w.write(10, tiles.len() as u64);
        for (x, y, tile) in tiles {
            if layer == DUST_LAYER {
                if tile.has_filth() {
                    dust.push((x, y, tile));
                }
                counters.count_tile(tile);
            }
            w.write(5, u64::from(x));
            w.write(5, u64::from(y));
            w.write(5, tile.shape as u64);
            w.write(3, u64::from(tile.flags));
            w.write_bytes(&tile.pack_tile_data());
        }
    }
    Ok(dust)
}

/// Ids share the wire with negative tombstones, so they must fit an `i32`.
fn write_id(w: &mut BitWriter, id: ObjectId) -> Result<(), FormatError> {
    if id > ObjectId::MAX {
        return Err(FormatError::FieldOverflow {
            field: "object id",
            value: i64::from(id.0),
            bits: 31,
        });
    }
    w.write(32, u64::from(id.0));
    Ok(())
}

fn write_props(w: &mut BitWriter, segment: &Segment<'_>) -> Result<(), FormatError> {
    write_bounded(w, 16, segment.props.len() as u64, "prop count")?;
    for &(id, placed) in &segment.props {
        let prop = &placed.prop;
        write_id(w, id)?;
        w.write(8, u64::from(placed.layer));
        w.write(8, u64::from(prop.layer_sub));

        let (x_code, y_code) = scale_code(prop.scale);
        w.write_bool(placed.x < 0.0);
        write_bounded(w, 27, placed.x.abs() as u64, "prop x")?;
        w.write(4, x_code);
        w.write_bool(placed.y < 0.0);
        write_bounded(w, 27, placed.y.abs() as u64, "prop y")?;
        w.write(4, y_code);

        w.write(16, u64::from(prop.rotation));
        w.write_bool(prop.flip_x);
        w.write_bool(prop.flip_y);
        w.write(8, u64::from(prop.prop_set));
        w.write(12, u64::from(prop.prop_group));
        w.write(12, u64::from(prop.prop_index));
        w.write(8, u64::from(prop.palette));
    }
    Ok(())
}

fn write_entities(
    w: &mut BitWriter,
    segment: &Segment<'_>,
    counters: &mut Counters,
) -> Result<(), FormatError> {
    let mut names = BitWriter::new();
    write_bounded(w, 16, segment.entities.len() as u64, "entity count")?;
    for &(id, placed) in &segment.entities {
        let entity = &placed.entity;
        let tag = entity.kind.tag();
        counters.enemy_filth += u64::from(entity.kind.filth());

        write_id(w, id)?;
        if tag.starts_with("z_") || tag == EXTENDED_TAG {
            write_6bit_str(w, EXTENDED_TAG)?;
            write_6bit_str(&mut names, tag)?;
        } else {
            write_6bit_str(w, tag)?;
        }
        write_float(w, 32, 8, placed.x);
        write_float(w, 32, 8, placed.y);
        w.write(16, u64::from(entity.rotation));
        w.write(8, u64::from(entity.layer));
        w.write_bool(!entity.flip_x);
        w.write_bool(!entity.flip_y);
        w.write_bool(entity.visible);
        write_var_map(w, &entity.variables)?;
    }

    names.align();
    let names_pos = w.bit_tell();
    w.write_bytes(names.as_bytes());
    w.align();
    let back = w.bit_tell() - names_pos;
    w.write(32, back);
    Ok(())
}

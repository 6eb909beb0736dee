//! Spatial bucketing of a level into regions and segments.
//!
//! A segment covers 16×16 tiles and a region 16×16 segments. Tiles are
//! bucketed by tile coordinate, props and entities by the tile containing
//! their pixel position (truncated toward zero). Segment coordinates wrap
//! modulo 16 and the region key carries the rest.
//!
//! Backdrop tiles live at 1/16 the scale of the level, so a whole region's
//! worth of backdrop fits in one extra segment per region.

use std::collections::{BTreeMap, HashMap};

use dustkit_core::ObjectId;
use dustkit_level::{Level, PlacedEntity, PlacedProp, Tile};

/// Width of a segment in tiles.
pub const SEGMENT_TILES: i32 = 16;

/// Width of a region in tiles.
pub const REGION_TILES: i32 = 256;

/// Width of a tile in pixels.
pub const TILE_PIXELS: f64 = 48.0;

/// Region containing tile `(x, y)`.
pub fn region_key(x: i32, y: i32) -> (i32, i32) {
    (x.div_euclid(REGION_TILES), y.div_euclid(REGION_TILES))
}

/// Segment within its region containing tile `(x, y)`.
pub fn segment_key(x: i32, y: i32) -> (u8, u8) {
    (
        (x.div_euclid(SEGMENT_TILES) & 0xF) as u8,
        (y.div_euclid(SEGMENT_TILES) & 0xF) as u8,
    )
}

/// Tile containing pixel position `(x, y)`, truncating toward zero.
pub fn pixel_to_tile(x: f64, y: f64) -> (i32, i32) {
    ((x / TILE_PIXELS) as i32, (y / TILE_PIXELS) as i32)
}

/// Sort key placing negative region coordinates after all positive ones, as
/// the game orders its region directory.
pub fn region_sort_key((x, y): (i32, i32)) -> (i64, i64) {
    let fold = |v: i32| {
        let v = i64::from(v);
        if v < 0 {
            v + (1 << 16)
        } else {
            v
        }
    };
    (fold(x), fold(y))
}

/// Objects of one segment, borrowed from the level.
#[derive(Debug, Default)]
pub struct Segment<'a> {
    /// Per layer, `(x, y, tile)` with coordinates local to the segment.
    pub tiles: BTreeMap<u8, Vec<(u8, u8, &'a Tile)>>,
    /// Props in insertion order.
    pub props: Vec<(ObjectId, &'a PlacedProp)>,
    /// Entities in insertion order.
    pub entities: Vec<(ObjectId, &'a PlacedEntity)>,
}

impl Segment<'_> {
    /// Whether the segment holds nothing.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty() && self.props.is_empty() && self.entities.is_empty()
    }
}

/// The segments of one region plus its backdrop segment.
#[derive(Debug, Default)]
pub struct Region<'a> {
    /// Segments keyed by their position within the region.
    pub segments: BTreeMap<(u8, u8), Segment<'a>>,
    /// Backdrop content for this region, if any.
    pub backdrop: Option<Segment<'a>>,
}

/// Every region of a level that holds at least one object.
#[derive(Debug, Default)]
pub struct RegionMap<'a> {
    regions: HashMap<(i32, i32), Region<'a>>,
}

impl<'a> RegionMap<'a> {
    /// Bucket every tile, prop and entity of `level`, backdrop included.
    pub fn from_level(level: &'a Level) -> Self {
        let mut map = Self::default();

        for (&(layer, x, y), tile) in &level.tiles {
            map.segment(x, y)
                .tiles
                .entry(layer)
                .or_default()
                .push(((x & 0xF) as u8, (y & 0xF) as u8, tile));
        }
        for (&id, placed) in &level.entities {
            let (tx, ty) = pixel_to_tile(placed.x, placed.y);
            map.segment(tx, ty).entities.push((id, placed));
        }
        for (&id, placed) in &level.props {
            let (tx, ty) = pixel_to_tile(placed.x, placed.y);
            map.segment(tx, ty).props.push((id, placed));
        }

        for (&(layer, x, y), tile) in &level.backdrop.tiles {
            let key = (x.div_euclid(SEGMENT_TILES), y.div_euclid(SEGMENT_TILES));
            map.backdrop(key)
                .tiles
                .entry(layer)
                .or_default()
                .push(((x & 0xF) as u8, (y & 0xF) as u8, tile));
        }
        for (&id, placed) in &level.backdrop.props {
            let (tx, ty) = pixel_to_tile(placed.x, placed.y);
            map.backdrop(region_key(tx, ty)).props.push((id, placed));
        }

        map
    }

    fn region(&mut self, key: (i32, i32)) -> &mut Region<'a> {
        self.regions.entry(key).or_default()
    }

    fn segment(&mut self, x: i32, y: i32) -> &mut Segment<'a> {
        self.region(region_key(x, y))
            .segments
            .entry(segment_key(x, y))
            .or_default()
    }

    fn backdrop(&mut self, key: (i32, i32)) -> &mut Segment<'a> {
        self.region(key).backdrop.get_or_insert_with(Segment::default)
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the level has no content at all.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// The region at `key`, if it holds anything.
    pub fn get(&self, key: (i32, i32)) -> Option<&Region<'a>> {
        self.regions.get(&key)
    }

    /// Regions in file order.
    pub fn sorted(&self) -> Vec<((i32, i32), &Region<'a>)> {
        let mut regions: Vec<_> = self.regions.iter().map(|(k, r)| (*k, r)).collect();
        regions.sort_by_key(|(k, _)| region_sort_key(*k));
        regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustkit_level::{Entity, Prop};

    #[test]
    fn coordinate_wrap() {
        assert_eq!(region_key(300, 5), (1, 0));
        assert_eq!(segment_key(300, 5), (2, 0));
        assert_eq!(segment_key(304, 5), (3, 0));
        assert_eq!(region_key(-1, -256), (-1, -1));
        assert_eq!(region_key(-257, 0), (-2, 0));
        assert_eq!(segment_key(-1, -17), (15, 14));
        assert_eq!(pixel_to_tile(-47.0, 95.0), (0, 1));
    }

    #[test]
    fn negative_regions_sort_last() {
        let mut keys = vec![(-1, 0), (0, 0), (3, -2), (0, 1), (2, 0)];
        keys.sort_by_key(|k| region_sort_key(*k));
        assert_eq!(keys, vec![(0, 0), (0, 1), (2, 0), (3, -2), (-1, 0)]);
    }

    #[test]
    fn level_is_bucketed() {
        let mut level = Level::new();
        level.add_tile(19, 300, 5, Tile::default());
        level.add_tile(19, -1, -1, Tile::default());
        level.add_prop(2, 48.0 * 300.0, 0.0, Prop::default(), None).unwrap();
        level
            .add_entity(-10.0, -10.0, Entity::from_tag("enemy_wolf"), None)
            .unwrap();
        level.add_backdrop_tile(0, 17, 0, Tile::default());

        let map = RegionMap::from_level(&level);
        assert_eq!(map.len(), 3);

        let region = map.get((1, 0)).unwrap();
        let segment = &region.segments[&(2, 0)];
        assert_eq!(segment.tiles[&19], vec![(12, 5, &level.tiles[&(19, 300, 5)])]);
        assert_eq!(region.segments[&(2, 0)].props.len(), 1);
        assert!(region.backdrop.as_ref().unwrap().tiles[&0][0].0 == 1);

        // Entity at (-10, -10) truncates into tile (0, 0).
        let origin = map.get((0, 0)).unwrap();
        assert_eq!(origin.segments[&(0, 0)].entities.len(), 1);
        assert!(map.get((-1, -1)).unwrap().segments.contains_key(&(15, 15)));

        let order: Vec<_> = map.sorted().into_iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec![(0, 0), (1, 0), (-1, -1)]);
    }
}

//! End-to-end level encoding tests.
//!
//! Each test builds a level in memory, writes it to `DF_LVL` bytes and reads
//! it back through the public API.

use dustkit_core::{ObjectId, Variable};
use dustkit_format::{
    read_level, read_level_with, write_level, FormatError, LevelReader, LevelWriter, ReadOptions,
    WriteOptions, LEVEL_VERSION,
};
use dustkit_level::{
    Entity, Level, PlacedEntity, PlacedProp, Prop, Tile, TileShape, TileSide, TileSpriteSet,
};
use dustkit_test_utils::{arb_tile, arb_variable_map, sample_level, solid_tile, DUST_LAYER};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────

fn roundtrip(level: &Level) -> Level {
    let bytes = write_level(level).expect("write");
    read_level(&bytes).expect("read")
}

// ── Round trips ─────────────────────────────────────────────────

#[test]
fn sample_level_roundtrips() {
    let level = sample_level();
    let decoded = roundtrip(&level);
    assert_eq!(decoded.tiles, level.tiles);
    assert_eq!(decoded.props, level.props);
    assert_eq!(decoded.entities, level.entities);
    assert_eq!(decoded.backdrop, level.backdrop);
    assert_eq!(decoded.variables, level.variables);
    assert_eq!(decoded.sshot, level.sshot);
    assert_eq!(decoded, level);
}

#[test]
fn writing_is_idempotent() {
    let first = write_level(&sample_level()).unwrap();
    let second = write_level(&read_level(&first).unwrap()).unwrap();
    let third = write_level(&read_level(&second).unwrap()).unwrap();
    assert_eq!(first, second);
    assert_eq!(second, third);
}

#[test]
fn insertion_order_does_not_change_output() {
    let level = sample_level();
    let mut shuffled = Level::new();
    shuffled.variables = level.variables.clone();
    shuffled.sshot = level.sshot.clone();
    for (&(layer, x, y), tile) in level.tiles.iter().rev() {
        shuffled.add_tile(layer, x, y, tile.clone());
    }
    for (&id, placed) in &level.props {
        shuffled.replace_prop(id, placed.clone());
    }
    for (&id, placed) in &level.entities {
        shuffled.replace_entity(id, placed.clone());
    }
    shuffled.backdrop = level.backdrop.clone();
    assert_eq!(write_level(&shuffled).unwrap(), write_level(&level).unwrap());
}

#[test]
fn full_tile_survives_and_rotates() {
    let mut level = Level::new();
    let mut tile = Tile::new(TileShape::Full);
    for edge in &mut tile.edges {
        edge.solid = true;
    }
    tile.edges[TileSide::Top.index()].visible = true;
    level.add_tile(0, 0, 0, tile.clone());

    let mut decoded = roundtrip(&level);
    assert_eq!(decoded.tiles[&(0, 0, 0)], tile);

    decoded.rotate(1);
    let rotated = &decoded.tiles[&(0, -1, 0)];
    assert_eq!(rotated.shape, TileShape::Full);
    assert!(rotated.edges.iter().all(|e| e.solid));
    assert!(rotated.edges[TileSide::Right.index()].visible);
    assert!(!rotated.edges[TileSide::Top.index()].visible);
}

#[test]
fn explicit_ids_survive_across_regions() {
    let mut level = Level::new();
    level
        .add_entity(10.0, 10.0, Entity::from_tag("enemy_bear"), Some(ObjectId(700)))
        .unwrap();
    level
        .add_prop(3, -50_000.0, 96.0, Prop::default(), Some(ObjectId(701)))
        .unwrap();
    let decoded = roundtrip(&level);
    assert_eq!(decoded.next_id(), ObjectId(702));
    assert_eq!(decoded.entities[&ObjectId(700)].entity.kind.filth(), 9);
    assert_eq!(decoded.props[&ObjectId(701)].x, -50_000.0);
}

#[test]
fn dust_is_only_kept_on_the_dust_layer() {
    let mut level = Level::new();
    let mut tile = solid_tile(TileShape::Full);
    tile.edges[0].filth_sprite_set = TileSpriteSet::Forest;
    level.add_tile(DUST_LAYER, 1, 1, tile.clone());
    level.add_tile(DUST_LAYER - 1, 1, 1, tile.clone());

    let decoded = roundtrip(&level);
    assert_eq!(decoded.tiles[&(DUST_LAYER, 1, 1)], tile);
    assert!(!decoded.tiles[&(DUST_LAYER - 1, 1, 1)].has_filth());
}

// ── Reader options and the extended API ─────────────────────────

#[test]
fn metadata_only_skips_regions() {
    let level = sample_level();
    let bytes = write_level(&level).unwrap();
    let meta = read_level_with(&bytes, &ReadOptions::metadata_only()).unwrap();
    assert!(meta.tiles.is_empty());
    assert!(meta.props.is_empty());
    assert!(meta.entities.is_empty());
    assert!(meta.backdrop.is_empty());
    assert_eq!(meta.variables, level.variables);
    assert_eq!(meta.sshot, level.sshot);
}

#[test]
fn raw_rewrite_is_byte_identical() {
    let bytes = write_level(&sample_level()).unwrap();
    let reader = LevelReader::open(&bytes).unwrap();
    assert_eq!(reader.header().version, LEVEL_VERSION);
    assert_eq!(reader.header().file_size as usize, bytes.len());
    let raw = reader.raw_regions().unwrap();
    assert_eq!(raw.len() as u32, reader.header().num_regions);

    let rewritten = LevelWriter::default()
        .write_raw(reader.level(), &raw)
        .unwrap();
    assert_eq!(rewritten, bytes);
}

#[test]
fn raw_rewrite_replaces_metadata() {
    let level = sample_level();
    let bytes = write_level(&level).unwrap();
    let reader = LevelReader::open(&bytes).unwrap();
    let raw = reader.raw_regions().unwrap();
    let mut meta = reader.into_level();
    meta.sshot = b"thumbnail".to_vec();
    meta.variables
        .insert("title".into(), Variable::string("Downhill remix"));

    let rewritten = LevelWriter::default().write_raw(&meta, &raw).unwrap();
    let decoded = read_level(&rewritten).unwrap();
    assert_eq!(decoded.sshot, b"thumbnail".to_vec());
    assert_eq!(decoded.variables, meta.variables);
    assert_eq!(decoded.tiles, level.tiles);
    assert_eq!(decoded.entities, level.entities);
}

#[test]
fn truncated_file_is_an_error() {
    let bytes = write_level(&sample_level()).unwrap();
    let cut = &bytes[..bytes.len() - 40];
    assert!(read_level(cut).is_err());
    assert!(matches!(read_level(&bytes[..20]), Err(FormatError::Bit(_))));
}

// ── Writer options ──────────────────────────────────────────────

#[test]
fn parallel_and_serial_output_match() {
    let level = sample_level();
    let serial = write_level(&level).unwrap();
    for workers in [2, 3, 8] {
        let writer = LevelWriter::new(WriteOptions {
            region_workers: Some(workers),
            ..WriteOptions::default()
        })
        .unwrap();
        assert_eq!(writer.write(&level).unwrap(), serial);
    }
}

#[test]
fn every_compression_level_reads_back() {
    let level = sample_level();
    for compression_level in [0, 1, 9] {
        let writer = LevelWriter::new(WriteOptions {
            compression_level,
            ..WriteOptions::default()
        })
        .unwrap();
        assert_eq!(read_level(&writer.write(&level).unwrap()).unwrap(), level);
    }
}

// ── Wire limits ─────────────────────────────────────────────────

fn assert_overflow(level: &Level, expected: &str) {
    match write_level(level) {
        Err(FormatError::FieldOverflow { field, .. }) => assert_eq!(field, expected),
        other => panic!("expected {expected} overflow, got {other:?}"),
    }
}

#[test]
fn every_layer_in_one_segment_is_rejected() {
    let mut level = Level::new();
    for layer in 0..=254u8 {
        level.add_tile(layer, 0, 0, Tile::default());
    }
    assert_eq!(roundtrip(&level).tiles.len(), 255);

    level.add_tile(255, 0, 0, Tile::default());
    assert_overflow(&level, "layer count");
}

#[test]
fn too_many_props_in_one_segment() {
    let mut level = Level::new();
    for _ in 0..=u16::MAX as u32 {
        level.add_prop(1, 10.0, 10.0, Prop::default(), None).unwrap();
    }
    assert_overflow(&level, "prop count");
}

#[test]
fn too_many_entities_in_one_segment() {
    let mut level = Level::new();
    for _ in 0..=u16::MAX as u32 {
        level
            .add_entity(10.0, 10.0, Entity::from_tag("check_point"), None)
            .unwrap();
    }
    assert_overflow(&level, "entity count");
}

#[test]
fn enemy_filth_counter_overflow() {
    let mut level = Level::new();
    // 5462 * 12 is just past 65535.
    for _ in 0..5462 {
        level
            .add_entity(10.0, 10.0, Entity::from_tag("enemy_stoneboss"), None)
            .unwrap();
    }
    assert_overflow(&level, "enemy filth counter");
}

#[test]
fn prop_position_must_fit_the_magnitude_field() {
    let limit = f64::from((1u32 << 27) - 1);
    let mut level = Level::new();
    level.add_prop(1, limit, -limit, Prop::default(), None).unwrap();
    let decoded = roundtrip(&level);
    let placed = decoded.props.values().next().unwrap();
    assert_eq!((placed.x, placed.y), (limit, -limit));

    let mut level = Level::new();
    level.add_prop(1, limit + 1.0, 0.0, Prop::default(), None).unwrap();
    assert_overflow(&level, "prop x");

    let mut level = Level::new();
    level.add_prop(1, 0.0, -(limit + 1.0), Prop::default(), None).unwrap();
    assert_overflow(&level, "prop y");
}

#[test]
fn ids_above_the_signed_range_are_not_written() {
    let high = ObjectId(0x8000_0000);

    let mut level = Level::new();
    level.replace_prop(
        high,
        PlacedProp {
            layer: 1,
            x: 0.0,
            y: 0.0,
            prop: Prop::default(),
        },
    );
    assert_overflow(&level, "object id");

    let mut level = Level::new();
    level.replace_entity(
        high,
        PlacedEntity {
            x: 0.0,
            y: 0.0,
            entity: Entity::from_tag("enemy_wolf"),
        },
    );
    assert_overflow(&level, "object id");

    let mut level = Level::new();
    level
        .add_prop(1, 0.0, 0.0, Prop::default(), Some(ObjectId::MAX))
        .unwrap();
    assert!(roundtrip(&level).props.contains_key(&ObjectId::MAX));
}

// ── Properties ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_tiles_roundtrip(
        tiles in prop::collection::vec(((-600i32..600), (-600i32..600), arb_tile()), 1..24),
    ) {
        let mut level = Level::new();
        for (x, y, tile) in tiles {
            level.add_tile(DUST_LAYER, x, y, tile);
        }
        let decoded = roundtrip(&level);
        prop_assert_eq!(decoded.tiles, level.tiles);
    }

    #[test]
    fn random_globals_roundtrip(vars in arb_variable_map()) {
        let mut level = Level::empty();
        level.variables = vars;
        let bytes = write_level(&level).unwrap();
        let decoded = read_level(&bytes).unwrap();
        prop_assert_eq!(&decoded.variables, &level.variables);
        prop_assert_eq!(write_level(&decoded).unwrap(), bytes);
    }
}

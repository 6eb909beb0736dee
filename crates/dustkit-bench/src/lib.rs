//! Benchmark profiles for the dustkit level codec.
//!
//! Provides pre-built levels for benchmarking:
//!
//! - [`reference_level`]: 256x256 tiles (one region) of terrain with dust,
//!   props and enemies
//! - [`stress_level`]: 1024x1024 tiles spread over 16 regions
//! - [`scatter_positions`]: deterministic object placement via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use dustkit_core::Variable;
use dustkit_level::{Entity, Level, Prop, Tile, TileShape, TileSide, TileSpriteSet};

const ENEMIES: [&str; 5] = [
    "enemy_wolf",
    "enemy_bear",
    "enemy_hawk",
    "enemy_slime_ball",
    "enemy_trash_can",
];

/// Build a reference benchmark level: one region, 256x256 tiles.
///
/// Every fourth row is a floor on the dust layer with dust on its top
/// edges, plus 512 props and 256 enemies.
pub fn reference_level(seed: u64) -> Level {
    terrain_level(256, seed)
}

/// Build a stress benchmark level: 1024x1024 tiles over 16 regions.
///
/// Same content density as [`reference_level`], scaled to 16x the area.
pub fn stress_level(seed: u64) -> Level {
    terrain_level(1024, seed)
}

fn terrain_level(size: i32, seed: u64) -> Level {
    let mut level = Level::new();
    level.set_name(format!("bench_{size}"));
    level
        .variables
        .insert("seed".into(), Variable::UInt(seed as u32));

    let shapes = [TileShape::Full, TileShape::Big1, TileShape::Small2, TileShape::HalfA];
    for y in (0..size).step_by(4) {
        for x in 0..size {
            let mut tile = Tile::new(shapes[(x as usize + y as usize) % shapes.len()]);
            let top = &mut tile.edges[TileSide::Top.index()];
            top.solid = true;
            top.visible = true;
            if x % 3 == 0 {
                top.filth_sprite_set = TileSpriteSet::Forest;
            }
            level.add_tile(19, x, y, tile);
        }
    }

    let cells = (size as usize) * (size as usize);
    let area = (size / 256).max(1) as usize;
    for (i, pos) in scatter_positions(cells, (512 * area * area) as u32, seed) {
        let (x, y) = cell_pixels(pos, size);
        let prop = Prop {
            prop_set: 1 + (i % 4) as u8,
            prop_group: (i % 20) as u16,
            prop_index: 1,
            ..Prop::default()
        };
        if let Err(err) = level.add_prop(10 + (i % 8) as u8, x, y, prop, None) {
            panic!("bench prop rejected: {err}");
        }
    }
    let enemies = (256 * area * area) as u32;
    for (i, pos) in scatter_positions(cells, enemies, seed ^ 0x5EED) {
        let (x, y) = cell_pixels(pos, size);
        let enemy = Entity::from_tag(ENEMIES[i as usize % ENEMIES.len()]);
        if let Err(err) = level.add_entity(x, y - 48.0, enemy, None) {
            panic!("bench entity rejected: {err}");
        }
    }
    level
}

fn cell_pixels(pos: usize, size: i32) -> (f64, f64) {
    let x = (pos % size as usize) as f64 * 48.0 + 24.0;
    let y = (pos / size as usize) as f64 * 48.0;
    (x, y)
}

/// Generate `n` deterministic, distinct cell indices below `cell_count`.
///
/// Returns `(index, cell)` pairs.
pub fn scatter_positions(cell_count: usize, n: u32, seed: u64) -> Vec<(u32, usize)> {
    let mut positions = Vec::with_capacity(n as usize);
    let mut occupied = std::collections::HashSet::new();

    for i in 0..n {
        let mut pos = (seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(u64::from(i).wrapping_mul(1442695040888963407))
            % cell_count as u64) as usize;

        // Linear probe to avoid collisions
        while occupied.contains(&pos) {
            pos = (pos + 1) % cell_count;
        }
        occupied.insert(pos);
        positions.push((i, pos));
    }

    positions
}

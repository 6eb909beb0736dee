//! Test fixtures and proptest strategies for dustkit development.
//!
//! [`sample_level`] builds a deterministic level that touches every part of
//! the level format. The `arb_*` functions generate values that survive a
//! trip through the binary codec unchanged.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use dustkit_core::{ObjectId, Variable, VariableArray, VariableMap, VariableType};
use dustkit_level::entity::fields;
use dustkit_level::{
    Entity, EntityKind, Level, LevelType, Prop, Tile, TileEdge, TileShape, TileSide,
    TileSpriteSet,
};
use proptest::prelude::*;

/// Layer whose tiles carry dust in the file format.
pub const DUST_LAYER: u8 = 19;

// ── Fixtures ────────────────────────────────────────────────────

/// A solid, visible edge with dust of the given set.
pub fn dusty_edge(set: TileSpriteSet) -> TileEdge {
    TileEdge {
        solid: true,
        visible: true,
        caps: [true, false],
        angles: [-12, 30],
        filth_sprite_set: set,
        filth_spike: false,
        filth_caps: [false, true],
        filth_angles: [5, -5],
    }
}

/// A tile of `shape` whose sides are all solid and visible.
pub fn solid_tile(shape: TileShape) -> Tile {
    let mut tile = Tile::new(shape);
    for side in shape.ordered_sides() {
        let edge = &mut tile.edges[side.index()];
        edge.solid = true;
        edge.visible = true;
    }
    tile
}

fn level_end(targets: &[ObjectId]) -> Entity {
    let mut end = Entity::new(EntityKind::LevelEnd);
    fields::LEVEL_END_ENTITIES.set(&mut end.variables, targets.iter().map(|id| id.0).collect());
    fields::FINISHED.set(&mut end.variables, false);
    end
}

fn camera_node(linked: &[ObjectId]) -> Entity {
    let mut node = Entity::new(EntityKind::CameraNode);
    fields::CAMERA_NODE_TYPE.set(&mut node.variables, 2);
    fields::CAMERA_ZOOM.set(&mut node.variables, 1440);
    fields::CAMERA_NODES.set(&mut node.variables, linked.iter().map(|id| id.0).collect());
    node
}

fn script_entity() -> Entity {
    let mut inner = VariableMap::new();
    inner.insert("speed".into(), Variable::Float(2.5));
    inner.insert("origin".into(), Variable::Vec2(-96.0, 1024.125));
    inner.insert(
        "names".into(),
        Variable::Array(VariableArray::from_values(
            VariableType::String,
            vec![Variable::string("left"), Variable::string("right")],
        )),
    );

    let mut script = Entity::from_tag("z_custom_script_trigger");
    script.layer = 20;
    script.visible = false;
    script.variables.insert("config".into(), Variable::Struct(inner));
    script.variables.insert("uses".into(), Variable::UInt(3));
    script
        .variables
        .insert("note".into(), Variable::string("spawns a wolf\non entry"));
    script
}

/// A level exercising every part of the format.
///
/// Contains every tile shape on the dust layer, dusted and dustblock tiles,
/// tiles on several other layers, props in several layers, entities with
/// nested variables and cross references, an extended entity tag, content
/// in regions on both sides of the origin, a backdrop and a screenshot.
/// Positions and values are all exactly representable on the wire.
pub fn sample_level() -> Level {
    let mut level = Level::new();
    level.set_name("downhill");
    level.set_level_type(LevelType::Normal);
    level.set_start_position(1, 96, -48);
    level.set_start_position(2, 144, -48);
    level
        .variables
        .insert("sky_bottom".into(), Variable::UInt(0xFF40_5060));
    level.sshot = (0..=255u8).cycle().take(600).collect();

    for (i, shape) in TileShape::ALL.into_iter().enumerate() {
        let i = i as i32;
        level.add_tile(DUST_LAYER, i * 3, 10, solid_tile(shape));
        level.add_tile(DUST_LAYER, -260 - i, -20 + i, solid_tile(shape));
    }

    let mut dusty = solid_tile(TileShape::Full);
    dusty.edges[TileSide::Top.index()] = dusty_edge(TileSpriteSet::Forest);
    dusty.edges[TileSide::Left.index()].filth_sprite_set = TileSpriteSet::Mansion;
    dusty.edges[TileSide::Left.index()].filth_spike = true;
    level.add_tile(DUST_LAYER, 40, 11, dusty);

    let mut slope = solid_tile(TileShape::Big3);
    slope.edges[TileSide::Bottom.index()] = dusty_edge(TileSpriteSet::City);
    level.add_tile(DUST_LAYER, 520, 300, slope);

    let mut dustblock = Tile::default();
    if dustblock.set_dustblock().is_ok() {
        level.add_tile(DUST_LAYER, 41, 11, dustblock);
    }

    for layer in [6u8, 12, 20] {
        let mut tile = Tile::new(TileShape::HalfB);
        tile.set_sprite((TileSpriteSet::Laboratory, 4, 2));
        level.add_tile(layer, 7, -3 + i32::from(layer), tile);
    }

    let props = [
        (1u8, 480.0, 96.0, 0x4000u16),
        (5, -12_480.0, -960.0, 0),
        (15, 24_576.0, 14_400.0, 0xC000),
        (22, -48.0, 48.0, 0x1234),
    ];
    for (n, &(layer, x, y, rotation)) in props.iter().enumerate() {
        let prop = Prop {
            layer_sub: n as u8,
            rotation,
            flip_x: n % 2 == 0,
            flip_y: n == 3,
            scale: 1.0,
            prop_set: 1 + n as u8,
            prop_group: 10 * n as u16,
            prop_index: 3,
            palette: n as u8,
        };
        if let Err(err) = level.add_prop(layer, x, y, prop, None) {
            panic!("sample prop rejected: {err}");
        }
    }

    let wolf = add(&mut level, 600.5, 432.0, Entity::from_tag("enemy_wolf"));
    let mut hawk = Entity::from_tag("enemy_hawk");
    hawk.flip_x = true;
    hawk.rotation = 0x2000;
    let hawk = add(&mut level, -13_000.25, -900.0, hawk);
    add(&mut level, 1200.0, 400.0, level_end(&[wolf, hawk]));
    let first = add(&mut level, 0.0, 0.0, camera_node(&[]));
    add(&mut level, 960.0, 0.0, camera_node(&[first]));
    add(&mut level, 720.0, 48.0, script_entity());
    add(&mut level, -20.0, 30.0, Entity::from_tag("check_point"));

    level.add_backdrop_tile(10, 2, 1, solid_tile(TileShape::Full));
    level.add_backdrop_tile(10, -3, 0, solid_tile(TileShape::Small2));
    let backdrop_prop = Prop {
        prop_set: 4,
        prop_group: 2,
        ..Prop::default()
    };
    if let Err(err) = level.add_backdrop_prop(2, 4800.0, -960.0, backdrop_prop, None) {
        panic!("sample backdrop prop rejected: {err}");
    }

    level
}

fn add(level: &mut Level, x: f64, y: f64, entity: Entity) -> ObjectId {
    match level.add_entity(x, y, entity, None) {
        Ok(id) => id,
        Err(err) => panic!("sample entity rejected: {err}"),
    }
}

// ── Strategies ──────────────────────────────────────────────────

/// Edge data. Filth fields are zero unless the edge has a filth sprite set.
pub fn arb_edge() -> impl Strategy<Value = TileEdge> {
    (
        any::<(bool, bool, [bool; 2], [i8; 2])>(),
        0usize..8,
        any::<(bool, [bool; 2], [i8; 2])>(),
    )
        .prop_map(|((solid, visible, caps, angles), set, (spike, fcaps, fangles))| {
            let mut edge = TileEdge {
                solid,
                visible,
                caps,
                angles,
                ..TileEdge::default()
            };
            if set != 0 {
                edge.filth_sprite_set = TileSpriteSet::ALL[set];
                edge.filth_spike = spike;
                edge.filth_caps = fcaps;
                edge.filth_angles = fangles;
            }
            edge
        })
}

/// A tile of any shape with edge data on the sides that shape has.
pub fn arb_tile() -> impl Strategy<Value = Tile> {
    (
        0usize..TileShape::ALL.len(),
        0u8..8,
        prop::array::uniform4(arb_edge()),
        0usize..8,
        any::<u8>(),
        0u8..16,
    )
        .prop_map(|(shape, flags, edges, set, sprite_tile, palette)| {
            let shape = TileShape::ALL[shape];
            let mut tile = Tile::new(shape);
            tile.flags = flags;
            for side in shape.ordered_sides() {
                tile.edges[side.index()] = edges[side.index()];
            }
            tile.set_sprite((TileSpriteSet::ALL[set], sprite_tile, palette));
            tile
        })
}

/// A valid variable key.
pub fn arb_key() -> impl Strategy<Value = String> {
    "[a-zA-Z_][0-9a-zA-Z_]{0,11}"
}

/// A fixed-point number the `(32, 32)` float codec stores exactly.
pub fn arb_fixed() -> impl Strategy<Value = f64> {
    (-1_000_000i32..1_000_000, 0u32..256).prop_map(|(i, f)| f64::from(i) + f64::from(f) / 256.0)
}

fn arb_scalar() -> impl Strategy<Value = Variable> {
    prop_oneof![
        any::<bool>().prop_map(Variable::Bool),
        any::<i32>().prop_map(Variable::Int),
        any::<u32>().prop_map(Variable::UInt),
        arb_fixed().prop_map(Variable::Float),
        prop::collection::vec(any::<u8>(), 0..24).prop_map(Variable::String),
        (arb_fixed(), arb_fixed()).prop_map(|(x, y)| Variable::Vec2(x, y)),
    ]
}

fn array_of<T: std::fmt::Debug + 'static>(
    element_type: VariableType,
    element: impl Strategy<Value = T> + 'static,
    wrap: fn(T) -> Variable,
) -> BoxedStrategy<Variable> {
    prop::collection::vec(element, 0..6)
        .prop_map(move |values| {
            Variable::Array(VariableArray::from_values(
                element_type,
                values.into_iter().map(wrap).collect(),
            ))
        })
        .boxed()
}

fn arb_scalar_array() -> impl Strategy<Value = Variable> {
    prop_oneof![
        array_of(VariableType::Bool, any::<bool>(), Variable::Bool),
        array_of(VariableType::Int, any::<i32>(), Variable::Int),
        array_of(VariableType::UInt, any::<u32>(), Variable::UInt),
        array_of(VariableType::Float, arb_fixed(), Variable::Float),
        array_of(
            VariableType::String,
            prop::collection::vec(any::<u8>(), 0..12),
            Variable::String
        ),
        array_of(VariableType::Vec2, (arb_fixed(), arb_fixed()), |(x, y)| {
            Variable::Vec2(x, y)
        }),
    ]
}

/// Any variable tree: scalars, homogeneous arrays and structs nested up to
/// three levels deep.
pub fn arb_variable() -> impl Strategy<Value = Variable> {
    prop_oneof![arb_scalar(), arb_scalar_array()].prop_recursive(3, 32, 6, |inner| {
        let arb_struct = prop::collection::vec((arb_key(), inner), 0..6)
            .prop_map(|fields| Variable::Struct(fields.into_iter().collect()))
            .boxed();
        prop_oneof![
            arb_struct.clone(),
            array_of(VariableType::Struct, arb_struct, |v| v),
        ]
    })
}

/// A variable map with codec-safe keys.
pub fn arb_variable_map() -> impl Strategy<Value = VariableMap> {
    prop::collection::vec((arb_key(), arb_variable()), 0..8)
        .prop_map(|fields| fields.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_level_covers_the_format() {
        let level = sample_level();
        for shape in TileShape::ALL {
            assert!(level.tiles.values().any(|t| t.shape == shape));
        }
        assert!(level.tiles.values().any(Tile::has_filth));
        assert!(level.tiles.values().any(Tile::is_dustblock));
        assert!(level.tiles.keys().any(|&(_, x, _)| x < 0));
        assert!(level
            .entities
            .values()
            .any(|e| e.entity.kind.tag().starts_with("z_")));
        assert!(!level.backdrop.is_empty());
        assert!(!level.sshot.is_empty());
    }

    proptest! {
        #[test]
        fn arrays_are_homogeneous(var in arb_variable()) {
            if let Variable::Array(array) = &var {
                let t = array.element_type();
                prop_assert!(array.iter().all(|v| v.variable_type() == t));
            }
        }
    }
}

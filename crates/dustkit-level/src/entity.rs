//! Entities and the catalog of known entity kinds.
//!
//! An entity's persisted properties all live in its variable map; the
//! [`fields`] constants give typed access to the ones the library itself
//! touches. [`EntityKind`] tells the known kinds apart so that transforms and
//! id remapping can update the variables each kind depends on.

use std::collections::HashMap;
use std::sync::OnceLock;

use dustkit_core::{ObjectId, Transformable, TxMatrix, VariableMap};

use crate::prop::rotate_angle;

/// How an entity kind takes part in combat and filth counting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityClass {
    /// Triggers, markers, cameras and anything unknown.
    Plain,
    /// Can be hit but holds no filth (players, apples).
    Hittable,
    /// An enemy carrying filth.
    Enemy,
}

macro_rules! entity_kinds {
    ($( $variant:ident = $tag:literal, $class:ident, $filth:literal; )*) => {
        /// Every entity type the library knows about.
        ///
        /// Tags that are not in the catalog decode to [`EntityKind::Other`]
        /// and are written back unchanged.
        #[allow(missing_docs)]
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub enum EntityKind {
            $( $variant, )*
            /// A tag outside the catalog.
            Other(String),
        }

        impl EntityKind {
            fn registry() -> &'static HashMap<&'static str, EntityKind> {
                static REGISTRY: OnceLock<HashMap<&'static str, EntityKind>> = OnceLock::new();
                REGISTRY.get_or_init(|| {
                    HashMap::from([ $( ($tag, EntityKind::$variant), )* ])
                })
            }

            /// The type tag stored in level files.
            pub fn tag(&self) -> &str {
                match self {
                    $( Self::$variant => $tag, )*
                    Self::Other(tag) => tag,
                }
            }

            /// Combat class of this kind.
            pub fn class(&self) -> EntityClass {
                match self {
                    $( Self::$variant => EntityClass::$class, )*
                    Self::Other(_) => EntityClass::Plain,
                }
            }

            /// Filth this entity contributes to the level's completion total.
            pub fn filth(&self) -> u32 {
                match self {
                    $( Self::$variant => $filth, )*
                    Self::Other(_) => 0,
                }
            }
        }
    };
}

entity_kinds! {
    Emitter = "entity_emitter", Plain, 0;
    CheckPoint = "check_point", Plain, 0;
    EndZone = "level_end_prox", Plain, 0;
    Trigger = "base_trigger", Plain, 0;
    FogTrigger = "fog_trigger", Plain, 0;
    AmbienceTrigger = "ambience_trigger", Plain, 0;
    MusicTrigger = "music_trigger", Plain, 0;
    SpecialTrigger = "special_trigger", Plain, 0;
    TextTrigger = "text_trigger", Plain, 0;
    DeathZone = "kill_box", Plain, 0;
    AiController = "AI_controller", Plain, 0;
    CameraNode = "camera_node", Plain, 0;
    LevelEnd = "level_end", Plain, 0;
    ScoreBook = "score_book", Plain, 0;
    LevelDoor = "level_door", Plain, 0;
    RedKeyDoor = "giga_gate", Plain, 0;
    CustomScoreBook = "custom_score_book", Plain, 0;
    StringList = "z_string_list", Plain, 0;
    LightPrism = "enemy_tutorial_square", Enemy, 1;
    HeavyPrism = "enemy_tutorial_hexagon", Enemy, 1;
    SlimeBeast = "enemy_slime_beast", Enemy, 9;
    SlimeBarrel = "enemy_slime_barrel", Enemy, 3;
    SpringBall = "enemy_spring_ball", Enemy, 5;
    SlimeBall = "enemy_slime_ball", Enemy, 3;
    TrashTire = "enemy_trash_tire", Enemy, 3;
    TrashBeast = "enemy_trash_beast", Enemy, 9;
    TrashCan = "enemy_trash_can", Enemy, 9;
    TrashBall = "enemy_trash_ball", Enemy, 3;
    Bear = "enemy_bear", Enemy, 9;
    TotemLarge = "enemy_stoneboss", Enemy, 12;
    TotemSmall = "enemy_stonebro", Enemy, 3;
    Porcupine = "enemy_porcupine", Enemy, 1;
    Wolf = "enemy_wolf", Enemy, 5;
    Turkey = "enemy_critter", Enemy, 3;
    Flag = "enemy_flag", Enemy, 5;
    Scroll = "enemy_scrolls", Enemy, 1;
    Treasure = "enemy_treasure", Enemy, 1;
    ChestTreasure = "enemy_chest_treasure", Enemy, 9;
    ChestScrolls = "enemy_chest_scrolls", Enemy, 9;
    Butler = "enemy_butler", Enemy, 1;
    Maid = "enemy_maid", Enemy, 1;
    Knight = "enemy_knight", Enemy, 9;
    GargoyleBig = "enemy_gargoyle_big", Enemy, 5;
    GargoyleSmall = "enemy_gargoyle_small", Enemy, 3;
    Book = "enemy_book", Enemy, 3;
    Hawk = "enemy_hawk", Enemy, 3;
    Key = "enemy_key", Enemy, 1;
    Door = "enemy_door", Enemy, 0;
    Apple = "hittable_apple", Hittable, 0;
    DustMan = "dust_man", Hittable, 0;
    DustGirl = "dust_girl", Hittable, 0;
    DustKid = "dust_kid", Hittable, 0;
    DustWorth = "dust_worth", Hittable, 0;
    DustWraith = "dust_wraith", Hittable, 0;
    LeafSprite = "leaf_sprite", Hittable, 0;
    TrashKing = "trash_king", Hittable, 0;
    SlimeBoss = "slime_boss", Hittable, 0;
}

impl EntityKind {
    /// Look a tag up in the catalog, falling back to [`EntityKind::Other`].
    pub fn from_tag(tag: &str) -> Self {
        Self::registry()
            .get(tag)
            .cloned()
            .unwrap_or_else(|| Self::Other(tag.to_string()))
    }

    /// Whether the entity can be hit (players, enemies, apples).
    pub fn is_hittable(&self) -> bool {
        self.class() != EntityClass::Plain
    }

    /// Whether the entity is an enemy.
    pub fn is_enemy(&self) -> bool {
        self.class() == EntityClass::Enemy
    }
}

/// Typed views over entity variables.
pub mod fields {
    use dustkit_core::{ArrayField, Field};

    /// Relative corners of a checkpoint or end zone trigger area.
    pub const TRIGGER_AREA: ArrayField<(f64, f64)> = ArrayField::new("trigger_area");
    /// Kill box width in pixels.
    pub const KILL_BOX_WIDTH: Field<i32> = Field::new("width", 0);
    /// Kill box height in pixels.
    pub const KILL_BOX_HEIGHT: Field<i32> = Field::new("height", 0);
    /// AI controller waypoints in level coordinates.
    pub const AI_NODES: ArrayField<(f64, f64)> = ArrayField::new("nodes");
    /// Wait time at each AI controller waypoint.
    pub const AI_NODE_WAIT_TIMES: ArrayField<i32> = ArrayField::new("nodes_wait_time");
    /// Entity controlled by an AI controller.
    pub const AI_PUPPET: Field<u32> = Field::new("puppet_id", 0);
    /// Camera node type (1 normal, 2 detach, 3 connect, 4 interest, 5 force connect).
    pub const CAMERA_NODE_TYPE: Field<i32> = Field::new("node_type", 1);
    /// Connected camera nodes.
    pub const CAMERA_NODES: ArrayField<u32> = ArrayField::new("c_node_ids");
    /// Camera zoom height.
    pub const CAMERA_ZOOM: Field<i32> = Field::new("zoom_h", 1080);
    /// Camera node width.
    pub const CAMERA_WIDTH: Field<i32> = Field::new("width", 520);
    /// Entities that must be cleared before a level end flag activates.
    pub const LEVEL_END_ENTITIES: ArrayField<u32> = ArrayField::new("ent_list");
    /// Whether the end flag or end zone has been reached.
    pub const FINISHED: Field<bool> = Field::new("finished", false);
    /// Door opened by a key.
    pub const KEY_DOOR: Field<u32> = Field::new("door", 0);
    /// Last known key x-coordinate.
    pub const KEY_LAST_X: Field<f64> = Field::new("lastKnowX", 0.0);
    /// Last known key y-coordinate.
    pub const KEY_LAST_Y: Field<f64> = Field::new("lastKnowY", 0.0);
    /// Size multiplier of hittable entities.
    pub const DM_SCALE: Field<f64> = Field::new("dm_scale", 1.0);
    /// Trigger width.
    pub const TRIGGER_WIDTH: Field<i32> = Field::new("width", 500);
    /// Fog transition speed.
    pub const FOG_SPEED: Field<f64> = Field::new("speed", 5.0);
    /// Text of a text trigger.
    pub const TEXT: Field<Vec<u8>> = Field::new("text_string", Vec::new());
    /// Hide a text trigger's text.
    pub const TEXT_HIDE: Field<bool> = Field::new("hide", false);
    /// Emitter type id.
    pub const EMITTER_ID: Field<u32> = Field::new("emitter_id", 0);
    /// Emitter area width.
    pub const EMITTER_WIDTH: Field<i32> = Field::new("width", 480);
    /// Emitter area height.
    pub const EMITTER_HEIGHT: Field<i32> = Field::new("height", 480);
    /// Level a door leads to.
    pub const DOOR_FILE_NAME: Field<Vec<u8>> = Field::new("file_name", Vec::new());
    /// Keys needed to open a giga gate.
    pub const KEYS_NEEDED: Field<i32> = Field::new("key_needed", 1);
    /// Strings held by a string list.
    pub const STRING_LIST: ArrayField<Vec<u8>> = ArrayField::new("list");
}

use fields::*;

/// An entity placed in a level. Its position is owned by the level.
///
/// # Examples
///
/// ```
/// use dustkit_core::{Transformable, TxMatrix};
/// use dustkit_level::entity::{fields, Entity, EntityKind};
///
/// let mut camera = Entity::new(EntityKind::CameraNode);
/// camera.transform(&(TxMatrix::IDENTITY * 2.0));
/// assert_eq!(fields::CAMERA_ZOOM.get(&camera.variables), 2160);
/// assert_eq!(Entity::from_tag("enemy_bear").kind.filth(), 9);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    /// What kind of entity this is.
    pub kind: EntityKind,
    /// Persisted properties.
    pub variables: VariableMap,
    /// Clockwise rotation; `0x4000` is a quarter turn. Applied after flips.
    pub rotation: u16,
    /// Render layer.
    pub layer: u8,
    /// Face left instead of right.
    pub flip_x: bool,
    /// Upside down.
    pub flip_y: bool,
    /// Drawn in game.
    pub visible: bool,
}

impl Entity {
    /// A visible, unrotated entity on layer 18 with no variables.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            variables: VariableMap::new(),
            rotation: 0,
            layer: 18,
            flip_x: false,
            flip_y: false,
            visible: true,
        }
    }

    /// [`Entity::new`] for a raw type tag.
    pub fn from_tag(tag: &str) -> Self {
        Self::new(EntityKind::from_tag(tag))
    }

    /// Rewrite stored references to other entities. Ids missing from `map`
    /// become 0.
    pub fn remap_ids(&mut self, map: &HashMap<ObjectId, ObjectId>) {
        let remap = |id: u32| map.get(&ObjectId(id)).map_or(0, |new| new.0);
        let vars = &mut self.variables;
        match self.kind {
            EntityKind::AiController => AI_PUPPET.set(vars, remap(AI_PUPPET.get(vars))),
            EntityKind::CameraNode => CAMERA_NODES.update(vars, remap),
            EntityKind::LevelEnd => LEVEL_END_ENTITIES.update(vars, remap),
            EntityKind::Key => KEY_DOOR.set(vars, remap(KEY_DOOR.get(vars))),
            _ => {}
        }
    }
}

impl Transformable for Entity {
    fn transform(&mut self, mat: &TxMatrix) {
        self.rotation = rotate_angle(self.rotation, mat);
        if mat.flipped() {
            self.flip_y = !self.flip_y;
            self.rotation = self.rotation.wrapping_neg();
        }

        let vars = &mut self.variables;
        match self.kind {
            // Trigger areas are relative to the entity.
            EntityKind::CheckPoint | EntityKind::EndZone => {
                TRIGGER_AREA.update(vars, |(x, y)| mat.sample_vector(x, y));
            }
            EntityKind::DeathZone => {
                let (w, h) = mat.sample_vector(
                    f64::from(KILL_BOX_WIDTH.get(vars)),
                    f64::from(KILL_BOX_HEIGHT.get(vars)),
                );
                KILL_BOX_WIDTH.set(vars, w.abs() as i32);
                KILL_BOX_HEIGHT.set(vars, h.abs() as i32);
            }
            EntityKind::AiController => {
                AI_NODES.update(vars, |(x, y)| mat.sample(x, y));
            }
            EntityKind::CameraNode => {
                let scale = mat.scale();
                let zoom = (f64::from(CAMERA_ZOOM.get(vars)) * scale).round_ties_even();
                let width = (f64::from(CAMERA_WIDTH.get(vars)) * scale).round_ties_even();
                CAMERA_ZOOM.set(vars, zoom as i32);
                CAMERA_WIDTH.set(vars, width as i32);
            }
            EntityKind::Key => {
                let (x, y) = mat.sample(KEY_LAST_X.get(vars), KEY_LAST_Y.get(vars));
                KEY_LAST_X.set(vars, x);
                KEY_LAST_Y.set(vars, y);
            }
            _ => {}
        }

        if self.kind.is_hittable() {
            DM_SCALE.set(vars, DM_SCALE.get(vars) * mat.scale());
        }
    }
}

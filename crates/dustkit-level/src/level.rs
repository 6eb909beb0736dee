//! The in-memory level: tiles, props, entities, globals and the backdrop.

use std::collections::HashMap;
use std::mem;

use dustkit_core::{Field, ObjectId, Transformable, TxMatrix, VariableMap};
use indexmap::IndexMap;

use crate::entity::Entity;
use crate::error::LevelError;
use crate::prop::Prop;
use crate::tile::Tile;

/// `(layer, x, y)` of a tile, in tile units.
pub type TileKey = (u8, i32, i32);

/// Tiles keyed by position.
pub type TileMap = IndexMap<TileKey, Tile>;

/// Props keyed by id.
pub type PropMap = IndexMap<ObjectId, PlacedProp>;

/// A prop together with its position.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedProp {
    /// Render layer.
    pub layer: u8,
    /// X position in pixels.
    pub x: f64,
    /// Y position in pixels.
    pub y: f64,
    /// The prop itself.
    pub prop: Prop,
}

/// An entity together with its position.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedEntity {
    /// X position in pixels.
    pub x: f64,
    /// Y position in pixels.
    pub y: f64,
    /// The entity itself.
    pub entity: Entity,
}

/// Level game mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum LevelType {
    /// A regular level.
    Normal = 0,
    /// A nexus hub.
    Nexus = 1,
    /// A multiplayer nexus.
    NexusMp = 2,
    /// King of the hill.
    Koth = 3,
    /// Survival.
    Survival = 4,
    /// A dustmod level.
    Dustmod = 6,
}

impl LevelType {
    /// Decode the `level_type` variable, returning `None` for unknown values.
    pub fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::Normal,
            1 => Self::Nexus,
            2 => Self::NexusMp,
            3 => Self::Koth,
            4 => Self::Survival,
            6 => Self::Dustmod,
            _ => return None,
        })
    }
}

/// Level name.
pub const NAME: Field<Vec<u8>> = Field::new("level_name", Vec::new());
/// Play as the virtual character.
pub const VIRTUAL_CHARACTER: Field<bool> = Field::new("vector_character", false);
/// Raw level type; see [`LevelType`].
pub const LEVEL_TYPE: Field<i32> = Field::new("level_type", LevelType::Normal as i32);
/// Name of the tool that last wrote the level.
pub const DUSTMOD_VERSION: Field<Vec<u8>> = Field::new("dustmod_version", Vec::new());

/// Background tiles and props, drawn behind the level at 16× scale.
///
/// The backdrop has no entities and no globals of its own; its props draw
/// ids from the owning [`Level`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Backdrop {
    /// Tiles keyed by `(layer, x, y)` in backdrop tile units.
    pub tiles: TileMap,
    /// Props keyed by id.
    pub props: PropMap,
}

impl Backdrop {
    /// Whether the backdrop holds anything.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty() && self.props.is_empty()
    }
}

/// A Dustforce level.
///
/// Props and entities (including backdrop props) share one id space. Ids
/// below 100 are reserved, so a fresh level starts allocating at 100.
///
/// Equality compares content only, not the id allocator.
///
/// # Examples
///
/// ```
/// use dustkit_level::{Level, Tile, TileShape, TileSide};
///
/// let mut level = Level::new();
/// let mut tile = Tile::new(TileShape::Full);
/// tile.edges[TileSide::Top.index()].solid = true;
/// level.add_tile(19, 0, 0, tile);
///
/// level.rotate(1);
/// let tile = &level.tiles[&(19, -1, 0)];
/// assert!(tile.edges[TileSide::Right.index()].solid);
/// ```
#[derive(Clone, Debug)]
pub struct Level {
    /// Tiles keyed by `(layer, x, y)`.
    pub tiles: TileMap,
    /// Props keyed by id.
    pub props: PropMap,
    /// Entities keyed by id.
    pub entities: IndexMap<ObjectId, PlacedEntity>,
    /// Global level variables.
    pub variables: VariableMap,
    /// Thumbnail image (PNG).
    pub sshot: Vec<u8>,
    /// Background layer.
    pub backdrop: Backdrop,
    next_id: u32,
}

impl Default for Level {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.tiles == other.tiles
            && self.props == other.props
            && self.entities == other.entities
            && self.variables == other.variables
            && self.sshot == other.sshot
            && self.backdrop == other.backdrop
    }
}

impl Level {
    /// An empty level stamped with this library as its writer.
    pub fn new() -> Self {
        let mut level = Self::empty();
        DUSTMOD_VERSION.set(&mut level.variables, b"dustkit".to_vec());
        level
    }

    /// An empty level with no variables at all.
    pub fn empty() -> Self {
        Self {
            tiles: TileMap::new(),
            props: PropMap::new(),
            entities: IndexMap::new(),
            variables: VariableMap::new(),
            sshot: Vec::new(),
            backdrop: Backdrop::default(),
            next_id: ObjectId::FIRST.0,
        }
    }

    // ── Global variables ────────────────────────────────────────

    /// Level name.
    pub fn name(&self) -> Vec<u8> {
        NAME.get(&self.variables)
    }

    /// Set the level name.
    pub fn set_name(&mut self, name: impl Into<Vec<u8>>) {
        NAME.set(&mut self.variables, name.into());
    }

    /// Whether the virtual character is used.
    pub fn virtual_character(&self) -> bool {
        VIRTUAL_CHARACTER.get(&self.variables)
    }

    /// Level type, or `None` if the stored value is unknown.
    pub fn level_type(&self) -> Option<LevelType> {
        LevelType::from_i32(LEVEL_TYPE.get(&self.variables))
    }

    /// Set the level type.
    pub fn set_level_type(&mut self, level_type: LevelType) {
        LEVEL_TYPE.set(&mut self.variables, level_type as i32);
    }

    /// Name of the tool that last wrote the level.
    pub fn dustmod_version(&self) -> Vec<u8> {
        DUSTMOD_VERSION.get(&self.variables)
    }

    /// Start position of `player` (1 to 4) in pixels.
    pub fn start_position(&self, player: u8) -> (i32, i32) {
        let (x, y) = start_keys(player);
        (
            dustkit_core::get_field(&self.variables, &x, 0),
            dustkit_core::get_field(&self.variables, &y, 0),
        )
    }

    /// Set the start position of `player` (1 to 4).
    pub fn set_start_position(&mut self, player: u8, x: i32, y: i32) {
        let (kx, ky) = start_keys(player);
        dustkit_core::set_field(&mut self.variables, &kx, x);
        dustkit_core::set_field(&mut self.variables, &ky, y);
    }

    // ── Ids ─────────────────────────────────────────────────────

    /// The id the next allocation will return.
    pub fn next_id(&self) -> ObjectId {
        ObjectId(self.next_id)
    }

    /// Seed the allocator, as done when reading a level's metadata.
    pub fn set_next_id(&mut self, id: ObjectId) {
        self.next_id = id.0;
    }

    fn gen_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    fn note_id(&mut self, id: ObjectId) {
        self.next_id = self.next_id.max(id.0.saturating_add(1));
    }

    /// Whether a prop, entity or backdrop prop already uses `id`.
    pub fn id_in_use(&self, id: ObjectId) -> bool {
        self.props.contains_key(&id)
            || self.entities.contains_key(&id)
            || self.backdrop.props.contains_key(&id)
    }

    fn claim_id(&mut self, id: Option<ObjectId>) -> Result<ObjectId, LevelError> {
        let id = match id {
            Some(id) => id,
            None => {
                while self.id_in_use(ObjectId(self.next_id)) {
                    self.next_id = self.next_id.saturating_add(1);
                }
                ObjectId(self.next_id)
            }
        };
        if id > ObjectId::MAX {
            return Err(LevelError::IdOutOfRange { id });
        }
        if self.id_in_use(id) {
            return Err(LevelError::DuplicateId { id });
        }
        self.note_id(id);
        Ok(id)
    }

    /// Largest prop or entity id in use, never below 100.
    ///
    /// With `reset` unset the current allocator position also counts, so the
    /// result is at least one less than [`next_id`](Self::next_id).
    pub fn max_id(&self, reset: bool) -> u32 {
        let init = if reset {
            ObjectId::FIRST.0
        } else {
            self.next_id.saturating_sub(1)
        };
        let backdrop = self
            .backdrop
            .props
            .keys()
            .fold(ObjectId::FIRST.0, |mx, id| mx.max(id.0));
        self.props
            .keys()
            .chain(self.entities.keys())
            .fold(init, |mx, id| mx.max(id.0))
            .max(backdrop)
    }

    /// [`max_id`](Self::max_id), also moving the allocator just past it.
    pub fn calculate_max_id(&mut self, reset: bool) -> u32 {
        let mx = self.max_id(reset);
        self.next_id = mx + 1;
        mx
    }

    // ── Content ─────────────────────────────────────────────────

    /// Place a tile, returning the one it replaced.
    pub fn add_tile(&mut self, layer: u8, x: i32, y: i32, tile: Tile) -> Option<Tile> {
        self.tiles.insert((layer, x, y), tile)
    }

    /// Add a prop, allocating an id unless one is given.
    ///
    /// Fails if a prop, entity or backdrop prop already has the id.
    pub fn add_prop(
        &mut self,
        layer: u8,
        x: f64,
        y: f64,
        prop: Prop,
        id: Option<ObjectId>,
    ) -> Result<ObjectId, LevelError> {
        let id = self.claim_id(id)?;
        self.props.insert(id, PlacedProp { layer, x, y, prop });
        Ok(id)
    }

    /// Add an entity, allocating an id unless one is given.
    pub fn add_entity(
        &mut self,
        x: f64,
        y: f64,
        entity: Entity,
        id: Option<ObjectId>,
    ) -> Result<ObjectId, LevelError> {
        let id = self.claim_id(id)?;
        self.entities.insert(id, PlacedEntity { x, y, entity });
        Ok(id)
    }

    /// Place a backdrop tile, returning the one it replaced.
    pub fn add_backdrop_tile(&mut self, layer: u8, x: i32, y: i32, tile: Tile) -> Option<Tile> {
        self.backdrop.tiles.insert((layer, x, y), tile)
    }

    /// Add a backdrop prop. Ids come from this level's allocator.
    pub fn add_backdrop_prop(
        &mut self,
        layer: u8,
        x: f64,
        y: f64,
        prop: Prop,
        id: Option<ObjectId>,
    ) -> Result<ObjectId, LevelError> {
        let id = self.claim_id(id)?;
        self.backdrop.props.insert(id, PlacedProp { layer, x, y, prop });
        Ok(id)
    }

    /// Store a prop under `id`, dropping any earlier prop with that id.
    pub fn replace_prop(&mut self, id: ObjectId, placed: PlacedProp) {
        self.note_id(id);
        self.props.shift_remove(&id);
        self.props.insert(id, placed);
    }

    /// Store a backdrop prop under `id`, dropping any earlier one.
    pub fn replace_backdrop_prop(&mut self, id: ObjectId, placed: PlacedProp) {
        self.note_id(id);
        self.backdrop.props.shift_remove(&id);
        self.backdrop.props.insert(id, placed);
    }

    /// Store an entity under `id`, dropping any earlier entity with that id.
    pub fn replace_entity(&mut self, id: ObjectId, placed: PlacedEntity) {
        self.note_id(id);
        self.entities.shift_remove(&id);
        self.entities.insert(id, placed);
    }

    /// Renumber props, then entities, then backdrop props from `min_id`.
    ///
    /// Entity references to other entities follow the renumbering.
    pub fn remap_ids(&mut self, min_id: u32) {
        log::debug!(
            "remapping {} props and {} entities from id {min_id}",
            self.props.len() + self.backdrop.props.len(),
            self.entities.len()
        );
        self.next_id = min_id;

        let props = mem::take(&mut self.props);
        self.props = props.into_iter().map(|(_, p)| (self.gen_id(), p)).collect();

        let mut entity_map = HashMap::new();
        let entities = mem::take(&mut self.entities);
        let mut remapped = IndexMap::with_capacity(entities.len());
        for (old, placed) in entities {
            let new = self.gen_id();
            entity_map.insert(old, new);
            remapped.insert(new, placed);
        }
        for placed in remapped.values_mut() {
            placed.entity.remap_ids(&entity_map);
        }
        self.entities = remapped;

        let props = mem::take(&mut self.backdrop.props);
        self.backdrop.props = props.into_iter().map(|(_, p)| (self.gen_id(), p)).collect();
    }

    /// Copy everything from `other` into this level.
    ///
    /// With `remap_ids` set, this level's ids are first moved above every id
    /// in `other`, so nothing is overwritten. Otherwise `other` wins on
    /// collisions.
    pub fn merge(&mut self, other: &Level, remap_ids: bool) {
        if remap_ids {
            self.remap_ids(other.max_id(true) + 1);
        }
        self.tiles
            .extend(other.tiles.iter().map(|(k, t)| (*k, t.clone())));
        self.props
            .extend(other.props.iter().map(|(k, p)| (*k, p.clone())));
        self.entities
            .extend(other.entities.iter().map(|(k, e)| (*k, e.clone())));
        self.backdrop
            .tiles
            .extend(other.backdrop.tiles.iter().map(|(k, t)| (*k, t.clone())));
        self.backdrop
            .props
            .extend(other.backdrop.props.iter().map(|(k, p)| (*k, p.clone())));
        self.calculate_max_id(false);
    }

    // ── Transforms ──────────────────────────────────────────────

    /// Apply an affine transform to the whole level, backdrop included.
    ///
    /// `mat` works in pixels and should be a combination of translation,
    /// flips and quarter turns; use [`upscale`](Self::upscale) to grow a
    /// level. Tiles are 48 pixels square.
    pub fn transform(&mut self, mat: &TxMatrix) {
        transform_tiles(&mut self.tiles, mat);
        transform_props(&mut self.props, mat);

        for player in 1..=4 {
            let (x, y) = self.start_position(player);
            let (nx, ny) = mat.sample(f64::from(x), f64::from(y));
            self.set_start_position(
                player,
                nx.round_ties_even() as i32,
                ny.round_ties_even() as i32,
            );
        }

        for placed in self.entities.values_mut() {
            (placed.x, placed.y) = mat.sample(placed.x, placed.y);
            placed.entity.transform(mat);
        }

        transform_tiles(&mut self.backdrop.tiles, mat);
        transform_props(&mut self.backdrop.props, mat);
    }

    /// Mirror the level left to right.
    pub fn flip_horizontal(&mut self) {
        self.transform(&TxMatrix::HFLIP);
    }

    /// Mirror the level top to bottom.
    pub fn flip_vertical(&mut self) {
        self.transform(&TxMatrix::VFLIP);
    }

    /// Rotate clockwise by `times` quarter turns; negative turns go
    /// counter-clockwise.
    pub fn rotate(&mut self, times: i32) {
        self.transform(&TxMatrix::rotation(times));
    }

    /// Move the level by whole pixels.
    pub fn translate(&mut self, x: f64, y: f64) {
        self.transform(&TxMatrix::IDENTITY.translate(x, y));
    }

    /// Grow the level so each tile becomes a `factor`×`factor` block.
    pub fn upscale(&mut self, factor: u32) {
        self.upscale_with(factor, &TxMatrix::IDENTITY);
    }

    /// [`upscale`](Self::upscale) combined with another transform. The
    /// linear part of `mat` is scaled by `factor`; its translation is not.
    pub fn upscale_with(&mut self, factor: u32, mat: &TxMatrix) {
        let k = f64::from(factor);
        let [[a, b, c], [d, e, f]] = mat.rows();
        self.transform(&TxMatrix::new(a * k, b * k, c, d * k, e * k, f));

        let tiles = mem::take(&mut self.tiles);
        for ((layer, x, y), tile) in tiles {
            for (dx, dy, part) in tile.upscale(factor) {
                self.tiles.insert((layer, x + dx, y + dy), part);
            }
        }
    }
}

fn start_keys(player: u8) -> (String, String) {
    (format!("p{player}_x"), format!("p{player}_y"))
}

// Tile coordinates name the top-left corner, so axes that flip sign also
// shift by one tile.
fn transform_tiles(tiles: &mut TileMap, mat: &TxMatrix) {
    let [[a, b, c], [d, e, f]] = mat.rows();
    let old = mem::take(tiles);
    for ((layer, x, y), mut tile) in old {
        let (x, y) = (f64::from(x), f64::from(y));
        let nx = c / 48.0 + x * a + y * b + a.min(0.0) + b.min(0.0);
        let ny = f / 48.0 + x * d + y * e + d.min(0.0) + e.min(0.0);
        tile.transform(mat);
        tiles.insert(
            (layer, nx.round_ties_even() as i32, ny.round_ties_even() as i32),
            tile,
        );
    }
}

fn transform_props(props: &mut PropMap, mat: &TxMatrix) {
    for placed in props.values_mut() {
        (placed.x, placed.y) = mat.sample(placed.x, placed.y);
        placed.prop.transform(mat);
    }
}

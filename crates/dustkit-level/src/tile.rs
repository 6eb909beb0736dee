//! Tiles: shapes, edges, orientation changes and the packed tile format.
//!
//! A tile is a 48-pixel square cut along 45° or axis-aligned lines into one
//! of 21 [`TileShape`]s. Each of its four [`TileSide`]s carries a
//! [`TileEdge`] with collision, rendering and filth (dust or spikes) data.
//! Where the tile sits (layer, x, y) is owned by the containing level.
//!
//! # Format
//!
//! Tile data and dust data are each 12 bytes:
//!
//! ```text
//! tile data                        dust data
//! byte 0-1  solid/visible/cap bits byte 0-1  sprite set:3 spike:1 per side
//! byte 2-9  angle pair per side    byte 2-9  filth angle pair per side
//! byte 10   sprite set | palette<<4  byte 10 filth cap pair per side
//! byte 11   sprite tile            byte 11   unused
//! ```
//!
//! For the LEFT and BOTTOM sides the two corners of every directed pair are
//! stored in the opposite order.

use dustkit_core::{Transformable, TxMatrix};
use smallvec::SmallVec;

use crate::error::LevelError;

/// Sprite collection a tile or its filth is drawn from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TileSpriteSet {
    /// Unused set. On an edge this means "no filth".
    #[default]
    None0 = 0,
    /// Mansion.
    Mansion = 1,
    /// Forest.
    Forest = 2,
    /// City.
    City = 3,
    /// Laboratory.
    Laboratory = 4,
    /// Tutorial (the default).
    Tutorial = 5,
    /// Nexus.
    Nexus = 6,
    /// Unused set.
    None7 = 7,
}

impl TileSpriteSet {
    /// Every sprite set, in numeric order.
    pub const ALL: [TileSpriteSet; 8] = [
        Self::None0,
        Self::Mansion,
        Self::Forest,
        Self::City,
        Self::Laboratory,
        Self::Tutorial,
        Self::Nexus,
        Self::None7,
    ];

    /// Decode a 3-bit sprite set, returning `None` above 7.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Lowercase name used in sprite paths.
    pub fn name(self) -> &'static str {
        match self {
            Self::None0 => "none_0",
            Self::Mansion => "mansion",
            Self::Forest => "forest",
            Self::City => "city",
            Self::Laboratory => "laboratory",
            Self::Tutorial => "tutorial",
            Self::Nexus => "nexus",
            Self::None7 => "none_7",
        }
    }

    /// Sprite tile index of this set's dustblock, if it has one.
    pub fn dustblock_tile(self) -> Option<u8> {
        match self {
            Self::Mansion => Some(21),
            Self::Forest => Some(13),
            Self::City => Some(6),
            Self::Laboratory => Some(9),
            Self::Tutorial => Some(2),
            Self::None0 | Self::Nexus | Self::None7 => None,
        }
    }
}

/// One side of a tile, in the engine's own order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TileSide {
    /// Top side.
    Top = 0,
    /// Bottom side.
    Bottom = 1,
    /// Left side.
    Left = 2,
    /// Right side.
    Right = 3,
}

impl TileSide {
    /// All sides, indexed by their numeric value.
    pub const ALL: [TileSide; 4] = [Self::Top, Self::Bottom, Self::Left, Self::Right];

    /// Index into [`Tile::edges`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Position of this side when walking the tile clockwise from the top.
    pub fn clockwise_index(self) -> usize {
        match self {
            Self::Top => 0,
            Self::Right => 1,
            Self::Bottom => 2,
            Self::Left => 3,
        }
    }

    /// Sides whose directed corner pairs are stored reversed on the wire.
    fn wire_reversed(self) -> bool {
        matches!(self, Self::Left | Self::Bottom)
    }
}

/// The 21 tile shapes.
///
/// `BigN`/`SmallN` pairs are the 75% and 25% pieces of a tile cut by a
/// shallow slope; `N` steps through the eight orientations. `Big1`..`Small4`
/// are rotations of each other and `Big5`..`Small8` are their mirror images.
/// `HalfA`..`HalfD` are cut along a diagonal.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TileShape {
    #[default]
    Full = 0,
    Big1 = 1,
    Small1 = 2,
    Big2 = 3,
    Small2 = 4,
    Big3 = 5,
    Small3 = 6,
    Big4 = 7,
    Small4 = 8,
    Big5 = 9,
    Small5 = 10,
    Big6 = 11,
    Small6 = 12,
    Big7 = 13,
    Small7 = 14,
    Big8 = 15,
    Small8 = 16,
    HalfA = 17,
    HalfB = 18,
    HalfC = 19,
    HalfD = 20,
}

use TileSide::{Bottom as B, Left as L, Right as R, Top as T};

const ORDERED_SIDES: [&[TileSide]; 21] = [
    &[T, R, B, L],
    &[T, B, L],
    &[T, B],
    &[R, L, T],
    &[R, L],
    &[B, T, R],
    &[B, T],
    &[L, R, B],
    &[L, R],
    &[T, B, R],
    &[T, B],
    &[L, R, T],
    &[L, R],
    &[B, T, L],
    &[B, T],
    &[R, L, B],
    &[R, L],
    &[T, B, L],
    &[B, L, T],
    &[B, T, R],
    &[T, R, B],
];

// Top-left, top-right, bottom-right, bottom-left in half-tile units. A
// repeated vertex collapses the side between them.
const VERTICES: [[(i32, i32); 4]; 21] = [
    [(0, 0), (2, 0), (2, 2), (0, 2)],
    [(0, 0), (2, 1), (2, 2), (0, 2)],
    [(0, 1), (2, 2), (2, 2), (0, 2)],
    [(0, 0), (2, 0), (1, 2), (0, 2)],
    [(0, 0), (1, 0), (0, 2), (0, 2)],
    [(0, 0), (2, 0), (2, 2), (0, 1)],
    [(0, 0), (2, 0), (2, 1), (0, 0)],
    [(1, 0), (2, 0), (2, 2), (0, 2)],
    [(2, 0), (2, 0), (2, 2), (1, 2)],
    [(0, 1), (2, 0), (2, 2), (0, 2)],
    [(0, 2), (2, 1), (2, 2), (0, 2)],
    [(0, 0), (2, 0), (2, 2), (1, 2)],
    [(1, 0), (2, 0), (2, 2), (2, 2)],
    [(0, 0), (2, 0), (2, 1), (0, 2)],
    [(0, 0), (2, 0), (2, 0), (0, 1)],
    [(0, 0), (1, 0), (2, 2), (0, 2)],
    [(0, 0), (0, 0), (1, 2), (0, 2)],
    [(0, 0), (2, 2), (2, 2), (0, 2)],
    [(0, 0), (2, 0), (2, 0), (0, 2)],
    [(0, 0), (2, 0), (2, 2), (0, 0)],
    [(0, 2), (2, 0), (2, 2), (0, 2)],
];

impl TileShape {
    /// Every shape, in numeric order.
    pub const ALL: [TileShape; 21] = [
        Self::Full,
        Self::Big1,
        Self::Small1,
        Self::Big2,
        Self::Small2,
        Self::Big3,
        Self::Small3,
        Self::Big4,
        Self::Small4,
        Self::Big5,
        Self::Small5,
        Self::Big6,
        Self::Small6,
        Self::Big7,
        Self::Small7,
        Self::Big8,
        Self::Small8,
        Self::HalfA,
        Self::HalfB,
        Self::HalfC,
        Self::HalfD,
    ];

    /// Decode a shape byte, returning `None` above 20.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// The sides this shape has, starting from the cut edge.
    ///
    /// Half tiles and small slopes list their sides clockwise. Big slopes
    /// list the cut edge, the opposite side, then the side small slopes lack;
    /// this is clockwise for `Big1`..`Big4` and counter-clockwise for the
    /// mirrored `Big5`..`Big8`. `Full` lists all four clockwise from the top.
    pub fn ordered_sides(self) -> &'static [TileSide] {
        ORDERED_SIDES[self as usize]
    }

    /// Corner coordinates in half-tile units, clockwise from the top-left.
    pub fn vertices(self) -> [(i32, i32); 4] {
        VERTICES[self as usize]
    }

    /// Whether this is one of the 16 slope pieces.
    pub fn is_slope(self) -> bool {
        (1..=16).contains(&(self as u8))
    }

    /// Whether this is one of the four diagonal halves.
    pub fn is_half(self) -> bool {
        self as u8 >= 17
    }

    fn nth(index: u8) -> Self {
        Self::ALL[index as usize]
    }
}

/// Per-edge data.
///
/// Directed pairs (`caps`, `angles` and their filth counterparts) are
/// ordered clockwise around the tile: walking from the first corner to the
/// second keeps the tile on your right.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TileEdge {
    /// Whether the edge collides.
    pub solid: bool,
    /// Whether the edge is drawn.
    pub visible: bool,
    /// Draw an end cap at each corner.
    pub caps: [bool; 2],
    /// Join angle at each corner in degrees, ignored where a cap is set.
    pub angles: [i8; 2],
    /// Sprite set of the filth on this edge; `None0` means no filth.
    pub filth_sprite_set: TileSpriteSet,
    /// Spikes instead of dust.
    pub filth_spike: bool,
    /// Filth end caps.
    pub filth_caps: [bool; 2],
    /// Filth join angles.
    pub filth_angles: [i8; 2],
}

impl TileEdge {
    /// Whether any filth is attached.
    pub fn has_filth(&self) -> bool {
        self.filth_sprite_set != TileSpriteSet::None0
    }

    // A mirror turns clockwise pairs into counter-clockwise ones.
    fn mirror(&mut self) {
        self.caps.reverse();
        self.filth_caps.reverse();
        self.angles = [self.angles[1].wrapping_neg(), self.angles[0].wrapping_neg()];
        self.filth_angles = [
            self.filth_angles[1].wrapping_neg(),
            self.filth_angles[0].wrapping_neg(),
        ];
    }

    fn clear_corner(&mut self, corner: usize) {
        self.caps[corner] = false;
        self.angles[corner] = 0;
        self.filth_caps[corner] = false;
        self.filth_angles[corner] = 0;
    }
}

/// A single tile.
///
/// # Examples
///
/// ```
/// use dustkit_core::{Transformable, TxMatrix};
/// use dustkit_level::{Tile, TileShape, TileSide};
///
/// let mut tile = Tile::new(TileShape::Big1);
/// tile.edges[TileSide::Top.index()].solid = true;
/// tile.transform(&TxMatrix::ROTATE[1]);
/// assert_eq!(tile.shape, TileShape::Big2);
/// assert!(tile.edges[TileSide::Right.index()].solid);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tile {
    /// Shape of the tile.
    pub shape: TileShape,
    /// Raw 3-bit engine flags. In practice always `0x4` (solid).
    pub flags: u8,
    /// Edge data indexed by [`TileSide::index`], present for every shape.
    pub edges: [TileEdge; 4],
    /// Sprite set the tile is drawn from.
    pub sprite_set: TileSpriteSet,
    /// Sprite index within the set.
    pub sprite_tile: u8,
    /// Colour variant, `0..=15`.
    pub sprite_palette: u8,
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            shape: TileShape::Full,
            flags: 0x4,
            edges: [TileEdge::default(); 4],
            sprite_set: TileSpriteSet::Tutorial,
            sprite_tile: 1,
            sprite_palette: 0,
        }
    }
}

impl Tile {
    /// A default tile of the given shape with empty edges.
    pub fn new(shape: TileShape) -> Self {
        Self {
            shape,
            ..Self::default()
        }
    }

    /// Decode a tile from its shape, flags and 12-byte tile data.
    pub fn from_packed(shape: TileShape, flags: u8, data: &[u8; 12]) -> Result<Self, LevelError> {
        let mut tile = Self {
            shape,
            flags,
            ..Self::default()
        };
        tile.unpack_tile_data(data)?;
        Ok(tile)
    }

    /// `(sprite_set, sprite_tile, sprite_palette)`.
    pub fn sprite(&self) -> (TileSpriteSet, u8, u8) {
        (self.sprite_set, self.sprite_tile, self.sprite_palette)
    }

    /// Set all three sprite fields at once.
    pub fn set_sprite(&mut self, (set, tile, palette): (TileSpriteSet, u8, u8)) {
        self.sprite_set = set;
        self.sprite_tile = tile;
        self.sprite_palette = palette;
    }

    /// Path of the tile's sprite within the extracted game sprites.
    pub fn sprite_path(&self) -> String {
        format!(
            "area/{}/tiles/tile{}_{}_0001.png",
            self.sprite_set.name(),
            self.sprite_tile,
            u16::from(self.sprite_palette) + 1
        )
    }

    /// Whether any edge carries filth.
    pub fn has_filth(&self) -> bool {
        self.edges.iter().any(TileEdge::has_filth)
    }

    /// Whether the sprite is the dustblock of its sprite set.
    pub fn is_dustblock(&self) -> bool {
        self.sprite_set.dustblock_tile() == Some(self.sprite_tile)
    }

    /// Turn the tile into the dustblock of its current sprite set.
    pub fn set_dustblock(&mut self) -> Result<(), LevelError> {
        let tile = self
            .sprite_set
            .dustblock_tile()
            .ok_or(LevelError::NoDustblock {
                sprite_set: self.sprite_set,
            })?;
        self.sprite_tile = tile;
        self.sprite_palette = 1;
        Ok(())
    }

    // ── Orientation ─────────────────────────────────────────────

    fn mirror_structure(&mut self) {
        let shape = self.shape as u8;
        match self.shape {
            TileShape::Full => self.edges.swap(L.index(), R.index()),
            s if s.is_slope() => {
                // The ordered side lists already map mirrored sides onto
                // each other, so only the shape changes.
                self.shape = TileShape::nth(1 + ((shape - 1) ^ 8) % 16);
            }
            s => {
                let sides = s.ordered_sides();
                self.edges.swap(sides[1].index(), sides[2].index());
                self.shape = TileShape::nth(17 + ((shape - 17) ^ 3));
            }
        }
        for edge in &mut self.edges {
            edge.mirror();
        }
    }

    fn rotated_shape(shape: TileShape, steps: u8) -> TileShape {
        let s = shape as u8;
        match s {
            0 => TileShape::Full,
            1..=8 => TileShape::nth(1 + ((s - 1) + steps * 2) % 8),
            9..=16 => TileShape::nth(9 + ((s - 9) + 8 - steps * 2) % 8),
            _ => TileShape::nth(17 + ((s - 17) + steps) % 4),
        }
    }

    // ── Upscaling ───────────────────────────────────────────────

    /// Expand into a `factor`×`factor` block of tiles with the same outline.
    ///
    /// Returns `(dx, dy, tile)` with offsets inside the block. Sub-tiles only
    /// inherit edges that lie on the outline, and corner data is cleared
    /// wherever a corner no longer touches the block boundary. A factor of
    /// zero yields nothing.
    pub fn upscale(&self, factor: u32) -> Vec<(i32, i32, Tile)> {
        let Ok(f) = i32::try_from(factor) else {
            return Vec::new();
        };
        match f {
            0 => Vec::new(),
            1 => vec![(0, 0, self.clone())],
            _ => match self.shape {
                TileShape::Full => self.upscale_full(f),
                TileShape::Big1 | TileShape::Small1 => self.upscale_slope(f),
                TileShape::HalfA => self.upscale_half(f),
                _ => self.upscale_reoriented(f),
            },
        }
    }

    fn blank_like(&self) -> Tile {
        let mut tile = Tile::new(TileShape::Full);
        tile.set_sprite(self.sprite());
        tile
    }

    fn copy_side(&self, f: i32, dx: i32, dy: i32, tile: &mut Tile, side: TileSide) {
        let mut edge = self.edges[side.index()];
        let cw = side.clockwise_index();
        let verts = tile.shape.vertices();
        for corner in 0..2 {
            let a = verts[(cw + 1 - corner) & 3];
            let b = verts[(cw + corner) & 3];
            let x = 2 * dx + b.0;
            let y = 2 * dy + b.1;
            if a.0 != b.0 && (x == 0 || x == 2 * f) {
                continue;
            }
            if a.1 != b.1 && (y == 0 || y == 2 * f) {
                continue;
            }
            edge.clear_corner(corner);
        }
        tile.edges[side.index()] = edge;
    }

    fn upscale_full(&self, f: i32) -> Vec<(i32, i32, Tile)> {
        let mut out = Vec::with_capacity((f * f) as usize);
        for dx in 0..f {
            for dy in 0..f {
                let mut tile = self.blank_like();
                if dx == 0 {
                    self.copy_side(f, dx, dy, &mut tile, L);
                }
                if dx + 1 == f {
                    self.copy_side(f, dx, dy, &mut tile, R);
                }
                if dy == 0 {
                    self.copy_side(f, dx, dy, &mut tile, T);
                }
                if dy + 1 == f {
                    self.copy_side(f, dx, dy, &mut tile, B);
                }
                out.push((dx, dy, tile));
            }
        }
        out
    }

    fn upscale_slope(&self, f: i32) -> Vec<(i32, i32, Tile)> {
        let mut out = Vec::new();
        let shift = if self.shape == TileShape::Small1 { f } else { 0 };
        for dx in 0..f {
            let ddx = dx + shift;
            for dy in ddx / 2..f {
                let mut tile = self.blank_like();
                if dy == ddx / 2 {
                    tile.shape = if ddx % 2 == 1 {
                        TileShape::Small1
                    } else {
                        TileShape::Big1
                    };
                    self.copy_side(f, dx, dy, &mut tile, T);
                }
                if dx == 0 {
                    self.copy_side(f, dx, dy, &mut tile, L);
                }
                if dy + 1 == f {
                    self.copy_side(f, dx, dy, &mut tile, B);
                }
                out.push((dx, dy, tile));
            }
        }
        out
    }

    fn upscale_half(&self, f: i32) -> Vec<(i32, i32, Tile)> {
        let mut out = Vec::new();
        for dx in 0..f {
            for dy in dx..f {
                let mut tile = self.blank_like();
                if dx == dy {
                    tile.shape = TileShape::HalfA;
                    self.copy_side(f, dx, dy, &mut tile, T);
                }
                if dx == 0 {
                    self.copy_side(f, dx, dy, &mut tile, L);
                }
                if dy + 1 == f {
                    self.copy_side(f, dx, dy, &mut tile, B);
                }
                out.push((dx, dy, tile));
            }
        }
        out
    }

    // Turn the tile into Big1/Small1/HalfA, upscale that, then turn every
    // piece back.
    fn upscale_reoriented(&self, f: i32) -> Vec<(i32, i32, Tile)> {
        let mut shape = self.shape as u8;
        let hflip = (9..=16).contains(&shape);
        if hflip {
            shape -= 8;
        }
        let rots = if shape <= 8 {
            i32::from((shape - 1) / 2)
        } else {
            i32::from(shape - 17)
        };

        let mut mat = TxMatrix::rotation(-rots);
        let mut imat = TxMatrix::rotation(rots);
        if hflip {
            mat = mat * TxMatrix::HFLIP;
            imat = TxMatrix::HFLIP * imat;
        }
        let corner = f64::from(f - 1);
        let shift = |m: TxMatrix| {
            let (x, y) = m.sample(corner, corner);
            m.translate((-x).max(0.0), (-y).max(0.0))
        };
        let mat = shift(mat);
        let imat = shift(imat);

        let mut canonical = self.clone();
        canonical.transform(&mat);
        debug_assert!(matches!(
            canonical.shape,
            TileShape::Big1 | TileShape::Small1 | TileShape::HalfA
        ));

        canonical
            .upscale(f as u32)
            .into_iter()
            .map(|(dx, dy, mut tile)| {
                tile.transform(&imat);
                let (tx, ty) = imat.sample(f64::from(dx), f64::from(dy));
                (tx as i32, ty as i32, tile)
            })
            .collect()
    }

    // ── Packing ─────────────────────────────────────────────────

    /// Encode edges and sprite into the 12-byte tile data block.
    ///
    /// # Panics
    ///
    /// Panics if `sprite_palette` does not fit in 4 bits.
    pub fn pack_tile_data(&self) -> [u8; 12] {
        assert!(
            self.sprite_palette <= 0xF,
            "sprite palette {} does not fit in 4 bits",
            self.sprite_palette
        );
        let mut data = [0u8; 12];
        for (side, edge) in TileSide::ALL.into_iter().zip(&self.edges) {
            let s = side.index();
            let mut offsets = [s, 4 + s, 8 + 2 * s, 9 + 2 * s];
            let mut angles = edge.angles;
            if side.wire_reversed() {
                offsets.swap(2, 3);
                angles.swap(0, 1);
            }
            let bits = [edge.solid, edge.visible, edge.caps[0], edge.caps[1]];
            for (set, off) in bits.into_iter().zip(offsets) {
                if set {
                    data[off >> 3] |= 1 << (off & 7);
                }
            }
            data[2 + 2 * s] = angles[0] as u8;
            data[3 + 2 * s] = angles[1] as u8;
        }
        data[10] = self.sprite_set as u8 | (self.sprite_palette << 4);
        data[11] = self.sprite_tile;
        data
    }

    /// Decode the 12-byte tile data block into edges and sprite.
    ///
    /// Filth fields are left untouched.
    pub fn unpack_tile_data(&mut self, data: &[u8; 12]) -> Result<(), LevelError> {
        let bit = |off: usize| data[off >> 3] & (1 << (off & 7)) != 0;
        for (side, edge) in TileSide::ALL.into_iter().zip(self.edges.iter_mut()) {
            let s = side.index();
            edge.solid = bit(s);
            edge.visible = bit(4 + s);
            edge.caps = [bit(8 + 2 * s), bit(9 + 2 * s)];
            edge.angles = [data[2 + 2 * s] as i8, data[3 + 2 * s] as i8];
            if side.wire_reversed() {
                edge.caps.reverse();
                edge.angles.reverse();
            }
        }
        let set = data[10] & 0xF;
        self.sprite_set =
            TileSpriteSet::from_u8(set).ok_or(LevelError::InvalidSpriteSet { value: set })?;
        self.sprite_palette = data[10] >> 4;
        self.sprite_tile = data[11];
        Ok(())
    }

    /// Encode edge filth into the 12-byte dust data block.
    pub fn pack_dust_data(&self) -> [u8; 12] {
        let mut data = [0u8; 12];
        for (side, edge) in TileSide::ALL.into_iter().zip(&self.edges) {
            let s = side.index();
            let mut caps = edge.filth_caps;
            let mut angles = edge.filth_angles;
            if side.wire_reversed() {
                caps.reverse();
                angles.reverse();
            }
            let off = 4 * s;
            let nibble = edge.filth_sprite_set as u8 | if edge.filth_spike { 0x8 } else { 0 };
            data[off >> 3] |= nibble << (off & 7);
            data[2 + 2 * s] = angles[0] as u8;
            data[3 + 2 * s] = angles[1] as u8;
            if caps[0] {
                data[10] |= 1 << (2 * s);
            }
            if caps[1] {
                data[10] |= 2 << (2 * s);
            }
        }
        data
    }

    /// Decode the 12-byte dust data block into edge filth.
    pub fn unpack_dust_data(&mut self, data: &[u8; 12]) {
        for (side, edge) in TileSide::ALL.into_iter().zip(self.edges.iter_mut()) {
            let s = side.index();
            let off = 4 * s;
            let nibble = data[off >> 3] >> (off & 7);
            edge.filth_sprite_set = TileSpriteSet::ALL[(nibble & 0x7) as usize];
            edge.filth_spike = nibble & 0x8 != 0;
            let caps = data[10] >> (2 * s);
            edge.filth_caps = [caps & 0x1 != 0, caps & 0x2 != 0];
            edge.filth_angles = [data[2 + 2 * s] as i8, data[3 + 2 * s] as i8];
            if side.wire_reversed() {
                edge.filth_caps.reverse();
                edge.filth_angles.reverse();
            }
        }
    }
}

impl Transformable for Tile {
    /// Apply the flip and quarter-turn part of `mat`. Scale and translation
    /// are ignored; use [`Tile::upscale`] to grow a tile.
    fn transform(&mut self, mat: &TxMatrix) {
        let original = self.shape;
        if mat.flipped() {
            self.mirror_structure();
        }

        let steps = mat.quarter_turns() as u8;
        self.shape = Self::rotated_shape(self.shape, steps);

        let snapshot: SmallVec<[TileEdge; 4]> = original
            .ordered_sides()
            .iter()
            .map(|side| self.edges[side.index()])
            .collect();
        let mut edges = [TileEdge::default(); 4];
        for (i, side) in self.shape.ordered_sides().iter().enumerate() {
            let src = if self.shape == TileShape::Full {
                (i + 4 - steps as usize) & 3
            } else {
                i
            };
            edges[side.index()] = snapshot[src];
        }
        self.edges = edges;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn symmetries() -> Vec<TxMatrix> {
        let mut out = Vec::new();
        for r in TxMatrix::ROTATE {
            out.push(r);
            out.push(r * TxMatrix::HFLIP);
        }
        out
    }

    fn arb_edge() -> impl Strategy<Value = TileEdge> {
        (
            any::<(bool, bool, [bool; 2], [i8; 2])>(),
            0u8..8,
            any::<(bool, [bool; 2], [i8; 2])>(),
        )
            .prop_map(|((solid, visible, caps, angles), set, (spike, fcaps, fangles))| {
                TileEdge {
                    solid,
                    visible,
                    caps,
                    angles,
                    filth_sprite_set: TileSpriteSet::ALL[set as usize],
                    filth_spike: spike,
                    filth_caps: fcaps,
                    filth_angles: fangles,
                }
            })
    }

    fn arb_shaped_tile() -> impl Strategy<Value = Tile> {
        (0u8..21, prop::array::uniform4(arb_edge())).prop_map(|(shape, edges)| {
            let shape = TileShape::ALL[shape as usize];
            let mut tile = Tile::new(shape);
            for side in shape.ordered_sides() {
                tile.edges[side.index()] = edges[side.index()];
            }
            tile
        })
    }

    #[test]
    fn default_tile() {
        let tile = Tile::default();
        assert_eq!(tile.shape, TileShape::Full);
        assert_eq!(tile.flags, 0x4);
        assert_eq!(tile.sprite(), (TileSpriteSet::Tutorial, 1, 0));
        assert!(!tile.has_filth());
        assert_eq!(tile.sprite_path(), "area/tutorial/tiles/tile1_1_0001.png");
    }

    #[test]
    fn dustblock() {
        let mut tile = Tile::default();
        assert!(!tile.is_dustblock());
        tile.set_dustblock().unwrap();
        assert_eq!((tile.sprite_tile, tile.sprite_palette), (2, 1));
        assert!(tile.is_dustblock());

        tile.sprite_set = TileSpriteSet::Nexus;
        assert_eq!(
            tile.set_dustblock(),
            Err(LevelError::NoDustblock {
                sprite_set: TileSpriteSet::Nexus
            })
        );
    }

    #[test]
    fn left_and_bottom_corners_are_swapped_on_the_wire() {
        let mut tile = Tile::default();
        tile.edges[L.index()].caps = [true, false];
        tile.edges[L.index()].angles = [10, -20];
        tile.edges[T.index()].caps = [true, false];
        let data = tile.pack_tile_data();
        // Left side, first corner at bit 9 + 2*2 = 13.
        assert_eq!(data[1] & (1 << 5), 1 << 5);
        // Top side, first corner at bit 8.
        assert_eq!(data[1] & 1, 1);
        assert_eq!(data[6] as i8, -20);
        assert_eq!(data[7] as i8, 10);
        assert_eq!(data[10], 5);
        assert_eq!(data[11], 1);
    }

    #[test]
    fn dust_layout() {
        let mut tile = Tile::default();
        let edge = &mut tile.edges[R.index()];
        edge.filth_sprite_set = TileSpriteSet::Forest;
        edge.filth_spike = true;
        edge.filth_caps = [false, true];
        let data = tile.pack_dust_data();
        assert_eq!(data[1], 0xA0);
        assert_eq!(data[10], 0x80);

        let mut back = Tile::default();
        back.unpack_dust_data(&data);
        assert_eq!(back, tile);
    }

    #[test]
    fn invalid_sprite_set_rejected() {
        let mut data = [0u8; 12];
        data[10] = 0x0B;
        assert_eq!(
            Tile::from_packed(TileShape::Full, 4, &data),
            Err(LevelError::InvalidSpriteSet { value: 11 })
        );
    }

    #[test]
    fn rotation_moves_edges_clockwise() {
        let mut tile = Tile::default();
        tile.edges[T.index()].solid = true;
        tile.transform(&TxMatrix::ROTATE[1]);
        assert_eq!(tile.shape, TileShape::Full);
        let solid: Vec<bool> = tile.edges.iter().map(|e| e.solid).collect();
        assert_eq!(solid, vec![false, false, false, true]);
    }

    #[test]
    fn flip_mirrors_shapes() {
        let mut tile = Tile::new(TileShape::Big1);
        tile.transform(&TxMatrix::HFLIP);
        assert_eq!(tile.shape, TileShape::Big5);
        let mut tile = Tile::new(TileShape::HalfA);
        tile.transform(&TxMatrix::HFLIP);
        assert_eq!(tile.shape, TileShape::HalfD);
        let mut tile = Tile::new(TileShape::HalfA);
        tile.transform(&TxMatrix::ROTATE[2]);
        assert_eq!(tile.shape, TileShape::HalfC);
    }

    #[test]
    fn full_upscale_keeps_only_outline() {
        let mut tile = Tile::default();
        for edge in &mut tile.edges {
            edge.solid = true;
            edge.visible = true;
            edge.caps = [true, true];
            edge.angles = [5, -5];
        }
        let parts = tile.upscale(3);
        assert_eq!(parts.len(), 9);
        for (dx, dy, part) in &parts {
            assert_eq!(part.shape, TileShape::Full);
            assert_eq!(part.edges[L.index()].solid, *dx == 0);
            assert_eq!(part.edges[R.index()].solid, *dx == 2);
            assert_eq!(part.edges[T.index()].solid, *dy == 0);
            assert_eq!(part.edges[B.index()].solid, *dy == 2);
        }
        let (_, _, middle) = &parts[4];
        assert_eq!(middle.edges, [TileEdge::default(); 4]);

        // Top-left piece keeps the cap at the outer corner only.
        let (_, _, corner) = &parts[0];
        assert_eq!(corner.edges[T.index()].caps, [true, false]);
        assert_eq!(corner.edges[T.index()].angles, [5, 0]);
        assert_eq!(corner.edges[L.index()].caps, [false, true]);
    }

    #[test]
    fn slope_upscale_staircase() {
        let shapes = |tile: Tile| {
            let mut parts: Vec<(i32, i32, TileShape)> = tile
                .upscale(2)
                .into_iter()
                .map(|(x, y, t)| (x, y, t.shape))
                .collect();
            parts.sort();
            parts
        };
        assert_eq!(
            shapes(Tile::new(TileShape::Big1)),
            vec![
                (0, 0, TileShape::Big1),
                (0, 1, TileShape::Full),
                (1, 0, TileShape::Small1),
                (1, 1, TileShape::Full),
            ]
        );
        assert_eq!(
            shapes(Tile::new(TileShape::Small1)),
            vec![(0, 1, TileShape::Big1), (1, 1, TileShape::Small1)]
        );
    }

    #[test]
    fn trivial_factors() {
        let tile = Tile::new(TileShape::Big3);
        assert!(tile.upscale(0).is_empty());
        assert_eq!(tile.upscale(1), vec![(0, 0, tile.clone())]);
    }

    proptest! {
        #[test]
        fn transform_then_inverse_is_identity(tile in arb_shaped_tile(), which in 0usize..8) {
            let mat = symmetries()[which];
            let mut moved = tile.clone();
            moved.transform(&mat);
            moved.transform(&mat.inverse().unwrap());
            prop_assert_eq!(moved, tile);
        }

        #[test]
        fn tile_data_roundtrips(tile in arb_shaped_tile(), set in 0u8..8, sprite in any::<u8>(), palette in 0u8..16) {
            let mut tile = tile;
            tile.set_sprite((TileSpriteSet::ALL[set as usize], sprite, palette));
            let mut back = Tile::from_packed(tile.shape, tile.flags, &tile.pack_tile_data()).unwrap();
            back.unpack_dust_data(&tile.pack_dust_data());
            prop_assert_eq!(back, tile);
        }

        #[test]
        fn upscale_stays_inside_block(shape in 0u8..21, factor in 2u32..5) {
            let tile = Tile::new(TileShape::ALL[shape as usize]);
            let f = factor as i32;
            let mut seen = HashSet::new();
            for (dx, dy, _) in tile.upscale(factor) {
                prop_assert!((0..f).contains(&dx) && (0..f).contains(&dy));
                prop_assert!(seen.insert((dx, dy)));
            }
        }
    }
}

//! Affine transforms for level geometry.
//!
//! [`TxMatrix`] holds the top two rows of a 3×3 affine matrix
//! `[[a, b, c], [d, e, f], [0, 0, 1]]`, mapping `(x, y)` to
//! `(a·x + b·y + c, d·x + e·y + f)`. Everything spatial in a level
//! (tiles, props, entities, backdrop) is moved by one of these.

use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::{Index, Mul};

/// Anything that can be moved by an affine transform.
///
/// Implementations update orientation data (rotations, flips, shapes,
/// positional variables). Where the object itself lives is owned by its
/// container and transformed there.
pub trait Transformable {
    /// Apply `mat` to this object.
    fn transform(&mut self, mat: &TxMatrix);
}

/// An immutable 2D affine transform.
///
/// # Examples
///
/// ```
/// use dustkit_core::TxMatrix;
///
/// let m = TxMatrix::ROTATE[1].translate(10.0, 0.0);
/// assert_eq!(m.sample(1.0, 0.0), (10.0, 1.0));
/// assert!(!m.flipped());
/// assert_eq!((TxMatrix::HFLIP * TxMatrix::HFLIP), TxMatrix::IDENTITY);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TxMatrix {
    rows: [[f64; 3]; 2],
}

impl TxMatrix {
    /// The identity transform.
    pub const IDENTITY: TxMatrix = TxMatrix::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);
    /// Mirror across the vertical axis (`x → -x`).
    pub const HFLIP: TxMatrix = TxMatrix::new(-1.0, 0.0, 0.0, 0.0, 1.0, 0.0);
    /// Mirror across the horizontal axis (`y → -y`).
    pub const VFLIP: TxMatrix = TxMatrix::new(1.0, 0.0, 0.0, 0.0, -1.0, 0.0);
    /// Clockwise rotations by `i` quarter turns (y axis points down).
    pub const ROTATE: [TxMatrix; 4] = [
        TxMatrix::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0),
        TxMatrix::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0),
        TxMatrix::new(-1.0, 0.0, 0.0, 0.0, -1.0, 0.0),
        TxMatrix::new(0.0, 1.0, 0.0, -1.0, 0.0, 0.0),
    ];

    /// Build a matrix from its six free coefficients.
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self {
            rows: [[a, b, c], [d, e, f]],
        }
    }

    /// Build a matrix from its top two rows.
    pub const fn from_rows(rows: [[f64; 3]; 2]) -> Self {
        Self { rows }
    }

    /// The top two rows.
    pub const fn rows(&self) -> [[f64; 3]; 2] {
        self.rows
    }

    /// Quarter-turn rotation by `times` steps clockwise (any sign).
    pub fn rotation(times: i32) -> Self {
        Self::ROTATE[times.rem_euclid(4) as usize]
    }

    /// Map a point, including translation.
    pub fn sample(&self, x: f64, y: f64) -> (f64, f64) {
        let [[a, b, c], [d, e, f]] = self.rows;
        (a * x + b * y + c, d * x + e * y + f)
    }

    /// Map a direction or extent, ignoring translation.
    pub fn sample_vector(&self, x: f64, y: f64) -> (f64, f64) {
        let [[a, b, _], [d, e, _]] = self.rows;
        (a * x + b * y, d * x + e * y)
    }

    /// This transform followed by a translation.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        let mut rows = self.rows;
        rows[0][2] += dx;
        rows[1][2] += dy;
        Self { rows }
    }

    /// Clockwise rotation, in radians, applied to a vertical line.
    pub fn angle(&self) -> f64 {
        self.rows[1][1].atan2(self.rows[1][0]) - FRAC_PI_2
    }

    /// `a·e - b·d`.
    pub fn determinant(&self) -> f64 {
        self.rows[0][0] * self.rows[1][1] - self.rows[0][1] * self.rows[1][0]
    }

    /// Whether the transform mirrors orientation.
    pub fn flipped(&self) -> bool {
        self.determinant() < 0.0
    }

    /// Uniform scale factor, `sqrt(|det|)`.
    pub fn scale(&self) -> f64 {
        self.determinant().abs().sqrt()
    }

    /// The inverse transform, or `None` when the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 {
            return None;
        }
        let [[a, b, c], [d, e, f]] = self.rows;
        let ia = e / det;
        let ib = -b / det;
        let id = -d / det;
        let ie = a / det;
        Some(Self::new(
            ia,
            ib,
            -(ia * c + ib * f),
            id,
            ie,
            -(id * c + ie * f),
        ))
    }

    /// Quarter-turn count equivalent to this transform's rotation after any
    /// flip has been factored out (`0..4`, clockwise).
    pub fn quarter_turns(&self) -> i64 {
        let sign = if self.flipped() { -1.0 } else { 1.0 };
        let angle = (self.rows[1][1].atan2(sign * self.rows[1][0]) / PI * 2.0).round_ties_even();
        (-(angle as i64) + 1) & 3
    }
}

impl Default for TxMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Index<usize> for TxMatrix {
    type Output = [f64; 3];

    fn index(&self, row: usize) -> &[f64; 3] {
        &self.rows[row]
    }
}

/// Composition: `(l * r).sample(p) == l.sample(r.sample(p))`.
impl Mul for TxMatrix {
    type Output = TxMatrix;

    fn mul(self, rhs: TxMatrix) -> TxMatrix {
        let l = self.rows;
        let r = rhs.rows;
        let mut out = [[0.0; 3]; 2];
        for (i, row) in out.iter_mut().enumerate() {
            row[0] = l[i][0] * r[0][0] + l[i][1] * r[1][0];
            row[1] = l[i][0] * r[0][1] + l[i][1] * r[1][1];
            row[2] = l[i][0] * r[0][2] + l[i][1] * r[1][2] + l[i][2];
        }
        TxMatrix { rows: out }
    }
}

/// Scales every coefficient, translation included.
impl Mul<f64> for TxMatrix {
    type Output = TxMatrix;

    fn mul(self, k: f64) -> TxMatrix {
        let mut rows = self.rows;
        for v in rows.iter_mut().flatten() {
            *v *= k;
        }
        TxMatrix { rows }
    }
}

impl Mul<TxMatrix> for f64 {
    type Output = TxMatrix;

    fn mul(self, m: TxMatrix) -> TxMatrix {
        m * self
    }
}

//! Static decoration props.

use std::f64::consts::PI;

use dustkit_core::{Transformable, TxMatrix};

/// A prop placed in a level. Its layer and position are owned by the level.
#[derive(Clone, Debug, PartialEq)]
pub struct Prop {
    /// Draw order within the layer.
    pub layer_sub: u8,
    /// Clockwise rotation; `0x4000` is a quarter turn. Applied after flips.
    pub rotation: u16,
    /// Mirror horizontally.
    pub flip_x: bool,
    /// Mirror vertically.
    pub flip_y: bool,
    /// Uniform scale factor.
    pub scale: f64,
    /// Prop set index.
    pub prop_set: u8,
    /// Group within the set (12 bits on the wire).
    pub prop_group: u16,
    /// Index within the group (12 bits on the wire).
    pub prop_index: u16,
    /// Colour variant.
    pub palette: u8,
}

impl Default for Prop {
    fn default() -> Self {
        Self {
            layer_sub: 0,
            rotation: 0,
            flip_x: false,
            flip_y: false,
            scale: 1.0,
            prop_set: 0,
            prop_group: 0,
            prop_index: 0,
            palette: 0,
        }
    }
}

/// Subtract the rotation of `mat` from a 16-bit clockwise angle.
pub(crate) fn rotate_angle(rotation: u16, mat: &TxMatrix) -> u16 {
    let delta = (f64::from(0x10000) * mat.angle() / PI / 2.0) as i64;
    (i64::from(rotation) - delta).rem_euclid(0x10000) as u16
}

impl Transformable for Prop {
    fn transform(&mut self, mat: &TxMatrix) {
        self.rotation = rotate_angle(self.rotation, mat);
        self.scale *= mat.scale();
        if mat.flipped() {
            self.flip_x = !self.flip_x;
            self.rotation = self.rotation.wrapping_neg();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turn_adds_quarter_rotation() {
        let mut prop = Prop {
            rotation: 0xF000,
            ..Prop::default()
        };
        prop.transform(&TxMatrix::ROTATE[1]);
        assert_eq!(prop.rotation, 0x3000);
        assert!(!prop.flip_x);
    }

    #[test]
    fn flip_negates_rotation() {
        let mut prop = Prop {
            rotation: 0x1000,
            ..Prop::default()
        };
        prop.transform(&TxMatrix::HFLIP);
        assert!(prop.flip_x);
        assert_eq!(prop.rotation, 0xF000);
    }

    #[test]
    fn scale_follows_matrix() {
        let mut prop = Prop::default();
        prop.transform(&(TxMatrix::IDENTITY * 2.0));
        assert_eq!(prop.scale, 2.0);
    }
}

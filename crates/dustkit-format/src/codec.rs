//! Primitive field codecs shared by every Dustforce file.
//!
//! # Format
//!
//! ```text
//! float(ibits, fbits): [sign:1] [ipart:ibits-1] [fpart:fbits]
//!                      value = ±ipart + fpart / 2^(fbits-1)
//! 6-bit string:        [len:6] [symbol:6]*len
//!                      symbols 0-9 A-Z _ a-z { map to 0..=63
//! ```
//!
//! The float sign applies to the integer part only. Writers store
//! `|floor(v)|` as the integer part, so negative values round-trip.

use dustkit_bitio::{BitReader, BitWriter};

use crate::error::FormatError;

/// Longest string a 6-bit length prefix can describe.
pub const MAX_6BIT_LEN: usize = 63;

// ── Bounded fields ──────────────────────────────────────────────

/// Write `value` into a `bits`-wide unsigned field, failing instead of
/// truncating.
pub fn write_bounded(
    w: &mut BitWriter,
    bits: u32,
    value: u64,
    field: &'static str,
) -> Result<(), FormatError> {
    if bits < 64 && value >> bits != 0 {
        return Err(FormatError::FieldOverflow {
            field,
            value: i64::try_from(value).unwrap_or(i64::MAX),
            bits,
        });
    }
    w.write(bits, value);
    Ok(())
}

// ── Fixed-point floats ──────────────────────────────────────────

/// Read a fixed-point number with `ibits` integer bits (sign included) and
/// `fbits` fractional bits.
pub fn read_float(r: &mut BitReader<'_>, ibits: u32, fbits: u32) -> Result<f64, FormatError> {
    let sign = if r.read_bool()? { -1.0 } else { 1.0 };
    let ipart = r.read(ibits - 1)? as f64;
    let fpart = r.read(fbits)? as f64;
    Ok(sign * ipart + fpart / (1u64 << (fbits - 1)) as f64)
}

/// Write a fixed-point number. Bits beyond the field widths are dropped.
pub fn write_float(w: &mut BitWriter, ibits: u32, fbits: u32, value: f64) {
    let floor = value.floor();
    let ipart = floor.abs() as u64;
    let fpart = ((value - floor) * (1u64 << (fbits - 1)) as f64) as u64;
    w.write_bool(value < 0.0);
    w.write(ibits - 1, ipart);
    w.write(fbits, fpart);
}

// ── 6-bit strings ───────────────────────────────────────────────

fn symbol_to_char(v: u8) -> char {
    match v {
        0..=9 => char::from(b'0' + v),
        10..=35 => char::from(b'A' + v - 10),
        36 => '_',
        37..=62 => char::from(b'a' + v - 37),
        _ => '{',
    }
}

fn char_to_symbol(c: char) -> Option<u8> {
    let b = u8::try_from(c).ok()?;
    Some(match b {
        b'0'..=b'9' => b - b'0',
        b'A'..=b'Z' => b - b'A' + 10,
        b'_' => 36,
        b'a'..=b'z' => b - b'a' + 37,
        b'{' => 63,
        _ => return None,
    })
}

/// Whether `text` can be stored as a 6-bit string.
pub fn is_6bit_str(text: &str) -> bool {
    text.chars().count() <= MAX_6BIT_LEN && text.chars().all(|c| char_to_symbol(c).is_some())
}

/// Read a 6-bit string.
pub fn read_6bit_str(r: &mut BitReader<'_>) -> Result<String, FormatError> {
    let len = r.read(6)? as usize;
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        out.push(symbol_to_char(r.read(6)? as u8));
    }
    Ok(out)
}

/// Write a 6-bit string, failing with [`FormatError::InvalidKey`] if it is
/// too long or uses a character outside the alphabet.
pub fn write_6bit_str(w: &mut BitWriter, text: &str) -> Result<(), FormatError> {
    let invalid = || FormatError::InvalidKey {
        key: text.to_owned(),
    };
    let symbols = text
        .chars()
        .map(char_to_symbol)
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(invalid)?;
    if symbols.len() > MAX_6BIT_LEN {
        return Err(invalid());
    }
    w.write(6, symbols.len() as u64);
    for s in symbols {
        w.write(6, u64::from(s));
    }
    Ok(())
}

// ── Magic ───────────────────────────────────────────────────────

/// Consume six magic bytes, failing if they differ from `expected`.
pub fn read_magic(r: &mut BitReader<'_>, expected: &[u8; 6]) -> Result<(), FormatError> {
    let found = r.read_array::<6>()?;
    if &found != expected {
        return Err(FormatError::InvalidMagic {
            expected: *expected,
            found: found.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bounded_field_rejects_overflow() {
        let mut w = BitWriter::new();
        write_bounded(&mut w, 8, 255, "layer count").unwrap();
        assert_eq!(w.bit_tell(), 8);
        assert!(matches!(
            write_bounded(&mut w, 8, 256, "layer count"),
            Err(FormatError::FieldOverflow {
                field: "layer count",
                value: 256,
                bits: 8
            })
        ));
        assert_eq!(w.bit_tell(), 8);
    }

    #[test]
    fn six_bit_known_bytes() {
        let mut w = BitWriter::new();
        write_6bit_str(&mut w, "Hello_Wor{d").unwrap();
        assert_eq!(w.as_bytes(), b"K\x94\xc2\xf0L\x82\xb3\xfd\xa3");

        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(read_6bit_str(&mut r).unwrap(), "Hello_Wor{d");
    }

    #[test]
    fn six_bit_rejects_bad_input() {
        let mut w = BitWriter::new();
        assert!(matches!(
            write_6bit_str(&mut w, "has space"),
            Err(FormatError::InvalidKey { .. })
        ));
        assert!(write_6bit_str(&mut w, &"a".repeat(64)).is_err());
        assert!(write_6bit_str(&mut w, &"a".repeat(63)).is_ok());
        assert!(!is_6bit_str("é"));
    }

    #[test]
    fn float_known_values() {
        let mut w = BitWriter::new();
        write_float(&mut w, 32, 8, -1.5);
        write_float(&mut w, 28, 4, 100.25);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(read_float(&mut r, 32, 8).unwrap(), -1.5);
        assert_eq!(read_float(&mut r, 28, 4).unwrap(), 100.25);
    }

    #[test]
    fn magic_mismatch_reports_bytes() {
        let mut r = BitReader::new(b"DF_CFGxx");
        match read_magic(&mut r, b"DF_STA") {
            Err(FormatError::InvalidMagic { expected, found }) => {
                assert_eq!(&expected, b"DF_STA");
                assert_eq!(found, b"DF_CFG".to_vec());
            }
            other => panic!("expected InvalidMagic, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn float_keeps_representable_values(
            ipart in -(1i64 << 30)..(1i64 << 30),
            frac in 0u64..256,
        ) {
            let value = ipart as f64 + frac as f64 / 256.0;
            let mut w = BitWriter::new();
            write_float(&mut w, 32, 32, value);
            let bytes = w.into_bytes();
            let mut r = BitReader::new(&bytes);
            prop_assert_eq!(read_float(&mut r, 32, 32).unwrap(), value);
        }

        #[test]
        fn six_bit_roundtrip(text in "[0-9A-Za-z_{]{0,63}") {
            let mut w = BitWriter::new();
            write_6bit_str(&mut w, &text).unwrap();
            let bytes = w.into_bytes();
            let mut r = BitReader::new(&bytes);
            prop_assert_eq!(read_6bit_str(&mut r).unwrap(), text);
        }
    }
}

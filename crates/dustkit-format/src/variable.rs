//! Encoding of the [`Variable`] value tree.
//!
//! # Format
//!
//! ```text
//! bool    [v:1]
//! int     [v:32]            (two's complement)
//! uint    [v:32]
//! float   float(32, 32)
//! string  [len:16] [bytes]
//! vec2    float(32, 32) float(32, 32)
//! array   [elem_tag:4] [count:16] [elem]*count
//! struct  ([tag:4] [key:6-bit string] [value])* [0:4]
//! ```
//!
//! Strings longer than 65535 bytes are split into chunks, every chunk but
//! the last exactly 65535 bytes long (a string whose length is a multiple
//! of 65535 ends with an empty chunk). Inside a struct each extra chunk is
//! re-tagged as a string field named `ctn`; inside an array each chunk is a
//! separate element and the array count includes them. Readers join chunks
//! for as long as a chunk is full, so decoded values never show the split.

use dustkit_bitio::{BitReader, BitWriter};
use dustkit_core::{Variable, VariableArray, VariableMap, VariableType};

use crate::codec::{read_6bit_str, read_float, write_6bit_str, write_float};
use crate::error::FormatError;

/// Bytes in a full string chunk.
pub const STRING_CHUNK: usize = 0xFFFF;

/// Key given to struct string continuation chunks.
pub const CONTINUATION_KEY: &str = "ctn";

// ── Reading ─────────────────────────────────────────────────────

fn read_type(r: &mut BitReader<'_>) -> Result<VariableType, FormatError> {
    let tag = r.read(4)? as u8;
    VariableType::from_tag(tag).ok_or(FormatError::UnknownVariableType { tag })
}

fn read_chunk(r: &mut BitReader<'_>) -> Result<Vec<u8>, FormatError> {
    let len = r.read(16)? as usize;
    Ok(r.read_bytes(len)?)
}

/// Read a string and any `ctn` continuation fields that follow it.
fn read_continued(r: &mut BitReader<'_>) -> Result<Vec<u8>, FormatError> {
    let mut joined = Vec::new();
    loop {
        let chunk = read_chunk(r)?;
        joined.extend_from_slice(&chunk);
        if chunk.len() != STRING_CHUNK {
            return Ok(joined);
        }
        // Continuation header; the tag and key carry no information.
        r.read(4)?;
        read_6bit_str(r)?;
    }
}

/// Read the body of a variable whose type tag has already been consumed.
pub fn read_value(r: &mut BitReader<'_>, vtype: VariableType) -> Result<Variable, FormatError> {
    Ok(match vtype {
        VariableType::Null => return Err(FormatError::NullVariable),
        VariableType::Bool => Variable::Bool(r.read_bool()?),
        VariableType::Int => Variable::Int(r.read_signed(32)? as i32),
        VariableType::UInt => Variable::UInt(r.read(32)? as u32),
        VariableType::Float => Variable::Float(read_float(r, 32, 32)?),
        VariableType::String => Variable::String(read_continued(r)?),
        VariableType::Vec2 => {
            let x = read_float(r, 32, 32)?;
            let y = read_float(r, 32, 32)?;
            Variable::Vec2(x, y)
        }
        VariableType::Array => Variable::Array(read_array(r)?),
        VariableType::Struct => Variable::Struct(read_var_map(r)?),
    })
}

fn read_array(r: &mut BitReader<'_>) -> Result<VariableArray, FormatError> {
    let element_type = read_type(r)?;
    if element_type == VariableType::Null {
        return Err(FormatError::NullVariable);
    }
    let mut remaining = r.read(16)? as usize;
    let mut array = VariableArray::new(element_type);

    if element_type != VariableType::String {
        for _ in 0..remaining {
            array.push(read_value(r, element_type)?);
        }
        return Ok(array);
    }

    while remaining > 0 {
        let mut joined = Vec::new();
        while remaining > 0 {
            remaining -= 1;
            let chunk = read_chunk(r)?;
            let full = chunk.len() == STRING_CHUNK;
            joined.extend_from_slice(&chunk);
            if !full {
                break;
            }
        }
        array.push(Variable::String(joined));
    }
    Ok(array)
}

/// Read struct fields up to and including the null terminator.
pub fn read_var_map(r: &mut BitReader<'_>) -> Result<VariableMap, FormatError> {
    let mut map = VariableMap::new();
    loop {
        let vtype = read_type(r)?;
        if vtype == VariableType::Null {
            return Ok(map);
        }
        let key = read_6bit_str(r)?;
        let value = read_value(r, vtype)?;
        map.insert(key, value);
    }
}

// ── Writing ─────────────────────────────────────────────────────

fn write_chunk(w: &mut BitWriter, chunk: &[u8]) {
    w.write(16, chunk.len() as u64);
    w.write_bytes(chunk);
}

/// Split a string into wire chunks. Always yields `len / 65535 + 1` chunks.
fn chunks(value: &[u8]) -> impl Iterator<Item = &[u8]> {
    (0..=value.len() / STRING_CHUNK).map(move |i| {
        let start = i * STRING_CHUNK;
        let end = (start + STRING_CHUNK).min(value.len());
        &value[start..end]
    })
}

/// Write the body of a variable (no type tag).
pub fn write_value(w: &mut BitWriter, var: &Variable) -> Result<(), FormatError> {
    match var {
        Variable::Bool(v) => w.write_bool(*v),
        Variable::Int(v) => w.write_signed(32, i64::from(*v)),
        Variable::UInt(v) => w.write(32, u64::from(*v)),
        Variable::Float(v) => write_float(w, 32, 32, *v),
        Variable::String(v) => {
            for (i, chunk) in chunks(v).enumerate() {
                if i > 0 {
                    w.write(4, u64::from(VariableType::String.tag()));
                    write_6bit_str(w, CONTINUATION_KEY)?;
                }
                write_chunk(w, chunk);
            }
        }
        Variable::Vec2(x, y) => {
            write_float(w, 32, 32, *x);
            write_float(w, 32, 32, *y);
        }
        Variable::Array(array) => write_array(w, array)?,
        Variable::Struct(map) => write_var_map(w, map)?,
    }
    Ok(())
}

fn write_array(w: &mut BitWriter, array: &VariableArray) -> Result<(), FormatError> {
    let element_type = array.element_type();
    let len = if element_type == VariableType::String {
        array
            .iter()
            .map(|v| match v {
                Variable::String(s) => s.len() / STRING_CHUNK + 1,
                _ => 1,
            })
            .sum()
    } else {
        array.len()
    };
    if len > 0xFFFF {
        return Err(FormatError::ArrayTooLong { len });
    }

    w.write(4, u64::from(element_type.tag()));
    w.write(16, len as u64);
    for value in array {
        match value {
            Variable::String(s) => chunks(s).for_each(|chunk| write_chunk(w, chunk)),
            other => write_value(w, other)?,
        }
    }
    Ok(())
}

/// Write one struct field: tag, key and value.
pub fn write_var(w: &mut BitWriter, key: &str, var: &Variable) -> Result<(), FormatError> {
    w.write(4, u64::from(var.variable_type().tag()));
    write_6bit_str(w, key)?;
    write_value(w, var)
}

/// Write every field of `map` followed by the null terminator.
pub fn write_var_map(w: &mut BitWriter, map: &VariableMap) -> Result<(), FormatError> {
    for (key, var) in map {
        write_var(w, key, var)?;
    }
    w.write(4, u64::from(VariableType::Null.tag()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustkit_test_utils::arb_variable;
    use proptest::prelude::*;

    fn roundtrip_map(map: &VariableMap) -> VariableMap {
        let mut w = BitWriter::new();
        write_var_map(&mut w, map).unwrap();
        let bytes = w.into_bytes();
        read_var_map(&mut BitReader::new(&bytes)).unwrap()
    }

    #[test]
    fn empty_map_is_one_nibble() {
        let mut w = BitWriter::new();
        write_var_map(&mut w, &VariableMap::new()).unwrap();
        assert_eq!(w.bit_tell(), 4);
    }

    #[test]
    fn long_struct_strings_are_rejoined() {
        let mut map = VariableMap::new();
        map.insert("exact".into(), Variable::String(vec![b'x'; STRING_CHUNK]));
        map.insert("long".into(), Variable::String(vec![b'y'; 2 * STRING_CHUNK + 7]));
        map.insert("after".into(), Variable::Int(-3));
        assert_eq!(roundtrip_map(&map), map);
    }

    #[test]
    fn continuation_chunks_are_tagged_ctn() {
        let mut w = BitWriter::new();
        write_value(&mut w, &Variable::String(vec![0; STRING_CHUNK])).unwrap();
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(read_chunk(&mut r).unwrap().len(), STRING_CHUNK);
        assert_eq!(r.read(4).unwrap(), u64::from(VariableType::String.tag()));
        assert_eq!(read_6bit_str(&mut r).unwrap(), CONTINUATION_KEY);
        assert!(read_chunk(&mut r).unwrap().is_empty());
    }

    #[test]
    fn long_value_strings_read_back_whole() {
        for len in [STRING_CHUNK - 1, STRING_CHUNK, 2 * STRING_CHUNK + 5] {
            let value = Variable::String((0..len).map(|i| i as u8).collect());
            let mut w = BitWriter::new();
            write_value(&mut w, &value).unwrap();
            w.write(8, 0xA5);
            let bytes = w.into_bytes();

            let mut r = BitReader::new(&bytes);
            assert_eq!(read_value(&mut r, VariableType::String).unwrap(), value);
            assert_eq!(r.read(8).unwrap(), 0xA5);
        }
    }

    #[test]
    fn long_array_strings_count_chunks() {
        let array = VariableArray::from_values(
            VariableType::String,
            vec![
                Variable::String(vec![1; STRING_CHUNK + 1]),
                Variable::string("short"),
                Variable::String(Vec::new()),
            ],
        );
        let mut w = BitWriter::new();
        write_value(&mut w, &Variable::Array(array.clone())).unwrap();
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read(4).unwrap(), u64::from(VariableType::String.tag()));
        assert_eq!(r.read(16).unwrap(), 4);

        let mut r = BitReader::new(&bytes);
        assert_eq!(
            read_value(&mut r, VariableType::Array).unwrap(),
            Variable::Array(array)
        );
    }

    #[test]
    fn oversized_array_fails() {
        let array =
            VariableArray::from_values(VariableType::Bool, vec![Variable::Bool(true); 0x10000]);
        let mut w = BitWriter::new();
        assert!(matches!(
            write_value(&mut w, &Variable::Array(array)),
            Err(FormatError::ArrayTooLong { len: 0x10000 })
        ));
    }

    #[test]
    fn bad_tags_are_errors() {
        // Struct field tagged 7.
        let mut r = BitReader::new(&[0x07, 0x00]);
        assert!(matches!(
            read_var_map(&mut r),
            Err(FormatError::UnknownVariableType { tag: 7 })
        ));
        let mut r = BitReader::new(&[0x00]);
        assert!(matches!(
            read_value(&mut r, VariableType::Null),
            Err(FormatError::NullVariable)
        ));
        assert!(matches!(
            read_value(&mut BitReader::new(&[0x00, 0x00, 0x00]), VariableType::Array),
            Err(FormatError::NullVariable)
        ));
    }

    #[test]
    fn invalid_key_fails() {
        let mut map = VariableMap::new();
        map.insert("not ok".into(), Variable::Bool(true));
        let mut w = BitWriter::new();
        assert!(matches!(
            write_var_map(&mut w, &map),
            Err(FormatError::InvalidKey { .. })
        ));
    }

    proptest! {
        #[test]
        fn variables_roundtrip(var in arb_variable()) {
            let mut w = BitWriter::new();
            write_value(&mut w, &var).unwrap();
            let bytes = w.into_bytes();
            let decoded = read_value(&mut BitReader::new(&bytes), var.variable_type()).unwrap();
            prop_assert_eq!(decoded, var);
        }
    }
}

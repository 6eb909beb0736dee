//! Stand-alone variable files: saves, config and fog presets.
//!
//! # Format
//!
//! ```text
//! [magic:6B] [version:16] [size:32] [variables] [align]
//! ```
//!
//! `size` is the whole file length in bytes. Readers ignore both the
//! version and the size.

use dustkit_bitio::{BitReader, BitWriter};
use dustkit_core::VariableMap;

use crate::codec::read_magic;
use crate::error::FormatError;
use crate::variable::{read_var_map, write_var_map};
use crate::VAR_FILE_VERSION;

/// Known variable file types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VarFileKind {
    /// Player stats and save data (`stats1`).
    Stats,
    /// Game configuration (`config`).
    Config,
    /// Fog presets.
    Fog,
}

impl VarFileKind {
    /// The file magic.
    pub fn magic(self) -> &'static [u8; 6] {
        match self {
            Self::Stats => b"DF_STA",
            Self::Config => b"DF_CFG",
            Self::Fog => b"DF_FOG",
        }
    }

    /// Identify a file from its first six bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        let head = data.get(..6)?;
        [Self::Stats, Self::Config, Self::Fog]
            .into_iter()
            .find(|kind| kind.magic() == head)
    }

    /// Read a file of this kind.
    pub fn read(self, data: &[u8]) -> Result<VariableMap, FormatError> {
        read_var_file(data, self.magic())
    }

    /// Write a file of this kind.
    pub fn write(self, vars: &VariableMap) -> Result<Vec<u8>, FormatError> {
        write_var_file(self.magic(), vars)
    }
}

/// Read a variable file, checking its magic.
pub fn read_var_file(data: &[u8], magic: &[u8; 6]) -> Result<VariableMap, FormatError> {
    let mut r = BitReader::new(data);
    read_magic(&mut r, magic)?;
    let _version = r.read(16)?;
    let _size = r.read(32)?;
    read_var_map(&mut r)
}

/// Write a variable file with the given magic.
pub fn write_var_file(magic: &[u8; 6], vars: &VariableMap) -> Result<Vec<u8>, FormatError> {
    let mut w = BitWriter::new();
    let header = w.reserve(96);
    write_var_map(&mut w, vars)?;
    w.align();
    let size = w.bit_tell() / 8;
    w.fill_with(header, |w| {
        w.write_bytes(magic);
        w.write(16, u64::from(VAR_FILE_VERSION));
        w.write(32, size);
    });
    Ok(w.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustkit_core::{Variable, VariableArray, VariableType};

    fn stats() -> VariableMap {
        let mut levels = VariableMap::new();
        levels.insert("downhill".into(), Variable::Int(4));
        let mut vars = VariableMap::new();
        vars.insert("character".into(), Variable::string("dustman"));
        vars.insert("levels".into(), Variable::Struct(levels));
        vars.insert(
            "keys".into(),
            Variable::Array(VariableArray::from_values(
                VariableType::Int,
                vec![Variable::Int(1), Variable::Int(0)],
            )),
        );
        vars
    }

    #[test]
    fn header_fields() {
        let bytes = write_var_file(VarFileKind::Stats.magic(), &stats()).unwrap();
        assert_eq!(&bytes[..6], b"DF_STA");
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), VAR_FILE_VERSION);
        let size = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        assert_eq!(size as usize, bytes.len());
    }

    #[test]
    fn every_kind_roundtrips() {
        for kind in [VarFileKind::Stats, VarFileKind::Config, VarFileKind::Fog] {
            let bytes = kind.write(&stats()).unwrap();
            assert_eq!(VarFileKind::detect(&bytes), Some(kind));
            assert_eq!(kind.read(&bytes).unwrap(), stats());
        }
    }

    #[test]
    fn magic_must_match() {
        let bytes = VarFileKind::Config.write(&stats()).unwrap();
        assert!(matches!(
            VarFileKind::Fog.read(&bytes),
            Err(FormatError::InvalidMagic { .. })
        ));
        assert_eq!(VarFileKind::detect(b"DF_LVL"), None);
        assert_eq!(VarFileKind::detect(b"DF"), None);
    }

    #[test]
    fn empty_file_is_thirteen_bytes() {
        let bytes = write_var_file(b"DF_FOG", &VariableMap::new()).unwrap();
        assert_eq!(bytes.len(), 13);
        assert!(read_var_file(&bytes, b"DF_FOG").unwrap().is_empty());
    }
}

//! Error types for reading and writing Dustforce files.

use std::fmt;
use std::io;

use dustkit_bitio::BitError;
use dustkit_level::LevelError;

use crate::config::ConfigError;

/// Errors that can occur while decoding or encoding a level or var file.
///
/// Every variant produced while reading means the input is malformed; the
/// parse is aborted and nothing is recovered.
#[derive(Debug)]
pub enum FormatError {
    /// The bit stream ended early or was rewound past its start.
    Bit(BitError),
    /// A decoded record was rejected by the level model.
    Level(LevelError),
    /// zlib compression or decompression failed.
    Io(io::Error),
    /// The file does not start with the expected magic bytes.
    InvalidMagic {
        /// The magic the caller asked for.
        expected: [u8; 6],
        /// The bytes actually found.
        found: Vec<u8>,
    },
    /// The level format version is too old to read.
    UnsupportedVersion {
        /// The version found in the file.
        found: u16,
    },
    /// A variable type tag outside the known set.
    UnknownVariableType {
        /// The raw 4-bit tag.
        tag: u8,
    },
    /// A value was tagged as null outside a struct terminator.
    NullVariable,
    /// A key or entity tag cannot be written as a 6-bit string.
    InvalidKey {
        /// The offending key.
        key: String,
    },
    /// An array has more elements than its 16-bit count can hold.
    ArrayTooLong {
        /// The number of wire elements required.
        len: usize,
    },
    /// A value does not fit the wire field that must hold it.
    FieldOverflow {
        /// What the field holds.
        field: &'static str,
        /// The value that was to be written.
        value: i64,
        /// Width of the field in bits.
        bits: u32,
    },
    /// Raw region bytes disagree with the region directory.
    RegionDataMismatch {
        /// Byte length named by the final directory entry.
        expected: u64,
        /// Byte length actually supplied.
        found: u64,
    },
    /// Reader or writer options failed validation.
    Config(ConfigError),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bit(e) => write!(f, "bit stream: {e}"),
            Self::Level(e) => write!(f, "level: {e}"),
            Self::Io(e) => write!(f, "zlib: {e}"),
            Self::InvalidMagic { expected, found } => write!(
                f,
                "invalid magic: expected {:?}, found {:?}",
                String::from_utf8_lossy(expected),
                String::from_utf8_lossy(found)
            ),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported level version {found}")
            }
            Self::UnknownVariableType { tag } => write!(f, "unknown variable type tag {tag}"),
            Self::NullVariable => write!(f, "unexpected null variable"),
            Self::InvalidKey { key } => {
                write!(f, "{key:?} is not a valid 6-bit string")
            }
            Self::ArrayTooLong { len } => {
                write!(f, "array needs {len} wire elements, at most 65535 fit")
            }
            Self::FieldOverflow { field, value, bits } => {
                write!(f, "{field} {value} does not fit in {bits} bits")
            }
            Self::RegionDataMismatch { expected, found } => write!(
                f,
                "region data is {found} bytes but the directory expects {expected}"
            ),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for FormatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bit(e) => Some(e),
            Self::Level(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BitError> for FormatError {
    fn from(e: BitError) -> Self {
        Self::Bit(e)
    }
}

impl From<LevelError> for FormatError {
    fn from(e: LevelError) -> Self {
        Self::Level(e)
    }
}

impl From<io::Error> for FormatError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ConfigError> for FormatError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

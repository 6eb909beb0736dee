//! Error types for bit-level I/O.

use std::fmt;

/// Errors produced while reading a bit stream.
///
/// Writing never fails: the writer's buffer grows on demand and caller
/// misuse (bad field widths, unaligned seeks) panics instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitError {
    /// A read extended past the end of the input.
    UnexpectedEof {
        /// Bit position at which the read started.
        position: u64,
        /// Number of bits requested.
        requested: u64,
        /// Total number of bits in the input.
        available: u64,
    },
    /// A relative skip would move before the start of the stream.
    SeekBeforeStart {
        /// The (negative) target bit position.
        target: i128,
    },
}

impl fmt::Display for BitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof {
                position,
                requested,
                available,
            } => write!(
                f,
                "unexpected end of stream: read of {requested} bits at bit {position} \
                 exceeds {available} available bits"
            ),
            Self::SeekBeforeStart { target } => {
                write!(f, "seek to bit {target} is before the start of the stream")
            }
        }
    }
}

impl std::error::Error for BitError {}

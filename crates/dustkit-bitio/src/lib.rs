//! Bit-granular reader and writer for the Dustforce binary formats.
//!
//! Every Dustforce file is a single LSB-first bit stream: bit 0 of a value
//! occupies the lowest unused bit of the current byte, and values freely
//! straddle byte boundaries. Byte alignment only happens where the format
//! asks for it explicitly.
//!
//! # Architecture
//!
//! - [`BitReader`] decodes from a borrowed byte slice
//! - [`BitWriter`] encodes into a growable buffer with seek support
//! - [`Reservation`] is the move-only handle used for back-patched headers:
//!   reserve a fixed number of bits, write the body, then fill the
//!   reservation once the real values are known
//!
//! # Format
//!
//! ```text
//! byte 0           byte 1
//! [7 6 5 4 3 2 1 0][7 6 5 4 3 2 1 0]
//!  ^^^^^^^^^^^^^^^  ^^^^^^^^^^^^^^^
//!  stream bits 7..0 stream bits 15..8
//! ```
//!
//! A 12-bit value written at bit 4 therefore occupies the high nibble of
//! byte 0 (its low 4 bits) and all of byte 1 (its high 8 bits).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod reader;
pub mod writer;

pub use error::BitError;
pub use reader::BitReader;
pub use writer::{BitWriter, Reservation};

/// Largest field width, in bits, accepted by a single read or write.
pub const MAX_FIELD_BITS: u32 = 64;

/// Round a bit position up to the next byte boundary.
pub const fn align_up(pos: u64) -> u64 {
    (pos + 7) & !7
}

fn check_width(bits: u32) {
    assert!(
        (1..=MAX_FIELD_BITS).contains(&bits),
        "bit field width must be in 1..=64, got {bits}"
    );
}

fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

//! Bit stream reader.
//!
//! [`BitReader`] decodes LSB-first fields from a borrowed byte slice. The
//! position can be moved anywhere, including backwards, which the level
//! format relies on for its trailing back-pointers.

use crate::error::BitError;
use crate::{check_width, low_mask};

/// Reads bit fields from a byte slice.
///
/// # Examples
///
/// ```
/// use dustkit_bitio::BitReader;
///
/// let data = [0b1011_0110u8, 0xFF];
/// let mut reader = BitReader::new(&data);
/// assert_eq!(reader.read(3).unwrap(), 0b110);
/// assert_eq!(reader.read_signed(5).unwrap(), -10);
/// assert_eq!(reader.bit_tell(), 8);
/// assert_eq!(reader.read_bytes(1).unwrap(), vec![0xFF]);
/// ```
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: u64,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at the first bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The full underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current bit position.
    pub fn bit_tell(&self) -> u64 {
        self.pos
    }

    /// Move to an absolute bit position. Positions past the end are allowed;
    /// the next read reports the overrun.
    pub fn bit_seek(&mut self, pos: u64) {
        self.pos = pos;
    }

    /// Move by a signed number of bits.
    pub fn skip(&mut self, bits: i64) -> Result<(), BitError> {
        let target = i128::from(self.pos) + i128::from(bits);
        if target < 0 {
            return Err(BitError::SeekBeforeStart { target });
        }
        self.pos = target as u64;
        Ok(())
    }

    /// Whether the position sits on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    /// Advance to the next byte boundary (no-op when already aligned).
    pub fn align(&mut self) {
        self.pos = crate::align_up(self.pos);
    }

    /// Bits left before the end of the input.
    pub fn remaining_bits(&self) -> u64 {
        self.total_bits().saturating_sub(self.pos)
    }

    fn total_bits(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    fn ensure(&self, bits: u64) -> Result<(), BitError> {
        if self.pos.saturating_add(bits) > self.total_bits() {
            return Err(BitError::UnexpectedEof {
                position: self.pos,
                requested: bits,
                available: self.total_bits(),
            });
        }
        Ok(())
    }

    /// Read an unsigned `bits`-wide field.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is 0 or greater than 64.
    pub fn read(&mut self, bits: u32) -> Result<u64, BitError> {
        check_width(bits);
        self.ensure(u64::from(bits))?;

        let mut value = 0u64;
        let mut filled = 0u32;
        while filled < bits {
            let byte = self.data[(self.pos / 8) as usize];
            let offset = (self.pos % 8) as u32;
            let take = (8 - offset).min(bits - filled);
            let chunk = (u64::from(byte) >> offset) & low_mask(take);
            value |= chunk << filled;
            filled += take;
            self.pos += u64::from(take);
        }
        Ok(value)
    }

    /// Read a two's-complement `bits`-wide field, sign-extending from its
    /// high bit.
    pub fn read_signed(&mut self, bits: u32) -> Result<i64, BitError> {
        let raw = self.read(bits)?;
        if bits == 64 {
            return Ok(raw as i64);
        }
        if raw >> (bits - 1) & 1 == 1 {
            Ok(raw as i64 - (1i64 << bits))
        } else {
            Ok(raw as i64)
        }
    }

    /// Read a single bit as a boolean.
    pub fn read_bool(&mut self) -> Result<bool, BitError> {
        Ok(self.read(1)? == 1)
    }

    /// Read `count` whole bytes. Aligned reads copy the slice directly,
    /// unaligned reads assemble each byte from two partial ones.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, BitError> {
        self.ensure(count as u64 * 8)?;
        if self.is_aligned() {
            let start = (self.pos / 8) as usize;
            self.pos += count as u64 * 8;
            return Ok(self.data[start..start + count].to_vec());
        }
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read(8)? as u8);
        }
        Ok(out)
    }

    /// Read `N` whole bytes into a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], BitError> {
        let mut out = [0u8; N];
        if self.is_aligned() {
            self.ensure(N as u64 * 8)?;
            let start = (self.pos / 8) as usize;
            out.copy_from_slice(&self.data[start..start + N]);
            self.pos += N as u64 * 8;
        } else {
            for byte in &mut out {
                *byte = self.read(8)? as u8;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_lsb_first_across_bytes() {
        let data = [0xF0u8, 0x0F];
        let mut r = BitReader::new(&data);
        assert_eq!(r.read(4).unwrap(), 0);
        assert_eq!(r.read(8).unwrap(), 0xFF);
        assert_eq!(r.read(4).unwrap(), 0);
    }

    #[test]
    fn signed_boundaries() {
        let data = [0xFFu8; 8];
        let mut r = BitReader::new(&data);
        assert_eq!(r.read_signed(1).unwrap(), -1);
        r.bit_seek(0);
        assert_eq!(r.read_signed(64).unwrap(), -1);
        r.bit_seek(0);
        assert_eq!(r.read(64).unwrap(), u64::MAX);
    }

    #[test]
    fn eof_is_reported() {
        let data = [0u8; 2];
        let mut r = BitReader::new(&data);
        r.read(10).unwrap();
        let err = r.read(7).unwrap_err();
        assert_eq!(
            err,
            BitError::UnexpectedEof {
                position: 10,
                requested: 7,
                available: 16
            }
        );
        assert!(r.read_bytes(1).is_err());
    }

    #[test]
    fn negative_skip_rewinds() {
        let data = [0xABu8, 0xCD];
        let mut r = BitReader::new(&data);
        r.read(16).unwrap();
        r.skip(-8).unwrap();
        assert_eq!(r.read(8).unwrap(), 0xCD);
        assert!(matches!(
            r.skip(-100),
            Err(BitError::SeekBeforeStart { .. })
        ));
    }

    #[test]
    fn unaligned_byte_reads() {
        let data = [0x10u8, 0x32, 0x04];
        let mut r = BitReader::new(&data);
        r.read(4).unwrap();
        assert_eq!(r.read_bytes(2).unwrap(), vec![0x21, 0x43]);
        r.bit_seek(4);
        assert_eq!(r.read_array::<2>().unwrap(), [0x21, 0x43]);
    }

    #[test]
    #[should_panic(expected = "bit field width")]
    fn zero_width_panics() {
        let data = [0u8];
        let _ = BitReader::new(&data).read(0);
    }
}

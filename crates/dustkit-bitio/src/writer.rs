//! Bit stream writer with back-patch reservations.
//!
//! [`BitWriter`] encodes into an in-memory buffer. Length and offset fields
//! that precede their body are handled with [`BitWriter::reserve`], which
//! skips over the field and hands back a [`Reservation`]. The reservation
//! must later be consumed by [`BitWriter::fill`] or [`BitWriter::fill_with`],
//! which write the field in place and return to the current position.

use crate::{align_up, check_width, low_mask};

/// A span of bits set aside for a value that is only known later.
///
/// The handle is move-only and consumed by exactly one fill, so a
/// placeholder cannot be patched twice. Dropping it unfilled leaves zero
/// bits in the output, which is always a bug.
#[must_use = "a reserved span must be filled with BitWriter::fill or fill_with"]
#[derive(Debug, PartialEq, Eq)]
pub struct Reservation {
    start: u64,
    bits: u64,
}

impl Reservation {
    /// Bit position of the first reserved bit.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Width of the reservation in bits.
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Bit position just past the reservation.
    pub fn end(&self) -> u64 {
        self.start + self.bits
    }
}

/// Writes bit fields into a growable byte buffer.
///
/// # Examples
///
/// ```
/// use dustkit_bitio::{BitReader, BitWriter};
///
/// let mut writer = BitWriter::new();
/// let size = writer.reserve(16);
/// writer.write(3, 5);
/// writer.write_bytes(b"hi");
/// writer.align();
/// let total = writer.bit_tell();
/// writer.fill(size, total / 8);
/// let bytes = writer.into_bytes();
///
/// let mut reader = BitReader::new(&bytes);
/// assert_eq!(reader.read(16).unwrap(), bytes.len() as u64);
/// assert_eq!(reader.read(3).unwrap(), 5);
/// assert_eq!(reader.read_bytes(2).unwrap(), b"hi".to_vec());
/// ```
#[derive(Clone, Debug, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    pos: u64,
}

impl BitWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with room for `bytes` bytes.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            pos: 0,
        }
    }

    /// Current bit position.
    pub fn bit_tell(&self) -> u64 {
        self.pos
    }

    /// Whether the position sits on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    /// Advance to the next byte boundary. Skipped bits read back as zero.
    pub fn align(&mut self) {
        self.pos = align_up(self.pos);
    }

    /// Move to a byte-aligned position.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is not a multiple of 8. Use
    /// [`bit_seek_unaligned`](Self::bit_seek_unaligned) to opt in to
    /// mid-byte positioning.
    pub fn bit_seek(&mut self, pos: u64) {
        assert!(
            pos % 8 == 0,
            "unaligned writer seek to bit {pos}; use bit_seek_unaligned"
        );
        self.pos = pos;
    }

    /// Move to any bit position. The bits of the target byte that precede
    /// `pos` are cleared, so earlier content sharing that byte is lost.
    pub fn bit_seek_unaligned(&mut self, pos: u64) {
        let index = (pos / 8) as usize;
        let offset = (pos % 8) as u32;
        if offset != 0 && index < self.buf.len() {
            self.buf[index] &= !(low_mask(offset) as u8);
        }
        self.pos = pos;
    }

    fn grow_to(&mut self, end_bit: u64) {
        let needed = align_up(end_bit) / 8;
        if needed as usize > self.buf.len() {
            self.buf.resize(needed as usize, 0);
        }
    }

    /// Write the low `bits` bits of `value`.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is 0 or greater than 64.
    pub fn write(&mut self, bits: u32, value: u64) {
        check_width(bits);
        self.grow_to(self.pos + u64::from(bits));

        let mut value = value & low_mask(bits);
        let mut left = bits;
        while left > 0 {
            let index = (self.pos / 8) as usize;
            let offset = (self.pos % 8) as u32;
            let take = (8 - offset).min(left);
            let mask = (low_mask(take) as u8) << offset;
            let chunk = ((value & low_mask(take)) as u8) << offset;
            self.buf[index] = (self.buf[index] & !mask) | chunk;
            value >>= take;
            left -= take;
            self.pos += u64::from(take);
        }
    }

    /// Write a signed value as a `bits`-wide two's-complement field.
    pub fn write_signed(&mut self, bits: u32, value: i64) {
        self.write(bits, value as u64);
    }

    /// Write a single bit.
    pub fn write_bool(&mut self, value: bool) {
        self.write(1, u64::from(value));
    }

    /// Write whole bytes, copying directly when aligned.
    pub fn write_bytes(&mut self, data: &[u8]) {
        if self.is_aligned() {
            let start = (self.pos / 8) as usize;
            self.grow_to(self.pos + data.len() as u64 * 8);
            self.buf[start..start + data.len()].copy_from_slice(data);
            self.pos += data.len() as u64 * 8;
        } else {
            for &byte in data {
                self.write(8, u64::from(byte));
            }
        }
    }

    /// Skip `bits` bits for a value to be written later.
    pub fn reserve(&mut self, bits: u64) -> Reservation {
        let start = self.pos;
        self.pos += bits;
        Reservation { start, bits }
    }

    /// Write `value` into a reservation of at most 64 bits.
    pub fn fill(&mut self, reservation: Reservation, value: u64) {
        let bits = reservation.bits as u32;
        self.fill_with(reservation, |w| w.write(bits, value));
    }

    /// Run `body` positioned at the start of `reservation`, then return to
    /// the current position.
    ///
    /// The neighbouring bits of partially shared bytes are preserved.
    ///
    /// # Panics
    ///
    /// Panics if `body` writes a different number of bits than were reserved.
    pub fn fill_with<F>(&mut self, reservation: Reservation, body: F)
    where
        F: FnOnce(&mut BitWriter),
    {
        let resume = self.pos;
        self.pos = reservation.start;
        body(self);
        assert_eq!(
            self.pos,
            reservation.end(),
            "reservation of {} bits at bit {} was filled with {} bits",
            reservation.bits,
            reservation.start,
            self.pos as i128 - reservation.start as i128,
        );
        self.pos = resume;
    }

    /// Bytes written so far, including a zero-padded partial last byte.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BitReader;
    use proptest::prelude::*;

    #[test]
    fn partial_byte_is_zero_padded() {
        let mut w = BitWriter::new();
        w.write(3, 0b101);
        assert_eq!(w.into_bytes(), vec![0b101]);
    }

    #[test]
    fn values_are_masked_to_width() {
        let mut w = BitWriter::new();
        w.write(4, 0xFF);
        w.write_signed(4, -1);
        assert_eq!(w.into_bytes(), vec![0xFF]);
    }

    #[test]
    fn fill_preserves_shared_byte() {
        let mut w = BitWriter::new();
        w.write(3, 0b111);
        let slot = w.reserve(10);
        w.write(3, 0b111);
        w.fill(slot, 0);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read(3).unwrap(), 0b111);
        assert_eq!(r.read(10).unwrap(), 0);
        assert_eq!(r.read(3).unwrap(), 0b111);
    }

    #[test]
    fn fill_with_writes_nested_fields() {
        let mut w = BitWriter::new();
        let header = w.reserve(24);
        w.write_bytes(b"body");
        w.fill_with(header, |w| {
            w.write(8, 1);
            w.write(16, 0xBEEF);
        });
        assert_eq!(w.bit_tell(), 56);
        assert_eq!(w.into_bytes(), vec![1, 0xEF, 0xBE, b'b', b'o', b'd', b'y']);
    }

    #[test]
    #[should_panic(expected = "was filled with")]
    fn short_fill_panics() {
        let mut w = BitWriter::new();
        let slot = w.reserve(16);
        w.fill_with(slot, |w| w.write(8, 0));
    }

    #[test]
    #[should_panic(expected = "unaligned writer seek")]
    fn unaligned_seek_requires_opt_in() {
        let mut w = BitWriter::new();
        w.bit_seek(3);
    }

    #[test]
    fn unaligned_seek_clears_leading_bits() {
        let mut w = BitWriter::new();
        w.write(8, 0xFF);
        w.bit_seek_unaligned(4);
        w.write(2, 0);
        assert_eq!(w.into_bytes(), vec![0x00]);
    }

    #[test]
    fn unaligned_bytes_roundtrip() {
        let mut w = BitWriter::new();
        w.write(5, 3);
        w.write_bytes(&[0xDE, 0xAD]);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read(5).unwrap(), 3);
        assert_eq!(r.read_bytes(2).unwrap(), vec![0xDE, 0xAD]);
    }

    fn arb_field() -> impl Strategy<Value = (u32, u64)> {
        (1u32..=64).prop_flat_map(|bits| {
            (Just(bits), any::<u64>().prop_map(move |v| v & low_mask(bits)))
        })
    }

    proptest! {
        #[test]
        fn roundtrip_unsigned_fields(fields in prop::collection::vec(arb_field(), 1..64)) {
            let mut w = BitWriter::new();
            for &(bits, value) in &fields {
                w.write(bits, value);
            }
            let bytes = w.into_bytes();
            let mut r = BitReader::new(&bytes);
            for &(bits, value) in &fields {
                prop_assert_eq!(r.read(bits).unwrap(), value);
            }
        }

        #[test]
        fn roundtrip_signed_fields(fields in prop::collection::vec((1u32..=64, any::<i64>()), 1..64)) {
            let fields: Vec<(u32, i64)> = fields
                .into_iter()
                .map(|(bits, v)| {
                    let half = 1i128 << (bits - 1);
                    (bits, (i128::from(v).rem_euclid(2 * half) - half) as i64)
                })
                .collect();
            let mut w = BitWriter::new();
            for &(bits, value) in &fields {
                w.write_signed(bits, value);
            }
            let bytes = w.into_bytes();
            let mut r = BitReader::new(&bytes);
            for &(bits, value) in &fields {
                prop_assert_eq!(r.read_signed(bits).unwrap(), value);
            }
        }
    }
}

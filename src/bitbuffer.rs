/// A growable bit buffer that supports appending multi-bit values and
/// patching bits that were already written. Bits are packed most-significant
/// first within each byte.
#[derive(Debug, Clone, Default)]
pub struct BitBuffer {
    bytes: Vec<u8>,
    /// Number of valid bits in the last byte (1..=8, or 0 if empty).
    bit_count: u8,
}

impl BitBuffer {
    /// Creates a new empty `BitBuffer`.
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bit_count: 0,
        }
    }

    /// Creates a `BitBuffer` with the given pre-allocated capacity in bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            bit_count: 0,
        }
    }

    /// Returns the total number of bits written.
    #[inline]
    pub fn len_bits(&self) -> usize {
        if self.bytes.is_empty() {
            0
        } else {
            (self.bytes.len() - 1) * 8 + self.bit_count as usize
        }
    }

    /// Returns `true` if no bits have been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns a reference to the underlying byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the buffer and returns the raw byte vector. Unused low bits of
    /// the last byte are zero.
    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Writes a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        if self.bit_count == 0 || self.bit_count == 8 {
            self.bytes.push(0);
            self.bit_count = 0;
        }
        if bit {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 1 << (7 - self.bit_count);
            }
        }
        self.bit_count += 1;
    }

    /// Writes the lowest `n` bits of `value` (big-endian order). `n` must be
    /// <= 64 and `value` must fit in `n` bits.
    pub fn write_bits(&mut self, value: u64, n: u8) {
        debug_assert!(n <= 64);
        debug_assert!(fits(value, n), "value {value:#x} does not fit in {n} bits");
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    /// Overwrites `n` already-written bits starting at bit `pos` with the
    /// lowest `n` bits of `value`.
    pub fn overwrite_bits(&mut self, pos: usize, value: u64, n: u8) {
        debug_assert!(n <= 64);
        debug_assert!(fits(value, n), "value {value:#x} does not fit in {n} bits");
        debug_assert!(pos + n as usize <= self.len_bits(), "overwrite past end of buffer");
        for i in 0..n as usize {
            let bit = (value >> (n as usize - 1 - i)) & 1 == 1;
            let at = pos + i;
            let mask = 1u8 << (7 - at % 8);
            if bit {
                self.bytes[at / 8] |= mask;
            } else {
                self.bytes[at / 8] &= !mask;
            }
        }
    }
}

#[inline]
fn fits(value: u64, n: u8) -> bool {
    n >= 64 || value >> n == 0
}

/// A cursor for reading bits sequentially from a byte slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    /// Total number of valid bits.
    total_bits: usize,
    /// Current bit position (0-indexed from the start).
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a new `BitReader` over everything written to `buffer`.
    pub fn new(buffer: &'a BitBuffer) -> Self {
        Self {
            bytes: buffer.as_bytes(),
            total_bits: buffer.len_bits(),
            pos: 0,
        }
    }

    /// Creates a `BitReader` over the first `total_bits` bits of `bytes`.
    /// `total_bits` is clamped to the slice length.
    pub fn from_raw(bytes: &'a [u8], total_bits: usize) -> Self {
        Self {
            bytes,
            total_bits: total_bits.min(bytes.len() * 8),
            pos: 0,
        }
    }

    /// Returns the current bit position.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of bits remaining.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.total_bits.saturating_sub(self.pos)
    }

    /// Returns `true` if there are no more bits to read.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.total_bits
    }

    /// Reads a single bit. Returns `None` if exhausted.
    #[inline]
    pub fn read_bit(&mut self) -> Option<bool> {
        if self.pos >= self.total_bits {
            return None;
        }
        let byte_idx = self.pos / 8;
        let bit_idx = self.pos % 8;
        self.pos += 1;
        Some((self.bytes[byte_idx] >> (7 - bit_idx)) & 1 == 1)
    }

    /// Reads `n` bits as a `u64` (big-endian). Returns `None` without
    /// advancing if not enough bits remain.
    pub fn read_bits(&mut self, n: u8) -> Option<u64> {
        debug_assert!(n <= 64);
        if n == 0 {
            return Some(0);
        }
        if self.remaining() < n as usize {
            return None;
        }
        let mut value: u64 = 0;
        for _ in 0..n {
            value = (value << 1) | (self.read_bit()? as u64);
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read_bits() {
        let mut buf = BitBuffer::new();
        buf.write_bit(true);
        buf.write_bit(false);
        buf.write_bit(true);
        buf.write_bit(true);
        assert_eq!(buf.len_bits(), 4);
        assert_eq!(buf.as_bytes(), &[0b1011_0000]);

        let mut reader = BitReader::new(&buf);
        assert_eq!(reader.read_bit(), Some(true));
        assert_eq!(reader.read_bit(), Some(false));
        assert_eq!(reader.read_bit(), Some(true));
        assert_eq!(reader.read_bit(), Some(true));
        assert_eq!(reader.read_bit(), None);
    }

    #[test]
    fn test_write_and_read_multi_bits() {
        let mut buf = BitBuffer::new();
        buf.write_bits(0b11010, 5);
        buf.write_bits(0xFF, 8);
        buf.write_bits(0x00, 8);
        assert_eq!(buf.len_bits(), 21);

        let mut reader = BitReader::new(&buf);
        assert_eq!(reader.read_bits(5), Some(0b11010));
        assert_eq!(reader.read_bits(8), Some(0xFF));
        assert_eq!(reader.read_bits(8), Some(0x00));
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_fields_cross_byte_boundaries() {
        // 3 + 16 + 27 bits, the blob header layout.
        let mut buf = BitBuffer::new();
        buf.write_bits(6, 3);
        buf.write_bits(4, 16);
        buf.write_bits(10_000, 27);
        assert_eq!(buf.len_bits(), 46);

        let mut reader = BitReader::new(&buf);
        assert_eq!(reader.read_bits(3), Some(6));
        assert_eq!(reader.read_bits(16), Some(4));
        assert_eq!(reader.read_bits(27), Some(10_000));
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_64_bit_value() {
        let mut buf = BitBuffer::new();
        let val: u64 = 0xDEAD_BEEF_CAFE_BABE;
        buf.write_bits(val, 64);
        assert_eq!(buf.len_bits(), 64);

        let mut reader = BitReader::new(&buf);
        assert_eq!(reader.read_bits(64), Some(val));
    }

    #[test]
    fn test_empty_buffer() {
        let buf = BitBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len_bits(), 0);

        let mut reader = BitReader::new(&buf);
        assert!(reader.is_exhausted());
        assert_eq!(reader.read_bit(), None);
        assert_eq!(reader.read_bits(0), Some(0));
    }

    #[test]
    fn test_zero_width_write_is_noop() {
        let mut buf = BitBuffer::new();
        buf.write_bits(0, 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_short_read_does_not_advance() {
        let mut buf = BitBuffer::new();
        buf.write_bits(0b101, 3);
        let mut reader = BitReader::new(&buf);
        assert_eq!(reader.read_bits(4), None);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_bits(3), Some(0b101));
    }

    #[test]
    fn test_overwrite_bits() {
        let mut buf = BitBuffer::new();
        buf.write_bits(0, 3);
        buf.write_bits(0, 16);
        buf.write_bits(0b1, 1);

        buf.overwrite_bits(0, 0b101, 3);
        buf.overwrite_bits(3, 0xABCD, 16);
        assert_eq!(buf.len_bits(), 20);

        let mut reader = BitReader::new(&buf);
        assert_eq!(reader.read_bits(3), Some(0b101));
        assert_eq!(reader.read_bits(16), Some(0xABCD));
        assert_eq!(reader.read_bit(), Some(true));

        // Clearing bits works too.
        buf.overwrite_bits(0, 0, 3);
        let mut reader = BitReader::new(&buf);
        assert_eq!(reader.read_bits(3), Some(0));
    }

    #[test]
    fn test_from_raw_limits_logical_length() {
        let bytes = [0b1110_0000u8];
        let mut reader = BitReader::from_raw(&bytes, 3);
        assert_eq!(reader.remaining(), 3);
        assert_eq!(reader.read_bits(3), Some(0b111));
        assert!(reader.is_exhausted());

        let reader = BitReader::from_raw(&bytes, 100);
        assert_eq!(reader.remaining(), 8);
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn test_value_wider_than_field_panics() {
        let mut buf = BitBuffer::new();
        buf.write_bits(0b1000, 3);
    }
}

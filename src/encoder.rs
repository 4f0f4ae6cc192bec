use log::debug;
use rust_decimal::Decimal;

use crate::bitbuffer::BitBuffer;
use crate::format::{
    self, COUNT_BITS, COUNT_OFFSET, INITIAL_BITS, LEN_BITS, MAX_CENTS, MAX_POINTS, PAD_BITS,
};

/// Error returned when a price series cannot be encoded. Encoding never
/// produces a partial blob.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// No prices were supplied.
    #[error("price series is empty")]
    SeriesEmpty,
    /// More prices than the 16-bit count field can describe.
    #[error("price series exceeds {max} points")]
    SeriesTooLarge { max: usize },
    /// A price is negative or above the largest encodable cent value.
    #[error("price {price} at index {index} is outside 0.00..=1342177.27")]
    PriceOutOfRange { index: usize, price: Decimal },
}

/// The delta encoder.
///
/// Prices are converted to whole cents. The first is stored verbatim in a
/// 27-bit field and every later one as a variable-length delta record from
/// its predecessor. The header count and padding fields are backfilled by
/// [`Encoder::finish`].
///
/// # Example
/// ```
/// use pricepack::Encoder;
/// use rust_decimal::Decimal;
///
/// let mut encoder = Encoder::new();
/// encoder.push(Decimal::new(10000, 2)).unwrap();
/// encoder.push(Decimal::new(10050, 2)).unwrap();
/// let blob = encoder.finish().unwrap();
/// assert_eq!(blob.point_count, 2);
/// ```
#[derive(Debug, Clone)]
pub struct Encoder {
    buf: BitBuffer,
    /// Number of prices encoded so far.
    count: usize,
    /// Previous price in cents.
    prev_cents: i64,
}

impl Encoder {
    /// Creates a new `Encoder`; the header is reserved immediately.
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Creates a new `Encoder` expecting roughly `points` prices.
    pub fn with_capacity(points: usize) -> Self {
        // Daily closes average close to two bytes per record.
        let mut buf = BitBuffer::with_capacity(6 + points * 2);
        buf.write_bits(0, PAD_BITS);
        buf.write_bits(0, COUNT_BITS);
        Self {
            buf,
            count: 0,
            prev_cents: 0,
        }
    }

    /// Appends a decimal price, rounded half-up to cents.
    ///
    /// On error nothing is written and the encoder can keep accepting prices.
    pub fn push(&mut self, price: Decimal) -> Result<(), EncodeError> {
        let cents = format::to_cents(price)
            .filter(|c| (0..=MAX_CENTS).contains(c))
            .ok_or(EncodeError::PriceOutOfRange {
                index: self.count,
                price,
            })?;
        self.push_cents(cents)
    }

    /// Appends a price already expressed in cents.
    pub fn push_cents(&mut self, cents: i64) -> Result<(), EncodeError> {
        if !(0..=MAX_CENTS).contains(&cents) {
            return Err(EncodeError::PriceOutOfRange {
                index: self.count,
                price: format::from_cents(cents),
            });
        }
        if self.count >= MAX_POINTS {
            return Err(EncodeError::SeriesTooLarge { max: MAX_POINTS });
        }

        if self.count == 0 {
            self.buf.write_bits(cents as u64, INITIAL_BITS);
        } else {
            self.encode_delta(cents - self.prev_cents);
        }

        self.prev_cents = cents;
        self.count += 1;
        Ok(())
    }

    /// Returns the number of prices encoded so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Backfills the header, byte-aligns the stream and returns the blob.
    pub fn finish(mut self) -> Result<EncodedBlob, EncodeError> {
        if self.count == 0 {
            return Err(EncodeError::SeriesEmpty);
        }

        let pad = format::pad_count(self.buf.len_bits());
        self.buf.write_bits(0, pad);
        self.buf.overwrite_bits(0, pad as u64, PAD_BITS);
        self.buf
            .overwrite_bits(COUNT_OFFSET, self.count as u64, COUNT_BITS);

        let point_count = self.count as u16;
        let bytes = self.buf.into_bytes();
        debug!(
            "encoded {} prices into {} bytes ({} padding bits)",
            point_count,
            bytes.len(),
            pad
        );
        Ok(EncodedBlob {
            bytes,
            point_count,
            pad_count: pad,
        })
    }

    /// Writes one delta record:
    ///
    /// | diff == 0 | `00000`                              | 5 bits          |
    /// | otherwise | `bit_len:5` `sign:1` `|diff|` sans MSB | 5 + bit_len bits |
    fn encode_delta(&mut self, diff: i64) {
        let magnitude = diff.unsigned_abs();
        let len = format::bit_len(magnitude);
        self.buf.write_bits(len as u64, LEN_BITS);
        if len == 0 {
            return;
        }
        self.buf.write_bit(diff >= 0);
        let stripped = magnitude ^ (1 << (len - 1));
        self.buf.write_bits(stripped, len - 1);
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes a whole price series in one call.
pub fn encode(prices: &[Decimal]) -> Result<EncodedBlob, EncodeError> {
    if prices.len() > MAX_POINTS {
        return Err(EncodeError::SeriesTooLarge { max: MAX_POINTS });
    }
    let mut encoder = Encoder::with_capacity(prices.len());
    for price in prices {
        encoder.push(*price)?;
    }
    encoder.finish()
}

/// An encoded price series.
///
/// Only `bytes` is persisted; the other fields restate what the header
/// already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlob {
    /// The encoded, byte-aligned data.
    pub bytes: Vec<u8>,
    /// Number of prices in this blob.
    pub point_count: u16,
    /// Number of zero bits appended to reach a byte boundary.
    pub pad_count: u8,
}

impl EncodedBlob {
    /// Returns the encoded bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the blob and returns the encoded bytes.
    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for EncodedBlob {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

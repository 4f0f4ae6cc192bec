use log::debug;
use rust_decimal::Decimal;

use crate::bitbuffer::BitReader;
use crate::format::{self, COUNT_BITS, HEADER_BITS, INITIAL_BITS, LEN_BITS, MAX_CENTS, PAD_BITS};

/// Error type for decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The stream ended before every announced price was reconstructed.
    #[error("stream truncated at bit {position}: {needed} more bits required")]
    TruncatedStream { position: usize, needed: usize },
    /// The blob violates the format (bad header, non-zero padding, a price
    /// outside the encodable range).
    #[error("corrupt blob: {0}")]
    CorruptBlob(String),
    /// Non-padding bits remain after the last record. The series itself
    /// decoded completely and is carried in `prices`.
    #[error("{extra_bits} unexpected bits after the last delta record")]
    TrailingData {
        extra_bits: usize,
        prices: Vec<Decimal>,
    },
    /// The requested window does not lie inside the series.
    #[error("window of {count} prices at {start} is outside a series of {point_count}")]
    RangeOutOfBounds {
        start: usize,
        count: usize,
        point_count: u16,
    },
}

impl DecodeError {
    /// Returns `false` for errors that still produced a complete series.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DecodeError::TrailingData { .. })
    }

    /// Returns the decoded prices carried by a non-fatal error.
    pub fn into_recovered(self) -> Option<Vec<Decimal>> {
        match self {
            DecodeError::TrailingData { prices, .. } => Some(prices),
            _ => None,
        }
    }
}

/// The fixed 46-bit blob header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobHeader {
    /// Zero bits appended after the last record.
    pub pad_count: u8,
    /// Number of prices in the blob.
    pub point_count: u16,
    /// First price, in cents.
    pub initial_cents: i64,
}

impl BlobHeader {
    /// First price of the series.
    pub fn initial_price(&self) -> Decimal {
        format::from_cents(self.initial_cents)
    }
}

/// The first `lookback + ticks` prices of a window, split the way a new
/// simulated stock consumes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedWindow {
    /// Prices already "seen" when the game starts, oldest first.
    pub past: Vec<Decimal>,
    /// Prices revealed one per tick.
    pub upcoming: Vec<Decimal>,
}

impl SeedWindow {
    /// Price the stock starts trading at.
    pub fn current_price(&self) -> Option<Decimal> {
        self.past.last().copied()
    }
}

/// The delta decoder.
///
/// Every price is a delta from its predecessor, so any access walks the
/// records from the start of the blob. Windowed decoding only avoids
/// allocating the prices before the window.
///
/// # Example
/// ```
/// use pricepack::{encode, Decoder};
/// use rust_decimal::Decimal;
///
/// let prices: Vec<Decimal> = [10000, 10050, 10050, 9975]
///     .iter()
///     .map(|c| Decimal::new(*c, 2))
///     .collect();
/// let blob = encode(&prices).unwrap();
///
/// assert_eq!(Decoder::decode_all(blob.as_bytes()).unwrap(), prices);
/// assert_eq!(Decoder::decode_window(blob.as_bytes(), 1, 2).unwrap(), &prices[1..3]);
/// ```
pub struct Decoder;

impl Decoder {
    /// Parses and validates the header.
    pub fn header(bytes: &[u8]) -> Result<BlobHeader, DecodeError> {
        read_header(bytes).map(|(header, _)| header)
    }

    /// Returns the number of prices in the blob without decoding them.
    pub fn point_count(bytes: &[u8]) -> Result<u16, DecodeError> {
        Self::header(bytes).map(|h| h.point_count)
    }

    /// Returns an iterator that lazily decodes every price.
    pub fn iter(bytes: &[u8]) -> Result<PriceIter<'_>, DecodeError> {
        let (header, reader) = read_header(bytes)?;
        Ok(PriceIter {
            reader,
            header,
            emitted: 0,
            prev_cents: 0,
            done: false,
        })
    }

    /// Decodes the whole series.
    ///
    /// Extra bits after the last record yield [`DecodeError::TrailingData`],
    /// which still carries the decoded series.
    pub fn decode_all(bytes: &[u8]) -> Result<Vec<Decimal>, DecodeError> {
        let mut iter = Self::iter(bytes)?;
        let mut prices = Vec::with_capacity(iter.header.point_count as usize);
        for price in iter.by_ref() {
            prices.push(price?);
        }

        let extra_bits = iter.reader.remaining();
        if extra_bits > 0 {
            return Err(DecodeError::TrailingData { extra_bits, prices });
        }
        debug!("decoded {} prices from {} bytes", prices.len(), bytes.len());
        Ok(prices)
    }

    /// Decodes the `count` prices at indices `start..start + count`.
    pub fn decode_window(
        bytes: &[u8],
        start: usize,
        count: usize,
    ) -> Result<Vec<Decimal>, DecodeError> {
        let mut iter = Self::iter(bytes)?;
        let point_count = iter.header.point_count;
        let in_bounds = start
            .checked_add(count)
            .map_or(false, |end| end <= point_count as usize);
        if count == 0 || !in_bounds {
            return Err(DecodeError::RangeOutOfBounds {
                start,
                count,
                point_count,
            });
        }

        let mut window = Vec::with_capacity(count);
        let mut index = 0;
        while window.len() < count {
            let cents = match iter.next_cents() {
                Some(cents) => cents?,
                None => break,
            };
            if index >= start {
                window.push(format::from_cents(cents));
            }
            index += 1;
        }
        debug!(
            "decoded window {}..{} of {} prices",
            start,
            start + window.len(),
            point_count
        );
        Ok(window)
    }

    /// Decodes `lookback + ticks` prices at `start` and splits them into the
    /// `lookback` past prices and the `ticks` upcoming ones. `lookback` must
    /// be at least one so there is a current price.
    pub fn seed_window(
        bytes: &[u8],
        start: usize,
        lookback: usize,
        ticks: usize,
    ) -> Result<SeedWindow, DecodeError> {
        let out_of_bounds = |point_count| DecodeError::RangeOutOfBounds {
            start,
            count: lookback.saturating_add(ticks),
            point_count,
        };
        if lookback == 0 {
            return Err(out_of_bounds(Self::point_count(bytes)?));
        }
        let count = match lookback.checked_add(ticks) {
            Some(count) => count,
            None => return Err(out_of_bounds(Self::point_count(bytes)?)),
        };

        let mut past = Self::decode_window(bytes, start, count)?;
        let upcoming = past.split_off(lookback);
        Ok(SeedWindow { past, upcoming })
    }
}

/// Reads the header and returns a reader positioned at the first delta
/// record whose logical end excludes the padding.
fn read_header(bytes: &[u8]) -> Result<(BlobHeader, BitReader<'_>), DecodeError> {
    let total_bits = bytes.len() * 8;
    if total_bits < HEADER_BITS {
        return Err(DecodeError::TruncatedStream {
            position: total_bits,
            needed: HEADER_BITS - total_bits,
        });
    }

    let pad_count = (bytes[0] >> (8 - PAD_BITS)) as usize;
    if HEADER_BITS + pad_count > total_bits {
        return Err(DecodeError::CorruptBlob(format!(
            "{pad_count} padding bits overlap the header"
        )));
    }
    let last = bytes[bytes.len() - 1];
    if last & ((1u16 << pad_count) - 1) as u8 != 0 {
        return Err(DecodeError::CorruptBlob(format!(
            "last {pad_count} padding bits are not zero"
        )));
    }

    let mut reader = BitReader::from_raw(bytes, total_bits - pad_count);
    take(&mut reader, PAD_BITS)?;
    let point_count = take(&mut reader, COUNT_BITS)? as u16;
    let initial_cents = take(&mut reader, INITIAL_BITS)? as i64;
    if point_count == 0 {
        return Err(DecodeError::CorruptBlob("point count is zero".into()));
    }

    let header = BlobHeader {
        pad_count: pad_count as u8,
        point_count,
        initial_cents,
    };
    Ok((header, reader))
}

#[inline]
fn take(reader: &mut BitReader<'_>, n: u8) -> Result<u64, DecodeError> {
    let position = reader.position();
    let remaining = reader.remaining();
    reader
        .read_bits(n)
        .ok_or_else(|| DecodeError::TruncatedStream {
            position,
            needed: n as usize - remaining,
        })
}

/// Decodes one delta record.
fn decode_delta(reader: &mut BitReader<'_>) -> Result<i64, DecodeError> {
    let len = take(reader, LEN_BITS)? as u8;
    if len == 0 {
        return Ok(0);
    }
    let non_negative = take(reader, 1)? == 1;
    let magnitude = (take(reader, len - 1)? | (1 << (len - 1))) as i64;
    Ok(if non_negative { magnitude } else { -magnitude })
}

/// A lazy iterator that yields the prices of a blob in order.
///
/// Yields exactly `point_count` items unless an error occurs, after which it
/// is fused.
#[derive(Debug, Clone)]
pub struct PriceIter<'a> {
    reader: BitReader<'a>,
    header: BlobHeader,
    emitted: usize,
    prev_cents: i64,
    done: bool,
}

impl<'a> PriceIter<'a> {
    /// The parsed header of the blob being decoded.
    pub fn header(&self) -> &BlobHeader {
        &self.header
    }

    fn next_cents(&mut self) -> Option<Result<i64, DecodeError>> {
        if self.done || self.emitted >= self.header.point_count as usize {
            return None;
        }

        let cents = if self.emitted == 0 {
            Ok(self.header.initial_cents)
        } else {
            decode_delta(&mut self.reader).and_then(|diff| {
                let cents = self.prev_cents + diff;
                if (0..=MAX_CENTS).contains(&cents) {
                    Ok(cents)
                } else {
                    Err(DecodeError::CorruptBlob(format!(
                        "price at index {} reconstructs to {} cents",
                        self.emitted, cents
                    )))
                }
            })
        };

        match cents {
            Ok(cents) => {
                self.prev_cents = cents;
                self.emitted += 1;
                Some(Ok(cents))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<'a> Iterator for PriceIter<'a> {
    type Item = Result<Decimal, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_cents().map(|r| r.map(format::from_cents))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let left = self.header.point_count as usize - self.emitted;
        (0, Some(left))
    }
}

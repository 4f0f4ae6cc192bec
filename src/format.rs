//! Blob layout constants and the cent/decimal conversions shared by the
//! encoder and decoder.
//!
//! ```text
//! | pad_count:3 | point_count:16 | initial_cents:27 | delta records ... | padding |
//! ```
//!
//! Each delta record is `bit_len:5`, then, when `bit_len > 0`, `sign:1`
//! (1 = non-negative) followed by `bit_len - 1` bits of `|diff|` with its
//! implicit leading 1 removed. Changing any width here breaks every blob
//! already written.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Width of the trailing-padding count field.
pub const PAD_BITS: u8 = 3;
/// Width of the point count field.
pub const COUNT_BITS: u8 = 16;
/// Width of the initial price field.
pub const INITIAL_BITS: u8 = 27;
/// Width of the per-record `bit_len` field.
pub const LEN_BITS: u8 = 5;

/// Bits occupied by the fixed header.
pub const HEADER_BITS: usize = (PAD_BITS + COUNT_BITS + INITIAL_BITS) as usize;
/// Bit offset of the point count field.
pub const COUNT_OFFSET: usize = PAD_BITS as usize;

/// Largest number of prices a blob can hold.
pub const MAX_POINTS: usize = (1 << COUNT_BITS) - 1;
/// Largest price, in cents, a blob can hold.
pub const MAX_CENTS: i64 = (1 << INITIAL_BITS) - 1;

/// Fractional digits carried by every price.
pub const PRICE_SCALE: u32 = 2;

/// Rounds `price` half-up to whole cents. Returns `None` if the value does
/// not fit an `i64` once scaled.
pub fn to_cents(price: Decimal) -> Option<i64> {
    price
        .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)?
        .to_i64()
}

/// Converts cents to a two-decimal price.
#[inline]
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, PRICE_SCALE)
}

/// Minimal number of bits needed for `magnitude`, i.e. `ceil(log2(m + 1))`.
/// Zero for zero.
#[inline]
pub fn bit_len(magnitude: u64) -> u8 {
    (u64::BITS - magnitude.leading_zeros()) as u8
}

/// Computes the padding needed to byte-align a stream of `total_bits`.
#[inline]
pub fn pad_count(total_bits: usize) -> u8 {
    ((8 - total_bits % 8) % 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_header_layout() {
        assert_eq!(HEADER_BITS, 46);
        assert_eq!(MAX_POINTS, 65_535);
        assert_eq!(MAX_CENTS, 134_217_727);
    }

    #[test]
    fn test_bit_len_is_minimal() {
        assert_eq!(bit_len(0), 0);
        assert_eq!(bit_len(1), 1);
        assert_eq!(bit_len(2), 2);
        assert_eq!(bit_len(3), 2);
        assert_eq!(bit_len(4), 3);
        assert_eq!(bit_len(50), 6);
        assert_eq!(bit_len(75), 7);
        assert_eq!(bit_len((1 << 31) - 1), 31);

        for m in 1..5_000u64 {
            let n = bit_len(m) as u32;
            assert!(1u64 << (n - 1) <= m && m < 1u64 << n, "m={m} n={n}");
        }
    }

    #[test]
    fn test_to_cents_rounds_half_up() {
        assert_eq!(to_cents(d("100.00")), Some(10_000));
        assert_eq!(to_cents(d("99.75")), Some(9_975));
        assert_eq!(to_cents(d("1.005")), Some(101));
        assert_eq!(to_cents(d("1.0049")), Some(100));
        assert_eq!(to_cents(d("0")), Some(0));
        assert_eq!(to_cents(d("12")), Some(1_200));
    }

    #[test]
    fn test_to_cents_overflow_is_none() {
        assert_eq!(to_cents(Decimal::MAX), None);
    }

    #[test]
    fn test_from_cents_keeps_two_places() {
        let p = from_cents(10_050);
        assert_eq!(p, d("100.50"));
        assert_eq!(p.to_string(), "100.50");
        assert_eq!(from_cents(0).to_string(), "0.00");
    }

    #[test]
    fn test_pad_count() {
        assert_eq!(pad_count(46), 2);
        assert_eq!(pad_count(48), 0);
        assert_eq!(pad_count(74), 6);
        assert_eq!(pad_count(81), 7);
    }
}

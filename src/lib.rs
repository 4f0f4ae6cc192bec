//! # pricepack
//!
//! A bit-packed delta codec for daily closing price series.
//!
//! ## Format overview
//!
//! Prices carry exactly two decimal places and are handled as integer cents.
//! A blob stores:
//!
//! - a 3-bit count of trailing padding bits, a 16-bit point count and the
//!   first price in a 27-bit field;
//! - one record per later price holding the cent difference from its
//!   predecessor: a 5-bit length, a sign bit, and the magnitude with its
//!   leading 1 bit dropped. An unchanged price costs 5 bits;
//! - zero padding up to a byte boundary.
//!
//! Deltas make the format sequential: decoding any window walks every record
//! before it, but only the window itself is allocated.
//!
//! ## Example
//!
//! ```rust
//! use pricepack::{encode, Decoder};
//! use rust_decimal::Decimal;
//!
//! let prices = vec![
//!     Decimal::new(10000, 2),
//!     Decimal::new(10050, 2),
//!     Decimal::new(10050, 2),
//!     Decimal::new(9975, 2),
//! ];
//!
//! // Compress
//! let blob = encode(&prices).unwrap();
//! println!("Compressed {} prices into {} bytes", blob.point_count, blob.bytes.len());
//!
//! // Decompress everything, or just a window
//! assert_eq!(Decoder::decode_all(blob.as_bytes()).unwrap(), prices);
//! assert_eq!(Decoder::decode_window(blob.as_bytes(), 2, 2).unwrap(), &prices[2..]);
//! ```
//!
//! ## Lazy iteration
//!
//! ```rust
//! # use pricepack::{encode, Decoder};
//! # use rust_decimal::Decimal;
//! # let blob = encode(&[Decimal::new(10000, 2), Decimal::new(10050, 2)]).unwrap();
//! for result in Decoder::iter(blob.as_bytes()).unwrap() {
//!     let price = result.unwrap();
//!     println!("{price}");
//! }
//! ```

pub mod bitbuffer;
pub mod decoder;
pub mod encoder;
pub mod format;
pub mod source;

// Re-export primary types at the crate root.
pub use decoder::{BlobHeader, DecodeError, Decoder, PriceIter, SeedWindow};
pub use encoder::{encode, EncodeError, EncodedBlob, Encoder};
pub use source::{read_close_prices, read_close_prices_from_path, SourceError};

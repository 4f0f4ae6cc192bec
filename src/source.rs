//! Loading raw daily closing prices from historical CSV tables.

use std::io;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;

/// Column holding the daily close in the raw quote tables.
pub const DEFAULT_CLOSE_COLUMN: &str = "<CLOSE>";

/// Error type for reading price tables.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("column {0:?} not found in header")]
    MissingColumn(String),
    #[error("row {row}: {value:?} is not a price")]
    InvalidPrice { row: usize, value: String },
}

/// Reads the `column` of a headed CSV table as prices, in row order.
/// Row numbers in errors are 1-based and exclude the header.
pub fn read_close_prices<R: io::Read>(reader: R, column: &str) -> Result<Vec<Decimal>, SourceError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let index = rdr
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| SourceError::MissingColumn(column.to_string()))?;

    let mut prices = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let raw = record.get(index).unwrap_or("").trim();
        let price = Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .map_err(|_| SourceError::InvalidPrice {
                row: row + 1,
                value: raw.to_string(),
            })?;
        prices.push(price);
    }
    Ok(prices)
}

/// Reads prices from the CSV file at `path`.
pub fn read_close_prices_from_path<P: AsRef<Path>>(
    path: P,
    column: &str,
) -> Result<Vec<Decimal>, SourceError> {
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    read_close_prices(io::BufReader::new(file), column)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTES: &str = "\
<TICKER>,<PER>,<DATE>,<TIME>,<OPEN>,<HIGH>,<LOW>,<CLOSE>,<VOL>,<OPENINT>
AAPL.US,D,19840907,000000,0.42388,0.42902,0.41874,0.42388,23220030,0
AAPL.US,D,19840910,000000,0.42388,0.42516,0.41366,0.42134,18022532,0
AAPL.US,D,19840911,000000,0.42516,0.43668,0.42516,0.42902,42498199,0
";

    #[test]
    fn test_reads_close_column() {
        let prices = read_close_prices(QUOTES.as_bytes(), DEFAULT_CLOSE_COLUMN).unwrap();
        let expected: Vec<Decimal> = ["0.42388", "0.42134", "0.42902"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        assert_eq!(prices, expected);
    }

    #[test]
    fn test_named_column() {
        let data = "Date,Close/Last\n2024-01-02, 248.42\n2024-01-03,238.45\n";
        let prices = read_close_prices(data.as_bytes(), "Close/Last").unwrap();
        assert_eq!(prices, vec![Decimal::new(24842, 2), Decimal::new(23845, 2)]);
    }

    #[test]
    fn test_missing_column() {
        let err = read_close_prices("a,b\n1,2\n".as_bytes(), DEFAULT_CLOSE_COLUMN).unwrap_err();
        assert!(matches!(err, SourceError::MissingColumn(c) if c == "<CLOSE>"));
    }

    #[test]
    fn test_invalid_price() {
        let data = "<CLOSE>\n1.00\nn/a\n";
        let err = read_close_prices(data.as_bytes(), DEFAULT_CLOSE_COLUMN).unwrap_err();
        match err {
            SourceError::InvalidPrice { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = read_close_prices_from_path("/nonexistent/quotes.csv", "<CLOSE>").unwrap_err();
        assert!(matches!(err, SourceError::Csv(_)));
    }
}

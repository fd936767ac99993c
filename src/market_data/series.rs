// =============================================================================
// OHLCV Series — validated, immutable input of the indicator engine
// =============================================================================
//
// `OhlcvSeries::new` is the only way to build a series, so every series that
// reaches the engine already satisfies the schema contract:
//   - at least one row
//   - strictly increasing timestamps
//   - finite, positive prices with low <= min(open, close) <= max(open, close) <= high
//   - finite, non-negative volume
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Whether the timestamp column carries calendar dates or exact instants.
///
/// Date-kind series have every timestamp at midnight UTC of the trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampKind {
    Date,
    DateTime,
}

/// Violations of the OHLCV schema contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("series is empty")]
    Empty,

    #[error("row {row}: timestamp {timestamp} is not after the previous row")]
    NonIncreasingTimestamp { row: usize, timestamp: DateTime<Utc> },

    #[error("row {row}: {field} must be a finite positive price, got {value}")]
    InvalidPrice {
        row: usize,
        field: &'static str,
        value: f64,
    },

    #[error("row {row}: expected low <= open/close <= high (o={open}, h={high}, l={low}, c={close})")]
    InconsistentRange {
        row: usize,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("row {row}: volume must be finite and non-negative, got {value}")]
    InvalidVolume { row: usize, value: f64 },
}

/// Ordered, validated OHLCV rows for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OhlcvSeries {
    symbol: String,
    timestamp_kind: TimestampKind,
    bars: Vec<OhlcvBar>,
}

impl OhlcvSeries {
    /// Validate `bars` against the schema contract and wrap them.
    pub fn new(
        symbol: impl Into<String>,
        timestamp_kind: TimestampKind,
        bars: Vec<OhlcvBar>,
    ) -> Result<Self, SchemaError> {
        if bars.is_empty() {
            return Err(SchemaError::Empty);
        }

        for (row, bar) in bars.iter().enumerate() {
            validate_bar(row, bar)?;
            if row > 0 && bar.timestamp <= bars[row - 1].timestamp {
                return Err(SchemaError::NonIncreasingTimestamp {
                    row,
                    timestamp: bar.timestamp,
                });
            }
        }

        Ok(Self {
            symbol: symbol.into(),
            timestamp_kind,
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timestamp_kind(&self) -> TimestampKind {
        self.timestamp_kind
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    /// Number of rows. Never zero.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> &OhlcvBar {
        // Non-empty by construction.
        &self.bars[self.bars.len() - 1]
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}

fn validate_bar(row: usize, bar: &OhlcvBar) -> Result<(), SchemaError> {
    for (field, value) in [
        ("open", bar.open),
        ("high", bar.high),
        ("low", bar.low),
        ("close", bar.close),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(SchemaError::InvalidPrice { row, field, value });
        }
    }

    let body_low = bar.open.min(bar.close);
    let body_high = bar.open.max(bar.close);
    if bar.low > body_low || body_high > bar.high {
        return Err(SchemaError::InconsistentRange {
            row,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        });
    }

    if !bar.volume.is_finite() || bar.volume < 0.0 {
        return Err(SchemaError::InvalidVolume {
            row,
            value: bar.volume,
        });
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::{Duration, TimeZone};

    /// Daily bars at midnight UTC starting 2024-01-01, one per close, with
    /// `high = close + 1`, `low = close - 1` and `open = close`.
    pub fn daily_series(closes: &[f64], volumes: &[f64]) -> OhlcvSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&close, &volume))| OhlcvBar {
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume,
            })
            .collect();
        OhlcvSeries::new("TEST", TimestampKind::Date, bars).expect("valid synthetic series")
    }

    /// Close = 100, 101, ... with constant volume 1000.
    pub fn rising_series(rows: usize) -> OhlcvSeries {
        let closes: Vec<f64> = (0..rows).map(|i| 100.0 + i as f64).collect();
        daily_series(&closes, &vec![1000.0; rows])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(day: u32, open: f64, high: f64, low: f64, close: f64, volume: f64) -> OhlcvBar {
        OhlcvBar {
            timestamp: Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn accepts_valid_rows() {
        let series = OhlcvSeries::new(
            "GME",
            TimestampKind::Date,
            vec![
                bar(1, 10.0, 11.0, 9.5, 10.5, 1_000.0),
                bar(2, 10.5, 12.0, 10.0, 11.8, 0.0),
            ],
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![10.5, 11.8]);
        assert_eq!(series.last().close, 11.8);
    }

    #[test]
    fn rejects_empty() {
        let err = OhlcvSeries::new("GME", TimestampKind::Date, Vec::new()).unwrap_err();
        assert_eq!(err, SchemaError::Empty);
    }

    #[test]
    fn rejects_out_of_order_timestamps() {
        let err = OhlcvSeries::new(
            "GME",
            TimestampKind::Date,
            vec![
                bar(2, 10.0, 11.0, 9.0, 10.0, 1.0),
                bar(2, 10.0, 11.0, 9.0, 10.0, 1.0),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::NonIncreasingTimestamp { row: 1, .. }));
    }

    #[test]
    fn rejects_close_above_high() {
        let err = OhlcvSeries::new(
            "GME",
            TimestampKind::Date,
            vec![bar(1, 10.0, 11.0, 9.0, 11.5, 1.0)],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InconsistentRange { row: 0, .. }));
    }

    #[test]
    fn rejects_non_positive_or_nan_prices() {
        let err = OhlcvSeries::new(
            "GME",
            TimestampKind::Date,
            vec![bar(1, 0.0, 11.0, 0.0, 10.0, 1.0)],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPrice { field: "open", .. }));

        let err = OhlcvSeries::new(
            "GME",
            TimestampKind::Date,
            vec![bar(1, 10.0, f64::NAN, 9.0, 10.0, 1.0)],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPrice { field: "high", .. }));
    }

    #[test]
    fn rejects_negative_volume() {
        let err = OhlcvSeries::new(
            "GME",
            TimestampKind::Date,
            vec![bar(1, 10.0, 11.0, 9.0, 10.0, -5.0)],
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::InvalidVolume { row: 0, value: -5.0 });
    }
}

// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
//   SMA_t = (close_{t-period+1} + ... + close_t) / period
//
// Each window is summed directly rather than with a running sum so the value
// at every row is exactly the mean of its window.

use super::{align, require, Column, ComputationError};

/// Compact SMA series; the first value belongs to index `period - 1`.
pub fn calculate_sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

/// Row-aligned SMA; undefined for the first `period - 1` rows.
pub fn sma_column(closes: &[f64], period: usize) -> Result<Column, ComputationError> {
    require("SMA", period, period, closes.len())?;
    Ok(align(calculate_sma(closes, period), closes.len()))
}

/// Row-aligned SMA over a column that may itself contain undefined rows.
///
/// A window is defined only when all of its values are.
pub fn sma_of_column(values: &[Option<f64>], period: usize) -> Column {
    if period == 0 || values.len() < period {
        return vec![None; values.len()];
    }
    let compact = values.windows(period).map(|w| {
        w.iter()
            .copied()
            .sum::<Option<f64>>()
            .map(|sum| sum / period as f64)
    });
    let mut column = vec![None; period - 1];
    column.extend(compact);
    column
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_close;

    #[test]
    fn sma_window_means() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0];
        let col = sma_column(&closes, 3).unwrap();
        assert_eq!(col.len(), 5);
        assert_eq!(&col[..2], &[None, None]);
        assert_close(col[2], 11.0);
        assert_close(col[3], 12.0);
        assert_close(col[4], 13.0);
    }

    #[test]
    fn sma_twenty_on_rising_closes() {
        let closes: Vec<f64> = (100..130).map(|x| x as f64).collect();
        let col = sma_column(&closes, 20).unwrap();
        assert!(col[..19].iter().all(Option::is_none));
        assert_close(col[19], 109.5);
        assert_close(col[29], 119.5);
    }

    #[test]
    fn sma_insufficient_data() {
        assert!(matches!(
            sma_column(&[1.0, 2.0], 3),
            Err(ComputationError::InsufficientData { required: 3, available: 2, .. })
        ));
    }

    #[test]
    fn sma_of_column_skips_undefined_windows() {
        let values = [None, Some(3.0), Some(6.0), Some(9.0)];
        let col = sma_of_column(&values, 2);
        assert_eq!(col.len(), 4);
        assert_eq!(col[0], None);
        assert_eq!(col[1], None);
        assert_close(col[2], 4.5);
        assert_close(col[3], 7.5);
    }
}

// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The very first EMA value is seeded with the SMA of the first `period` values,
// so the column is undefined for the first `period - 1` rows.
// =============================================================================

use super::{align, require, Column, ComputationError};

/// Compute the EMA series for `values` and look-back `period`.
///
/// Returns an empty `Vec` when the input is too short or the period is zero.
/// Each output element corresponds to an input starting at index `period - 1`.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period + 1) as f64;
    let seed = values[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(seed);

    let mut prev = seed;
    for &value in &values[period..] {
        let ema = value * multiplier + prev * (1.0 - multiplier);
        result.push(ema);
        prev = ema;
    }

    result
}

/// Row-aligned EMA of the close column.
pub fn ema_column(closes: &[f64], period: usize) -> Result<Column, ComputationError> {
    require("EMA", period, period, closes.len())?;
    Ok(align(calculate_ema(closes, period), closes.len()))
}

// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   MACD      = EMA(fast) - EMA(slow)
//   signal    = EMA(signal_period) of the MACD line
//   histogram = MACD - signal
//
// With 12/26/9 the line is defined from row 25 and signal/histogram from
// row 33. The signal EMA runs over the defined part of the line only.
// =============================================================================

use super::ema::calculate_ema;
use super::{align, require, Column, ComputationError};

/// Row-aligned MACD line, signal and histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdColumns {
    pub macd: Column,
    pub signal: Column,
    pub histogram: Column,
}

/// Compute MACD columns. `fast` must be shorter than `slow`.
pub fn macd_columns(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<MacdColumns, ComputationError> {
    if fast >= slow {
        return Err(ComputationError::InvalidParameter {
            indicator: "MACD",
            reason: format!("fast period {fast} must be shorter than slow period {slow}"),
        });
    }
    require("MACD", fast.min(signal), slow, closes.len())?;

    let total = closes.len();
    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);

    // Both compact series end on the last row; align on the slow one.
    let offset = slow - fast;
    let line: Vec<f64> = slow_ema
        .iter()
        .zip(&fast_ema[offset..])
        .map(|(s, f)| f - s)
        .collect();

    let signal_line = calculate_ema(&line, signal);
    let histogram: Vec<f64> = signal_line
        .iter()
        .zip(&line[line.len() - signal_line.len()..])
        .map(|(s, m)| m - s)
        .collect();

    Ok(MacdColumns {
        macd: align(line, total),
        signal: align(signal_line, total),
        histogram: align(histogram, total),
    })
}

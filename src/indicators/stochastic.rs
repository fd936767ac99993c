// =============================================================================
// Stochastic Oscillator (%K / %D)
// =============================================================================
//
//   %K = 100 * (close - lowest_low_n) / (highest_high_n - lowest_low_n)
//   %D = SMA(d_period) of %K
//
// %K is undefined where the window's range is zero; %D is undefined unless
// every %K in its window is defined.
// =============================================================================

use super::sma::sma_of_column;
use super::{require, rolling_max, rolling_min, Column, ComputationError};

#[derive(Debug, Clone, PartialEq)]
pub struct StochasticColumns {
    pub k: Column,
    pub d: Column,
}

pub fn stochastic_columns(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> Result<StochasticColumns, ComputationError> {
    require("Stochastic", k_period.min(d_period), k_period, closes.len())?;

    let highest = rolling_max(highs, k_period);
    let lowest = rolling_min(lows, k_period);

    let k: Column = closes
        .iter()
        .zip(highest.iter().zip(&lowest))
        .map(|(&close, (hh, ll))| {
            let (hh, ll) = ((*hh)?, (*ll)?);
            let range = hh - ll;
            (range != 0.0).then(|| 100.0 * (close - ll) / range)
        })
        .collect();

    let d = sma_of_column(&k, d_period);
    Ok(StochasticColumns { k, d })
}

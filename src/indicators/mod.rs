// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the panel's indicators. Every
// `*_column` function returns a row-aligned `Column` (one `Option<f64>` per
// input row, `None` during warm-up) or a `ComputationError` when its window
// cannot be satisfied at all. The engine turns such errors into all-undefined
// columns so the panel keeps its shape.

pub mod bollinger;
pub mod ema;
pub mod fear_greed;
pub mod ichimoku;
pub mod macd;
pub mod obv;
pub mod parabolic_sar;
pub mod rsi;
pub mod sma;
pub mod stochastic;

use thiserror::Error;

/// One value per input row; `None` where the indicator is undefined.
pub type Column = Vec<Option<f64>>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    #[error("{indicator} needs at least {required} rows, got {available}")]
    InsufficientData {
        indicator: &'static str,
        required: usize,
        available: usize,
    },

    #[error("{indicator}: {reason}")]
    InvalidParameter {
        indicator: &'static str,
        reason: String,
    },
}

/// Fail unless `period` is non-zero and `available >= required`.
pub(crate) fn require(
    indicator: &'static str,
    period: usize,
    required: usize,
    available: usize,
) -> Result<(), ComputationError> {
    if period == 0 {
        return Err(ComputationError::InvalidParameter {
            indicator,
            reason: "period must be greater than zero".to_string(),
        });
    }
    if available < required {
        return Err(ComputationError::InsufficientData {
            indicator,
            required,
            available,
        });
    }
    Ok(())
}

/// Left-pad a compact series (first value belongs to row `total - len`) with
/// `None` so it lines up with the input rows.
pub(crate) fn align(compact: Vec<f64>, total: usize) -> Column {
    let pad = total.saturating_sub(compact.len());
    let mut column = vec![None; pad];
    column.extend(compact.into_iter().map(Some));
    column
}

/// Highest value of each trailing `period` window, row-aligned.
pub(crate) fn rolling_max(values: &[f64], period: usize) -> Column {
    rolling(values, period, |w| w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Lowest value of each trailing `period` window, row-aligned.
pub(crate) fn rolling_min(values: &[f64], period: usize) -> Column {
    rolling(values, period, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

fn rolling(values: &[f64], period: usize, reduce: impl Fn(&[f64]) -> f64) -> Column {
    if period == 0 || values.len() < period {
        return vec![None; values.len()];
    }
    align(values.windows(period).map(reduce).collect(), values.len())
}

#[cfg(test)]
pub(crate) fn assert_close(actual: Option<f64>, expected: f64) {
    let value = actual.unwrap_or_else(|| panic!("expected {expected}, got undefined"));
    assert!(
        (value - expected).abs() < 1e-9,
        "expected {expected}, got {value}"
    );
}

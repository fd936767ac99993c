// =============================================================================
// Bollinger Bands
// =============================================================================
//
//   Middle = SMA(period)
//   Upper  = Middle + multiplier * σ
//   Lower  = Middle - multiplier * σ
//
// σ is the population standard deviation of the window (divide by n).
// =============================================================================

use super::sma::calculate_sma;
use super::{align, require, Column, ComputationError};

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerColumns {
    pub upper: Column,
    pub lower: Column,
}

/// Population standard deviation of each trailing window; compact series.
fn rolling_std(values: &[f64], period: usize, means: &[f64]) -> Vec<f64> {
    values
        .windows(period)
        .zip(means)
        .map(|(w, &mean)| {
            let variance = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
            variance.sqrt()
        })
        .collect()
}

pub fn bollinger_columns(
    closes: &[f64],
    period: usize,
    multiplier: f64,
) -> Result<BollingerColumns, ComputationError> {
    require("Bollinger", period, period, closes.len())?;
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(ComputationError::InvalidParameter {
            indicator: "Bollinger",
            reason: format!("multiplier must be finite and non-negative, got {multiplier}"),
        });
    }

    let means = calculate_sma(closes, period);
    let stds = rolling_std(closes, period, &means);

    let (upper, lower): (Vec<f64>, Vec<f64>) = means
        .iter()
        .zip(&stds)
        .map(|(m, s)| (m + multiplier * s, m - multiplier * s))
        .unzip();

    Ok(BollingerColumns {
        upper: align(upper, closes.len()),
        lower: align(lower, closes.len()),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_close;

    #[test]
    fn flat_series_collapses_bands() {
        let b = bollinger_columns(&[100.0; 25], 20, 2.0).unwrap();
        assert!(b.upper[..19].iter().all(Option::is_none));
        assert_close(b.upper[19], 100.0);
        assert_close(b.lower[24], 100.0);
    }

    #[test]
    fn known_population_std() {
        // Mean 5, population σ = 2.
        let closes = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let b = bollinger_columns(&closes, 8, 2.0).unwrap();
        assert_close(b.upper[7], 9.0);
        assert_close(b.lower[7], 1.0);
    }

    #[test]
    fn bands_surround_mean() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0).collect();
        let b = bollinger_columns(&closes, 20, 2.0).unwrap();
        let means = calculate_sma(&closes, 20);
        for (i, mean) in means.iter().enumerate() {
            let row = i + 19;
            assert!(b.upper[row].unwrap() >= *mean);
            assert!(b.lower[row].unwrap() <= *mean);
        }
    }

    #[test]
    fn rejects_negative_multiplier() {
        assert!(matches!(
            bollinger_columns(&[1.0; 30], 20, -1.0),
            Err(ComputationError::InvalidParameter { .. })
        ));
    }
}

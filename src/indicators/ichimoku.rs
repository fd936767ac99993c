// =============================================================================
// Ichimoku Cloud
// =============================================================================
//
//   conversion = (max High_9  + min Low_9)  / 2
//   base       = (max High_26 + min Low_26) / 2
//   span A     = (conversion + base) / 2, shifted forward 26 rows
//   span B     = (max High_52 + min Low_52) / 2, shifted forward 26 rows
//
// The shift stays inside the input's rows: span A at row i is the raw value
// at row i - 26. No future rows are appended.
// =============================================================================

use super::{require, rolling_max, rolling_min, Column, ComputationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IchimokuPeriods {
    pub conversion: usize,
    pub base: usize,
    pub span_b: usize,
    pub displacement: usize,
}

impl Default for IchimokuPeriods {
    fn default() -> Self {
        Self {
            conversion: 9,
            base: 26,
            span_b: 52,
            displacement: 26,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IchimokuColumns {
    pub conversion: Column,
    pub base: Column,
    pub span_a: Column,
    pub span_b: Column,
}

fn midpoint(highs: &[f64], lows: &[f64], period: usize) -> Column {
    rolling_max(highs, period)
        .into_iter()
        .zip(rolling_min(lows, period))
        .map(|(hh, ll)| Some((hh? + ll?) / 2.0))
        .collect()
}

fn shift_forward(column: Column, rows: usize) -> Column {
    let len = column.len();
    let mut shifted = vec![None; rows.min(len)];
    shifted.extend(column.into_iter().take(len.saturating_sub(rows)));
    shifted
}

/// Compute the four Ichimoku lines.
///
/// Only the conversion window has to fit; longer windows simply stay
/// undefined on short series.
pub fn ichimoku_columns(
    highs: &[f64],
    lows: &[f64],
    periods: IchimokuPeriods,
) -> Result<IchimokuColumns, ComputationError> {
    let shortest = periods
        .conversion
        .min(periods.base)
        .min(periods.span_b);
    require("Ichimoku", shortest, periods.conversion, highs.len())?;

    let conversion = midpoint(highs, lows, periods.conversion);
    let base = midpoint(highs, lows, periods.base);
    let raw_a: Column = conversion
        .iter()
        .zip(&base)
        .map(|(c, b)| Some(((*c)? + (*b)?) / 2.0))
        .collect();
    let raw_b = midpoint(highs, lows, periods.span_b);

    Ok(IchimokuColumns {
        span_a: shift_forward(raw_a, periods.displacement),
        span_b: shift_forward(raw_b, periods.displacement),
        conversion,
        base,
    })
}

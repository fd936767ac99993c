// =============================================================================
// Fear & Greed composite score
// =============================================================================
//
// Three components, each min/max-normalised to 0..100 over the whole series:
//
//   rsi_norm = rescale(RSI)
//   sma_norm = rescale(close / SMA - 1)
//   vol_norm = rescale(volume)
//
//   score    = (rsi_norm + sma_norm + vol_norm) / 3
//
// `rescale(x) = (x - lo) / (hi - lo) * 100` with lo/hi taken over the
// component's defined rows. A component with lo == hi maps to 50. The score
// is defined on rows where all three components are.
// =============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Column;

const NEUTRAL: f64 = 50.0;

/// Normalise a column to 0..100 using its own defined min and max.
pub fn rescale(column: &[Option<f64>]) -> Column {
    let (lo, hi) = column
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let range = hi - lo;
    column
        .iter()
        .map(|v| {
            v.map(|x| {
                if range > 0.0 {
                    (x - lo) / range * 100.0
                } else {
                    NEUTRAL
                }
            })
        })
        .collect()
}

/// Deviation of close from its SMA, `close / sma - 1`.
pub fn sma_deviation(closes: &[f64], sma: &[Option<f64>]) -> Column {
    closes
        .iter()
        .zip(sma)
        .map(|(&close, sma)| match sma {
            Some(s) if *s != 0.0 => Some(close / s - 1.0),
            _ => None,
        })
        .collect()
}

/// Row-aligned composite score from an RSI column, closes, an SMA column and
/// volumes.
pub fn fear_greed_column(
    rsi: &[Option<f64>],
    closes: &[f64],
    sma: &[Option<f64>],
    volumes: &[f64],
) -> Column {
    let rsi_norm = rescale(rsi);
    let sma_norm = rescale(&sma_deviation(closes, sma));
    let volume_col: Column = volumes.iter().copied().map(Some).collect();
    let vol_norm = rescale(&volume_col);

    rsi_norm
        .iter()
        .zip(&sma_norm)
        .zip(&vol_norm)
        .map(|((r, s), v)| Some(((*r)? + (*s)? + (*v)?) / 3.0))
        .collect()
}

/// Gauge band a score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FearGreedLevel {
    #[serde(rename = "Extreme Fear")]
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    #[serde(rename = "Extreme Greed")]
    ExtremeGreed,
}

impl FearGreedLevel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < 20.0 => Self::ExtremeFear,
            s if s < 40.0 => Self::Fear,
            s if s < 60.0 => Self::Neutral,
            s if s < 80.0 => Self::Greed,
            _ => Self::ExtremeGreed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ExtremeFear => "Extreme Fear",
            Self::Fear => "Fear",
            Self::Neutral => "Neutral",
            Self::Greed => "Greed",
            Self::ExtremeGreed => "Extreme Greed",
        }
    }
}

impl fmt::Display for FearGreedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

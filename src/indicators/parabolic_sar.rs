// =============================================================================
// Parabolic SAR (Stop And Reverse)
// =============================================================================
//
//   SAR_t = SAR_{t-1} + AF * (EP - SAR_{t-1})      (up-trend)
//   SAR_t = SAR_{t-1} - AF * (SAR_{t-1} - EP)      (down-trend)
//
// EP is the extreme point of the current trend (highest high / lowest low).
// AF starts at `step`, grows by `step` on every new EP and is capped at
// `max_step`. The trend flips when price crosses the projected SAR; the SAR
// then jumps to the old EP and AF resets.
//
// Without a reversal the SAR may not cross the two prior bars: in an
// up-trend it becomes Low[t-2] if that is below it, else Low[t-1] if that
// is; a down-trend does the same with the highs.
//
// Iteration starts at row 2 in an up-trend with EP = High[0] and the seed
// SAR = Close[1]. Rows 0 and 1 are undefined.
// =============================================================================

use super::{require, Column, ComputationError};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SarParams {
    pub step: f64,
    pub max_step: f64,
}

impl Default for SarParams {
    fn default() -> Self {
        Self {
            step: 0.02,
            max_step: 0.20,
        }
    }
}

pub fn parabolic_sar_column(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    params: SarParams,
) -> Result<Column, ComputationError> {
    let SarParams { step, max_step } = params;
    if !(step > 0.0 && step.is_finite() && max_step >= step && max_step.is_finite()) {
        return Err(ComputationError::InvalidParameter {
            indicator: "Parabolic SAR",
            reason: format!("need 0 < step <= max_step, got step {step}, max {max_step}"),
        });
    }
    require("Parabolic SAR", 1, 3, closes.len())?;

    let n = closes.len();
    let mut column: Column = vec![None; n];

    let mut up_trend = true;
    let mut af = step;
    let mut trend_high = highs[0];
    let mut trend_low = lows[0];
    let mut prev_sar = closes[1];

    for i in 2..n {
        let mut sar;
        let mut reversal = false;

        if up_trend {
            sar = prev_sar + af * (trend_high - prev_sar);
            if lows[i] < sar {
                reversal = true;
                sar = trend_high;
                trend_low = lows[i];
                af = step;
            } else {
                if highs[i] > trend_high {
                    trend_high = highs[i];
                    af = (af + step).min(max_step);
                }
                // Low[i-2] is checked first; Low[i-1] only when it does not apply.
                if lows[i - 2] < sar {
                    sar = lows[i - 2];
                } else if lows[i - 1] < sar {
                    sar = lows[i - 1];
                }
            }
        } else {
            sar = prev_sar - af * (prev_sar - trend_low);
            if highs[i] > sar {
                reversal = true;
                sar = trend_low;
                trend_high = highs[i];
                af = step;
            } else {
                if lows[i] < trend_low {
                    trend_low = lows[i];
                    af = (af + step).min(max_step);
                }
                if highs[i - 2] > sar {
                    sar = highs[i - 2];
                } else if highs[i - 1] > sar {
                    sar = highs[i - 1];
                }
            }
        }

        if reversal {
            up_trend = !up_trend;
        }
        column[i] = Some(sar);
        prev_sar = sar;
    }

    Ok(column)
}

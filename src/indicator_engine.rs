// =============================================================================
// Indicator Engine — OHLCV series in, full indicator panel out
// =============================================================================
//
// `IndicatorEngine::compute` is pure and deterministic: the same series and
// parameters always give the same panel. Each indicator is computed
// independently; one whose window cannot be satisfied leaves its columns
// all-undefined and the rest of the panel is still produced.
//
// The Fear/Greed score is derived from the RSI and SMA columns computed here,
// so it inherits their warm-up rows.
// =============================================================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicators::bollinger::bollinger_columns;
use crate::indicators::ema::ema_column;
use crate::indicators::fear_greed::fear_greed_column;
use crate::indicators::ichimoku::{ichimoku_columns, IchimokuPeriods};
use crate::indicators::macd::macd_columns;
use crate::indicators::obv::obv_column;
use crate::indicators::parabolic_sar::{parabolic_sar_column, SarParams};
use crate::indicators::rsi::rsi_column;
use crate::indicators::sma::sma_column;
use crate::indicators::stochastic::stochastic_columns;
use crate::indicators::ComputationError;
use crate::market_data::OhlcvSeries;
use crate::panel::{IndicatorColumn, IndicatorPanel};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_sma_window() -> usize {
    20
}

fn default_ema_window() -> usize {
    20
}

fn default_rsi_window() -> usize {
    14
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

fn default_stoch_window() -> usize {
    14
}

fn default_stoch_smooth() -> usize {
    3
}

fn default_bollinger_window() -> usize {
    20
}

fn default_bollinger_dev() -> f64 {
    2.0
}

// =============================================================================
// IndicatorParams
// =============================================================================

/// Windows and multipliers for every indicator in the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    /// SMA window; also the baseline of the Fear/Greed SMA deviation.
    #[serde(default = "default_sma_window")]
    pub sma_window: usize,

    #[serde(default = "default_ema_window")]
    pub ema_window: usize,

    /// RSI window; also feeds the Fear/Greed score.
    #[serde(default = "default_rsi_window")]
    pub rsi_window: usize,

    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    /// %K look-back.
    #[serde(default = "default_stoch_window")]
    pub stoch_window: usize,

    /// %D smoothing window.
    #[serde(default = "default_stoch_smooth")]
    pub stoch_smooth: usize,

    #[serde(default = "default_bollinger_window")]
    pub bollinger_window: usize,

    /// Band width in standard deviations.
    #[serde(default = "default_bollinger_dev")]
    pub bollinger_dev: f64,

    #[serde(default)]
    pub ichimoku: IchimokuPeriods,

    #[serde(default)]
    pub sar: SarParams,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_window: default_sma_window(),
            ema_window: default_ema_window(),
            rsi_window: default_rsi_window(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            stoch_window: default_stoch_window(),
            stoch_smooth: default_stoch_smooth(),
            bollinger_window: default_bollinger_window(),
            bollinger_dev: default_bollinger_dev(),
            ichimoku: IchimokuPeriods::default(),
            sar: SarParams::default(),
        }
    }
}

// =============================================================================
// IndicatorEngine
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    params: IndicatorParams,
}

/// Unwrap an indicator result, logging and discarding a computation error.
fn recover<T>(
    symbol: &str,
    result: Result<T, ComputationError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(symbol, error = %e, "indicator left undefined");
            None
        }
    }
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        Self { params }
    }

    /// Compute every indicator column for `series`.
    pub fn compute(&self, series: Arc<OhlcvSeries>) -> IndicatorPanel {
        let p = &self.params;
        let symbol = series.symbol().to_string();
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();
        let volumes = series.volumes();

        let mut panel = IndicatorPanel::new(series);

        if let Some(col) = recover(&symbol, sma_column(&closes, p.sma_window)) {
            panel.set(IndicatorColumn::Sma, col);
        }
        if let Some(col) = recover(&symbol, ema_column(&closes, p.ema_window)) {
            panel.set(IndicatorColumn::Ema, col);
        }
        if let Some(col) = recover(&symbol, rsi_column(&closes, p.rsi_window)) {
            panel.set(IndicatorColumn::Rsi, col);
        }
        if let Some(m) = recover(
            &symbol,
            macd_columns(&closes, p.macd_fast, p.macd_slow, p.macd_signal),
        ) {
            panel.set(IndicatorColumn::Macd, m.macd);
            panel.set(IndicatorColumn::MacdSignal, m.signal);
            panel.set(IndicatorColumn::MacdHist, m.histogram);
        }
        if let Some(s) = recover(
            &symbol,
            stochastic_columns(&highs, &lows, &closes, p.stoch_window, p.stoch_smooth),
        ) {
            panel.set(IndicatorColumn::Stoch, s.k);
            panel.set(IndicatorColumn::StochSignal, s.d);
        }
        if let Some(b) = recover(
            &symbol,
            bollinger_columns(&closes, p.bollinger_window, p.bollinger_dev),
        ) {
            panel.set(IndicatorColumn::BbHigh, b.upper);
            panel.set(IndicatorColumn::BbLow, b.lower);
        }
        if let Some(ichi) = recover(&symbol, ichimoku_columns(&highs, &lows, p.ichimoku)) {
            panel.set(IndicatorColumn::IchimokuA, ichi.span_a);
            panel.set(IndicatorColumn::IchimokuB, ichi.span_b);
            panel.set(IndicatorColumn::IchimokuBase, ichi.base);
            panel.set(IndicatorColumn::IchimokuConv, ichi.conversion);
        }
        if let Some(col) = recover(&symbol, parabolic_sar_column(&highs, &lows, &closes, p.sar)) {
            panel.set(IndicatorColumn::ParabolicSar, col);
        }
        if let Some(col) = recover(&symbol, obv_column(&closes, &volumes)) {
            panel.set(IndicatorColumn::Obv, col);
        }

        let score = fear_greed_column(
            panel.column(IndicatorColumn::Rsi),
            &closes,
            panel.column(IndicatorColumn::Sma),
            &volumes,
        );
        panel.set(IndicatorColumn::FearGreedIndex, score);

        debug!(
            symbol = %symbol,
            rows = panel.rows(),
            "indicator panel computed"
        );
        panel
    }
}

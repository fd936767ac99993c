// =============================================================================
// Indicator Panel — the OHLCV series extended with derived columns
// =============================================================================
//
// Every panel carries one column per `IndicatorColumn`, each with exactly as
// many rows as the underlying series. Rows an indicator cannot fill hold
// `None`, serialised as JSON `null`.
//
// Columnar JSON layout produced by `PanelView`:
//
//   {
//     "symbol": "GME",
//     "timestamp_kind": "Date",
//     "rows": 30,
//     "columns": {
//       "timestamp": ["2024-01-02", ...],
//       "Open": [...], "High": [...], "Low": [...], "Close": [...], "Volume": [...],
//       "SMA": [null, ..., 119.5], ...
//     }
//   }
// =============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::indicators::Column;
use crate::market_data::{OhlcvBar, OhlcvSeries, TimestampKind};

pub use crate::indicators::fear_greed::FearGreedLevel;

// =============================================================================
// IndicatorColumn
// =============================================================================

/// Stable identifiers of the derived columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorColumn {
    Sma,
    Ema,
    Rsi,
    Macd,
    MacdSignal,
    MacdHist,
    Stoch,
    StochSignal,
    BbHigh,
    BbLow,
    IchimokuA,
    IchimokuB,
    IchimokuBase,
    IchimokuConv,
    ParabolicSar,
    Obv,
    FearGreedIndex,
}

impl IndicatorColumn {
    /// Output order of the derived columns.
    pub const ALL: [IndicatorColumn; 17] = [
        IndicatorColumn::Sma,
        IndicatorColumn::Ema,
        IndicatorColumn::Rsi,
        IndicatorColumn::Macd,
        IndicatorColumn::MacdSignal,
        IndicatorColumn::MacdHist,
        IndicatorColumn::Stoch,
        IndicatorColumn::StochSignal,
        IndicatorColumn::BbHigh,
        IndicatorColumn::BbLow,
        IndicatorColumn::IchimokuA,
        IndicatorColumn::IchimokuB,
        IndicatorColumn::IchimokuBase,
        IndicatorColumn::IchimokuConv,
        IndicatorColumn::ParabolicSar,
        IndicatorColumn::Obv,
        IndicatorColumn::FearGreedIndex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorColumn::Sma => "SMA",
            IndicatorColumn::Ema => "EMA",
            IndicatorColumn::Rsi => "RSI",
            IndicatorColumn::Macd => "MACD",
            IndicatorColumn::MacdSignal => "MACD_Signal",
            IndicatorColumn::MacdHist => "MACD_Hist",
            IndicatorColumn::Stoch => "Stoch",
            IndicatorColumn::StochSignal => "Stoch_Signal",
            IndicatorColumn::BbHigh => "BB_High",
            IndicatorColumn::BbLow => "BB_Low",
            IndicatorColumn::IchimokuA => "Ichimoku_A",
            IndicatorColumn::IchimokuB => "Ichimoku_B",
            IndicatorColumn::IchimokuBase => "Ichimoku_Base",
            IndicatorColumn::IchimokuConv => "Ichimoku_Conv",
            IndicatorColumn::ParabolicSar => "Parabolic_SAR",
            IndicatorColumn::Obv => "OBV",
            IndicatorColumn::FearGreedIndex => "FearGreedIndex",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for IndicatorColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorColumn {
    type Err = String;

    /// Case-insensitive match on the column id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        IndicatorColumn::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown indicator column '{s}'"))
    }
}

// =============================================================================
// IndicatorPanel
// =============================================================================

/// Most recent defined Fear/Greed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FearGreedReading {
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub level: FearGreedLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPanel {
    series: Arc<OhlcvSeries>,
    // Indexed by `IndicatorColumn::index`.
    columns: Vec<Column>,
}

impl IndicatorPanel {
    /// A panel with every derived column undefined.
    pub(crate) fn new(series: Arc<OhlcvSeries>) -> Self {
        let rows = series.len();
        Self {
            columns: vec![vec![None; rows]; IndicatorColumn::ALL.len()],
            series,
        }
    }

    /// Replace a derived column. Its length must match the series.
    pub(crate) fn set(&mut self, id: IndicatorColumn, column: Column) {
        debug_assert_eq!(column.len(), self.rows(), "{id} has wrong row count");
        self.columns[id.index()] = column;
    }

    pub fn series(&self) -> &Arc<OhlcvSeries> {
        &self.series
    }

    pub fn rows(&self) -> usize {
        self.series.len()
    }

    pub fn column(&self, id: IndicatorColumn) -> &[Option<f64>] {
        &self.columns[id.index()]
    }

    /// Last row with a defined Fear/Greed score.
    pub fn latest_fear_greed(&self) -> Option<FearGreedReading> {
        let bars = self.series.bars();
        self.column(IndicatorColumn::FearGreedIndex)
            .iter()
            .enumerate()
            .rev()
            .find_map(|(row, score)| {
                score.map(|score| FearGreedReading {
                    timestamp: bars[row].timestamp,
                    score,
                    level: FearGreedLevel::from_score(score),
                })
            })
    }

    /// Serialisable view restricted to `selection` (all columns when `None`).
    pub fn view<'a>(&'a self, selection: Option<&[IndicatorColumn]>) -> PanelView<'a> {
        let selected = match selection {
            Some(ids) => IndicatorColumn::ALL
                .into_iter()
                .filter(|id| ids.contains(id))
                .collect(),
            None => IndicatorColumn::ALL.to_vec(),
        };
        PanelView {
            panel: self,
            selected,
        }
    }
}

// =============================================================================
// PanelView — columnar JSON
// =============================================================================

pub struct PanelView<'a> {
    panel: &'a IndicatorPanel,
    selected: Vec<IndicatorColumn>,
}

struct Columns<'a>(&'a PanelView<'a>);

struct Timestamps<'a>(&'a OhlcvSeries);

struct BarField<'a> {
    series: &'a OhlcvSeries,
    get: fn(&OhlcvBar) -> f64,
}

impl Serialize for Timestamps<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = self.0.timestamp_kind();
        serializer.collect_seq(self.0.bars().iter().map(|b| match kind {
            TimestampKind::Date => b.timestamp.format("%Y-%m-%d").to_string(),
            TimestampKind::DateTime => b.timestamp.to_rfc3339(),
        }))
    }
}

impl Serialize for BarField<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.series.bars().iter().map(self.get))
    }
}

impl Serialize for Columns<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let view = self.0;
        let series = view.panel.series.as_ref();
        let fields: [(&str, fn(&OhlcvBar) -> f64); 5] = [
            ("Open", |b| b.open),
            ("High", |b| b.high),
            ("Low", |b| b.low),
            ("Close", |b| b.close),
            ("Volume", |b| b.volume),
        ];

        let mut map = serializer.serialize_map(Some(1 + fields.len() + view.selected.len()))?;
        map.serialize_entry("timestamp", &Timestamps(series))?;
        for (name, get) in fields {
            map.serialize_entry(name, &BarField { series, get })?;
        }
        for id in &view.selected {
            map.serialize_entry(id.as_str(), view.panel.column(*id))?;
        }
        map.end()
    }
}

impl Serialize for PanelView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let series = self.panel.series.as_ref();
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("symbol", series.symbol())?;
        map.serialize_entry("timestamp_kind", &series.timestamp_kind())?;
        map.serialize_entry("rows", &series.len())?;
        map.serialize_entry("columns", &Columns(self))?;
        map.end()
    }
}

// =============================================================================
// Shared value types: lookback periods, sampling intervals, UI time frames
// =============================================================================
//
// `Period` and `Interval` use the market-data provider's vocabulary ("5d",
// "1mo", "5m", ...). `TimeFrame` is the fixed label set offered to users and
// resolves to a `(Period, Interval)` pair through a static lookup table.
// =============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Period
// =============================================================================

/// Lookback span of a series request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub const ALL: [Period; 11] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::YearToDate,
        Period::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }

    /// Upper bound of the span in calendar days, `None` for `max`.
    ///
    /// `ytd` is bounded by a full (leap) year.
    pub fn max_days(&self) -> Option<u32> {
        match self {
            Period::OneDay => Some(1),
            Period::FiveDays => Some(5),
            Period::OneMonth => Some(31),
            Period::ThreeMonths => Some(92),
            Period::SixMonths => Some(184),
            Period::OneYear => Some(366),
            Period::TwoYears => Some(730),
            Period::FiveYears => Some(1827),
            Period::TenYears => Some(3653),
            Period::YearToDate => Some(366),
            Period::Max => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown period '{s}'"))
    }
}

// =============================================================================
// Interval
// =============================================================================

/// Sampling granularity of a series request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "2m")]
    M2,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "60m")]
    M60,
    #[serde(rename = "90m")]
    M90,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "5d")]
    D5,
    #[serde(rename = "1wk")]
    W1,
    #[serde(rename = "1mo")]
    Mo1,
    #[serde(rename = "3mo")]
    Mo3,
}

impl Interval {
    pub const ALL: [Interval; 13] = [
        Interval::M1,
        Interval::M2,
        Interval::M5,
        Interval::M15,
        Interval::M30,
        Interval::M60,
        Interval::M90,
        Interval::H1,
        Interval::D1,
        Interval::D5,
        Interval::W1,
        Interval::Mo1,
        Interval::Mo3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M2 => "2m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::M60 => "60m",
            Interval::M90 => "90m",
            Interval::H1 => "1h",
            Interval::D1 => "1d",
            Interval::D5 => "5d",
            Interval::W1 => "1wk",
            Interval::Mo1 => "1mo",
            Interval::Mo3 => "3mo",
        }
    }

    /// Approximate bar duration in minutes.
    pub fn to_minutes(&self) -> u32 {
        match self {
            Interval::M1 => 1,
            Interval::M2 => 2,
            Interval::M5 => 5,
            Interval::M15 => 15,
            Interval::M30 => 30,
            Interval::M60 | Interval::H1 => 60,
            Interval::M90 => 90,
            Interval::D1 => 24 * 60,
            Interval::D5 => 5 * 24 * 60,
            Interval::W1 => 7 * 24 * 60,
            Interval::Mo1 => 31 * 24 * 60,
            Interval::Mo3 => 92 * 24 * 60,
        }
    }

    /// True for intervals shorter than one trading day.
    pub fn is_intraday(&self) -> bool {
        self.to_minutes() < 24 * 60
    }

    /// Furthest back (in days) the provider serves bars of this interval.
    pub fn max_lookback_days(&self) -> Option<u32> {
        match self {
            Interval::M1 => Some(7),
            Interval::H1 | Interval::M60 => Some(730),
            i if i.is_intraday() => Some(60),
            _ => None,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .iter()
            .copied()
            .find(|i| i.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown interval '{s}'"))
    }
}

/// Check that `interval` can be requested over `period`.
///
/// Returns a human-readable reason when the combination is not served.
pub fn check_combination(period: Period, interval: Interval) -> Result<(), String> {
    let span = period.max_days();

    if let (Some(limit), Some(span)) = (interval.max_lookback_days(), span) {
        if span > limit {
            return Err(format!(
                "interval {interval} is only available for the last {limit} days, period {period} spans up to {span}"
            ));
        }
    }
    if let (Some(limit), None) = (interval.max_lookback_days(), span) {
        return Err(format!(
            "interval {interval} is only available for the last {limit} days, period {period} is unbounded"
        ));
    }

    if let Some(span) = span {
        let span_minutes = span * 24 * 60;
        if interval.to_minutes() > span_minutes {
            return Err(format!(
                "interval {interval} is longer than period {period}"
            ));
        }
    }

    Ok(())
}

// =============================================================================
// SeriesKey
// =============================================================================

/// Identity of a loaded series: the exact `(symbol, period, interval)` tuple.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SeriesKey {
    pub symbol: String,
    pub period: Period,
    pub interval: Interval,
}

impl SeriesKey {
    /// Build a key, normalising the symbol to trimmed upper case.
    pub fn new(symbol: &str, period: Period, interval: Interval) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            period,
            interval,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}/{}", self.symbol, self.period, self.interval)
    }
}

// =============================================================================
// TimeFrame
// =============================================================================

/// User-facing time-frame choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrame {
    #[serde(rename = "Intraday")]
    Intraday,
    #[serde(rename = "1 Day")]
    OneDay,
    #[serde(rename = "5 Day")]
    FiveDay,
    #[serde(rename = "1 Month")]
    OneMonth,
    #[serde(rename = "6 Months")]
    SixMonths,
    #[serde(rename = "1 Year")]
    OneYear,
    #[serde(rename = "YTD")]
    YearToDate,
    #[serde(rename = "5Y")]
    FiveYears,
    #[serde(rename = "4 Hour")]
    FourHour,
}

/// Fallback used for labels without an entry in the lookup table.
const DEFAULT_PAIR: (Period, Interval) = (Period::OneDay, Interval::D1);

impl TimeFrame {
    pub const ALL: [TimeFrame; 9] = [
        TimeFrame::Intraday,
        TimeFrame::OneDay,
        TimeFrame::FiveDay,
        TimeFrame::OneMonth,
        TimeFrame::SixMonths,
        TimeFrame::OneYear,
        TimeFrame::YearToDate,
        TimeFrame::FiveYears,
        TimeFrame::FourHour,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TimeFrame::Intraday => "Intraday",
            TimeFrame::OneDay => "1 Day",
            TimeFrame::FiveDay => "5 Day",
            TimeFrame::OneMonth => "1 Month",
            TimeFrame::SixMonths => "6 Months",
            TimeFrame::OneYear => "1 Year",
            TimeFrame::YearToDate => "YTD",
            TimeFrame::FiveYears => "5Y",
            TimeFrame::FourHour => "4 Hour",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        TimeFrame::ALL.iter().copied().find(|tf| tf.label() == label)
    }

    /// The `(period, interval)` pair requested for this time frame.
    ///
    /// "4 Hour" has no table entry and falls back to one daily bar.
    pub fn resolve(&self) -> (Period, Interval) {
        match self {
            TimeFrame::Intraday => (Period::OneDay, Interval::M5),
            TimeFrame::OneDay => (Period::OneDay, Interval::D1),
            TimeFrame::FiveDay => (Period::FiveDays, Interval::D1),
            TimeFrame::OneMonth => (Period::OneMonth, Interval::D1),
            TimeFrame::SixMonths => (Period::SixMonths, Interval::D1),
            TimeFrame::OneYear => (Period::OneYear, Interval::D1),
            TimeFrame::YearToDate => (Period::YearToDate, Interval::D1),
            TimeFrame::FiveYears => (Period::FiveYears, Interval::D1),
            TimeFrame::FourHour => DEFAULT_PAIR,
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolve an arbitrary label, defaulting to `1d`/`1d` when it is unknown.
pub fn resolve_label(label: &str) -> (Period, Interval) {
    TimeFrame::from_label(label)
        .map(|tf| tf.resolve())
        .unwrap_or(DEFAULT_PAIR)
}

// =============================================================================
// Yahoo Finance chart client — public v8 chart endpoint
// =============================================================================
//
// GET {base_url}/v8/finance/chart/{symbol}?range={period}&interval={interval}
//
// The symbol is pushed as an encoded path segment, never spliced into the URL.
//
// The endpoint answers an unknown symbol with HTTP 404 and an error body of
// code "Not Found"; that is reported as an empty series so the loader can
// raise `NoData`. Rows with a missing open/high/low/close are skipped, a
// missing volume counts as zero, and a repeated timestamp keeps the last row.
// Daily-or-longer bars are normalised to midnight UTC of the exchange-local
// trading date.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::market_data::provider::{MarketDataProvider, ProviderError, RawSeries};
use crate::market_data::series::{OhlcvBar, TimestampKind};
use crate::types::SeriesKey;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) ta-panel/1.0";

const SECONDS_PER_DAY: i64 = 86_400;

// -----------------------------------------------------------------------------
// Wire format
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// -----------------------------------------------------------------------------
// Client
// -----------------------------------------------------------------------------

/// Market-data provider backed by the Yahoo Finance chart API.
#[derive(Clone)]
pub struct YahooChartClient {
    base_url: Url,
    client: reqwest::Client,
}

impl YahooChartClient {
    /// Create a client against `base_url` with a per-request `timeout`.
    ///
    /// Fails on a base URL that cannot carry a path or a user agent that is
    /// not a valid header value.
    pub fn new(
        base_url: impl AsRef<str>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let raw_base = base_url.as_ref();
        let base_url = Url::parse(raw_base)
            .map_err(|e| ProviderError::Config(format!("invalid base url '{raw_base}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::Config(format!(
                "base url '{raw_base}' cannot carry a path"
            )));
        }

        let mut default_headers = HeaderMap::new();
        // The chart endpoint rejects requests without a browser-like agent.
        let agent = HeaderValue::from_str(user_agent)
            .map_err(|e| ProviderError::Config(format!("invalid user agent: {e}")))?;
        default_headers.insert(USER_AGENT, agent);

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()?;

        debug!(%base_url, "YahooChartClient initialised");

        Ok(Self { base_url, client })
    }

    fn chart_url(&self, key: &SeriesKey) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejected cannot-be-a-base URLs, so this always applies.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v8", "finance", "chart", key.symbol.as_str()]);
        }
        url.query_pairs_mut()
            .append_pair("range", key.period.as_str())
            .append_pair("interval", key.interval.as_str())
            .append_pair("includePrePost", "false");
        url
    }
}

#[async_trait]
impl MarketDataProvider for YahooChartClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    #[instrument(skip(self, key), fields(key = %key), name = "yahoo::fetch_bars")]
    async fn fetch_bars(&self, key: &SeriesKey) -> Result<RawSeries, ProviderError> {
        let url = self.chart_url(key);
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        debug!(%status, bytes = body.len(), "chart response received");

        let kind = if key.interval.is_intraday() {
            TimestampKind::DateTime
        } else {
            TimestampKind::Date
        };

        let parsed = parse_chart(&body, kind);
        if !status.is_success() && parsed.is_err() {
            return Err(ProviderError::Api(format!("HTTP {status}")));
        }
        parsed
    }
}

/// Decode a chart payload into normalised bars.
fn parse_chart(body: &str, kind: TimestampKind) -> Result<RawSeries, ProviderError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

    if let Some(err) = envelope.chart.error {
        if err.code == "Not Found" {
            debug!(description = %err.description, "symbol not found");
            return Ok(RawSeries::empty(kind));
        }
        return Err(ProviderError::Api(format!("{}: {}", err.code, err.description)));
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(RawSeries::empty(kind));
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let offset = result.meta.gmtoffset;

    let mut bars: Vec<OhlcvBar> = Vec::with_capacity(result.timestamp.len());
    let mut skipped = 0usize;

    for (i, &ts) in result.timestamp.iter().enumerate() {
        let field = |col: &Vec<Option<f64>>| col.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
        ) else {
            skipped += 1;
            continue;
        };

        let Some(timestamp) = normalise_timestamp(ts, offset, kind) else {
            skipped += 1;
            continue;
        };

        let bar = OhlcvBar {
            timestamp,
            open,
            high,
            low,
            close,
            volume: field(&quote.volume).unwrap_or(0.0),
        };

        match bars.last_mut() {
            Some(last) if last.timestamp == timestamp => *last = bar,
            _ => bars.push(bar),
        }
    }

    if skipped > 0 {
        warn!(skipped, "skipped incomplete chart rows");
    }

    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by(|later, earlier| {
        if later.timestamp == earlier.timestamp {
            *earlier = *later;
            true
        } else {
            false
        }
    });

    Ok(RawSeries {
        timestamp_kind: kind,
        bars,
    })
}

/// Convert a provider epoch (seconds) into the series timestamp.
fn normalise_timestamp(epoch_secs: i64, gmtoffset: i64, kind: TimestampKind) -> Option<DateTime<Utc>> {
    match kind {
        TimestampKind::DateTime => DateTime::from_timestamp(epoch_secs, 0),
        TimestampKind::Date => {
            let local = epoch_secs + gmtoffset;
            let midnight = local.div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY;
            DateTime::from_timestamp(midnight, 0)
        }
    }
}

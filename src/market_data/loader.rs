// =============================================================================
// Series Loader — fetch, validate and memoise OHLCV series
// =============================================================================
//
// load(symbol, period, interval):
//   1. Reject malformed symbols and unserved period/interval combinations.
//   2. Serve from the injected `SeriesCache` when fresh.
//   3. Otherwise join (or start) the single in-flight fetch for the key, so
//      concurrent callers share one provider call. The fetch runs on its own
//      task: it finishes, fills the cache and leaves the in-flight map even
//      when every caller has gone away.
//   4. Bound the provider call by `fetch_timeout`.
//   5. Empty result => `NoData`; rows violating the schema => `Schema`.
//
// Every failure to obtain rows (empty response, timeout, transport error,
// unserved combination) is reported as `LoadError::NoData` with a reason.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::market_data::cache::SeriesCache;
use crate::market_data::provider::MarketDataProvider;
use crate::market_data::series::{OhlcvSeries, SchemaError};
use crate::types::{check_combination, Interval, Period, SeriesKey};

/// Why a request produced no rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoDataReason {
    #[error("provider returned no rows")]
    EmptyResponse,

    #[error("unsupported request: {0}")]
    UnsupportedCombination(String),

    #[error("fetch timed out after {} ms", .0.as_millis())]
    TimedOut(Duration),

    #[error("provider failure: {0}")]
    ProviderFailure(String),
}

/// Errors returned by [`SeriesLoader::load`].
///
/// `Clone` so one in-flight result can be handed to every coalesced waiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("invalid symbol '{0}': expected 1-32 letters, digits or . - ^ = _")]
    InvalidSymbol(String),

    #[error("no data found for {key}: {reason}")]
    NoData { key: SeriesKey, reason: NoDataReason },

    #[error("provider returned an invalid series for {key}: {source}")]
    Schema {
        key: SeriesKey,
        #[source]
        source: SchemaError,
    },
}

impl LoadError {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }
}

type LoadResult = Result<Arc<OhlcvSeries>, LoadError>;
type InFlight = Shared<BoxFuture<'static, LoadResult>>;
// Each entry carries the id of the task that owns it.
type InFlightMap = Arc<Mutex<HashMap<SeriesKey, (u64, InFlight)>>>;

/// Default upper bound on a single provider call.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Longest accepted ticker symbol.
pub const MAX_SYMBOL_LEN: usize = 32;

fn is_ticker_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '_')
}

pub struct SeriesLoader {
    provider: Arc<dyn MarketDataProvider>,
    cache: Arc<SeriesCache>,
    in_flight: InFlightMap,
    next_fetch_id: AtomicU64,
    fetch_timeout: Duration,
}

impl SeriesLoader {
    pub fn new(provider: Arc<dyn MarketDataProvider>, cache: Arc<SeriesCache>) -> Self {
        Self {
            provider,
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_fetch_id: AtomicU64::new(0),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn cache(&self) -> &Arc<SeriesCache> {
        &self.cache
    }

    /// Validate the request parameters and build the cache key.
    pub fn key_for(
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<SeriesKey, LoadError> {
        let key = SeriesKey::new(symbol, period, interval);
        if key.symbol.is_empty()
            || key.symbol.len() > MAX_SYMBOL_LEN
            || !key.symbol.chars().all(is_ticker_char)
        {
            return Err(LoadError::InvalidSymbol(symbol.trim().to_string()));
        }
        if let Err(why) = check_combination(period, interval) {
            return Err(LoadError::NoData {
                key,
                reason: NoDataReason::UnsupportedCombination(why),
            });
        }
        Ok(key)
    }

    /// Load the series for `(symbol, period, interval)`.
    pub async fn load(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Arc<OhlcvSeries>, LoadError> {
        let key = Self::key_for(symbol, period, interval)?;

        if let Some(hit) = self.cache.get(&key) {
            debug!(%key, rows = hit.len(), "series cache hit");
            return Ok(hit);
        }

        let fetch = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(&key) {
                Some((_, existing)) => {
                    debug!(%key, "joining in-flight fetch");
                    existing.clone()
                }
                None => {
                    debug!(%key, "series cache miss, fetching");
                    let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let task = tokio::spawn(run_fetch(
                        Arc::clone(&self.provider),
                        Arc::clone(&self.cache),
                        Arc::clone(&self.in_flight),
                        key.clone(),
                        id,
                        self.fetch_timeout,
                    ));
                    let task_key = key.clone();
                    let fut = task
                        .map(move |joined| {
                            joined.unwrap_or_else(|e| {
                                Err(LoadError::NoData {
                                    key: task_key,
                                    reason: NoDataReason::ProviderFailure(format!(
                                        "fetch task failed: {e}"
                                    )),
                                })
                            })
                        })
                        .boxed()
                        .shared();
                    // The task cannot clear this entry before we release the lock.
                    in_flight.insert(key.clone(), (id, fut.clone()));
                    fut
                }
            }
        };

        fetch.await
    }

    /// Drop the cached series for `key`, forcing the next load to refetch.
    pub fn invalidate(&self, key: &SeriesKey) -> bool {
        let dropped = self.cache.invalidate(key);
        if dropped {
            info!(%key, "series cache entry invalidated");
        }
        dropped
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().len()
    }
}

/// Body of a spawned fetch task: fetch, then retire its own in-flight entry.
async fn run_fetch(
    provider: Arc<dyn MarketDataProvider>,
    cache: Arc<SeriesCache>,
    in_flight: InFlightMap,
    key: SeriesKey,
    id: u64,
    fetch_timeout: Duration,
) -> LoadResult {
    let result = fetch_series(provider, cache, key.clone(), fetch_timeout).await;

    // Only remove our own entry; a newer fetch may already be registered.
    let mut in_flight = in_flight.lock();
    if in_flight.get(&key).map_or(false, |(owner, _)| *owner == id) {
        in_flight.remove(&key);
    }

    result
}

async fn fetch_series(
    provider: Arc<dyn MarketDataProvider>,
    cache: Arc<SeriesCache>,
    key: SeriesKey,
    fetch_timeout: Duration,
) -> LoadResult {
    let raw = match tokio::time::timeout(fetch_timeout, provider.fetch_bars(&key)).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(e)) => {
            warn!(%key, provider = provider.name(), error = %e, "provider fetch failed");
            return Err(LoadError::NoData {
                key,
                reason: NoDataReason::ProviderFailure(e.to_string()),
            });
        }
        Err(_) => {
            warn!(
                %key,
                provider = provider.name(),
                timeout_ms = fetch_timeout.as_millis() as u64,
                "provider fetch timed out"
            );
            return Err(LoadError::NoData {
                key,
                reason: NoDataReason::TimedOut(fetch_timeout),
            });
        }
    };

    if raw.bars.is_empty() {
        warn!(%key, provider = provider.name(), "provider returned no rows");
        return Err(LoadError::NoData {
            key,
            reason: NoDataReason::EmptyResponse,
        });
    }

    let series = OhlcvSeries::new(key.symbol.clone(), raw.timestamp_kind, raw.bars)
        .map_err(|source| {
            warn!(%key, error = %source, "provider rows violate the OHLCV schema");
            LoadError::Schema {
                key: key.clone(),
                source,
            }
        })?;

    info!(
        %key,
        provider = provider.name(),
        rows = series.len(),
        first = %series.bars()[0].timestamp,
        last = %series.last().timestamp,
        "series loaded"
    );

    let series = Arc::new(series);
    cache.insert(key, Arc::clone(&series));
    Ok(series)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    use super::*;
    use crate::market_data::provider::{ProviderError, RawSeries};
    use crate::market_data::series::{OhlcvBar, TimestampKind};

    /// Provider serving `rows` rising daily bars for every symbol except
    /// `ZZZZINVALID`, counting calls and optionally sleeping first.
    pub struct MockProvider {
        pub rows: usize,
        pub delay: Duration,
        pub calls: AtomicUsize,
    }

    impl MockProvider {
        pub fn new(rows: usize) -> Self {
            Self {
                rows,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn fetch_bars(&self, key: &SeriesKey) -> Result<RawSeries, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if key.symbol == "ZZZZINVALID" {
                return Ok(RawSeries::empty(TimestampKind::Date));
            }
            if key.symbol == "BROKEN" {
                return Err(ProviderError::Api("upstream unavailable".into()));
            }

            let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let bars = (0..self.rows)
                .map(|i| {
                    let close = 100.0 + i as f64;
                    OhlcvBar {
                        timestamp: start + ChronoDuration::days(i as i64),
                        open: close,
                        high: close + 1.0,
                        low: close - 1.0,
                        close,
                        volume: 1000.0,
                    }
                })
                .collect();
            Ok(RawSeries {
                timestamp_kind: TimestampKind::Date,
                bars,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MockProvider;
    use super::*;

    fn loader(provider: Arc<MockProvider>, capacity: usize) -> SeriesLoader {
        SeriesLoader::new(provider, Arc::new(SeriesCache::new(capacity, None)))
    }

    #[tokio::test]
    async fn repeated_loads_hit_the_cache() {
        let provider = Arc::new(MockProvider::new(30));
        let loader = loader(Arc::clone(&provider), 8);

        let first = loader.load("gme", Period::OneMonth, Interval::D1).await.unwrap();
        let second = loader.load("GME", Period::OneMonth, Interval::D1).await.unwrap();

        assert_eq!(provider.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 30);
        assert_eq!(first.symbol(), "GME");
    }

    #[tokio::test]
    async fn different_keys_are_fetched_separately() {
        let provider = Arc::new(MockProvider::new(30));
        let loader = loader(Arc::clone(&provider), 8);

        loader.load("GME", Period::OneMonth, Interval::D1).await.unwrap();
        loader.load("GME", Period::FiveDays, Interval::D1).await.unwrap();

        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn empty_response_is_no_data() {
        let provider = Arc::new(MockProvider::new(30));
        let loader = loader(Arc::clone(&provider), 8);

        let err = loader
            .load("ZZZZINVALID", Period::OneMonth, Interval::D1)
            .await
            .unwrap_err();

        assert!(err.is_no_data());
        assert!(matches!(
            err,
            LoadError::NoData { reason: NoDataReason::EmptyResponse, .. }
        ));
        assert!(loader.cache().is_empty());
    }

    #[tokio::test]
    async fn provider_errors_are_no_data() {
        let provider = Arc::new(MockProvider::new(30));
        let loader = loader(Arc::clone(&provider), 8);

        let err = loader.load("BROKEN", Period::OneMonth, Interval::D1).await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::NoData { reason: NoDataReason::ProviderFailure(_), .. }
        ));
    }

    #[tokio::test]
    async fn unsupported_combination_never_reaches_the_provider() {
        let provider = Arc::new(MockProvider::new(30));
        let loader = loader(Arc::clone(&provider), 8);

        let err = loader.load("GME", Period::OneYear, Interval::M1).await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::NoData { reason: NoDataReason::UnsupportedCombination(_), .. }
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn empty_symbol_is_rejected() {
        let provider = Arc::new(MockProvider::new(30));
        let loader = loader(Arc::clone(&provider), 8);

        let err = loader.load("   ", Period::OneMonth, Interval::D1).await.unwrap_err();
        assert_eq!(err, LoadError::InvalidSymbol(String::new()));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn symbols_outside_the_ticker_charset_are_rejected() {
        let provider = Arc::new(MockProvider::new(30));
        let loader = loader(Arc::clone(&provider), 8);

        let too_long = "X".repeat(MAX_SYMBOL_LEN + 1);
        for bad in ["GME#", "GME?range=max", "A/B", "GME&x=1", too_long.as_str()] {
            let err = loader.load(bad, Period::OneMonth, Interval::D1).await.unwrap_err();
            assert!(matches!(err, LoadError::InvalidSymbol(_)), "{bad} accepted");
        }
        assert_eq!(provider.calls(), 0);

        for good in ["BRK-B", "^GSPC", "EURUSD=X", "BTC-USD", "RDS.A"] {
            assert!(SeriesLoader::key_for(good, Period::OneMonth, Interval::D1).is_ok(), "{good}");
        }
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_fetch() {
        let provider = Arc::new(MockProvider::new(30).with_delay(Duration::from_millis(50)));
        let loader = loader(Arc::clone(&provider), 8);

        let (a, b) = tokio::join!(
            loader.load("GME", Period::OneMonth, Interval::D1),
            loader.load("GME", Period::OneMonth, Interval::D1),
        );

        assert_eq!(provider.calls(), 1);
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(loader.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn cancelled_load_still_completes_and_cleans_up() {
        let provider = Arc::new(MockProvider::new(30).with_delay(Duration::from_millis(50)));
        let loader = loader(Arc::clone(&provider), 8);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(5),
            loader.load("GME", Period::OneMonth, Interval::D1),
        )
        .await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(loader.in_flight_len(), 0);
        assert_eq!(loader.cache().len(), 1);

        loader.load("GME", Period::OneMonth, Interval::D1).await.unwrap();
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn slow_provider_times_out_as_no_data() {
        let provider = Arc::new(MockProvider::new(30).with_delay(Duration::from_millis(500)));
        let loader = loader(Arc::clone(&provider), 8).with_fetch_timeout(Duration::from_millis(10));

        let err = loader.load("GME", Period::OneMonth, Interval::D1).await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::NoData { reason: NoDataReason::TimedOut(_), .. }
        ));
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let provider = Arc::new(MockProvider::new(30));
        let loader = loader(Arc::clone(&provider), 8);

        loader.load("GME", Period::OneMonth, Interval::D1).await.unwrap();
        let key = SeriesLoader::key_for("GME", Period::OneMonth, Interval::D1).unwrap();
        assert!(loader.invalidate(&key));
        loader.load("GME", Period::OneMonth, Interval::D1).await.unwrap();

        assert_eq!(provider.calls(), 2);
    }
}

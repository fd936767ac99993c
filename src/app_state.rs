// =============================================================================
// Central Application State
// =============================================================================
//
// Ties the loader and the indicator engine together behind one `Arc<AppState>`
// shared by every HTTP handler. The loader owns all mutable state (cache and
// in-flight fetches) and guards it internally; the engine is immutable.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::indicator_engine::IndicatorEngine;
use crate::market_data::{LoadError, MarketDataProvider, SeriesCache, SeriesLoader};
use crate::panel::IndicatorPanel;
use crate::runtime_config::PanelConfig;
use crate::types::{resolve_label, SeriesKey};

pub struct AppState {
    pub config: PanelConfig,
    pub loader: SeriesLoader,
    pub engine: IndicatorEngine,
    start_time: Instant,
}

impl AppState {
    /// Wire a provider into a fresh cache, loader and engine per `config`.
    pub fn new(config: PanelConfig, provider: Arc<dyn MarketDataProvider>) -> Self {
        let cache = Arc::new(SeriesCache::new(config.cache.capacity, config.cache.ttl()));
        let loader = SeriesLoader::new(provider, cache).with_fetch_timeout(config.fetch_timeout());
        let engine = IndicatorEngine::new(config.indicators.clone());

        info!(
            cache_capacity = config.cache.capacity,
            fetch_timeout_secs = config.fetch_timeout_secs,
            "application state initialised"
        );

        Self {
            config,
            loader,
            engine,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn cached_series(&self) -> usize {
        self.loader.cache().len()
    }

    /// Validated cache key for a ticker and time-frame label.
    pub fn key_for(&self, ticker: &str, time_frame: &str) -> Result<SeriesKey, LoadError> {
        let (period, interval) = resolve_label(time_frame);
        SeriesLoader::key_for(ticker, period, interval)
    }

    /// Load the series for `ticker` / `time_frame` and compute its panel.
    ///
    /// With `refresh` the cached series is dropped first. A load failure is
    /// returned before any indicator is computed.
    pub async fn build_panel(
        &self,
        ticker: &str,
        time_frame: &str,
        refresh: bool,
    ) -> Result<IndicatorPanel, LoadError> {
        let (period, interval) = resolve_label(time_frame);
        if refresh {
            let key = SeriesLoader::key_for(ticker, period, interval)?;
            self.loader.invalidate(&key);
        }

        let series = self.loader.load(ticker, period, interval).await?;
        Ok(self.engine.compute(series))
    }

    /// Drop one cached series (`Some`) or the whole cache (`None`).
    /// Returns the number of entries removed.
    pub fn invalidate(&self, key: Option<&SeriesKey>) -> usize {
        match key {
            Some(key) => usize::from(self.loader.invalidate(key)),
            None => {
                let n = self.loader.cache().clear();
                info!(dropped = n, "series cache cleared");
                n
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::loader::test_support::MockProvider;
    use crate::market_data::NoDataReason;
    use crate::panel::IndicatorColumn;

    fn state(rows: usize) -> (AppState, Arc<MockProvider>) {
        let provider = Arc::new(MockProvider::new(rows));
        let state = AppState::new(PanelConfig::default(), provider.clone());
        (state, provider)
    }

    #[tokio::test]
    async fn builds_panel_for_time_frame() {
        let (state, provider) = state(40);
        let panel = state.build_panel("gme", "1 Month", false).await.unwrap();
        assert_eq!(panel.rows(), 40);
        assert_eq!(panel.series().symbol(), "GME");
        assert!(panel.column(IndicatorColumn::Sma)[39].is_some());
        assert_eq!(provider.calls(), 1);
        assert_eq!(state.cached_series(), 1);
    }

    #[tokio::test]
    async fn second_request_hits_cache_and_refresh_refetches() {
        let (state, provider) = state(30);
        state.build_panel("GME", "5Y", false).await.unwrap();
        state.build_panel("GME", "5Y", false).await.unwrap();
        assert_eq!(provider.calls(), 1);

        state.build_panel("GME", "5Y", true).await.unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn empty_response_is_no_data() {
        let (state, _) = state(30);
        let err = state.build_panel("ZZZZINVALID", "1 Month", false).await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::NoData { reason: NoDataReason::EmptyResponse, .. }
        ));
        assert_eq!(state.cached_series(), 0);
    }

    #[tokio::test]
    async fn unknown_label_falls_back_to_one_day() {
        let (state, _) = state(30);
        let key = state.key_for("GME", "4 Hour").unwrap();
        assert_eq!(key.to_string(), "GME@1d/1d");
        let key = state.key_for("GME", "fortnight").unwrap();
        assert_eq!(key.to_string(), "GME@1d/1d");
    }

    #[tokio::test]
    async fn invalidate_one_or_all() {
        let (state, _) = state(30);
        state.build_panel("A", "1 Month", false).await.unwrap();
        state.build_panel("B", "1 Month", false).await.unwrap();

        let key = state.key_for("A", "1 Month").unwrap();
        assert_eq!(state.invalidate(Some(&key)), 1);
        assert_eq!(state.invalidate(Some(&key)), 0);
        assert_eq!(state.invalidate(None), 1);
        assert_eq!(state.cached_series(), 0);
    }
}

//! Market-data provider abstraction.
//!
//! A [`MarketDataProvider`] turns a [`SeriesKey`] into raw bars. It does not
//! validate the schema contract or cache anything; the
//! [`SeriesLoader`](crate::market_data::SeriesLoader) does both. An unknown
//! symbol is reported as an empty [`RawSeries`], not as an error.

use async_trait::async_trait;
use thiserror::Error;

use crate::market_data::series::{OhlcvBar, TimestampKind};
use crate::types::SeriesKey;

/// Errors that can occur within a provider implementation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network failure, timeout inside the HTTP client, TLS error...
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with an error payload.
    #[error("provider error: {0}")]
    Api(String),

    /// The payload could not be decoded into bars.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The client was built with an unusable setting (base URL, header...).
    #[error("invalid client configuration: {0}")]
    Config(String),
}

/// Bars as returned by a provider, oldest first, timestamps already normalised
/// for `timestamp_kind`.
#[derive(Debug, Clone)]
pub struct RawSeries {
    pub timestamp_kind: TimestampKind,
    pub bars: Vec<OhlcvBar>,
}

impl RawSeries {
    pub fn empty(timestamp_kind: TimestampKind) -> Self {
        Self {
            timestamp_kind,
            bars: Vec::new(),
        }
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    async fn fetch_bars(&self, key: &SeriesKey) -> Result<RawSeries, ProviderError>;
}

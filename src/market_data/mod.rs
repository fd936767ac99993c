pub mod cache;
pub mod loader;
pub mod provider;
pub mod series;

pub use cache::SeriesCache;
pub use loader::{LoadError, NoDataReason, SeriesLoader};
pub use provider::{MarketDataProvider, ProviderError, RawSeries};
pub use series::{OhlcvBar, OhlcvSeries, SchemaError, TimestampKind};

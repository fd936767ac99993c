// =============================================================================
// ta-panel — technical-analysis indicator panel over OHLCV market data
// =============================================================================
//
//   SeriesLoader (provider + cache)  ->  IndicatorEngine  ->  IndicatorPanel
//
// The HTTP surface in `api` is a thin layer over `AppState::build_panel`.
// =============================================================================

pub mod api;
pub mod app_state;
pub mod indicator_engine;
pub mod indicators;
pub mod market_data;
pub mod panel;
pub mod runtime_config;
pub mod types;
pub mod yahoo;

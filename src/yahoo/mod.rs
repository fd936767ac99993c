pub mod client;

pub use client::YahooChartClient;

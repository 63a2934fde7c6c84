//! Daily OHLCV history behind [`analysis_core::MarketDataProvider`].

pub mod yahoo;

use analysis_core::{AnalysisError, PricePoint, PriceSeries};

pub use yahoo::YahooFinanceClient;

/// Turns raw provider bars into a validated series.
///
/// Bars that break the OHLC bounds are dropped with a warning. When two bars
/// share a date the later one wins, which is how Yahoo reports the live
/// session next to the last settled bar.
pub(crate) fn build_series(
    provider: &str,
    symbol: &str,
    mut bars: Vec<PricePoint>,
) -> Result<PriceSeries, AnalysisError> {
    bars.sort_by_key(|b| b.date);

    let mut cleaned: Vec<PricePoint> = Vec::with_capacity(bars.len());
    for bar in bars {
        if let Err(e) = bar.validate() {
            tracing::warn!("{}: dropping bar for {}: {}", provider, symbol, e);
            continue;
        }
        match cleaned.last_mut() {
            Some(prev) if prev.date == bar.date => *prev = bar,
            _ => cleaned.push(bar),
        }
    }

    if cleaned.is_empty() {
        return Err(AnalysisError::DataUnavailable(format!(
            "no price data for {} in the requested range",
            symbol
        )));
    }

    PriceSeries::new(cleaned)
}

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{AnalysisError, NewsArticle, PriceSeries};

/// Source of daily OHLCV history.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch daily bars for `symbol` in `[start, end)`.
    ///
    /// Fails with `DataUnavailable` for an unknown symbol, an empty range,
    /// a transport failure or a response without bars.
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, AnalysisError>;

    /// Short provider name used in logs.
    fn name(&self) -> &'static str;
}

/// Source of news headlines.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Search articles matching `query`. An empty result is not an error.
    async fn search(&self, query: &str) -> Result<Vec<NewsArticle>, AnalysisError>;

    fn name(&self) -> &'static str;
}

/// Rejects empty ranges before any request goes out.
pub fn validate_range(symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<(), AnalysisError> {
    if symbol.trim().is_empty() {
        return Err(AnalysisError::DataUnavailable("empty symbol".to_string()));
    }
    if start >= end {
        return Err(AnalysisError::DataUnavailable(format!(
            "empty date range {} .. {}",
            start, end
        )));
    }
    Ok(())
}

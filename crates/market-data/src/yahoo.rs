use analysis_core::{validate_range, AnalysisError, MarketDataProvider, PricePoint, PriceSeries};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;

use crate::build_series;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance chart API client (daily bars, no key required).
#[derive(Clone)]
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: CHART_URL.to_string(),
        }
    }

    /// Point the client at another chart endpoint (used for proxies and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `{base_url}/{symbol}` with the symbol as one encoded path segment.
    fn chart_url(&self, symbol: &str) -> Result<Url, AnalysisError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            AnalysisError::DataUnavailable(format!("bad chart URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                AnalysisError::DataUnavailable(format!("chart URL {} cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .push(symbol.trim());
        Ok(url)
    }

    /// Get daily bars for `[start, end)`.
    pub async fn get_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, AnalysisError> {
        let url = self.chart_url(symbol)?;
        let period1 = midnight_timestamp(start);
        let period2 = midnight_timestamp(end);

        let response = self
            .client
            .get(url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Yahoo request for {} failed: {}", symbol, e);
                AnalysisError::DataUnavailable(e.to_string())
            })?;

        let status = response.status();
        let json: Value = response.json().await.map_err(|e| {
            AnalysisError::DataUnavailable(format!("HTTP {}: unreadable body: {}", status, e))
        })?;

        if !status.is_success() {
            let detail = chart_error(&json).unwrap_or_else(|| "no detail".to_string());
            tracing::warn!("Yahoo chart for {} returned HTTP {}: {}", symbol, status, detail);
            return Err(AnalysisError::DataUnavailable(format!(
                "HTTP {} for {}: {}",
                status, symbol, detail
            )));
        }

        parse_chart(&json)
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, AnalysisError> {
        validate_range(symbol, start, end)?;
        let bars = self.get_daily_bars(symbol, start, end).await?;
        build_series(self.name(), symbol, bars)
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}

fn midnight_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

fn chart_error(json: &Value) -> Option<String> {
    let error = json.get("chart")?.get("error")?;
    let description = error
        .get("description")
        .and_then(|v| v.as_str())
        .or_else(|| error.get("code").and_then(|v| v.as_str()))?;
    Some(description.to_string())
}

fn quote_column<'a>(quotes: &'a Value, name: &str) -> Result<&'a Vec<Value>, AnalysisError> {
    quotes
        .get(name)
        .and_then(|v| v.as_array())
        .ok_or_else(|| AnalysisError::DataUnavailable(format!("No {} column", name)))
}

/// Parse a `/v8/finance/chart` body into bars.
///
/// Rows with any missing field (holidays, halted sessions) are skipped.
/// Dates are taken in the exchange's local time using the reported
/// `gmtoffset`, so a 09:30 New York open stays on its trading day.
pub(crate) fn parse_chart(json: &Value) -> Result<Vec<PricePoint>, AnalysisError> {
    if let Some(detail) = chart_error(json) {
        return Err(AnalysisError::DataUnavailable(detail));
    }

    let chart = json
        .get("chart")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| AnalysisError::DataUnavailable("No chart data found".to_string()))?;

    let gmt_offset = chart
        .get("meta")
        .and_then(|m| m.get("gmtoffset"))
        .and_then(|v| v.as_i64())
        .unwrap_or(0);

    // A valid symbol with no sessions in range has no timestamp array at all
    let Some(timestamps) = chart.get("timestamp").and_then(|v| v.as_array()) else {
        return Ok(Vec::new());
    };

    let quotes = chart
        .get("indicators")
        .and_then(|v| v.get("quote"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| AnalysisError::DataUnavailable("No quote data found".to_string()))?;

    let opens = quote_column(quotes, "open")?;
    let highs = quote_column(quotes, "high")?;
    let lows = quote_column(quotes, "low")?;
    let closes = quote_column(quotes, "close")?;
    let volumes = quote_column(quotes, "volume")?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let field = |col: &Vec<Value>| col.get(i).and_then(|v| v.as_f64());
        let (Some(ts), Some(open), Some(high), Some(low), Some(close)) = (
            ts.as_i64(),
            field(opens),
            field(highs),
            field(lows),
            field(closes),
        ) else {
            continue;
        };
        let volume = volumes
            .get(i)
            .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0) as u64)))
            .unwrap_or(0);

        let Some(date) = DateTime::from_timestamp(ts + gmt_offset, 0).map(|dt| dt.date_naive()) else {
            continue;
        };

        bars.push(PricePoint {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    Ok(bars)
}

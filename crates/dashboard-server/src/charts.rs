//! Chart-ready series for one symbol.
//!
//! The page draws these directly; nothing here renders images.

use analysis_core::{AnalysisError, IndicatorSeries, PriceSeries};
use chrono::NaiveDate;
use serde::Serialize;
use technical_analysis::{rsi, sma};

use crate::config::DashboardConfig;

#[derive(Debug, Clone, Copy)]
pub struct ChartSettings {
    pub short_ma_window: usize,
    pub long_ma_window: usize,
    pub rsi_window: usize,
}

impl From<&DashboardConfig> for ChartSettings {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            short_ma_window: config.short_ma_window,
            long_ma_window: config.long_ma_window,
            rsi_window: config.rsi_window,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeBar {
    pub date: NaiveDate,
    pub volume: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClosePoint {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovingAverages {
    pub close: Vec<ClosePoint>,
    pub short_window: usize,
    pub short: IndicatorSeries,
    pub long_window: usize,
    pub long: IndicatorSeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct RsiPanel {
    pub window: usize,
    pub values: IndicatorSeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockChart {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub candles: Vec<Candle>,
    pub volume: Vec<VolumeBar>,
    pub moving_averages: MovingAverages,
    pub rsi: RsiPanel,
}

pub(crate) fn close_points(series: &PriceSeries) -> Vec<ClosePoint> {
    series
        .points()
        .iter()
        .map(|p| ClosePoint {
            date: p.date,
            close: p.close,
        })
        .collect()
}

/// Assemble the four panels for `[start, end)`.
pub fn build_stock_chart(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    series: &PriceSeries,
    settings: ChartSettings,
) -> Result<StockChart, AnalysisError> {
    let candles = series
        .points()
        .iter()
        .map(|p| Candle {
            date: p.date,
            open: p.open,
            high: p.high,
            low: p.low,
            close: p.close,
        })
        .collect();

    let volume = series
        .points()
        .iter()
        .map(|p| VolumeBar {
            date: p.date,
            volume: p.volume,
        })
        .collect();

    let moving_averages = MovingAverages {
        close: close_points(series),
        short_window: settings.short_ma_window,
        short: sma(series, settings.short_ma_window)?,
        long_window: settings.long_ma_window,
        long: sma(series, settings.long_ma_window)?,
    };

    Ok(StockChart {
        symbol: symbol.to_string(),
        start,
        end,
        candles,
        volume,
        moving_averages,
        rsi: RsiPanel {
            window: settings.rsi_window,
            values: rsi(series, settings.rsi_window)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::PricePoint;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint {
                date: start + chrono::Duration::days(i as i64),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1_000 + i as u64,
            })
            .collect();
        PriceSeries::new(points).unwrap()
    }

    fn settings() -> ChartSettings {
        ChartSettings {
            short_ma_window: 3,
            long_ma_window: 5,
            rsi_window: 2,
        }
    }

    #[test]
    fn test_panels_are_aligned() {
        let s = series(&[10.0, 11.0, 12.0, 11.0, 13.0, 14.0]);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let chart = build_stock_chart("AAPL", start, end, &s, settings()).unwrap();

        assert_eq!(chart.candles.len(), 6);
        assert_eq!(chart.volume.len(), 6);
        assert_eq!(chart.moving_averages.close.len(), 6);
        assert_eq!(chart.moving_averages.short.len(), 6);
        assert_eq!(chart.moving_averages.long.len(), 6);
        assert_eq!(chart.rsi.values.len(), 6);

        assert_eq!(chart.moving_averages.short.leading_undefined(), 2);
        assert_eq!(chart.moving_averages.long.leading_undefined(), 4);
        assert_eq!(chart.rsi.values.leading_undefined(), 2);
        assert_eq!(chart.volume[5].volume, 1_005);
    }

    #[test]
    fn test_short_series_has_undefined_long_average() {
        let s = series(&[10.0, 11.0]);
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let chart = build_stock_chart("AAPL", d, d, &s, settings()).unwrap();
        assert!(chart.moving_averages.long.values().iter().all(Option::is_none));
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let s = series(&[10.0, 11.0]);
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bad = ChartSettings {
            rsi_window: 0,
            ..settings()
        };
        assert!(matches!(
            build_stock_chart("AAPL", d, d, &s, bad),
            Err(AnalysisError::InvalidArgument(_))
        ));
    }
}

use analysis_core::{AnalysisError, IndicatorPoint, IndicatorSeries, PriceSeries};
use chrono::Duration;
use serde::Serialize;

use crate::indicators::sma;

/// Moving-average window used by the dashboard's predict view.
pub const DEFAULT_PREDICTION_MA_WINDOW: usize = 10;

/// Flat-line extrapolation of the latest moving average.
///
/// This is a display placeholder, not a forecast: every future date carries
/// the same value.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionBand {
    pub ma_window: usize,
    pub predicted_value: Option<f64>,
    pub points: IndicatorSeries,
}

/// Projects the last `ma_window`-point SMA over `horizon_days` calendar days
/// starting the day after the series ends.
///
/// Yields an empty band when the series is too short for a single SMA value
/// or when `horizon_days` is zero.
pub fn prediction_band(
    series: &PriceSeries,
    horizon_days: usize,
    ma_window: usize,
) -> Result<PredictionBand, AnalysisError> {
    let averages = sma(series, ma_window)?;

    let predicted_value = averages.last_defined();
    let (Some(value), Some(last_date)) = (predicted_value, series.last_date()) else {
        return Ok(PredictionBand {
            ma_window,
            predicted_value: None,
            points: IndicatorSeries::default(),
        });
    };

    let points = (1..=horizon_days)
        .filter_map(|offset| {
            let date = last_date.checked_add_signed(Duration::days(offset as i64))?;
            Some(IndicatorPoint {
                date,
                value: Some(value),
            })
        })
        .collect();

    Ok(PredictionBand {
        ma_window,
        predicted_value,
        points: IndicatorSeries { points },
    })
}

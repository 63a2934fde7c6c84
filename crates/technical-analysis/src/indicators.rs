use analysis_core::{AnalysisError, IndicatorSeries, PriceSeries};
use serde::Serialize;

/// Default lookback for [`rsi`].
pub const DEFAULT_RSI_WINDOW: usize = 14;

/// RSI reported when the window saw gains but no losses.
pub const RSI_SATURATED: f64 = 100.0;

/// RSI reported for a window with neither gains nor losses.
pub const RSI_NEUTRAL: f64 = 50.0;

fn check_window(window: usize) -> Result<(), AnalysisError> {
    if window == 0 {
        return Err(AnalysisError::InvalidArgument(
            "window must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// Trailing arithmetic mean over `window` values.
///
/// `out[i]` is defined only when the `window` inputs ending at `i` are all
/// defined, so an undefined input keeps every window that covers it undefined.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut result = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if i + 1 < window {
            result.push(None);
            continue;
        }
        let slice = &values[i + 1 - window..=i];
        let sum: Option<f64> = slice.iter().copied().sum();
        result.push(sum.map(|s| s / window as f64));
    }
    result
}

/// Simple Moving Average of close prices, aligned to the series dates.
pub fn sma(series: &PriceSeries, window: usize) -> Result<IndicatorSeries, AnalysisError> {
    check_window(window)?;

    let closes: Vec<Option<f64>> = series.closes().into_iter().map(Some).collect();
    let values = rolling_mean(&closes, window);
    Ok(IndicatorSeries::from_parts(&series.dates(), values))
}

/// Intermediate RSI series, all aligned to the source dates.
#[derive(Debug, Clone, Serialize)]
pub struct RsiBreakdown {
    pub window: usize,
    pub avg_gain: IndicatorSeries,
    pub avg_loss: IndicatorSeries,
    pub rsi: IndicatorSeries,
}

/// Maps average gain/loss to an RSI value.
///
/// A window with no losses saturates at 100 (or sits at 50 when it had no
/// gains either), so the result is never NaN.
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain > 0.0 {
            RSI_SATURATED
        } else {
            RSI_NEUTRAL
        }
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

/// Relative Strength Index with simple (non-Wilder) averaging.
///
/// The first `window` points are undefined: one for the missing first
/// delta, `window - 1` while the averages fill.
pub fn rsi_breakdown(series: &PriceSeries, window: usize) -> Result<RsiBreakdown, AnalysisError> {
    check_window(window)?;

    let closes = series.closes();
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());

    for i in 0..closes.len() {
        if i == 0 {
            gains.push(None);
            losses.push(None);
            continue;
        }
        let delta = closes[i] - closes[i - 1];
        gains.push(Some(delta.max(0.0)));
        losses.push(Some((-delta).max(0.0)));
    }

    let avg_gain = rolling_mean(&gains, window);
    let avg_loss = rolling_mean(&losses, window);

    let rsi_values: Vec<Option<f64>> = avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(g, l)| match (g, l) {
            (Some(g), Some(l)) => Some(rsi_from_averages(*g, *l)),
            _ => None,
        })
        .collect();

    let dates = series.dates();
    Ok(RsiBreakdown {
        window,
        avg_gain: IndicatorSeries::from_parts(&dates, avg_gain),
        avg_loss: IndicatorSeries::from_parts(&dates, avg_loss),
        rsi: IndicatorSeries::from_parts(&dates, rsi_values),
    })
}

/// Relative Strength Index over `window` periods.
pub fn rsi(series: &PriceSeries, window: usize) -> Result<IndicatorSeries, AnalysisError> {
    rsi_breakdown(series, window).map(|b| b.rsi)
}

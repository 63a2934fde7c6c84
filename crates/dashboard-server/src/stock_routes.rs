use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use technical_analysis::{prediction_band, PredictionBand};

use crate::charts::{build_stock_chart, close_points, ChartSettings, ClosePoint, StockChart};
use crate::session::Session;
use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct ChartQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct PredictionView {
    pub symbol: String,
    pub actual: Vec<ClosePoint>,
    pub band: PredictionBand,
}

pub fn stock_routes(enable_prediction: bool) -> Router<AppState> {
    let router = Router::new().route("/api/stocks/:symbol/chart", get(get_chart));

    if enable_prediction {
        router.route("/api/stocks/:symbol/predict", get(get_prediction))
    } else {
        router
    }
}

/// Trim and upper-case a ticker; an empty one is a bad request.
pub(crate) fn normalize_symbol(raw: &str) -> Result<String, AppError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AppError::bad_request("Symbol must not be empty"));
    }
    Ok(symbol)
}

/// Resolve the optional query bounds into `[start, end)`.
pub(crate) fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    lookback_days: i64,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), AppError> {
    let end = end.unwrap_or(today);
    let start = match start {
        Some(start) => start,
        None => end
            .checked_sub_signed(Duration::days(lookback_days))
            .ok_or_else(|| {
                AppError::bad_request(format!("End date {} is too early for the default range", end))
            })?,
    };
    if start >= end {
        return Err(AppError::bad_request(format!(
            "Start date {} must be before end date {}",
            start, end
        )));
    }
    Ok((start, end))
}

async fn get_chart(
    State(state): State<AppState>,
    _session: Session,
    Path(symbol): Path<String>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<ApiResponse<StockChart>>, AppError> {
    let symbol = normalize_symbol(&symbol)?;
    let (start, end) = resolve_range(
        query.start,
        query.end,
        state.config.default_lookback_days,
        Utc::now().date_naive(),
    )?;

    let series = state.market_data.fetch(&symbol, start, end).await?;
    tracing::debug!(
        "Fetched {} bars for {} from {}",
        series.len(),
        symbol,
        state.market_data.name()
    );

    let chart = build_stock_chart(
        &symbol,
        start,
        end,
        &series,
        ChartSettings::from(state.config.as_ref()),
    )?;
    Ok(Json(ApiResponse::success(chart)))
}

async fn get_prediction(
    State(state): State<AppState>,
    _session: Session,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<PredictionView>>, AppError> {
    let symbol = normalize_symbol(&symbol)?;
    let (start, end) = resolve_range(
        None,
        None,
        state.config.default_lookback_days,
        Utc::now().date_naive(),
    )?;

    let series = state.market_data.fetch(&symbol, start, end).await?;
    let band = prediction_band(
        &series,
        state.config.prediction_horizon_days,
        state.config.prediction_ma_window,
    )?;

    Ok(Json(ApiResponse::success(PredictionView {
        symbol,
        actual: close_points(&series),
        band,
    })))
}

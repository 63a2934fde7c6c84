use analysis_core::NewsArticle;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::session::Session;
use crate::{ApiResponse, AppError, AppState};

pub const NO_ARTICLES_MESSAGE: &str = "No news articles found for the given stock symbol.";

#[derive(Deserialize)]
pub struct NewsQuery {
    pub q: Option<String>,
}

pub fn news_routes() -> Router<AppState> {
    Router::new().route("/api/news", get(get_news))
}

async fn get_news(
    State(state): State<AppState>,
    _session: Session,
    Query(query): Query<NewsQuery>,
) -> Result<Json<ApiResponse<Vec<NewsArticle>>>, AppError> {
    let q = query
        .q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| state.config.default_symbol.clone());

    let articles = state.news.search(&q).await?;
    tracing::debug!("{} returned {} articles for '{}'", state.news.name(), articles.len(), q);

    if articles.is_empty() {
        return Ok(Json(ApiResponse::success(articles).with_message(NO_ARTICLES_MESSAGE)));
    }
    Ok(Json(ApiResponse::success(articles)))
}

//! Headline search behind [`analysis_core::NewsProvider`].

pub mod gnews;
pub mod newsapi;

use analysis_core::{AnalysisError, NewsArticle};
use reqwest::Client;
use std::time::Duration;

pub use gnews::GNewsClient;
pub use newsapi::NewsApiClient;

pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Sends a prepared request and decodes a JSON body, mapping transport
/// failures and non-2xx statuses to `ServiceError`.
pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, AnalysisError> {
    let response = request.send().await.map_err(|e| {
        tracing::warn!("{} request failed: {}", provider, e);
        AnalysisError::ServiceError(format!("{}: {}", provider, e))
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("{} returned HTTP {}", provider, status);
        return Err(AnalysisError::ServiceError(format!(
            "{} HTTP {}: {}",
            provider, status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AnalysisError::ServiceError(format!("{}: invalid body: {}", provider, e)))
}

/// Drops articles the dashboard cannot render.
pub(crate) fn displayable(articles: Vec<NewsArticle>) -> Vec<NewsArticle> {
    articles.into_iter().filter(|a| a.is_displayable()).collect()
}

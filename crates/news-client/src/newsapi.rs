use analysis_core::{AnalysisError, NewsArticle, NewsProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{displayable, get_json, http_client};

const BASE_URL: &str = "https://newsapi.org/v2";

/// NewsAPI `everything` client, English articles newest first.
#[derive(Clone)]
pub struct NewsApiClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl NewsApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            client: http_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl NewsProvider for NewsApiClient {
    async fn search(&self, query: &str) -> Result<Vec<NewsArticle>, AnalysisError> {
        let url = format!("{}/everything", self.base_url);
        let request = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(&[("q", query), ("language", "en"), ("sortBy", "publishedAt")]);

        let response: NewsApiResponse = get_json(self.name(), request).await?;
        if response.status != "ok" {
            return Err(AnalysisError::ServiceError(format!(
                "newsapi status {}: {}",
                response.status,
                response.message.unwrap_or_default()
            )));
        }
        Ok(displayable(response.into_articles()))
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<NewsApiSource>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

impl NewsApiResponse {
    fn into_articles(self) -> Vec<NewsArticle> {
        self.articles
            .into_iter()
            .map(|a| NewsArticle {
                title: a.title.unwrap_or_default(),
                description: a.description,
                url: a.url.unwrap_or_default(),
                source: a.source.and_then(|s| s.name),
                published_at: a.published_at,
            })
            .collect()
    }
}

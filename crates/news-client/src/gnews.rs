use analysis_core::{AnalysisError, NewsArticle, NewsProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{displayable, get_json, http_client};

const BASE_URL: &str = "https://gnews.io/api/v4";

/// GNews search client.
#[derive(Clone)]
pub struct GNewsClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GNewsClient {
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
impl NewsProvider for GNewsClient {
    async fn search(&self, query: &str) -> Result<Vec<NewsArticle>, AnalysisError> {
        let url = format!("{}/search", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("q", query), ("token", self.api_key.as_str())]);

        let response: GNewsResponse = get_json(self.name(), request).await?;
        Ok(displayable(response.into_articles()))
    }

    fn name(&self) -> &'static str {
        "gnews"
    }
}

#[derive(Debug, Deserialize)]
struct GNewsResponse {
    #[serde(default)]
    articles: Vec<GNewsArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GNewsArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<GNewsSource>,
}

#[derive(Debug, Deserialize)]
struct GNewsSource {
    name: Option<String>,
}

impl GNewsResponse {
    fn into_articles(self) -> Vec<NewsArticle> {
        self.articles
            .into_iter()
            .map(|a| NewsArticle {
                title: a.title,
                description: a.description,
                url: a.url,
                source: a.source.and_then(|s| s.name),
                published_at: a.published_at,
            })
            .collect()
    }
}

use std::sync::Arc;

use analysis_core::{
    validate_range, AnalysisError, MarketDataProvider, NewsArticle, NewsProvider, PricePoint,
    PriceSeries,
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate};
use credential_store::{ensure_account, MemoryCredentialStore};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::config_from_pairs;
use crate::news_routes::NO_ARTICLES_MESSAGE;
use crate::{build_router, AppState};

struct FakeMarketData {
    result: Result<PriceSeries, AnalysisError>,
}

#[async_trait]
impl MarketDataProvider for FakeMarketData {
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, AnalysisError> {
        validate_range(symbol, start, end)?;
        self.result.clone()
    }

    fn name(&self) -> &'static str {
        "fake-market"
    }
}

struct FakeNews {
    result: Result<Vec<NewsArticle>, AnalysisError>,
}

#[async_trait]
impl NewsProvider for FakeNews {
    async fn search(&self, _query: &str) -> Result<Vec<NewsArticle>, AnalysisError> {
        self.result.clone()
    }

    fn name(&self) -> &'static str {
        "fake-news"
    }
}

fn series(len: usize) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let points = (0..len)
        .map(|i| {
            let close = 100.0 + i as f64;
            PricePoint {
                date: start + Duration::days(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000,
            }
        })
        .collect();
    PriceSeries::new(points).unwrap()
}

fn article(title: &str) -> NewsArticle {
    NewsArticle {
        title: title.to_string(),
        description: Some("desc".to_string()),
        url: format!("https://news.example/{}", title),
        source: Some("Example".to_string()),
        published_at: None,
    }
}

struct TestApp {
    router: Router,
}

impl TestApp {
    async fn build(
        pairs: &[(&str, &str)],
        market: Result<PriceSeries, AnalysisError>,
        news: Result<Vec<NewsArticle>, AnalysisError>,
    ) -> Self {
        let mut all = vec![("SHORT_MA_WINDOW", "5"), ("LONG_MA_WINDOW", "10")];
        all.extend_from_slice(pairs);
        let config = config_from_pairs(&all).unwrap();

        let credentials = Arc::new(MemoryCredentialStore::new());
        ensure_account(credentials.as_ref(), "admin", "password").await.unwrap();

        let state = AppState::new(
            config,
            Arc::new(FakeMarketData { result: market }),
            Arc::new(FakeNews { result: news }),
            credentials,
        );
        Self {
            router: build_router(state),
        }
    }

    async fn default() -> Self {
        Self::build(&[], Ok(series(30)), Ok(vec![article("one")])).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("X-Session-Token", token);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            "/api/auth/login",
            None,
            json!({ "username": username, "password": password }),
        )
        .await
    }

    async fn token(&self) -> String {
        let (status, body) = self.login("admin", "password").await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::default().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_public_config_reports_flags() {
    let app = TestApp::build(&[("ENABLE_PREDICTION", "false")], Ok(series(5)), Ok(vec![])).await;
    let (status, body) = app.get("/api/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enable_prediction"], false);
    assert_eq!(body["data"]["enable_registration"], false);
    assert_eq!(body["data"]["default_symbol"], "AAPL");
}

#[tokio::test]
async fn test_index_page_is_served() {
    let app = TestApp::default().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("Stonks Dashboard"));
}

#[tokio::test]
async fn test_api_requires_session() {
    let app = TestApp::default().await;
    let (status, body) = app.get("/api/stocks/AAPL/chart", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/api/news", Some("not-a-real-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_and_session() {
    let app = TestApp::default().await;
    let token = app.token().await;

    let (status, body) = app.get("/api/session", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "admin");
    assert!(body["data"].get("token").is_none());
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let app = TestApp::default().await;
    let (status, body) = app.login("admin", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app.login("nobody", "password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_repeated_failures_lock_out() {
    let app = TestApp::build(&[("AUTH_MAX_FAILURES", "2")], Ok(series(5)), Ok(vec![])).await;
    assert_eq!(app.login("admin", "bad").await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(app.login("admin", "bad").await.0, StatusCode::UNAUTHORIZED);

    let (status, _) = app.login("admin", "password").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = TestApp::default().await;
    let token = app.token().await;

    let (status, body) = app.post("/api/auth/logout", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out");

    let (status, _) = app.get("/api/session", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_chart_panels() {
    let app = TestApp::default().await;
    let token = app.token().await;

    let (status, body) = app
        .get("/api/stocks/aapl/chart?start=2024-01-01&end=2024-02-01", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);

    let chart = &body["data"];
    assert_eq!(chart["symbol"], "AAPL");
    assert_eq!(chart["start"], "2024-01-01");
    assert_eq!(chart["candles"].as_array().unwrap().len(), 30);
    assert_eq!(chart["volume"].as_array().unwrap().len(), 30);
    assert_eq!(chart["moving_averages"]["short_window"], 5);

    let short = chart["moving_averages"]["short"].as_array().unwrap();
    assert!(short[3]["value"].is_null());
    assert_eq!(short[4]["value"], 102.0);

    let rsi = chart["rsi"]["values"].as_array().unwrap();
    assert_eq!(rsi.len(), 30);
    assert!(rsi[13]["value"].is_null());
    assert_eq!(rsi[14]["value"], 100.0);
}

#[tokio::test]
async fn test_chart_rejects_bad_input() {
    let app = TestApp::default().await;
    let token = app.token().await;

    let (status, _) = app.get("/api/stocks/%20/chart", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .get("/api/stocks/AAPL/chart?start=2024-02-01&end=2024-01-01", Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_unavailable_market_data() {
    let app = TestApp::build(
        &[],
        Err(AnalysisError::DataUnavailable("no bars for ZZZZ".into())),
        Ok(vec![]),
    )
    .await;
    let token = app.token().await;

    let (status, body) = app.get("/api/stocks/ZZZZ/chart", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no bars for ZZZZ");
}

#[tokio::test]
async fn test_prediction_band() {
    let app = TestApp::default().await;
    let token = app.token().await;

    let (status, body) = app.get("/api/stocks/AAPL/predict", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let band = &body["data"]["band"];
    let points = band["points"].as_array().unwrap();
    assert_eq!(points.len(), 10);
    // Mean of closes 120..=129.
    assert_eq!(band["predicted_value"], 124.5);
    assert_eq!(points[0]["date"], "2024-01-31");
    assert_eq!(points[9]["date"], "2024-02-09");
    assert!(points.iter().all(|p| p["value"] == 124.5));
    let actual = body["data"]["actual"].as_array().unwrap();
    assert_eq!(actual.len(), 30);
    // The band picks up the day after the last actual close.
    assert_eq!(actual[29]["date"], "2024-01-30");
}

#[tokio::test]
async fn test_prediction_disabled() {
    let app = TestApp::build(&[("ENABLE_PREDICTION", "false")], Ok(series(30)), Ok(vec![])).await;
    let token = app.token().await;
    let (status, _) = app.get("/api/stocks/AAPL/predict", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_registration_disabled_by_default() {
    let app = TestApp::default().await;
    let (status, _) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "bob", "password": "pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_registration_flow() {
    let app = TestApp::build(&[("ENABLE_REGISTRATION", "true")], Ok(series(5)), Ok(vec![])).await;
    let credentials = json!({ "username": "bob", "password": "hunter2" });

    let (status, body) = app.post("/api/auth/register", None, credentials.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["username"], "bob");

    let (status, _) = app.post("/api/auth/register", None, credentials).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "  ", "password": "pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.login("bob", "hunter2").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_news_articles() {
    let app = TestApp::default().await;
    let token = app.token().await;

    let (status, body) = app.get("/api/news?q=AAPL", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["title"], "one");
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn test_empty_news_carries_message() {
    let app = TestApp::build(&[], Ok(series(5)), Ok(vec![])).await;
    let token = app.token().await;

    let (status, body) = app.get("/api/news", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["message"], NO_ARTICLES_MESSAGE);
}

#[tokio::test]
async fn test_news_service_error() {
    let app = TestApp::build(
        &[],
        Ok(series(5)),
        Err(AnalysisError::ServiceError("gnews: 403".into())),
    )
    .await;
    let token = app.token().await;

    let (status, body) = app.get("/api/news?q=TSLA", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
}

#[test]
fn test_app_error_status_and_debug() {
    use crate::AppError;
    use axum::response::IntoResponse;

    let bad = AppError::bad_request("Symbol must not be empty");
    assert!(format!("{:?}", bad).contains("Symbol must not be empty"));
    assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);

    let cases = [
        (AnalysisError::DataUnavailable("x".into()), StatusCode::NOT_FOUND),
        (AnalysisError::ServiceError("x".into()), StatusCode::BAD_GATEWAY),
        (AnalysisError::InvalidData("x".into()), StatusCode::BAD_GATEWAY),
        (AnalysisError::AlreadyExists("x".into()), StatusCode::CONFLICT),
        (AnalysisError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (error, status) in cases {
        assert_eq!(AppError::from(error).into_response().status(), status);
    }
    assert_eq!(
        AppError::from(anyhow::anyhow!("boom")).into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_chart_with_end_near_minimum_date() {
    let app = TestApp::default().await;
    let token = app.token().await;

    let (status, body) = app
        .get("/api/stocks/AAPL/chart?end=-262143-01-05", Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

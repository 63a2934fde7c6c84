//! Stonks dashboard HTTP server.
//!
//! Serves the embedded page plus the JSON API behind it: login, charts,
//! the flat prediction band and news headlines.

pub mod auth;
pub mod brute_force;
pub mod charts;
pub mod config;
pub mod embedded_frontend;
pub mod news_routes;
pub mod session;
pub mod stock_routes;

#[cfg(test)]
mod router_tests;

use analysis_core::{AnalysisError, MarketDataProvider, NewsProvider};
use anyhow::Context;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use credential_store::{
    ensure_account, CredentialBackend, CredentialStore, MemoryCredentialStore, SqliteCredentialStore,
};
use market_data::YahooFinanceClient;
use news_client::{GNewsClient, NewsApiClient};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::brute_force::LoginGuard;
use crate::config::{DashboardConfig, NewsSource};
use crate::session::SessionStore;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);
const MAX_SESSION_TTL_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DashboardConfig>,
    pub market_data: Arc<dyn MarketDataProvider>,
    pub news: Arc<dyn NewsProvider>,
    pub credentials: Arc<dyn CredentialStore>,
    pub sessions: Arc<SessionStore>,
    pub login_guard: Arc<LoginGuard>,
}

impl AppState {
    pub fn new(
        config: DashboardConfig,
        market_data: Arc<dyn MarketDataProvider>,
        news: Arc<dyn NewsProvider>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let ttl_secs = i64::try_from(config.session_ttl_secs)
            .unwrap_or(MAX_SESSION_TTL_SECS)
            .min(MAX_SESSION_TTL_SECS);
        let sessions = SessionStore::new(chrono::Duration::seconds(ttl_secs));
        let login_guard = LoginGuard::new(
            config.auth_max_failures,
            Duration::from_secs(config.auth_failure_window_secs),
            Duration::from_secs(config.auth_lockout_secs),
        );

        Self {
            config: Arc::new(config),
            market_data,
            news,
            credentials,
            sessions: Arc::new(sessions),
            login_guard: Arc::new(login_guard),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Handler error. Analysis errors keep their kind so the status code can
/// follow it; anything else is a 500.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(AnalysisError::InvalidArgument(message.into()).into())
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0.downcast_ref::<AnalysisError>() {
            Some(AnalysisError::InvalidArgument(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            Some(AnalysisError::DataUnavailable(msg)) => {
                tracing::warn!("Market data unavailable: {}", msg);
                (StatusCode::NOT_FOUND, msg.clone())
            }
            Some(e @ (AnalysisError::ServiceError(_) | AnalysisError::InvalidData(_))) => {
                tracing::warn!("Upstream failure: {}", e);
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            Some(AnalysisError::AlreadyExists(msg)) => (StatusCode::CONFLICT, msg.clone()),
            _ => {
                tracing::error!("Request failed: {:#}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

/// What the page needs to know before it renders anything.
#[derive(Debug, Serialize)]
pub struct PublicConfig {
    pub enable_prediction: bool,
    pub enable_registration: bool,
    pub default_symbol: String,
    pub default_lookback_days: i64,
    pub short_ma_window: usize,
    pub long_ma_window: usize,
    pub rsi_window: usize,
    pub prediction_horizon_days: usize,
}

impl From<&DashboardConfig> for PublicConfig {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            enable_prediction: config.enable_prediction,
            enable_registration: config.enable_registration,
            default_symbol: config.default_symbol.clone(),
            default_lookback_days: config.default_lookback_days,
            short_ma_window: config.short_ma_window,
            long_ma_window: config.long_ma_window,
            rsi_window: config.rsi_window,
            prediction_horizon_days: config.prediction_horizon_days,
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn public_config(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<ApiResponse<PublicConfig>> {
    Json(ApiResponse::success(PublicConfig::from(state.config.as_ref())))
}

/// Full router: page, public endpoints, and the session-gated API.
pub fn build_router(state: AppState) -> Router {
    let enable_prediction = state.config.enable_prediction;
    let enable_registration = state.config.enable_registration;

    Router::new()
        .route("/", get(embedded_frontend::index))
        .route("/assets/*path", get(embedded_frontend::asset))
        .route("/health", get(health))
        .route("/api/config", get(public_config))
        .merge(auth::auth_routes(enable_registration))
        .merge(stock_routes::stock_routes(enable_prediction))
        .merge(news_routes::news_routes())
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

fn build_market_data(config: &DashboardConfig) -> Arc<dyn MarketDataProvider> {
    let client = YahooFinanceClient::new();
    match &config.yahoo_chart_url {
        Some(url) => Arc::new(client.with_base_url(url.clone())),
        None => Arc::new(client),
    }
}

fn build_news(config: &DashboardConfig) -> Arc<dyn NewsProvider> {
    let key = config.news_api_key.clone().unwrap_or_default();
    match config.news_source {
        NewsSource::GNews => Arc::new(GNewsClient::new(key)),
        NewsSource::NewsApi => Arc::new(NewsApiClient::new(key)),
    }
}

async fn build_credentials(config: &DashboardConfig) -> anyhow::Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match config.credential_backend {
        CredentialBackend::Memory => Arc::new(MemoryCredentialStore::new()),
        CredentialBackend::Sqlite => Arc::new(
            SqliteCredentialStore::connect(&config.database_url)
                .await
                .with_context(|| format!("opening credential database {}", config.database_url))?,
        ),
    };

    if let Some(password) = &config.admin_password {
        ensure_account(store.as_ref(), &config.admin_username, password).await?;
    }
    Ok(store)
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Starting Stonks dashboard server");

    let config = DashboardConfig::from_env()?;
    config.log_summary();

    let market_data = build_market_data(&config);
    let news = build_news(&config);
    let credentials = build_credentials(&config).await?;
    tracing::info!(
        "Providers: market data {}, news {}",
        market_data.name(),
        news.name()
    );

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, market_data, news, credentials);

    let sessions = state.sessions.clone();
    let login_guard = state.login_guard.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            sessions.cleanup();
            login_guard.cleanup();
        }
    });

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    tracing::info!("Dashboard listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

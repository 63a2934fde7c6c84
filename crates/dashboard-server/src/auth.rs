use analysis_core::AnalysisError;
use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;

use crate::session::Session;
use crate::{ApiResponse, AppState};

#[cfg(test)]
#[path = "auth_tests.rs"]
mod auth_tests;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub username: String,
}

pub fn auth_routes(enable_registration: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/session", get(current_session));

    if enable_registration {
        router.route("/api/auth/register", post(register))
    } else {
        router
    }
}

fn client_ip(connect_info: Option<ConnectInfo<SocketAddr>>) -> String {
    connect_info
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Guard key for a login attempt: client IP plus the attempted username.
fn guard_key(ip: &str, username: &str) -> String {
    format!("{}|{}", ip, username.to_lowercase())
}

/// Client description for auth logs; the username is masked.
pub(crate) fn client_label(ip: &str, username: &str) -> String {
    format!("{} ({})", ip, mask_username(username))
}

/// Mask a username for logging (first character only).
pub(crate) fn mask_username(username: &str) -> String {
    match username.chars().next() {
        Some(first) => format!("{}***", first),
        None => "***".to_string(),
    }
}

async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AuthError> {
    let username = req.username.trim().to_string();
    let ip = client_ip(connect_info);
    let key = guard_key(&ip, &username);

    if state.login_guard.is_locked(&key) {
        tracing::warn!("Login refused for {}: locked out", client_label(&ip, &username));
        return Err(AuthError::Locked);
    }

    let valid = state
        .credentials
        .verify(&username, &req.password)
        .await
        .map_err(AuthError::Backend)?;

    if !valid {
        tracing::warn!("Failed login for {}", client_label(&ip, &username));
        if state.login_guard.record_failure(&key) {
            tracing::warn!(
                "Login lockout triggered for {} after {} failures",
                client_label(&ip, &username),
                state.config.auth_max_failures
            );
        }
        return Err(AuthError::InvalidCredentials);
    }

    state.login_guard.record_success(&key);
    let session = state.sessions.create(&username);
    tracing::info!("User {} logged in", mask_username(&username));

    Ok(Json(ApiResponse::success(LoginResponse {
        token: session.token,
        username: session.username,
        expires_at: session.expires_at,
    })))
}

async fn logout(State(state): State<AppState>, session: Session) -> Json<ApiResponse<()>> {
    state.sessions.revoke(&session.token);
    tracing::info!("User {} logged out", mask_username(&session.username));
    Json(ApiResponse::success(()).with_message("Logged out"))
}

async fn current_session(session: Session) -> Json<ApiResponse<Session>> {
    Json(ApiResponse::success(session))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisteredUser>>), AuthError> {
    let username = req.username.trim().to_string();
    match state.credentials.insert(&username, &req.password).await {
        Ok(()) => {
            tracing::info!("Registered user {}", mask_username(&username));
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::success(RegisteredUser { username })),
            ))
        }
        Err(AnalysisError::AlreadyExists(_)) => Err(AuthError::UsernameTaken),
        Err(AnalysisError::InvalidArgument(msg)) => Err(AuthError::InvalidInput(msg)),
        Err(e) => Err(AuthError::Backend(e)),
    }
}

/// Authentication errors
#[derive(Debug)]
pub enum AuthError {
    MissingSession,
    InvalidSession,
    InvalidCredentials,
    UsernameTaken,
    InvalidInput(String),
    Locked,
    Backend(AnalysisError),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingSession => write!(f, "Missing session token"),
            AuthError::InvalidSession => write!(f, "Invalid or expired session"),
            AuthError::InvalidCredentials => write!(f, "Invalid username or password"),
            AuthError::UsernameTaken => write!(f, "Username already exists"),
            AuthError::InvalidInput(msg) => write!(f, "{}", msg),
            AuthError::Locked => write!(f, "Too many failed login attempts"),
            AuthError::Backend(e) => write!(f, "Credential backend error: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingSession => (
                StatusCode::UNAUTHORIZED,
                "Missing session token. Log in and send it via Authorization: Bearer or X-Session-Token.".to_string(),
            ),
            AuthError::InvalidSession => (
                StatusCode::UNAUTHORIZED,
                "Session is invalid or has expired. Please log in again.".to_string(),
            ),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid username or password.".to_string(),
            ),
            AuthError::UsernameTaken => (
                StatusCode::CONFLICT,
                "Username already exists. Please choose a different one.".to_string(),
            ),
            AuthError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AuthError::Locked => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many failed login attempts. Please try again later.".to_string(),
            ),
            AuthError::Backend(e) => {
                tracing::error!("Credential backend error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

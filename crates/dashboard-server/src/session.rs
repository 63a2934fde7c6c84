use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::AppState;

/// A logged-in user. Handlers that need a login take this as an argument.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    #[serde(skip_serializing)]
    pub token: String,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Live sessions keyed by token.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn create(&self, username: &str) -> Session {
        self.create_at(username, Utc::now())
    }

    fn create_at(&self, username: &str, now: DateTime<Utc>) -> Session {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let session = Session {
            token: token.clone(),
            username: username.to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
        };
        self.sessions.insert(token, session.clone());
        session
    }

    /// Resolve a token, evicting it if it has expired.
    pub fn get(&self, token: &str) -> Option<Session> {
        self.get_at(token, Utc::now())
    }

    fn get_at(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        let session = self.sessions.get(token).map(|entry| entry.value().clone())?;
        if session.is_expired_at(now) {
            self.sessions.remove(token);
            return None;
        }
        Some(session)
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop expired sessions. Run periodically.
    pub fn cleanup(&self) {
        let now = Utc::now();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Pull the session token from `Authorization: Bearer` or `X-Session-Token`.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Result<String, AuthError> {
    if let Some(auth) = headers.get("Authorization") {
        if let Ok(auth_str) = auth.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Ok(token.to_string());
                }
            }
        }
    }

    if let Some(token) = headers.get("X-Session-Token") {
        if let Ok(token) = token.to_str() {
            let token = token.trim();
            if !token.is_empty() {
                return Ok(token.to_string());
            }
        }
    }

    Err(AuthError::MissingSession)
}

/// Mask a token for logging (first 4 and last 4 characters).
pub(crate) fn mask_token(token: &str) -> String {
    if token.len() <= 8 {
        return "****".to_string();
    }
    format!("{}...{}", &token[..4], &token[token.len() - 4..])
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(&parts.headers)?;
        match state.sessions.get(&token) {
            Some(session) => Ok(session),
            None => {
                tracing::debug!("Rejected unknown or expired session {}", mask_token(&token));
                Err(AuthError::InvalidSession)
            }
        }
    }
}

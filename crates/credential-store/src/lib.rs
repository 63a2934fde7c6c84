//! Username to password-digest storage for the dashboard login.

pub mod memory;
pub mod password;
pub mod sqlite;

use analysis_core::AnalysisError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub use memory::MemoryCredentialStore;
pub use sqlite::SqliteCredentialStore;

/// A stored account. The password itself is never kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredCredential {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Which store backs the login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    Memory,
    Sqlite,
}

impl FromStr for CredentialBackend {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(CredentialBackend::Memory),
            "sqlite" => Ok(CredentialBackend::Sqlite),
            other => Err(AnalysisError::InvalidArgument(format!(
                "unknown credential backend '{}', expected memory or sqlite",
                other
            ))),
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn lookup(&self, username: &str) -> Result<Option<StoredCredential>, AnalysisError>;

    /// Fails with `AlreadyExists` when the username is taken.
    async fn insert(&self, username: &str, password: &str) -> Result<(), AnalysisError>;

    /// `Ok(false)` for an unknown user or a wrong password.
    async fn verify(&self, username: &str, password: &str) -> Result<bool, AnalysisError> {
        let Some(credential) = self.lookup(username.trim()).await? else {
            // Burn the same work as a real check so unknown users aren't faster
            let _ = crate::password::verify_password(password, crate::password::DUMMY_HASH);
            return Ok(false);
        };
        Ok(crate::password::verify_password(password, &credential.password_hash))
    }
}

/// Trims and checks a username/password pair before it reaches a store.
pub(crate) fn validate_new_account(username: &str, password: &str) -> Result<String, AnalysisError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AnalysisError::InvalidArgument("username must not be empty".to_string()));
    }
    if username.len() > 64 {
        return Err(AnalysisError::InvalidArgument("username is longer than 64 characters".to_string()));
    }
    if password.is_empty() {
        return Err(AnalysisError::InvalidArgument("password must not be empty".to_string()));
    }
    Ok(username.to_string())
}

/// Creates the account unless it already exists.
pub async fn ensure_account(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> Result<(), AnalysisError> {
    match store.insert(username, password).await {
        Ok(()) => {
            tracing::info!("Seeded account '{}'", username.trim());
            Ok(())
        }
        Err(AnalysisError::AlreadyExists(_)) => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("memory".parse::<CredentialBackend>().unwrap(), CredentialBackend::Memory);
        assert_eq!(" SQLite ".parse::<CredentialBackend>().unwrap(), CredentialBackend::Sqlite);
        assert!("postgres".parse::<CredentialBackend>().is_err());
    }

    #[test]
    fn test_validate_new_account() {
        assert_eq!(validate_new_account("  alice ", "pw").unwrap(), "alice");
        assert!(validate_new_account("   ", "pw").is_err());
        assert!(validate_new_account("alice", "").is_err());
        assert!(validate_new_account(&"x".repeat(65), "pw").is_err());
    }

    #[test]
    fn test_credential_never_serializes_hash() {
        let credential = StoredCredential {
            username: "alice".to_string(),
            password_hash: "secret".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&credential).unwrap();
        assert!(!json.contains("secret"));
    }

    #[tokio::test]
    async fn test_ensure_account_is_idempotent() {
        let store = MemoryCredentialStore::new();
        ensure_account(&store, "admin", "pw").await.unwrap();
        ensure_account(&store, "admin", "other").await.unwrap();
        assert!(store.verify("admin", "pw").await.unwrap());
    }
}

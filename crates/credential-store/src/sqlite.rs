use analysis_core::AnalysisError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::password::hash_password;
use crate::{validate_new_account, CredentialStore, StoredCredential};

fn storage_error(e: sqlx::Error) -> AnalysisError {
    AnalysisError::Storage(e.to_string())
}

/// Accounts persisted in a single SQLite `users` table.
#[derive(Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl SqliteCredentialStore {
    /// Open (creating if missing) the database and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, AnalysisError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(storage_error)?
            .create_if_missing(true);

        // Every pooled connection to `:memory:` gets its own database, so keep
        // exactly one and never recycle it
        let in_memory = database_url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(storage_error)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), AnalysisError> {
        let schema = include_str!("../schema.sql");

        // sqlx runs one statement per query
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await.map_err(storage_error)?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn lookup(&self, username: &str) -> Result<Option<StoredCredential>, AnalysisError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.map(|r| StoredCredential {
            username: r.username,
            password_hash: r.password_hash,
            created_at: r.created_at,
        }))
    }

    async fn insert(&self, username: &str, password: &str) -> Result<(), AnalysisError> {
        let username = validate_new_account(username, password)?;

        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(&username)
        .bind(hash_password(password))
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AnalysisError::AlreadyExists(format!("user '{}' already exists", username)),
            ),
            Err(e) => Err(storage_error(e)),
        }
    }
}

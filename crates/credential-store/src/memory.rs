use analysis_core::AnalysisError;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::password::hash_password;
use crate::{validate_new_account, CredentialStore, StoredCredential};

/// Process-local accounts, lost on restart.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: DashMap<String, StoredCredential>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn lookup(&self, username: &str) -> Result<Option<StoredCredential>, AnalysisError> {
        Ok(self.users.get(username.trim()).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, username: &str, password: &str) -> Result<(), AnalysisError> {
        let username = validate_new_account(username, password)?;

        match self.users.entry(username.clone()) {
            Entry::Occupied(_) => Err(AnalysisError::AlreadyExists(format!(
                "user '{}' already exists",
                username
            ))),
            Entry::Vacant(slot) => {
                slot.insert(StoredCredential {
                    username,
                    password_hash: hash_password(password),
                    created_at: Utc::now(),
                });
                Ok(())
            }
        }
    }
}

//! In-memory credential store
//!
//! Keeps user records in a map guarded by a tokio mutex. Used by tests and
//! by embedders that do not need persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::Mutex;

use crate::domain::result::{Error, Result};
use crate::domain::{StoredCredential, User, UserCredential, UserDetail, UserId};
use crate::ports::CredentialStore;
use crate::services::PasswordHasher;

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: String,
    phone: Option<String>,
    deleted: bool,
}

/// Credential store held entirely in process memory
pub struct InMemoryCredentialStore {
    users: Mutex<HashMap<UserId, UserRecord>>,
    hasher: PasswordHasher,
}

impl InMemoryCredentialStore {
    pub fn new(hasher: PasswordHasher) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            hasher,
        }
    }

    /// Number of records, soft-deleted ones included
    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.lock().await.is_empty()
    }

    /// Whether a record exists and carries the soft-delete flag
    pub async fn is_deleted(&self, id: &UserId) -> Option<bool> {
        self.users.lock().await.get(id).map(|record| record.deleted)
    }

    async fn active_record(&self, id: &UserId) -> Result<UserRecord> {
        let users = self.users.lock().await;
        match users.get(id) {
            Some(record) if !record.deleted => Ok(record.clone()),
            _ => Err(Error::not_found(format!("User {} not found", id))),
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create_user(&self, credential: UserCredential) -> Result<()> {
        let UserCredential { user, password, phone } = credential;

        if self.users.lock().await.contains_key(&user.id) {
            return Err(Error::already_exists(format!("User {} already exists", user.id)));
        }

        let password_hash = self.hasher.hash(&password).await?;
        drop(password);

        // Re-check under the same lock as the insert: another registration may
        // have won while we were hashing.
        let mut users = self.users.lock().await;
        if users.contains_key(&user.id) {
            return Err(Error::already_exists(format!("User {} already exists", user.id)));
        }
        users.insert(
            user.id.clone(),
            UserRecord {
                user,
                password_hash,
                phone,
                deleted: false,
            },
        );
        Ok(())
    }

    async fn get_credential(&self, id: &UserId) -> Result<StoredCredential> {
        let record = self.active_record(id).await?;
        Ok(StoredCredential {
            user: record.user,
            password_hash: record.password_hash,
        })
    }

    async fn get_detail(&self, id: &UserId) -> Result<UserDetail> {
        let record = self.active_record(id).await?;
        Ok(UserDetail {
            user: record.user,
            phone: record.phone,
        })
    }

    async fn delete_user(&self, id: &UserId) -> Result<()> {
        let mut users = self.users.lock().await;
        match users.get_mut(id) {
            Some(record) => {
                record.deleted = true;
                Ok(())
            }
            None => Err(Error::not_found(format!("User {} not found", id))),
        }
    }

    async fn verify_secret(&self, plaintext: &SecretString, hashed: &str) -> Result<bool> {
        self.hasher.verify(plaintext, hashed).await
    }
}

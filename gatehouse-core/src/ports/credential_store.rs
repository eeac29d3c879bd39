//! Credential store port - user record persistence

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::result::Result;
use crate::domain::{StoredCredential, UserCredential, UserDetail, UserId};

/// Durable storage of user records keyed by identity.
///
/// Implementations own password hashing: the plaintext secret handed to
/// [`CredentialStore::create_user`] is hashed before it is persisted and never
/// written anywhere in plaintext. Not-found and already-exists conditions are
/// reported as `Error::NotFound` / `Error::AlreadyExists` so they stay
/// distinguishable from connectivity failures.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create a user record
    ///
    /// Fails with `AlreadyExists` when any record (soft-deleted included)
    /// has the same identity. The existence check and the insert are atomic.
    async fn create_user(&self, credential: UserCredential) -> Result<()>;

    /// Get the stored credential for an active user
    async fn get_credential(&self, id: &UserId) -> Result<StoredCredential>;

    /// Get the detail record for an active user
    async fn get_detail(&self, id: &UserId) -> Result<UserDetail>;

    /// Soft delete a user (idempotent on already-deleted records)
    async fn delete_user(&self, id: &UserId) -> Result<()>;

    /// Compare a plaintext secret with a stored hash using the hash
    /// function's own verification primitive
    async fn verify_secret(&self, plaintext: &SecretString, hashed: &str) -> Result<bool>;
}

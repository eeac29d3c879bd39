//! Authentication service - login, registration and role-gated deletion
//!
//! Orchestrates the credential store and the token authority, and owns the
//! only authorization policy in the system: only admins may delete users, and
//! admin users can never be deleted.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{SessionToken, User, UserCredential, UserDetail, UserId};
use crate::ports::{CredentialStore, TokenAuthority};
use crate::services::PasswordHasher;

/// Default bound on a single credential store round-trip
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Authentication service
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<dyn TokenAuthority>,
    store_timeout: Option<Duration>,
    refresh_role_from_store: bool,
    decoy: Option<LoginDecoy>,
}

/// Hash verified against when a login names an unknown identity
struct LoginDecoy {
    hasher: PasswordHasher,
    hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: Arc<dyn TokenAuthority>) -> Self {
        Self {
            store,
            tokens,
            store_timeout: Some(DEFAULT_STORE_TIMEOUT),
            refresh_role_from_store: false,
            decoy: None,
        }
    }

    /// Spend one password verification on logins for unknown identities, so
    /// they take as long as a wrong password.
    ///
    /// `hasher` should use the same parameters as the store's hasher.
    pub fn with_login_decoy(mut self, hasher: PasswordHasher) -> Self {
        self.decoy = Some(LoginDecoy {
            hasher,
            hash: OnceCell::new(),
        });
        self
    }

    /// Bound every store round-trip; `None` waits indefinitely
    pub fn with_store_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Re-read the caller's role from the store after token validation.
    ///
    /// Off by default: a token's role is then trusted until it expires, even
    /// if the user's role changed or the user was deleted after issuance.
    pub fn with_role_refresh(mut self, enabled: bool) -> Self {
        self.refresh_role_from_store = enabled;
        self
    }

    async fn bounded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        match self.store_timeout {
            Some(limit) => tokio::time::timeout(limit, op)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => op.await,
        }
    }

    /// Register a new user
    #[instrument(skip_all, fields(user = %credential.user().id))]
    pub async fn register(&self, credential: UserCredential) -> Result<()> {
        credential.validate()?;
        let role = credential.user().role;
        self.bounded(self.store.create_user(credential)).await?;
        info!(%role, "Registered user");
        Ok(())
    }

    /// Verify a password and issue a session token.
    ///
    /// An unknown identity and a wrong password both fail with
    /// `InvalidCredentials`.
    #[instrument(skip_all, fields(user = %id))]
    pub async fn login(&self, id: &UserId, password: &SecretString) -> Result<SessionToken> {
        let stored = match self.bounded(self.store.get_credential(id)).await {
            Ok(stored) => stored,
            Err(Error::NotFound(_)) => {
                self.verify_decoy(password).await;
                debug!("Login refused: unknown identity");
                return Err(Error::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        if !self.store.verify_secret(password, &stored.password_hash).await? {
            debug!("Login refused: password mismatch");
            return Err(Error::InvalidCredentials);
        }

        let token = self.tokens.issue(&stored.user)?;
        info!("User logged in");
        Ok(token)
    }

    /// Exchange a valid token for a fresh one with a later expiry
    #[instrument(skip_all)]
    pub async fn renew(&self, token: &SessionToken) -> Result<SessionToken> {
        if !self.refresh_role_from_store {
            return self.tokens.renew(token);
        }
        let caller = self.authenticate(token).await?;
        self.tokens.issue(&caller)
    }

    /// Resolve a token to the caller's current record
    #[instrument(skip_all)]
    pub async fn current_user(&self, token: &SessionToken) -> Result<UserDetail> {
        let caller = self.tokens.validate(token)?;
        self.caller_detail(&caller.id).await
    }

    /// Soft delete `target` on behalf of the token holder.
    ///
    /// The caller must be an admin, and the target must not be one.
    #[instrument(skip_all, fields(target = %target))]
    pub async fn delete_user(&self, token: &SessionToken, target: &UserId) -> Result<()> {
        let caller = self.authenticate(token).await?;

        if !caller.is_admin() {
            warn!(caller = %caller.id, "Delete refused: caller is not an admin");
            return Err(Error::unauthorized("only admins can delete users"));
        }

        let victim = self.bounded(self.store.get_detail(target)).await?;
        if victim.is_admin() {
            warn!(caller = %caller.id, "Delete refused: target is an admin");
            return Err(Error::unauthorized("admin users cannot be deleted"));
        }

        self.bounded(self.store.delete_user(target)).await?;
        info!(caller = %caller.id, "Deleted user");
        Ok(())
    }

    async fn verify_decoy(&self, password: &SecretString) {
        let Some(decoy) = &self.decoy else {
            return;
        };
        match decoy.hash.get_or_try_init(|| decoy.hasher.decoy_hash()).await {
            Ok(hash) => {
                let _ = decoy.hasher.verify(password, hash).await;
            }
            Err(e) => warn!(error = %e, "Could not prepare decoy hash"),
        }
    }

    /// Validate a token, optionally refreshing the role from the store
    async fn authenticate(&self, token: &SessionToken) -> Result<User> {
        let caller = self.tokens.validate(token)?;
        if !self.refresh_role_from_store {
            return Ok(caller);
        }
        Ok(self.caller_detail(&caller.id).await?.user)
    }

    /// A token whose subject is gone is no longer a valid credential
    async fn caller_detail(&self, id: &UserId) -> Result<UserDetail> {
        match self.bounded(self.store.get_detail(id)).await {
            Err(Error::NotFound(_)) => Err(Error::invalid_token("token subject no longer exists")),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::hmac_token::HmacTokenAuthority;
    use crate::adapters::memory::InMemoryCredentialStore;
    use crate::domain::result::ErrorKind;
    use crate::domain::{Argon2Params, Role, User};
    use crate::ports::SystemClock;

    fn cheap_hasher() -> PasswordHasher {
        PasswordHasher::new(Argon2Params {
            time_cost: 1,
            memory_cost: 1024,
            parallelism: 1,
            hash_len: 32,
        })
        .unwrap()
    }

    fn service() -> AuthService {
        let store = Arc::new(InMemoryCredentialStore::new(cheap_hasher()));
        let tokens = Arc::new(
            HmacTokenAuthority::new(
                Some(SecretString::from("0123456789abcdef0123456789abcdef")),
                Duration::from_secs(600),
                Arc::new(SystemClock),
            )
            .unwrap(),
        );
        AuthService::new(store, tokens)
    }

    #[tokio::test]
    async fn test_register_revalidates_hand_built_credential() {
        let auth = service();
        let id = UserId::parse("a@x.com").unwrap();
        let credential = UserCredential {
            user: User::new(id.clone(), Role::Customer),
            password: SecretString::from(""),
            phone: None,
        };

        let err = auth.register(credential).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);

        // Nothing was stored, so an empty password cannot sign in either
        let err = auth.login(&id, &SecretString::from("")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_unknown_identity_runs_decoy_verification() {
        let auth = service().with_login_decoy(cheap_hasher());
        let id = UserId::parse("ghost@x.com").unwrap();

        let err = auth.login(&id, &SecretString::from("p1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCredentials);

        let decoy = auth.decoy.as_ref().unwrap();
        let hash = decoy.hash.get().unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));

        // The decoy is built once and reused
        let first = hash.clone();
        auth.login(&id, &SecretString::from("p2")).await.unwrap_err();
        assert_eq!(decoy.hash.get().unwrap(), &first);
    }

    #[tokio::test]
    async fn test_no_decoy_by_default() {
        let auth = service();
        let id = UserId::parse("ghost@x.com").unwrap();
        auth.login(&id, &SecretString::from("p1")).await.unwrap_err();
        assert!(auth.decoy.is_none());
    }
}

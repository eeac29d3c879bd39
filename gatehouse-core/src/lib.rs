//! Gatehouse Core - credential storage, session tokens and authorization
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (UserId, Role, UserCredential, SessionToken, ...)
//! - **ports**: Trait definitions for collaborators (CredentialStore, TokenAuthority, Clock)
//! - **services**: Business logic orchestration (AuthService, PasswordHasher)
//! - **adapters**: Concrete implementations (DuckDB, in-memory, HMAC tokens)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbCredentialStore;
use adapters::hmac_token::HmacTokenAuthority;
use config::Config;
use ports::SystemClock;
use services::{AuthService, PasswordHasher};

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorKind, OperationResult, Result};
pub use domain::{Role, SessionToken, User, UserCredential, UserDetail, UserId};

/// Main context for Gatehouse operations
///
/// This is the primary entry point for embedders: it loads configuration,
/// opens the credential store and wires the authentication service.
pub struct GatehouseContext {
    pub config: Config,
    pub store: Arc<DuckDbCredentialStore>,
    pub tokens: Arc<HmacTokenAuthority>,
    pub auth_service: AuthService,
}

impl GatehouseContext {
    /// Create a new Gatehouse context rooted at `gatehouse_dir`
    pub fn new(gatehouse_dir: &Path) -> Result<Self> {
        let config = Config::load(gatehouse_dir)?;
        Self::with_config(gatehouse_dir, config)
    }

    /// Create a context from an already resolved configuration
    pub fn with_config(gatehouse_dir: &Path, config: Config) -> Result<Self> {
        let hasher = PasswordHasher::new(config.password_hashing.clone())?;

        let db_path = gatehouse_dir.join(&config.database_file);
        let store = Arc::new(DuckDbCredentialStore::new(&db_path, hasher.clone())?);

        // Initialize schema
        store.ensure_schema()?;

        if config.signing_secret.is_none() {
            tracing::warn!("No signing secret configured; token operations will be unavailable");
        }
        let tokens = Arc::new(HmacTokenAuthority::new(
            config.signing_secret.clone(),
            config.token_ttl,
            Arc::new(SystemClock),
        )?);

        let auth_service = AuthService::new(store.clone(), tokens.clone())
            .with_store_timeout(config.store_timeout)
            .with_role_refresh(config.refresh_role_from_store)
            .with_login_decoy(hasher);

        Ok(Self {
            config,
            store,
            tokens,
            auth_service,
        })
    }
}

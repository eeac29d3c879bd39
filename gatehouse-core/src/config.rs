//! Configuration management
//!
//! Settings live in `settings.json` inside the gatehouse directory:
//! ```json
//! {
//!   "auth": {
//!     "signingSecret": "...",
//!     "tokenTtlMinutes": 60,
//!     "storeTimeoutMs": 10000,
//!     "refreshRoleFromStore": false,
//!     "passwordHashing": { "timeCost": 3, "memoryCost": 65536, "parallelism": 4 }
//!   },
//!   "database": "gatehouse.duckdb"
//! }
//! ```
//! Every field is optional. Environment variables override the file:
//! `GATEHOUSE_SIGNING_SECRET`, `GATEHOUSE_TOKEN_TTL_MINUTES`,
//! `GATEHOUSE_STORE_TIMEOUT_MS`, `GATEHOUSE_REFRESH_ROLE`.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::Argon2Params;

pub const DEFAULT_TOKEN_TTL_MINUTES: u64 = 60;
/// Longest token lifetime accepted (one year)
pub const MAX_TOKEN_TTL_MINUTES: u64 = 365 * 24 * 60;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_DATABASE_FILE: &str = "gatehouse.duckdb";

const ENV_SIGNING_SECRET: &str = "GATEHOUSE_SIGNING_SECRET";
const ENV_TOKEN_TTL_MINUTES: &str = "GATEHOUSE_TOKEN_TTL_MINUTES";
const ENV_STORE_TIMEOUT_MS: &str = "GATEHOUSE_STORE_TIMEOUT_MS";
const ENV_REFRESH_ROLE: &str = "GATEHOUSE_REFRESH_ROLE";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    auth: AuthSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signing_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_ttl_minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    store_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_role_from_store: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_hashing: Option<Argon2Params>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("signing_secret", &self.signing_secret.as_ref().map(|_| "[REDACTED]"))
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .field("refresh_role_from_store", &self.refresh_role_from_store)
            .field("password_hashing", &self.password_hashing)
            .finish_non_exhaustive()
    }
}

/// Gatehouse configuration (resolved view of settings + environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub signing_secret: Option<SecretString>,
    pub token_ttl: Duration,
    /// `None` disables the store round-trip bound
    pub store_timeout: Option<Duration>,
    pub refresh_role_from_store: bool,
    pub password_hashing: Argon2Params,
    pub database_file: String,
    secret_from_env: bool,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            signing_secret: None,
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_MINUTES * 60),
            store_timeout: Some(Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS)),
            refresh_role_from_store: false,
            password_hashing: Argon2Params::default(),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            secret_from_env: false,
            _raw_settings: SettingsFile::default(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" | "yes" | "TRUE" | "YES" => Ok(true),
        "false" | "0" | "no" | "FALSE" | "NO" => Ok(false),
        other => Err(Error::Config(format!("{} must be a boolean, got '{}'", key, other))),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}

fn token_ttl(minutes: u64) -> Result<Duration> {
    if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes) {
        return Err(Error::Config(format!(
            "Token TTL must be between 1 and {} minutes, got {}",
            MAX_TOKEN_TTL_MINUTES, minutes
        )));
    }
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| Error::Config(format!("Token TTL of {} minutes overflows", minutes)))
}

impl Config {
    /// Load config from the gatehouse directory, applying environment overrides
    pub fn load(gatehouse_dir: &Path) -> Result<Self> {
        Self::load_with_env(gatehouse_dir, |key| std::env::var(key).ok())
    }

    /// Load config with a custom environment lookup
    pub fn load_with_env<F>(gatehouse_dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings_path = gatehouse_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("Invalid {}: {}", settings_path.display(), e))
            })?
        } else {
            SettingsFile::default()
        };

        let (signing_secret, secret_from_env) = match env(ENV_SIGNING_SECRET) {
            Some(secret) if !secret.is_empty() => (Some(SecretString::from(secret)), true),
            _ => (
                raw.auth
                    .signing_secret
                    .clone()
                    .filter(|s| !s.is_empty())
                    .map(SecretString::from),
                false,
            ),
        };

        let ttl_minutes = match env(ENV_TOKEN_TTL_MINUTES) {
            Some(value) => parse_u64(ENV_TOKEN_TTL_MINUTES, &value)?,
            None => raw.auth.token_ttl_minutes.unwrap_or(DEFAULT_TOKEN_TTL_MINUTES),
        };
        let token_ttl = token_ttl(ttl_minutes)?;

        let timeout_ms = match env(ENV_STORE_TIMEOUT_MS) {
            Some(value) => parse_u64(ENV_STORE_TIMEOUT_MS, &value)?,
            None => raw.auth.store_timeout_ms.unwrap_or(DEFAULT_STORE_TIMEOUT_MS),
        };

        let refresh_role_from_store = match env(ENV_REFRESH_ROLE) {
            Some(value) => parse_bool(ENV_REFRESH_ROLE, &value)?,
            None => raw.auth.refresh_role_from_store.unwrap_or(false),
        };

        Ok(Self {
            signing_secret,
            token_ttl,
            store_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            refresh_role_from_store,
            password_hashing: raw.auth.password_hashing.clone().unwrap_or_default(),
            database_file: raw
                .database
                .clone()
                .unwrap_or_else(|| DEFAULT_DATABASE_FILE.to_string()),
            secret_from_env,
            _raw_settings: raw,
        })
    }

    /// Save config to the gatehouse directory
    ///
    /// Preserves settings this crate doesn't manage. A signing secret that
    /// came from the environment is never written to disk.
    pub fn save(&self, gatehouse_dir: &Path) -> Result<()> {
        let settings_path = gatehouse_dir.join("settings.json");
        let mut settings = self._raw_settings.clone();

        if !self.secret_from_env {
            settings.auth.signing_secret = self
                .signing_secret
                .as_ref()
                .map(|s| s.expose_secret().to_string());
        }
        settings.auth.token_ttl_minutes = Some(self.token_ttl.as_secs() / 60);
        settings.auth.store_timeout_ms =
            Some(self.store_timeout.map_or(0, |t| t.as_millis() as u64));
        settings.auth.refresh_role_from_store = Some(self.refresh_role_from_store);
        settings.auth.password_hashing = Some(self.password_hashing.clone());
        settings.database = Some(self.database_file.clone());

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Replace the signing secret (persisted by the next `save`)
    pub fn set_signing_secret(&mut self, secret: SecretString) {
        self.signing_secret = Some(secret);
        self.secret_from_env = false;
    }
}

//! User domain model

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Local part, `@`, then at least two non-empty dot-separated labels
static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@(?:[^\s@.]+\.)+[^\s@.]+$").expect("email pattern is valid")
});

/// Unique, email-shaped identity of a user; the primary key of a user record.
///
/// Identities are compared verbatim. No case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Maximum length of an identity (RFC 5321 path limit)
    pub const MAX_LENGTH: usize = 254;

    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::validation("email is required"));
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(Error::validation(format!(
                "email must be at most {} characters",
                Self::MAX_LENGTH
            )));
        }
        if !EMAIL_SHAPE.is_match(s) {
            return Err(Error::validation(format!("'{}' is not a valid email", s)));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role of a user. Only these two values exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            "" => Err(Error::validation("role is required")),
            other => Err(Error::validation(format!(
                "role must be one of customer, admin (got '{}')",
                other
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity plus role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub role: Role,
}

impl User {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Registration input: a user plus the plaintext secret.
///
/// Built only through [`UserCredential::parse`]. The secret is redacted from
/// `Debug` output and zeroized when dropped.
#[derive(Debug)]
pub struct UserCredential {
    pub(crate) user: User,
    pub(crate) password: SecretString,
    /// Contact number captured at registration
    pub(crate) phone: Option<String>,
}

impl UserCredential {
    /// Build a credential from raw caller input, validating every field
    pub fn parse(id: &str, role: &str, password: SecretString) -> Result<Self> {
        let credential = Self {
            user: User::new(UserId::parse(id)?, role.parse::<Role>()?),
            password,
            phone: None,
        };
        credential.validate()?;
        Ok(credential)
    }

    /// Check the invariants identity and role parsing cannot express
    pub fn validate(&self) -> Result<()> {
        if self.password.expose_secret().is_empty() {
            return Err(Error::validation("password is required"));
        }
        Ok(())
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        let phone = phone.into();
        self.phone = if phone.trim().is_empty() { None } else { Some(phone) };
        self
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
}

/// A credential as persisted: the hashed form only
#[derive(Clone)]
pub struct StoredCredential {
    pub user: User,
    /// PHC-formatted hash (algorithm, parameters and salt embedded)
    pub password_hash: String,
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("user", &self.user)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

/// A user plus contact details, used for authorization decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub phone: Option<String>,
}

impl UserDetail {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }
}

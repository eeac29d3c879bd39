//! Session token domain models

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::{Role, User, UserId};

/// Opaque signed bearer credential proving a prior successful login.
///
/// Tokens are never stored; they are validated cryptographically.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

// Bearer tokens grant access; keep them out of logs.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Claims carried in a session token's payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Identity the token was issued to
    pub sub: UserId,
    /// Role at issuance time
    pub role: Role,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
    /// Unique token id
    pub jti: Uuid,
}

impl TokenClaims {
    pub fn new(user: &User, issued_at: i64, expires_at: i64) -> Self {
        Self {
            sub: user.id.clone(),
            role: user.role,
            iat: issued_at,
            exp: expires_at,
            jti: Uuid::new_v4(),
        }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    pub fn user(&self) -> User {
        User::new(self.sub.clone(), self.role)
    }
}

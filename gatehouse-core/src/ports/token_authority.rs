//! Token authority port - session token lifecycle

use crate::domain::result::Result;
use crate::domain::{SessionToken, User};

/// Issues, validates and renews session tokens.
///
/// The sole source of truth for "is this caller authenticated, and as whom".
/// Validation is self-contained: implementations must not consult the
/// credential store.
pub trait TokenAuthority: Send + Sync {
    /// Issue a token for the user, expiring after the authority's TTL
    ///
    /// Fails with `Unavailable` when no signing key is configured.
    fn issue(&self, user: &User) -> Result<SessionToken>;

    /// Validate a token and return the identity and role it was issued for
    ///
    /// Fails with `InvalidToken` if the token is malformed, mis-signed or
    /// expired.
    fn validate(&self, token: &SessionToken) -> Result<User>;

    /// Validate a token and issue a fresh one for the same user
    fn renew(&self, token: &SessionToken) -> Result<SessionToken> {
        let user = self.validate(token)?;
        self.issue(&user)
    }
}

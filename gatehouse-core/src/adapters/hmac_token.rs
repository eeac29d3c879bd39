//! HS256 JWT token authority
//!
//! Tokens are standard JWTs signed with HMAC-SHA256 under the process signing
//! secret. The payload carries [`TokenClaims`]; expiry is checked against the
//! injected [`Clock`] rather than the wall clock.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::domain::{SessionToken, TokenClaims, User};
use crate::ports::{Clock, TokenAuthority};

/// Shortest signing secret accepted, in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Generate a random signing secret (32 random bytes, base64)
pub fn generate_signing_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    STANDARD.encode(bytes)
}

/// Stateless token authority signing with a shared secret
pub struct HmacTokenAuthority {
    secret: Option<SecretString>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    validation: Validation,
}

impl HmacTokenAuthority {
    /// Create an authority
    ///
    /// Without a secret the authority still constructs, but every operation
    /// fails with `Unavailable`.
    pub fn new(secret: Option<SecretString>, ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        if let Some(secret) = &secret {
            if secret.expose_secret().len() < MIN_SECRET_LEN {
                return Err(Error::Config(format!(
                    "Signing secret must be at least {} bytes",
                    MIN_SECRET_LEN
                )));
            }
        }
        if ttl.as_secs() == 0 {
            return Err(Error::Config("Token TTL must be at least one second".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // exp is compared with the injected clock in `claims`
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            secret,
            ttl,
            clock,
            validation,
        })
    }

    fn key_bytes(&self) -> Result<&[u8]> {
        self.secret
            .as_ref()
            .map(|s| s.expose_secret().as_bytes())
            .ok_or_else(|| Error::unavailable("No signing key configured"))
    }

    fn now(&self) -> i64 {
        self.clock.now().timestamp()
    }

    /// Verify a token's signature and expiry and return its claims
    pub fn claims(&self, token: &SessionToken) -> Result<TokenClaims> {
        let key = DecodingKey::from_secret(self.key_bytes()?);

        let data = decode::<TokenClaims>(token.as_str(), &key, &self.validation).map_err(|e| {
            debug!(error = %e, "Rejected session token");
            Error::invalid_token(e.to_string())
        })?;

        if data.claims.is_expired_at(self.now()) {
            return Err(Error::invalid_token("token expired"));
        }

        Ok(data.claims)
    }
}

impl TokenAuthority for HmacTokenAuthority {
    fn issue(&self, user: &User) -> Result<SessionToken> {
        let key = EncodingKey::from_secret(self.key_bytes()?);

        let issued_at = self.now();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = TokenClaims::new(user, issued_at, issued_at.saturating_add(ttl));

        let token = encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| Error::unavailable(format!("Failed to sign token: {}", e)))?;

        debug!(user = %user.id, exp = claims.exp, "Issued session token");
        Ok(SessionToken::new(token))
    }

    fn validate(&self, token: &SessionToken) -> Result<User> {
        Ok(self.claims(token)?.user())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::domain::result::ErrorKind;
    use crate::domain::{Role, UserId};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Mutex::new(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()))
        }

        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += chrono::Duration::from_std(by).unwrap();
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn authority(clock: Arc<ManualClock>) -> HmacTokenAuthority {
        HmacTokenAuthority::new(
            Some(SecretString::from(SECRET)),
            Duration::from_secs(600),
            clock,
        )
        .unwrap()
    }

    fn user(role: Role) -> User {
        User::new(UserId::parse("a@x.com").unwrap(), role)
    }

    #[test]
    fn test_issue_then_validate_round_trip() {
        let authority = authority(Arc::new(ManualClock::new()));
        let token = authority.issue(&user(Role::Admin)).unwrap();
        assert_eq!(authority.validate(&token).unwrap(), user(Role::Admin));
    }

    #[test]
    fn test_token_is_hs256_jwt() {
        let authority = authority(Arc::new(ManualClock::new()));
        let token = authority.issue(&user(Role::Customer)).unwrap();

        let header = jsonwebtoken::decode_header(token.as_str()).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
        assert_eq!(token.as_str().split('.').count(), 3);

        let claims = authority.claims(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 600);
    }

    #[test]
    fn test_expired_token_rejected_and_cannot_renew() {
        let clock = Arc::new(ManualClock::new());
        let authority = authority(Arc::clone(&clock));
        let token = authority.issue(&user(Role::Customer)).unwrap();

        clock.advance(Duration::from_secs(599));
        assert!(authority.validate(&token).is_ok());

        clock.advance(Duration::from_secs(1));
        assert_eq!(authority.validate(&token).unwrap_err().kind(), ErrorKind::InvalidToken);
        assert_eq!(authority.renew(&token).unwrap_err().kind(), ErrorKind::InvalidToken);
    }

    #[test]
    fn test_renew_extends_expiry() {
        let clock = Arc::new(ManualClock::new());
        let authority = authority(Arc::clone(&clock));
        let token = authority.issue(&user(Role::Customer)).unwrap();
        let original = authority.claims(&token).unwrap();

        clock.advance(Duration::from_secs(300));
        let renewed = authority.renew(&token).unwrap();
        let refreshed = authority.claims(&renewed).unwrap();

        assert_ne!(token, renewed);
        assert_ne!(refreshed.jti, original.jti);
        assert_eq!(refreshed.sub, original.sub);
        assert_eq!(refreshed.role, original.role);
        assert_eq!(refreshed.exp, original.exp + 300);
    }

    #[test]
    fn test_tampered_tokens_rejected() {
        let authority = authority(Arc::new(ManualClock::new()));
        let token = authority.issue(&user(Role::Customer)).unwrap();
        let parts: Vec<&str> = token.as_str().split('.').collect();
        let (header, payload, signature) = (parts[0], parts[1], parts[2]);

        // Forge an admin payload but keep the customer signature
        let claims = authority.claims(&token).unwrap();
        let forged = TokenClaims { role: Role::Admin, ..claims };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());

        // Unsigned token claiming the same payload
        let unsigned_header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);

        for bad in [
            format!("{}.{}.{}", header, forged_payload, signature),
            format!("{}.{}.{}x", header, payload, signature),
            format!("{}.{}.", header, payload),
            format!("{}.{}.", unsigned_header, payload),
            format!("{}.{}", header, payload),
            format!("{}.{}.{}.{}", header, payload, signature, signature),
            String::new(),
        ] {
            let err = authority.validate(&SessionToken::new(bad.clone())).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidToken, "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_token_from_another_secret_rejected() {
        let clock = Arc::new(ManualClock::new());
        let other = HmacTokenAuthority::new(
            Some(SecretString::from("fedcba9876543210fedcba9876543210")),
            Duration::from_secs(600),
            clock.clone(),
        )
        .unwrap();
        let token = other.issue(&user(Role::Admin)).unwrap();

        let err = authority(clock).validate(&token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
    }

    #[test]
    fn test_missing_key_is_unavailable() {
        let authority =
            HmacTokenAuthority::new(None, Duration::from_secs(60), Arc::new(ManualClock::new()))
                .unwrap();
        let err = authority.issue(&user(Role::Customer)).unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = HmacTokenAuthority::new(
            Some(SecretString::from("short")),
            Duration::from_secs(60),
            Arc::new(ManualClock::new()),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_generated_secret_is_long_enough() {
        let secret = generate_signing_secret();
        assert!(secret.len() >= MIN_SECRET_LEN);
        assert_ne!(secret, generate_signing_secret());
    }
}

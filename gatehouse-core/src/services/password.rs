//! Password hashing - the single boundary around Argon2id
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`),
//! so the algorithm and cost parameters travel with every hash. Verification
//! always uses the parameters embedded in the stored hash, which lets the
//! configured cost change without invalidating existing users.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::domain::result::{Error, Result};
use crate::domain::Argon2Params;

/// Slow, salted one-way password hashing.
///
/// The async methods run the computation on tokio's blocking pool. Once
/// started, a hash or verify runs to completion even if the awaiting future
/// is dropped or times out: the computation is never interrupted midway.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Argon2Params,
}

impl PasswordHasher {
    /// Create a hasher, rejecting parameter sets Argon2 would refuse
    pub fn new(params: Argon2Params) -> Result<Self> {
        build_params(&params)?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = build_params(&self.params)?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a password with a fresh random salt (blocking)
    pub fn hash_blocking(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::unavailable(format!("Failed to hash password: {}", e)))
    }

    /// Verify a password against a PHC hash (blocking)
    ///
    /// A malformed stored hash never verifies.
    pub fn verify_blocking(password: &str, hashed: &str) -> bool {
        let parsed = match PasswordHash::new(hashed) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Hash a password on the blocking pool
    pub async fn hash(&self, password: &SecretString) -> Result<String> {
        let hasher = self.clone();
        let password = SecretString::from(password.expose_secret().to_owned());

        tokio::task::spawn_blocking(move || hasher.hash_blocking(password.expose_secret()))
            .await
            .map_err(|e| Error::unavailable(format!("Password hashing task failed: {}", e)))?
    }

    /// Hash of a random throwaway password, using the configured cost
    pub async fn decoy_hash(&self) -> Result<String> {
        let filler = SaltString::generate(&mut OsRng);
        self.hash(&SecretString::from(filler.as_str().to_owned())).await
    }

    /// Verify a password on the blocking pool
    pub async fn verify(&self, password: &SecretString, hashed: &str) -> Result<bool> {
        let password = SecretString::from(password.expose_secret().to_owned());
        let hashed = hashed.to_string();

        tokio::task::spawn_blocking(move || Self::verify_blocking(password.expose_secret(), &hashed))
            .await
            .map_err(|e| Error::unavailable(format!("Password verification task failed: {}", e)))
    }
}

fn build_params(params: &Argon2Params) -> Result<Params> {
    Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(params.hash_len as usize),
    )
    .map_err(|e| Error::Config(format!("Invalid argon2 parameters: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_hasher() -> PasswordHasher {
        PasswordHasher::new(Argon2Params {
            time_cost: 1,
            memory_cost: 1024,
            parallelism: 1,
            hash_len: 32,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_is_salted_phc_string() {
        let hasher = cheap_hasher();
        let first = hasher.hash_blocking("p1").unwrap();
        let second = hasher.hash_blocking("p1").unwrap();

        assert!(first.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
        assert_ne!(first, second, "each hash gets its own salt");
        assert!(!first.contains("p1$"));
    }

    #[test]
    fn test_verify_matches_only_the_original_password() {
        let hasher = cheap_hasher();
        let hash = hasher.hash_blocking("correct horse").unwrap();

        assert!(PasswordHasher::verify_blocking("correct horse", &hash));
        assert!(!PasswordHasher::verify_blocking("correct horse ", &hash));
        assert!(!PasswordHasher::verify_blocking("", &hash));
    }

    #[test]
    fn test_verify_uses_parameters_embedded_in_hash() {
        let old = cheap_hasher().hash_blocking("p1").unwrap();
        let upgraded = PasswordHasher::new(Argon2Params {
            time_cost: 2,
            memory_cost: 2048,
            parallelism: 1,
            hash_len: 32,
        })
        .unwrap();

        assert!(upgraded.hash_blocking("p1").unwrap().contains("m=2048,t=2"));
        assert!(PasswordHasher::verify_blocking("p1", &old));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!PasswordHasher::verify_blocking("p1", "p1"));
        assert!(!PasswordHasher::verify_blocking("p1", ""));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let err = PasswordHasher::new(Argon2Params {
            time_cost: 0,
            ..Argon2Params::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_async_round_trip() {
        let hasher = cheap_hasher();
        let secret = SecretString::from("p1");
        let hash = hasher.hash(&secret).await.unwrap();

        assert!(hasher.verify(&secret, &hash).await.unwrap());
        assert!(!hasher.verify(&SecretString::from("p2"), &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_decoy_hash_uses_configured_cost() {
        let hasher = cheap_hasher();
        let decoy = hasher.decoy_hash().await.unwrap();

        assert!(decoy.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
        assert_ne!(decoy, hasher.decoy_hash().await.unwrap());
        assert!(!hasher.verify(&SecretString::from(""), &decoy).await.unwrap());
    }
}

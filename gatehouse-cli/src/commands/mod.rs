//! CLI command implementations

pub mod delete;
pub mod keygen;
pub mod login;
pub mod register;
pub mod renew;
pub mod whoami;

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use colored::Colorize;
use dialoguer::Password;
use secrecy::SecretString;
use serde::Serialize;

use gatehouse_core::domain::TokenClaims;
use gatehouse_core::{Error, GatehouseContext, Result, Role, SessionToken, UserId};

/// Get the gatehouse directory from environment or default
pub fn get_gatehouse_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("GATEHOUSE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".gatehouse"))
        .ok_or_else(|| Error::Config("could not find home directory; set GATEHOUSE_DIR".into()))
}

/// Get or create gatehouse context
pub fn get_context() -> Result<GatehouseContext> {
    let gatehouse_dir = get_gatehouse_dir()?;

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&gatehouse_dir)?;

    GatehouseContext::new(&gatehouse_dir)
}

/// Use the `--password` value, or prompt without echo
pub fn password_or_prompt(password: Option<String>, prompt: &str) -> anyhow::Result<SecretString> {
    if let Some(p) = password {
        return Ok(SecretString::from(p));
    }
    let p = Password::new()
        .with_prompt(prompt)
        .interact()
        .context("Failed to read password")?;
    Ok(SecretString::from(p))
}

/// A freshly issued token, as printed by `login` and `renew`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: SessionToken,
    pub user: UserId,
    pub role: Role,
    pub expires_at: Option<DateTime<Utc>>,
}

impl IssuedToken {
    pub fn new(token: SessionToken, claims: TokenClaims) -> Self {
        Self {
            token,
            user: claims.sub,
            role: claims.role,
            expires_at: DateTime::from_timestamp(claims.exp, 0),
        }
    }
}

/// Decode the claims of a token the context just issued
pub fn issued(ctx: &GatehouseContext, token: SessionToken) -> Result<IssuedToken> {
    let claims = ctx.tokens.claims(&token)?;
    Ok(IssuedToken::new(token, claims))
}

/// Print an issued token; the bare token goes to stdout so it can be piped
pub fn print_issued(issued: &IssuedToken) {
    println!("{}", issued.token.as_str());
    if let Some(expires_at) = issued.expires_at {
        let note = format!("{} ({}) until {}", issued.user, issued.role, expires_at.to_rfc3339());
        eprintln!("{}", note.dimmed());
    }
}

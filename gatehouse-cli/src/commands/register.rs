//! Register command - create a new user

use anyhow::{Context, Result};
use dialoguer::Password;
use secrecy::SecretString;

use gatehouse_core::{Error, User, UserCredential};

use super::get_context;
use crate::output;

/// Use the `--password` value, or prompt twice without echo
fn password_with_confirm(password: Option<String>) -> Result<SecretString> {
    if let Some(p) = password {
        return Ok(SecretString::from(p));
    }

    let p1 = Password::new()
        .with_prompt("Password")
        .interact()
        .context("Failed to read password")?;
    let p2 = Password::new()
        .with_prompt("Confirm password")
        .interact()
        .context("Failed to read password")?;

    if p1 != p2 {
        anyhow::bail!("Passwords do not match");
    }
    Ok(SecretString::from(p1))
}

pub async fn run(
    email: String,
    role: String,
    phone: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let password = password_with_confirm(password)?;

    let outcome = async {
        let mut credential = UserCredential::parse(&email, &role, password)?;
        if let Some(phone) = phone {
            credential = credential.with_phone(phone);
        }
        let user: User = credential.user().clone();

        let ctx = get_context()?;
        ctx.auth_service.register(credential).await?;
        Ok::<_, Error>(user)
    }
    .await;

    output::report(outcome, json, |user| {
        output::success(&format!("Registered {} as {}", user.id, user.role));
    })
}

//! Keygen command - generate a token signing secret

use anyhow::Result;
use secrecy::SecretString;
use serde_json::json;

use gatehouse_core::adapters::hmac_token::generate_signing_secret;
use gatehouse_core::config::Config;

use super::get_gatehouse_dir;
use crate::output;

pub fn run(write: bool, json: bool) -> Result<()> {
    let secret = generate_signing_secret();

    let outcome = if write {
        save_secret(&secret).map(Some)
    } else {
        Ok(None)
    }
    .map(|path| json!({ "signingSecret": secret, "writtenTo": path }));

    output::report(outcome, json, |data| {
        println!("{}", secret);
        if let Some(path) = data["writtenTo"].as_str() {
            output::info(&format!("Saved to {}", path));
        }
    })
}

/// Persist the secret to settings.json, keeping every other setting
fn save_secret(secret: &str) -> gatehouse_core::Result<String> {
    let gatehouse_dir = get_gatehouse_dir()?;
    std::fs::create_dir_all(&gatehouse_dir)?;

    let mut config = Config::load(&gatehouse_dir)?;
    if std::env::var_os("GATEHOUSE_SIGNING_SECRET").is_some() {
        tracing::warn!("GATEHOUSE_SIGNING_SECRET is set and takes precedence over the saved secret");
    }
    config.set_signing_secret(SecretString::from(secret.to_string()));
    config.save(&gatehouse_dir)?;

    Ok(gatehouse_dir.join("settings.json").display().to_string())
}

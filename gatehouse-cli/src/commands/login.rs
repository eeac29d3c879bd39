//! Login command - exchange a password for a session token

use anyhow::Result;

use gatehouse_core::UserId;

use super::{get_context, issued, password_or_prompt, print_issued};
use crate::output;

pub async fn run(email: String, password: Option<String>, json: bool) -> Result<()> {
    let password = password_or_prompt(password, "Password")?;

    let outcome = async {
        let id = UserId::parse(&email)?;
        let ctx = get_context()?;
        let token = ctx.auth_service.login(&id, &password).await?;
        issued(&ctx, token)
    }
    .await;

    output::report(outcome, json, print_issued)
}

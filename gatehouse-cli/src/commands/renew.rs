//! Renew command - trade a valid token for one with a later expiry

use anyhow::Result;

use gatehouse_core::SessionToken;

use super::{get_context, issued, print_issued};
use crate::output;

pub async fn run(token: String, json: bool) -> Result<()> {
    let token = SessionToken::new(token);

    let outcome = async {
        let ctx = get_context()?;
        let renewed = ctx.auth_service.renew(&token).await?;
        issued(&ctx, renewed)
    }
    .await;

    output::report(outcome, json, print_issued)
}

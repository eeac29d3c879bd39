//! Whoami command - show the user behind a token

use anyhow::Result;
use colored::Colorize;

use gatehouse_core::SessionToken;

use super::get_context;
use crate::output;

pub async fn run(token: String, json: bool) -> Result<()> {
    let token = SessionToken::new(token);

    let outcome = async {
        let ctx = get_context()?;
        ctx.auth_service.current_user(&token).await
    }
    .await;

    output::report(outcome, json, |detail| {
        let mut table = output::create_table();
        table.set_header(vec!["Field", "Value"]);
        table.add_row(vec!["Email", detail.user.id.as_str()]);
        table.add_row(vec!["Role", detail.user.role.as_str()]);
        table.add_row(vec!["Phone", detail.phone.as_deref().unwrap_or("-")]);

        println!("{}", "Signed in".bold());
        println!("{}", table);
    })
}

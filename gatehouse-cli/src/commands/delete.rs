//! Delete command - soft delete a user (admins only)

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use serde_json::json;

use gatehouse_core::{Error, SessionToken, UserId};

use super::get_context;
use crate::output;

pub async fn run(token: String, email: String, force: bool, json: bool) -> Result<()> {
    // Confirm deletion unless --force (JSON callers are scripts)
    if !force && !json {
        println!();
        output::warning(&format!("This will delete the user '{}'.", email));
        println!("{}\n", "The record is kept but can no longer sign in.".dimmed());

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let token = SessionToken::new(token);
    let outcome = async {
        let target = UserId::parse(&email)?;
        let ctx = get_context()?;
        ctx.auth_service.delete_user(&token, &target).await?;
        Ok::<_, Error>(json!({ "deleted": target }))
    }
    .await;

    output::report(outcome, json, |_| {
        println!("{} User '{}' deleted\n", "✓".green(), email);
    })
}

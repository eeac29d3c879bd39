//! Output formatting utilities

use std::fmt;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use serde::Serialize;

use gatehouse_core::OperationResult;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// A failure that has already been written to stdout as JSON
#[derive(Debug)]
pub struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation failed")
    }
}

impl std::error::Error for Reported {}

/// Print the outcome of a core operation.
///
/// With `json` the outcome is printed as an `OperationResult` envelope and a
/// failure becomes `Reported`; otherwise `human` renders the success and a
/// failure is returned for `main` to print.
pub fn report<T: Serialize>(
    outcome: gatehouse_core::Result<T>,
    json: bool,
    human: impl FnOnce(&T),
) -> anyhow::Result<()> {
    if json {
        let envelope = OperationResult::from(outcome);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return if envelope.success { Ok(()) } else { Err(Reported.into()) };
    }

    let data = outcome?;
    human(&data);
    Ok(())
}

//! Gatehouse CLI - credentials and session tokens from the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{delete, keygen, login, register, renew, whoami};

/// Gatehouse - credential store and session tokens
#[derive(Parser)]
#[command(name = "gatehouse", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new user
    Register {
        /// Email address identifying the user
        #[arg(long)]
        email: String,
        /// Role to grant (customer or admin)
        #[arg(long)]
        role: String,
        /// Contact phone number
        #[arg(long)]
        phone: Option<String>,
        /// Password (prompted for when omitted)
        #[arg(short, long, env = "GATEHOUSE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in and print a session token
    Login {
        /// Email address identifying the user
        #[arg(long)]
        email: String,
        /// Password (prompted for when omitted)
        #[arg(short, long, env = "GATEHOUSE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Exchange a valid token for one with a later expiry
    Renew {
        /// Session token
        #[arg(env = "GATEHOUSE_TOKEN", hide_env_values = true)]
        token: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the user a token belongs to
    Whoami {
        /// Session token
        #[arg(env = "GATEHOUSE_TOKEN", hide_env_values = true)]
        token: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a user (requires an admin token)
    Delete {
        /// Email address of the user to delete
        email: String,
        /// Session token of the acting admin
        #[arg(long, env = "GATEHOUSE_TOKEN", hide_env_values = true)]
        token: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a random token signing secret
    Keygen {
        /// Save the secret to settings.json
        #[arg(long)]
        write: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GATEHOUSE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // JSON failures have already been printed as an envelope
            if e.downcast_ref::<output::Reported>().is_none() {
                output::error(&format!("{:#}", e));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register { email, role, phone, password, json } => {
            register::run(email, role, phone, password, json).await
        }
        Commands::Login { email, password, json } => login::run(email, password, json).await,
        Commands::Renew { token, json } => renew::run(token, json).await,
        Commands::Whoami { token, json } => whoami::run(token, json).await,
        Commands::Delete { email, token, force, json } => delete::run(token, email, force, json).await,
        Commands::Keygen { write, json } => keygen::run(write, json),
    }
}

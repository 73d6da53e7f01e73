//! Keystone command-line client
//!
//! Drives the session manager from the shell: `login`, `logout`, and
//! `status` for whatever session the local store currently holds.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use keystone_core::{ActionResult, Config, Keystone, LoginCredentials, StoredSession, User};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "keystone", about = "Log in to the API and manage the stored session")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange credentials for a token and store the session
    Login {
        #[arg(long)]
        username: String,

        #[arg(long, env = "KEYSTONE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the stored session
    Logout,
    /// Show the stored session
    Status,
}

#[derive(Serialize, Debug)]
struct StatusReport {
    stored: bool,
    token: Option<String>,
    token_type: Option<String>,
    user: Option<User>,
}

impl From<StoredSession> for StatusReport {
    fn from(session: StoredSession) -> Self {
        Self {
            stored: !session.is_empty(),
            token: session.token.as_deref().map(mask_token),
            token_type: session.token_type,
            user: session.user,
        }
    }
}

fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn report(result: &ActionResult) -> ExitCode {
    let code = print_json(result);
    if result.success {
        code
    } else {
        ExitCode::FAILURE
    }
}

async fn run(cli: Cli) -> keystone_core::Result<ExitCode> {
    let keystone = Keystone::new(Config::from_env()?)?;
    let sessions = keystone.session_manager();

    let code = match cli.command {
        Command::Login { username, password } => {
            let credentials = LoginCredentials::new(username, password);
            report(&sessions.login(&credentials).await)
        }
        Command::Logout => report(&sessions.logout().await),
        Command::Status => print_json(&StatusReport::from(sessions.stored_session()?)),
    };

    Ok(code)
}

#[tokio::main]
async fn main() -> ExitCode {
    keystone_core::init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

//! Command line handling for the server binary.
//!
//! Without a command the binary runs the server. The other commands are operator tools that read the same
//! environment: `settings` shows the effective configuration, and `keys` issues and edits merchant credentials in the
//! server's database.
use std::env::{self, VarError};

use clap::{Args, Parser, Subcommand};
use paymatch_engine::{db_types::ApiKey, ApiKeyApi, ApiKeyManagement, SqliteDatabase};

use crate::{config::ServerConfig, errors::ServerError};

const HELP: &str = include_str!("./cli-help.txt");

/// Environment variables shown by `settings`, in the order of the help text. None of them hold secrets.
const SETTINGS: [&str; 14] = [
    "RUST_LOG",
    "PMG_HOST",
    "PMG_PORT",
    "PMG_DATABASE_URL",
    "PMG_ORDER_EXPIRY_SECONDS",
    "PMG_EXPIRY_SWEEP_SECONDS",
    "PMG_CREDIT_MARKER",
    "PMG_PAY_URL_TEMPLATE",
    "PMG_WEBHOOK_MAX_ATTEMPTS",
    "PMG_WEBHOOK_INITIAL_BACKOFF_MS",
    "PMG_WEBHOOK_MAX_BACKOFF_MS",
    "PMG_WEBHOOK_TIMEOUT_SECONDS",
    "PMG_WEBHOOK_CONCURRENCY",
    "PMG_USE_X_FORWARDED_FOR",
];

#[derive(Parser, Debug)]
#[command(version, about = "PayMatch Gateway server", after_help = HELP)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the environment and the configuration the server would start with
    #[clap(name = "settings")]
    Settings,
    /// Manage merchant api keys
    #[command(subcommand)]
    Keys(KeyCommand),
}

#[derive(Debug, Subcommand)]
pub enum KeyCommand {
    /// Issue a new access key and secret key for a merchant
    #[clap(name = "issue")]
    Issue(IssueKeyParams),
    /// Change the name or remark of an existing key
    #[clap(name = "update")]
    Update(UpdateKeyParams),
}

#[derive(Debug, Args)]
pub struct IssueKeyParams {
    /// A unique name for the merchant
    #[arg(short = 'n', long = "name")]
    pub name: String,
    /// Free-text note kept with the key
    #[arg(short = 'r', long = "remark", default_value = "")]
    pub remark: String,
}

#[derive(Debug, Args)]
pub struct UpdateKeyParams {
    /// The key's id, as printed when it was issued
    #[arg(short = 'i', long = "id")]
    pub id: i64,
    /// The new name
    #[arg(short = 'n', long = "name")]
    pub name: Option<String>,
    /// The new remark
    #[arg(short = 'r', long = "remark")]
    pub remark: Option<String>,
}

/// Runs a non-server command.
pub async fn run_command(command: Command, config: &ServerConfig) -> Result<(), ServerError> {
    match command {
        Command::Settings => {
            print_settings(config);
            Ok(())
        },
        Command::Keys(cmd) => {
            let db = SqliteDatabase::new_with_url(&config.database_url, 1)
                .await
                .map_err(|e| ServerError::InitializeError(e.to_string()))?;
            db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not run migrations. {e}")))?;
            let result = run_key_command(cmd, &ApiKeyApi::new(db.clone())).await;
            db.close().await;
            println!("{}", result?);
            Ok(())
        },
    }
}

/// Applies a key command and returns the report to print.
pub async fn run_key_command<B: ApiKeyManagement>(cmd: KeyCommand, api: &ApiKeyApi<B>) -> Result<String, ServerError> {
    match cmd {
        KeyCommand::Issue(params) => {
            let key = api.create_api_key(&params.name, &params.remark).await?;
            let secret = key.secret_key.reveal();
            Ok(format!("{}\nsecret key: {secret}\nThe secret key is not shown again.", key_report(&key)))
        },
        KeyCommand::Update(params) => {
            if params.name.is_none() && params.remark.is_none() {
                return Err(ServerError::InvalidRequestBody("Nothing to update. Pass --name and/or --remark".into()));
            }
            let key = api.update_api_key(params.id, params.name.as_deref(), params.remark.as_deref()).await?;
            Ok(key_report(&key))
        },
    }
}

fn key_report(key: &ApiKey) -> String {
    format!("id: {}\nname: {}\nremark: {}\naccess key: {}", key.id, key.name, key.remark, key.access_key)
}

fn print_settings(config: &ServerConfig) {
    println!("Current environment values:");
    for name in SETTINGS {
        println!("  {name:<35} {}", describe(env::var(name)));
    }
    println!(
        "\nWith these values the server listens on {}:{}, stores orders in {} and keeps orders payable for {}s.",
        config.host,
        config.port,
        config.database_url,
        config.order_expiry.num_seconds()
    );
}

fn describe(value: Result<String, VarError>) -> String {
    match value {
        Ok(s) if s.is_empty() => "(empty)".into(),
        Ok(s) => s,
        Err(VarError::NotPresent) => "Not set".into(),
        Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
    }
}

//! CLI command definitions and dispatch.

pub mod db;
pub mod token;
pub mod user;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use catwatch_core::config::AppConfig;
use catwatch_core::error::AppError;
use catwatch_database::DatabasePool;
use catwatch_entity::Identity;
use catwatch_service::IdentityService;

use crate::output::OutputFormat;

/// Catwatch identity administration
#[derive(Debug, Parser)]
#[command(name = "catwatch", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Identity management
    User(user::UserArgs),
    /// Password reset tokens
    Token(token::TokenArgs),
    /// Database connectivity
    Db(db::DbArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::User(args) => user::execute(args, config, self.format).await,
            Commands::Token(args) => token::execute(args, config, self.format).await,
            Commands::Db(args) => db::execute(args, config).await,
        }
    }
}

/// Connect to the database and build the identity service on top of it.
pub async fn connect(config: &AppConfig) -> Result<(DatabasePool, IdentityService), AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    let service = IdentityService::new(&config.auth, Arc::new(pool.identity_store()))?;
    Ok((pool, service))
}

/// Resolve an email or username to an identity, failing when none matches.
pub async fn require_identity(service: &IdentityService, login: &str) -> Result<Identity, AppError> {
    service
        .lookup()
        .find_by_identity(login)
        .await?
        .ok_or_else(|| AppError::not_found(format!("No identity matches '{login}'")))
}

/// Prompt for a new password twice.
pub fn prompt_password(prompt: &str) -> Result<String, AppError> {
    dialoguer::Password::new()
        .with_prompt(prompt)
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}

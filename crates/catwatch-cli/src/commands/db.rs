//! Database connectivity commands.

use clap::{Args, Subcommand};

use catwatch_core::config::AppConfig;
use catwatch_core::error::AppError;
use catwatch_database::{CountFilter, IdentityStore};
use catwatch_entity::Role;

use crate::output;

/// Arguments for db commands
#[derive(Debug, Args)]
pub struct DbArgs {
    /// Database subcommand
    #[command(subcommand)]
    pub command: DbCommand,
}

/// Database subcommands
#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Check that the database answers and summarize the identity table
    Check,
}

/// Execute db commands
pub async fn execute(args: &DbArgs, config: &AppConfig) -> Result<(), AppError> {
    let (pool, _) = super::connect(config).await?;
    let store = pool.identity_store();

    match &args.command {
        DbCommand::Check => {
            if !store.health_check().await? {
                return Err(AppError::database("Database health check failed"));
            }
            output::print_success("Database reachable");

            let admins = store.count(CountFilter::Role(Role::Admin)).await?;
            let active = store.count(CountFilter::Active(true)).await?;
            output::print_kv("Administrators", &admins.to_string());
            output::print_kv("Active identities", &active.to_string());
            if admins == 0 {
                output::print_warning("No administrator exists; create one with `user create --role admin`");
            }
            if config.auth.uses_default_secret() {
                output::print_warning("auth.secret_key is the built-in default");
            }
        }
    }

    pool.close().await;
    Ok(())
}

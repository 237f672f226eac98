//! Password reset token commands.

use clap::{Args, Subcommand};

use catwatch_core::config::AppConfig;
use catwatch_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for token commands
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Token subcommand
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands
#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Issue a password reset token
    Reset {
        /// Email or username
        login: String,
    },
    /// Check a password reset token and optionally use it
    VerifyReset {
        /// The token to check
        token: String,
        /// Prompt for a new password and apply it
        #[arg(long)]
        apply: bool,
    },
}

/// Execute token commands
pub async fn execute(
    args: &TokenArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let (pool, service) = super::connect(config).await?;

    match &args.command {
        TokenCommand::Reset { login } => match service.request_password_reset(login).await? {
            Some(token) => {
                output::print_kv("Expires in", &format!("{}s", config.auth.action_token_ttl_seconds));
                println!("{token}");
            }
            None => return Err(AppError::not_found(format!("No identity matches '{login}'"))),
        },
        TokenCommand::VerifyReset { token, apply } => {
            if *apply {
                let password = super::prompt_password("New password")?;
                let identity = service.reset_password(token, &password).await?;
                output::print_success(&format!("Password reset for '{}'", identity.email));
            } else {
                let identity = service.tokens().resolve_action_token(token).await?;
                output::print_success("Token is valid");
                output::print_identity(&identity, format);
            }
        }
    }

    pool.close().await;
    Ok(())
}

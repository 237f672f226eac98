//! Identity management CLI commands.

use clap::{Args, Subcommand, ValueEnum};

use catwatch_core::config::AppConfig;
use catwatch_core::error::AppError;
use catwatch_entity::{AccessChange, Role, SearchField};
use catwatch_service::RegisterIdentity;

use crate::output::{self, IdentityRow, OutputFormat};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create an identity
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,
        /// Login name
        #[arg(short, long)]
        username: Option<String>,
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
        /// Role: guest, member or admin
        #[arg(short, long, default_value = "member")]
        role: Role,
        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
        /// Create without a password
        #[arg(long, conflicts_with = "password")]
        no_password: bool,
    },
    /// Show the identity with the given email or username
    Find {
        /// Email or username
        login: String,
    },
    /// Search identities; an empty query lists everyone
    Search {
        /// Text to look for
        #[arg(default_value = "")]
        query: String,
        /// Fields to search (repeatable)
        #[arg(long = "field", value_enum)]
        fields: Vec<FieldArg>,
    },
    /// Change an identity's role
    Role {
        /// Email or username
        login: String,
        /// New role
        role: Role,
    },
    /// Allow an identity to sign in
    Activate {
        /// Email or username
        login: String,
    },
    /// Prevent an identity from signing in
    Deactivate {
        /// Email or username
        login: String,
    },
    /// Set a new password
    Password {
        /// Email or username
        login: String,
        /// New password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
}

/// Searchable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldArg {
    Email,
    Name,
    Username,
}

impl From<FieldArg> for SearchField {
    fn from(field: FieldArg) -> Self {
        match field {
            FieldArg::Email => Self::Email,
            FieldArg::Name => Self::Name,
            FieldArg::Username => Self::Username,
        }
    }
}

/// Execute user commands
pub async fn execute(
    args: &UserArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let (pool, service) = super::connect(config).await?;

    match &args.command {
        UserCommand::Create {
            email,
            username,
            name,
            role,
            password,
            no_password,
        } => {
            let password = match password {
                Some(p) => p.clone(),
                None if *no_password => String::new(),
                None => super::prompt_password("Password")?,
            };

            let identity = service
                .register(RegisterIdentity {
                    email: email.clone(),
                    username: username.clone(),
                    password,
                    name: name.clone(),
                    role: *role,
                })
                .await?;

            output::print_success(&format!(
                "Identity '{}' created (id: {})",
                identity.email, identity.id
            ));
            if !identity.has_credential() {
                output::print_warning("No password set; this identity cannot sign in yet");
            }
        }
        UserCommand::Find { login } => {
            let identity = super::require_identity(&service, login).await?;
            output::print_identity(&identity, format);
        }
        UserCommand::Search { query, fields } => {
            let fields: Vec<SearchField> = if fields.is_empty() {
                SearchField::DEFAULT.to_vec()
            } else {
                fields.iter().copied().map(SearchField::from).collect()
            };

            let found = service.lookup().search(query, &fields).await?;
            let rows: Vec<IdentityRow> = found.iter().map(IdentityRow::from).collect();
            output::print_list(&rows, format);
        }
        UserCommand::Role { login, role } => {
            let identity = super::require_identity(&service, login).await?;
            let updated = service
                .change_access(identity.id, AccessChange::default().with_role(*role))
                .await?;
            output::print_success(&format!("'{}' is now {}", updated.email, updated.role.label()));
        }
        UserCommand::Activate { login } => {
            let identity = super::require_identity(&service, login).await?;
            service
                .change_access(identity.id, AccessChange::default().with_active(true))
                .await?;
            output::print_success(&format!("'{}' activated", identity.email));
        }
        UserCommand::Deactivate { login } => {
            let identity = super::require_identity(&service, login).await?;
            service
                .change_access(identity.id, AccessChange::default().with_active(false))
                .await?;
            output::print_success(&format!("'{}' deactivated", identity.email));
        }
        UserCommand::Password { login, password } => {
            let identity = super::require_identity(&service, login).await?;
            let password = match password {
                Some(p) => p.clone(),
                None => super::prompt_password("New password")?,
            };
            service.change_password(identity.id, &password).await?;
            output::print_success(&format!("Password updated for '{}'", identity.email));
        }
    }

    pool.close().await;
    Ok(())
}

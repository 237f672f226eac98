//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use catwatch_entity::Identity;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// One identity as a table row
#[derive(Debug, Serialize, Tabled)]
pub struct IdentityRow {
    id: String,
    email: String,
    username: String,
    name: String,
    role: String,
    active: bool,
    sign_ins: i32,
    created_at: String,
}

impl From<&Identity> for IdentityRow {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.to_string(),
            email: identity.email.clone(),
            username: identity.username.clone().unwrap_or_default(),
            name: identity.name.clone().unwrap_or_default(),
            role: identity.role.label().to_string(),
            active: identity.active,
            sign_ins: identity.sign_in_count,
            created_at: identity.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{json}");
        }
    }
}

/// Print one identity with its sign-in history
pub fn print_identity(identity: &Identity, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            print_kv("ID", &identity.id.to_string());
            print_kv("Email", &identity.email);
            print_kv("Username", identity.username.as_deref().unwrap_or("-"));
            print_kv("Name", identity.name.as_deref().unwrap_or("-"));
            print_kv("Role", identity.role.label());
            print_kv("Active", if identity.active { "yes" } else { "no" });
            print_kv("Password set", if identity.has_credential() { "yes" } else { "no" });
            print_kv("Sign-ins", &identity.sign_in_count.to_string());
            for (label, sign_in) in [
                ("Current sign-in", identity.current_sign_in()),
                ("Last sign-in", identity.last_sign_in()),
            ] {
                let value = match sign_in {
                    Some(s) => format!(
                        "{} from {}",
                        s.at.format("%Y-%m-%d %H:%M:%S"),
                        s.ip.as_deref().unwrap_or("?")
                    ),
                    None => "-".to_string(),
                };
                print_kv(label, &value);
            }
            print_kv("Created", &identity.created_at.to_rfc3339());
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(identity).unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{key}:"), value);
}

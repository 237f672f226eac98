//! Settings for the Postgres pool behind the identity store.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Pool settings for the `users` database.
///
/// Every store handed out by the pool shares these connections. An access
/// change pins one connection for the length of its transaction, so
/// concurrent role or activation edits queue on `max_connections`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres URL, usually supplied as `CATWATCH__DATABASE__URL`.
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connections kept open while the CLI or service is idle.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// How long a lookup or access change waits for a free connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

impl DatabaseConfig {
    /// Reject pool sizes the store cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_connections == 0 {
            return Err(AppError::configuration(
                "database.max_connections must be at least 1",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(AppError::configuration(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    300
}

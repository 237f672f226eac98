//! PostgreSQL identity store.
//!
//! Expects a `users` table whose columns match [`Identity`] (with the
//! activation flag stored as `is_active`), unique constraints
//! `users_email_key` and `users_username_key`, and a `role_types` enum.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, warn};

use catwatch_core::error::{AppError, ErrorKind};
use catwatch_core::result::AppResult;
use catwatch_core::types::IdentityId;
use catwatch_entity::{AccessChange, AdminCensus, Identity, NewIdentity, Role, SearchPredicate};

use super::{AccessGuard, AccessOutcome, CountFilter, IdentityStore};

/// Advisory lock key serializing role/activation changes ("catwatch" in ASCII).
const ACCESS_CHANGE_LOCK_KEY: i64 = 0x6361_7477_6174_6368;

/// Repository for identity persistence in PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    /// Create a new identity store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

fn missing(id: IdentityId) -> AppError {
    AppError::not_found(format!("Identity {id} not found"))
}

/// Escape LIKE metacharacters so the needle matches literally.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Render the WHERE clause for a predicate; `$1` is the LIKE pattern.
fn where_clause(predicate: &SearchPredicate) -> Option<String> {
    match predicate {
        SearchPredicate::All => None,
        SearchPredicate::AnyContains { fields, .. } if fields.is_empty() => None,
        SearchPredicate::AnyContains { fields, .. } => {
            let terms: Vec<String> = fields
                .iter()
                .map(|f| format!("{} ILIKE $1", f.column()))
                .collect();
            Some(terms.join(" OR "))
        }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn insert(&self, new: &NewIdentity) -> AppResult<Identity> {
        sqlx::query_as::<_, Identity>(
            "INSERT INTO users (id, role, is_active, username, email, password_hash, name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING *",
        )
        .bind(IdentityId::new())
        .bind(new.role)
        .bind(new.active)
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("users_username_key") =>
            {
                AppError::conflict(format!(
                    "Username '{}' already exists",
                    new.username.as_deref().unwrap_or_default()
                ))
            }
            sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("users_email_key") => {
                AppError::conflict("Email already in use")
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create identity", e),
        })
    }

    async fn find_by_id(&self, id: IdentityId) -> AppResult<Option<Identity>> {
        sqlx::query_as::<_, Identity>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find identity by id"))
    }

    async fn find_by_login(&self, email: &str, username: &str) -> AppResult<Option<Identity>> {
        sqlx::query_as::<_, Identity>(
            "SELECT * FROM users WHERE email = $1 OR username = $2 \
             ORDER BY (email = $1) DESC LIMIT 1",
        )
        .bind(email)
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find identity by login"))
    }

    async fn search(&self, predicate: &SearchPredicate) -> AppResult<Vec<Identity>> {
        match (where_clause(predicate), predicate) {
            (Some(clause), SearchPredicate::AnyContains { needle, .. }) => {
                let sql = format!("SELECT * FROM users WHERE {clause} ORDER BY email ASC");
                sqlx::query_as::<_, Identity>(&sql)
                    .bind(like_pattern(needle))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(db_error("Failed to search identities"))
            }
            _ => sqlx::query_as::<_, Identity>("SELECT * FROM users ORDER BY email ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to list identities")),
        }
    }

    async fn count(&self, filter: CountFilter) -> AppResult<u64> {
        let count: i64 = match filter {
            CountFilter::Role(role) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = $1")
                    .bind(role)
                    .fetch_one(&self.pool)
                    .await
            }
            CountFilter::Active(active) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_active = $1")
                    .bind(active)
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(db_error("Failed to count identities"))?;

        Ok(count as u64)
    }

    async fn update_password(&self, id: IdentityId, password_hash: &str) -> AppResult<Identity> {
        sqlx::query_as::<_, Identity>(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to update password"))?
        .ok_or_else(|| missing(id))
    }

    async fn record_sign_in(
        &self,
        id: IdentityId,
        ip: &str,
        at: DateTime<Utc>,
    ) -> AppResult<Identity> {
        // SET expressions read the pre-update row, so the shift is atomic.
        sqlx::query_as::<_, Identity>(
            "UPDATE users SET sign_in_count = sign_in_count + 1, \
                              last_sign_in_at = current_sign_in_at, \
                              last_sign_in_ip = current_sign_in_ip, \
                              current_sign_in_at = $2, \
                              current_sign_in_ip = $3, \
                              updated_at = $2 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(at)
        .bind(ip)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to record sign-in"))?
        .ok_or_else(|| missing(id))
    }

    async fn change_access(
        &self,
        id: IdentityId,
        change: AccessChange,
        guard: AccessGuard<'_>,
    ) -> AppResult<AccessOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        // Held until commit/rollback; each later statement sees every
        // access change committed before the lock was granted.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ACCESS_CHANGE_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to acquire access-change lock"))?;

        let current = sqlx::query_as::<_, Identity>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to load identity"))?
            .ok_or_else(|| missing(id))?;

        let (admins, active): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE role = $1), COUNT(*) FILTER (WHERE is_active) FROM users",
        )
        .bind(Role::Admin)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to count administrators"))?;

        let census = AdminCensus {
            admins: admins as u64,
            active: active as u64,
        };

        if guard(&current, &change, census) {
            tx.rollback()
                .await
                .map_err(db_error("Failed to roll back access change"))?;
            warn!(identity_id = %id, admins, active, "Access change vetoed");
            return Ok(AccessOutcome::Forbidden { census });
        }

        let (role, active) = change.resolve(&current);
        let updated = sqlx::query_as::<_, Identity>(
            "UPDATE users SET role = $2, is_active = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(role)
        .bind(active)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to apply access change"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit access change"))?;

        debug!(identity_id = %id, role = %updated.role, active = updated.active, "Access change committed");
        Ok(AccessOutcome::Applied(updated))
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(db_error("Health check failed"))
    }
}

#[cfg(test)]
mod tests {
    use catwatch_entity::SearchField;

    use super::*;

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("bob"), "%bob%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_where_clause_joins_fields_with_or() {
        let predicate = SearchPredicate::AnyContains {
            needle: "x".to_string(),
            fields: SearchField::DEFAULT.to_vec(),
        };
        assert_eq!(
            where_clause(&predicate).as_deref(),
            Some("email ILIKE $1 OR name ILIKE $1")
        );
        assert_eq!(where_clause(&SearchPredicate::All), None);
    }
}

//! Identity lookup by login and free-text search.

use std::sync::Arc;

use tracing::debug;

use catwatch_core::result::AppResult;
use catwatch_database::IdentityStore;
use catwatch_entity::{Identity, SearchField, SearchPredicate};

/// Finds identities by email/username and searches them by text.
#[derive(Debug, Clone)]
pub struct IdentityLookup {
    store: Arc<dyn IdentityStore>,
}

impl IdentityLookup {
    /// Creates a lookup over `store`.
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Find the identity whose email or username equals `input`.
    ///
    /// Emails compare exactly. Usernames are stored lowercase, so the input
    /// is lowercased for that column.
    pub async fn find_by_identity(&self, input: &str) -> AppResult<Option<Identity>> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }
        self.store
            .find_by_login(input, &input.to_lowercase())
            .await
    }

    /// Build the predicate for a text query over `fields`.
    ///
    /// A blank query or an empty field list means no filter at all.
    pub fn search_predicate(query: &str, fields: &[SearchField]) -> SearchPredicate {
        let needle = query.trim();
        if needle.is_empty() || fields.is_empty() {
            return SearchPredicate::All;
        }
        SearchPredicate::AnyContains {
            needle: needle.to_string(),
            fields: fields.to_vec(),
        }
    }

    /// Search identities whose `fields` contain `query`, ordered by email.
    pub async fn search(&self, query: &str, fields: &[SearchField]) -> AppResult<Vec<Identity>> {
        let predicate = Self::search_predicate(query, fields);
        let found = self.store.search(&predicate).await?;
        debug!(
            query,
            filtered = !predicate.is_match_all(),
            hits = found.len(),
            "Identity search"
        );
        Ok(found)
    }
}

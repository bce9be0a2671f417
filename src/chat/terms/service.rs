//! Excluded-terms service: validated CRUD plus redaction, with a per-user
//! cache of active terms in front of the store.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use crate::chat::core::errors::ChatResult;
use crate::chat::core::ids::{TermId, UserId};
use crate::chat::terms::filter::{self, FilteredText, MatchReport};
use crate::chat::terms::model::{ExcludedTerm, TermCategory};
use crate::chat::terms::store::SqliteTermStore;

/// User-facing excluded-terms service.
pub struct TermService {
    store: SqliteTermStore,
    active_cache: DashMap<UserId, Arc<Vec<ExcludedTerm>>>,
}

impl TermService {
    /// Wrap a term store.
    #[must_use]
    pub fn new(store: SqliteTermStore) -> Self {
        Self {
            store,
            active_cache: DashMap::new(),
        }
    }

    /// Validate and persist a new term.
    ///
    /// # Errors
    /// Returns `ChatError::InvalidTerm` on validation failure, or a storage
    /// error if the insert fails.
    pub async fn add(
        &self,
        user_id: &UserId,
        raw_term: &str,
        category: TermCategory,
        reason: Option<String>,
    ) -> ChatResult<ExcludedTerm> {
        let term_text = filter::validate_term(raw_term)?;
        let term = ExcludedTerm::new(user_id.clone(), term_text, category, reason);
        self.store.insert(&term).await?;
        self.active_cache.remove(user_id);
        Ok(term)
    }

    /// Validate and overwrite an existing term's text, category, and reason.
    ///
    /// # Errors
    /// Returns a validation error, `ChatError::NotFound`, or a storage error.
    pub async fn update(
        &self,
        id: TermId,
        raw_term: &str,
        category: TermCategory,
        reason: Option<String>,
    ) -> ChatResult<ExcludedTerm> {
        let term_text = filter::validate_term(raw_term)?;
        let mut term = self.require(id).await?;
        term.term = term_text;
        term.category = category;
        term.reason = reason;
        term.updated_at = Utc::now();
        self.store.update(&term).await?;
        self.active_cache.remove(&term.user_id);
        Ok(term)
    }

    /// Flip a term's `is_active` flag, refreshing only `updated_at`.
    ///
    /// # Errors
    /// Returns `ChatError::NotFound` or a storage error.
    pub async fn toggle(&self, id: TermId) -> ChatResult<ExcludedTerm> {
        let mut term = self.require(id).await?;
        term.is_active = !term.is_active;
        term.updated_at = Utc::now();
        self.store.update(&term).await?;
        self.active_cache.remove(&term.user_id);
        Ok(term)
    }

    /// Delete a term.
    ///
    /// # Errors
    /// Returns `ChatError::NotFound` or a storage error.
    pub async fn delete(&self, id: TermId) -> ChatResult<()> {
        // Look the row up first so the owner's cache can be invalidated.
        let term = self.require(id).await?;
        self.store.delete(id).await?;
        self.active_cache.remove(&term.user_id);
        Ok(())
    }

    /// List all of the user's terms.
    ///
    /// # Errors
    /// Returns a storage error if the query fails.
    pub async fn list(&self, user_id: &UserId) -> ChatResult<Vec<ExcludedTerm>> {
        self.store.list(user_id).await
    }

    /// Redact active terms from the text, collapsing whitespace.
    ///
    /// # Errors
    /// Returns a storage error if the active terms cannot be loaded.
    pub async fn filter_text(&self, user_id: &UserId, text: &str) -> ChatResult<FilteredText> {
        let terms = self.active_terms(user_id).await?;
        let result = filter::apply_terms(text, &terms);
        if !result.removed.is_empty() {
            debug!(user = %user_id, removed = result.removed.len(), "redacted excluded terms");
        }
        Ok(result)
    }

    /// Report active-term matches without mutating the text.
    ///
    /// # Errors
    /// Returns a storage error if the active terms cannot be loaded.
    pub async fn contains_excluded_terms(
        &self,
        user_id: &UserId,
        text: &str,
    ) -> ChatResult<MatchReport> {
        let terms = self.active_terms(user_id).await?;
        Ok(filter::find_matches(text, &terms))
    }

    async fn active_terms(&self, user_id: &UserId) -> ChatResult<Arc<Vec<ExcludedTerm>>> {
        if let Some(cached) = self.active_cache.get(user_id) {
            return Ok(Arc::clone(&cached));
        }

        let terms = Arc::new(self.store.list_active(user_id).await?);
        self.active_cache
            .insert(user_id.clone(), Arc::clone(&terms));
        Ok(terms)
    }

    async fn require(&self, id: TermId) -> ChatResult<ExcludedTerm> {
        self.store.get(id).await?.ok_or_else(|| {
            crate::chat::core::errors::ChatError::NotFound(format!("excluded term {id}"))
        })
    }
}

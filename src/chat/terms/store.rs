//! `SQLite` storage for excluded terms.

use chrono::{TimeZone, Utc};
use tokio_rusqlite::Connection;

use crate::chat::core::config::StorageConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{TermId, UserId};
use crate::chat::terms::model::{ExcludedTerm, TermCategory};

/// `SQLite`-backed store for user-scoped excluded terms.
pub struct SqliteTermStore {
    conn: Connection,
}

impl SqliteTermStore {
    /// Open the store at the configured path, creating the schema if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn new(config: &StorageConfig) -> ChatResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::init_schema(&conn).await?;
        Ok(Self { conn })
    }

    /// Open an in-memory store, mainly for tests.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn open_in_memory() -> ChatResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init_schema(&conn).await?;
        Ok(Self { conn })
    }

    async fn init_schema(conn: &Connection) -> ChatResult<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS excluded_terms (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    term TEXT NOT NULL,
                    category TEXT NOT NULL,
                    reason TEXT,
                    is_active INTEGER NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_excluded_terms_user
                    ON excluded_terms(user_id);",
            )?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Insert a term record.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn insert(&self, term: &ExcludedTerm) -> ChatResult<()> {
        let record = term.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO excluded_terms
                        (id, user_id, term, category, reason, is_active, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    rusqlite::params![
                        record.id,
                        record.user_id,
                        record.term,
                        record.category.as_str(),
                        record.reason,
                        record.is_active,
                        record.created_at.timestamp_millis(),
                        record.updated_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Overwrite an existing term record.
    ///
    /// # Errors
    /// Returns `ChatError::NotFound` if no row matches the id.
    pub async fn update(&self, term: &ExcludedTerm) -> ChatResult<()> {
        let record = term.clone();
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE excluded_terms
                     SET term = ?2, category = ?3, reason = ?4, is_active = ?5, updated_at = ?6
                     WHERE id = ?1",
                    rusqlite::params![
                        record.id,
                        record.term,
                        record.category.as_str(),
                        record.reason,
                        record.is_active,
                        record.updated_at.timestamp_millis(),
                    ],
                )?;
                Ok(changed)
            })
            .await?;

        if changed == 0 {
            return Err(ChatError::NotFound(format!("excluded term {}", term.id)));
        }
        Ok(())
    }

    /// Fetch a term by id.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn get(&self, id: TermId) -> ChatResult<Option<ExcludedTerm>> {
        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, term, category, reason, is_active, created_at, updated_at
                     FROM excluded_terms WHERE id = ?1",
                )?;
                let row = stmt
                    .query_row(rusqlite::params![id], map_term_row)
                    .map(Some)
                    .or_else(|err| match err {
                        rusqlite::Error::QueryReturnedNoRows => Ok(None),
                        other => Err(other),
                    })?;
                Ok(row)
            })
            .await?;
        row.transpose()
    }

    /// Delete a term by id.
    ///
    /// # Errors
    /// Returns `ChatError::NotFound` if no row matches the id.
    pub async fn delete(&self, id: TermId) -> ChatResult<()> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "DELETE FROM excluded_terms WHERE id = ?1",
                    rusqlite::params![id],
                )?;
                Ok(changed)
            })
            .await?;

        if changed == 0 {
            return Err(ChatError::NotFound(format!("excluded term {id}")));
        }
        Ok(())
    }

    /// List all of a user's terms, newest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn list(&self, user_id: &UserId) -> ChatResult<Vec<ExcludedTerm>> {
        self.list_where(user_id, false).await
    }

    /// List only the user's active terms, newest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn list_active(&self, user_id: &UserId) -> ChatResult<Vec<ExcludedTerm>> {
        self.list_where(user_id, true).await
    }

    async fn list_where(&self, user_id: &UserId, active_only: bool) -> ChatResult<Vec<ExcludedTerm>> {
        let user = user_id.clone();
        let rows = self
            .conn
            .call(move |conn| {
                let sql = if active_only {
                    "SELECT id, user_id, term, category, reason, is_active, created_at, updated_at
                     FROM excluded_terms WHERE user_id = ?1 AND is_active = 1
                     ORDER BY created_at DESC"
                } else {
                    "SELECT id, user_id, term, category, reason, is_active, created_at, updated_at
                     FROM excluded_terms WHERE user_id = ?1
                     ORDER BY created_at DESC"
                };
                let mut stmt = conn.prepare(sql)?;
                let rows = stmt
                    .query_map(rusqlite::params![user], map_term_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter().collect()
    }
}

type TermRow = ChatResult<ExcludedTerm>;

/// Map a `SELECT` row to an [`ExcludedTerm`], deferring domain validation
/// errors so they surface as `ChatError` rather than a sqlite error.
fn map_term_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TermRow> {
    let id: TermId = row.get(0)?;
    let user_id: UserId = row.get(1)?;
    let term: String = row.get(2)?;
    let category_raw: String = row.get(3)?;
    let reason: Option<String> = row.get(4)?;
    let is_active: bool = row.get(5)?;
    let created_ms: i64 = row.get(6)?;
    let updated_ms: i64 = row.get(7)?;

    Ok(build_term(
        id,
        user_id,
        term,
        &category_raw,
        reason,
        is_active,
        created_ms,
        updated_ms,
    ))
}

#[allow(clippy::too_many_arguments)]
fn build_term(
    id: TermId,
    user_id: UserId,
    term: String,
    category_raw: &str,
    reason: Option<String>,
    is_active: bool,
    created_ms: i64,
    updated_ms: i64,
) -> TermRow {
    let category = TermCategory::parse(category_raw).ok_or_else(|| {
        ChatError::MalformedResponse(format!("unknown term category: {category_raw}"))
    })?;
    let created_at = Utc
        .timestamp_millis_opt(created_ms)
        .single()
        .ok_or_else(|| ChatError::MalformedResponse("invalid created_at".to_string()))?;
    let updated_at = Utc
        .timestamp_millis_opt(updated_ms)
        .single()
        .ok_or_else(|| ChatError::MalformedResponse("invalid updated_at".to_string()))?;

    Ok(ExcludedTerm {
        id,
        user_id,
        term,
        category,
        reason,
        is_active,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("term-tester").expect("valid user id")
    }

    #[tokio::test]
    async fn insert_and_list_roundtrip() {
        let store = SqliteTermStore::open_in_memory().await.expect("open");
        let term = ExcludedTerm::new(user(), "reggaeton", TermCategory::Genre, None);
        store.insert(&term).await.expect("insert");

        let listed = store.list(&user()).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].term, "reggaeton");
        assert_eq!(listed[0].category, TermCategory::Genre);
    }

    #[tokio::test]
    async fn list_active_excludes_disabled_terms() {
        let store = SqliteTermStore::open_in_memory().await.expect("open");
        let active = ExcludedTerm::new(user(), "salsa", TermCategory::Genre, None);
        let mut disabled = ExcludedTerm::new(user(), "tango", TermCategory::Genre, None);
        disabled.is_active = false;

        store.insert(&active).await.expect("insert active");
        store.insert(&disabled).await.expect("insert disabled");

        let listed = store.list_active(&user()).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].term, "salsa");
    }

    #[tokio::test]
    async fn delete_unknown_id_reports_not_found() {
        let store = SqliteTermStore::open_in_memory().await.expect("open");
        let result = store.delete(TermId::new()).await;
        assert!(matches!(result, Err(ChatError::NotFound(_))));
    }
}

//! Local `SQLite` cache for conversations, plus a small namespaced
//! key-value table for the auth token / profile cache.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Value;
use tokio_rusqlite::Connection;

use crate::chat::core::config::StorageConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::UserId;
use crate::chat::core::session::ChatSession;
use crate::chat::history::{ConversationSummary, ListFilters};

/// Local conversation cache.
///
/// Acts as a read-through cache in front of the remote store and as the sole
/// store when the BFF is unreachable. Derived metadata (message count,
/// preview, topic tags, search text) is recomputed on every save; the
/// `starred` flag survives upserts.
pub struct ConversationCache {
    conn: Connection,
}

impl ConversationCache {
    /// Open the cache at the configured path, creating the schema if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn new(config: &StorageConfig) -> ChatResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::init_schema(&conn).await?;
        Ok(Self { conn })
    }

    /// Open an in-memory cache, mainly for tests.
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
                "CREATE TABLE IF NOT EXISTS conversations (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    title TEXT NOT NULL,
                    session_json TEXT NOT NULL,
                    message_count INTEGER NOT NULL,
                    preview TEXT NOT NULL,
                    topics_json TEXT NOT NULL,
                    starred INTEGER NOT NULL DEFAULT 0,
                    search_text TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_conversations_user
                    ON conversations(user_id, updated_at);
                CREATE TABLE IF NOT EXISTS kv_cache (
                    namespace TEXT NOT NULL,
                    key TEXT NOT NULL,
                    value_json TEXT NOT NULL,
                    updated_at INTEGER NOT NULL,
                    PRIMARY KEY (namespace, key)
                );",
            )?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Upsert a conversation, recomputing derived metadata.
    ///
    /// # Errors
    /// Returns an error if serialization or storage access fails.
    pub async fn save(&self, user_id: &UserId, session: &ChatSession) -> ChatResult<()> {
        let user = user_id.clone();
        let id = session.id.clone();
        let title = session.title.clone();
        let session_json = serde_json::to_string(session)?;
        let message_count = session.messages.len() as i64;
        let preview = session.preview();
        let topics_json = serde_json::to_string(&session.topics())?;
        let search_text = build_search_text(session);
        let created_at = session.created_at.timestamp_millis();
        let updated_at = session.updated_at.timestamp_millis();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO conversations
                        (id, user_id, title, session_json, message_count, preview,
                         topics_json, starred, search_text, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?10)
                     ON CONFLICT(id) DO UPDATE SET
                        user_id = excluded.user_id,
                        title = excluded.title,
                        session_json = excluded.session_json,
                        message_count = excluded.message_count,
                        preview = excluded.preview,
                        topics_json = excluded.topics_json,
                        search_text = excluded.search_text,
                        updated_at = excluded.updated_at",
                    rusqlite::params![
                        id,
                        user,
                        title,
                        session_json,
                        message_count,
                        preview,
                        topics_json,
                        search_text,
                        created_at,
                        updated_at,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Fetch a cached conversation transcript.
    ///
    /// # Errors
    /// Returns an error if storage access or deserialization fails.
    pub async fn get(&self, session_id: &str) -> ChatResult<Option<ChatSession>> {
        let id = session_id.to_string();
        let json = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT session_json FROM conversations WHERE id = ?1")?;
                let json: Option<String> = stmt
                    .query_row(rusqlite::params![id], |row| row.get(0))
                    .map(Some)
                    .or_else(|err| match err {
                        rusqlite::Error::QueryReturnedNoRows => Ok(None),
                        other => Err(other),
                    })?;
                Ok(json)
            })
            .await?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// List a user's cached conversations, newest-updated first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn list(
        &self,
        user_id: &UserId,
        filters: &ListFilters,
    ) -> ChatResult<Vec<ConversationSummary>> {
        let mut sql = String::from(
            "SELECT id, title, message_count, preview, topics_json, starred, created_at, updated_at
             FROM conversations WHERE user_id = ?",
        );
        let mut params: Vec<Value> = vec![Value::Text(user_id.as_str().to_string())];

        if let Some(from) = filters.from {
            sql.push_str(" AND updated_at >= ?");
            params.push(Value::Integer(from.timestamp_millis()));
        }
        if let Some(to) = filters.to {
            sql.push_str(" AND updated_at <= ?");
            params.push(Value::Integer(to.timestamp_millis()));
        }
        if filters.starred_only {
            sql.push_str(" AND starred = 1");
        }
        if let Some(search) = filters.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            sql.push_str(" AND search_text LIKE ?");
            params.push(Value::Text(format!(
                "%{}%",
                search.to_lowercase().replace('%', "")
            )));
        }
        sql.push_str(" ORDER BY updated_at DESC");

        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(params), map_summary_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter().collect()
    }

    /// Hard-delete a cached conversation.
    ///
    /// # Errors
    /// Returns `ChatError::NotFound` when the id is unknown.
    pub async fn delete(&self, session_id: &str) -> ChatResult<()> {
        let id = session_id.to_string();
        let changed = self
            .conn
            .call(move |conn| {
                let changed =
                    conn.execute("DELETE FROM conversations WHERE id = ?1", rusqlite::params![id])?;
                Ok(changed)
            })
            .await?;

        if changed == 0 {
            return Err(ChatError::NotFound(format!("conversation {session_id}")));
        }
        Ok(())
    }

    /// Set or clear the starred flag.
    ///
    /// # Errors
    /// Returns `ChatError::NotFound` when the id is unknown.
    pub async fn set_starred(&self, session_id: &str, starred: bool) -> ChatResult<()> {
        let id = session_id.to_string();
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE conversations SET starred = ?2 WHERE id = ?1",
                    rusqlite::params![id, starred],
                )?;
                Ok(changed)
            })
            .await?;

        if changed == 0 {
            return Err(ChatError::NotFound(format!("conversation {session_id}")));
        }
        Ok(())
    }

    /// Store a JSON value in the key-value table.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn put_value(
        &self,
        namespace: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> ChatResult<()> {
        let namespace = namespace.to_string();
        let key = key.to_string();
        let value_json = value.to_string();
        let updated_at = Utc::now().timestamp_millis();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO kv_cache (namespace, key, value_json, updated_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![namespace, key, value_json, updated_at],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Read a JSON value from the key-value table.
    ///
    /// # Errors
    /// Returns an error if storage access or deserialization fails.
    pub async fn get_value(
        &self,
        namespace: &str,
        key: &str,
    ) -> ChatResult<Option<serde_json::Value>> {
        let namespace = namespace.to_string();
        let key = key.to_string();
        let json = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT value_json FROM kv_cache WHERE namespace = ?1 AND key = ?2",
                )?;
                let json: Option<String> = stmt
                    .query_row(rusqlite::params![namespace, key], |row| row.get(0))
                    .map(Some)
                    .or_else(|err| match err {
                        rusqlite::Error::QueryReturnedNoRows => Ok(None),
                        other => Err(other),
                    })?;
                Ok(json)
            })
            .await?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Remove a key-value entry. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    pub async fn remove_value(&self, namespace: &str, key: &str) -> ChatResult<()> {
        let namespace = namespace.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM kv_cache WHERE namespace = ?1 AND key = ?2",
                    rusqlite::params![namespace, key],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

/// Lowercased title plus message bodies, for `LIKE` search.
fn build_search_text(session: &ChatSession) -> String {
    let mut text = String::new();
    for lower in session.title.chars().flat_map(char::to_lowercase) {
        text.push(lower);
    }
    for message in &session.messages {
        text.push(' ');
        for lower in message.text.chars().flat_map(char::to_lowercase) {
            text.push(lower);
        }
    }
    text
}

type SummaryRow = ChatResult<ConversationSummary>;

fn map_summary_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SummaryRow> {
    let id: String = row.get(0)?;
    let title: String = row.get(1)?;
    let message_count: i64 = row.get(2)?;
    let preview: String = row.get(3)?;
    let topics_json: String = row.get(4)?;
    let starred: bool = row.get(5)?;
    let created_ms: i64 = row.get(6)?;
    let updated_ms: i64 = row.get(7)?;

    Ok(build_summary(
        id,
        title,
        message_count,
        preview,
        &topics_json,
        starred,
        created_ms,
        updated_ms,
    ))
}

#[allow(clippy::too_many_arguments)]
fn build_summary(
    id: String,
    title: String,
    message_count: i64,
    preview: String,
    topics_json: &str,
    starred: bool,
    created_ms: i64,
    updated_ms: i64,
) -> SummaryRow {
    let topics: Vec<String> = serde_json::from_str(topics_json)?;
    Ok(ConversationSummary {
        id,
        title,
        message_count: usize::try_from(message_count).unwrap_or_default(),
        preview,
        topics,
        starred,
        created_at: millis_to_datetime(created_ms)?,
        updated_at: millis_to_datetime(updated_ms)?,
    })
}

fn millis_to_datetime(millis: i64) -> ChatResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ChatError::MalformedResponse(format!("invalid timestamp: {millis}")))
}

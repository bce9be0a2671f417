//! Error types for the chat client.

use thiserror::Error;

/// Chat client error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An excluded term failed validation.
    #[error("invalid excluded term: {0}")]
    InvalidTerm(String),
    /// Invalid identifier value.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
    /// Authentication failure with a localized, user-facing message.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Transport-level HTTP failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The remote service answered with a non-2xx status.
    #[error("unexpected http status: {0}")]
    HttpStatus(u16),
    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// A record with the given id does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

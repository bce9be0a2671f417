//! Configuration for the chat client.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::core::errors::{ChatError, ChatResult};

/// Environment variable overriding the BFF base URL.
///
/// This is the only environment variable the crate reads.
pub const BFF_URL_ENV: &str = "CADENZA_BFF_URL";

/// Fixed application name used to namespace the local database.
pub const APP_DB_NAME: &str = "cadenza";

/// Top-level configuration for the chat client.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// AI gateway settings.
    pub gateway: GatewayConfig,
    /// Identity provider settings.
    pub auth: AuthConfig,
    /// Local storage settings.
    pub storage: StorageConfig,
    /// Simulated streaming settings.
    pub reveal: RevealConfig,
}

impl AgentConfig {
    /// Build a configuration from defaults, applying the `CADENZA_BFF_URL`
    /// override when present.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var(BFF_URL_ENV) {
            config.gateway.base_url = base_url;
        }
        config
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        Url::parse(&self.gateway.base_url)?;
        Url::parse(&self.auth.base_url)?;

        if self.gateway.model.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "gateway.model must not be empty".to_string(),
            ));
        }

        if self.gateway.timeout_seconds == 0 {
            return Err(ChatError::InvalidConfig(
                "gateway.timeout_seconds must be > 0".to_string(),
            ));
        }

        if self.reveal.max_chunk_chars == 0 {
            return Err(ChatError::InvalidConfig(
                "reveal.max_chunk_chars must be > 0".to_string(),
            ));
        }

        if self.reveal.min_delay_ms > self.reveal.max_delay_ms {
            return Err(ChatError::InvalidConfig(
                "reveal.min_delay_ms must be <= reveal.max_delay_ms".to_string(),
            ));
        }

        Ok(())
    }
}

/// AI gateway (BFF) settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the BFF endpoint.
    pub base_url: String,
    /// Model identifier sent with every question.
    pub model: String,
    /// Whether the gateway should include conversational context.
    pub include_context: bool,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/".to_string(),
            model: "music-recommender-v2".to_string(),
            include_context: true,
            timeout_seconds: 60,
        }
    }
}

/// Identity provider settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the identity-toolkit API.
    pub base_url: String,
    /// Project API key appended to every request.
    pub api_key: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: "https://identitytoolkit.googleapis.com/v1/".to_string(),
            api_key: String::new(),
            timeout_seconds: 30,
        }
    }
}

/// Local storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from(format!("{APP_DB_NAME}.sqlite")),
        }
    }
}

/// Settings for the time-sliced answer reveal.
///
/// The gateway returns complete answers; the reveal task replays them in
/// chunks so the transcript fills in progressively.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevealConfig {
    /// Soft maximum chunk size in characters; chunks break at whitespace.
    pub max_chunk_chars: usize,
    /// Delay contribution per revealed character, in milliseconds.
    pub millis_per_char: u64,
    /// Lower bound on the per-chunk delay, in milliseconds.
    pub min_delay_ms: u64,
    /// Upper bound on the per-chunk delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 24,
            millis_per_char: 12,
            min_delay_ms: 30,
            max_delay_ms: 350,
        }
    }
}

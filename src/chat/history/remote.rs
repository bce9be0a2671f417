//! HTTP client for the remote conversation store.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::chat::core::config::GatewayConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::UserId;
use crate::chat::core::session::ChatSession;
use crate::chat::history::{ConversationStore, ConversationSummary};

/// Save payload: the session plus its owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveBody<'a> {
    user_id: &'a str,
    session: &'a ChatSession,
}

/// Conversation store client over the BFF HTTP API.
pub struct RemoteConversationStore {
    client: reqwest::Client,
    base_url: Url,
}

impl RemoteConversationStore {
    /// Build a store client from configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be constructed.
    pub fn new(config: &GatewayConfig) -> ChatResult<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Build a store client reusing an existing HTTP client.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn with_client(config: &GatewayConfig, client: reqwest::Client) -> ChatResult<Self> {
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self { client, base_url })
    }

    fn conversations_url(&self, suffix: &str) -> ChatResult<Url> {
        Ok(self.base_url.join(&format!("conversations/{suffix}"))?)
    }
}

#[async_trait]
impl ConversationStore for RemoteConversationStore {
    #[instrument(skip(self))]
    async fn list(&self, user_id: &UserId) -> ChatResult<Vec<ConversationSummary>> {
        let url = self.conversations_url(&format!("user/{user_id}"))?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::HttpStatus(status.as_u16()));
        }

        let summaries: Vec<ConversationSummary> = response.json().await?;
        debug!(count = summaries.len(), "listed remote conversations");
        Ok(summaries)
    }

    #[instrument(skip(self))]
    async fn get(&self, session_id: &str) -> ChatResult<Option<ChatSession>> {
        let url = self.conversations_url(session_id)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ChatError::HttpStatus(status.as_u16()));
        }

        Ok(Some(response.json().await?))
    }

    #[instrument(skip(self, session), fields(session = %session.id))]
    async fn save(&self, user_id: &UserId, session: &ChatSession) -> ChatResult<()> {
        let url = self.conversations_url(&session.id)?;
        let body = SaveBody {
            user_id: user_id.as_str(),
            session,
        };
        let response = self.client.post(url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::HttpStatus(status.as_u16()));
        }

        debug!("saved remote conversation");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, session_id: &str) -> ChatResult<()> {
        let url = self.conversations_url(session_id)?;
        let response = self.client.delete(url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ChatError::NotFound(format!("conversation {session_id}")));
        }
        if !status.is_success() {
            return Err(ChatError::HttpStatus(status.as_u16()));
        }

        Ok(())
    }
}

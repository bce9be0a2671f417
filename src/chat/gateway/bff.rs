//! HTTP implementation of the gateway seam against the BFF.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};
use url::Url;

use crate::chat::core::config::GatewayConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::gateway::{AnswerGateway, AskReply, AskRequest, GatewayResponse};

/// Path of the question endpoint, relative to the base URL.
const ASK_PATH: &str = "ask";

/// Gateway client over the BFF HTTP API.
pub struct BffGateway {
    client: reqwest::Client,
    base_url: Url,
}

impl BffGateway {
    /// Build a gateway client from configuration.
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

    /// Build a gateway client reusing an existing HTTP client.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn with_client(config: &GatewayConfig, client: reqwest::Client) -> ChatResult<Self> {
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl AnswerGateway for BffGateway {
    #[instrument(skip(self, request), fields(session = ?request.session_id))]
    async fn ask(&self, request: &AskRequest) -> ChatResult<AskReply> {
        let url = self.base_url.join(ASK_PATH)?;
        let response = self.client.post(url).json(request).send().await?;

        // Success is decided by the HTTP status alone; the body-level
        // isSuccess flag is ignored.
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::HttpStatus(status.as_u16()));
        }

        let body: GatewayResponse = response.json().await?;
        let text = body
            .select_answer()
            .ok_or_else(|| {
                ChatError::MalformedResponse("gateway response carried no answer text".to_string())
            })?
            .to_string();

        let session_id = body
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| request.session_id.clone())
            .ok_or_else(|| {
                ChatError::MalformedResponse(
                    "gateway neither echoed nor assigned a session id".to_string(),
                )
            })?;

        debug!(chars = text.len(), %session_id, "gateway answered");
        Ok(AskReply { text, session_id })
    }
}

//! AI gateway client: request/response shapes and the `AnswerGateway` seam.

pub mod bff;

pub use bff::BffGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chat::core::errors::ChatResult;

/// Question payload sent to the gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    /// Session to continue, or `None` to let the gateway assign one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// The user's question.
    pub question: String,
    /// Model identifier.
    pub model: String,
    /// Identifier of the asking user.
    pub user_id: String,
    /// Whether the gateway should include conversational context.
    pub include_context: bool,
}

/// Raw gateway response body.
///
/// The BFF spreads its answer across several fields; [`select_answer`] picks
/// the first usable one. `is_success` and `status_code` are carried for
/// diagnostics only: the HTTP status decides success.
///
/// [`select_answer`]: GatewayResponse::select_answer
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayResponse {
    /// Natural-language answer. Highest priority.
    pub natural_language_answer: Option<String>,
    /// Clarifying question back to the user.
    pub clarification_message: Option<String>,
    /// Human-friendly description of the result.
    pub user_friendly_description: Option<String>,
    /// Raw message from the model.
    pub raw_message: Option<String>,
    /// The question as the gateway understood it. Lowest priority.
    pub contextualized_question: Option<String>,
    /// Echoed or newly assigned session id.
    pub session_id: Option<String>,
    /// Body-level status code. Diagnostic only.
    pub status_code: Option<u16>,
    /// Body-level success flag. Diagnostic only.
    pub is_success: Option<bool>,
}

impl GatewayResponse {
    /// First non-empty answer field in priority order.
    #[must_use]
    pub fn select_answer(&self) -> Option<&str> {
        [
            &self.natural_language_answer,
            &self.clarification_message,
            &self.user_friendly_description,
            &self.raw_message,
            &self.contextualized_question,
        ]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .map(str::trim)
        .find(|text| !text.is_empty())
    }
}

/// A successfully resolved exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AskReply {
    /// The answer text to reveal.
    pub text: String,
    /// Session id to carry forward (echoed or assigned).
    pub session_id: String,
}

/// Seam over the AI gateway so the engine can be tested with fakes.
#[async_trait]
pub trait AnswerGateway: Send + Sync {
    /// Submit a question and wait for the complete answer.
    ///
    /// # Errors
    /// Returns a transport, status, or malformed-response error.
    async fn ask(&self, request: &AskRequest) -> ChatResult<AskReply>;
}

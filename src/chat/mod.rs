//! Client core for the Cadenza music-recommendation assistant.
//!
//! Organized into:
//! - `core`: Configuration, errors, IDs, and conversation models
//! - `gateway`: AI gateway request/response shapes and the HTTP client
//! - `history`: Remote conversation store client and the local `SQLite` cache
//! - `terms`: Excluded-term validation, redaction, and storage
//! - `auth`: Identity provider client with localized error mapping
//! - `engine`: Session lifecycle orchestration and the answer reveal

pub mod auth;
pub mod core;
pub mod engine;
pub mod gateway;
pub mod history;
pub mod terms;

// Re-export commonly used types for convenience
pub use auth::{AuthClient, AuthState, AuthUser, describe_auth_error};
pub use self::core::{
    AgentConfig, AuthConfig, ChatError, ChatMessage, ChatResult, ChatSession, GatewayConfig,
    MessageId, RevealConfig, Sender, StorageConfig, TermId, UserId,
};
pub use engine::{
    ChatEngine, EngineDeps, ExchangePhase, SendOutcome, SessionSnapshot,
};
pub use gateway::{AnswerGateway, AskReply, AskRequest, BffGateway, GatewayResponse};
pub use history::{
    ConversationCache, ConversationStore, ConversationSummary, ListFilters,
    RemoteConversationStore,
};
pub use terms::{ExcludedTerm, FilteredText, MatchReport, TermCategory, TermService};

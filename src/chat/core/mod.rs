//! Shared types: configuration, errors, identifiers, and conversation models.

pub mod config;
pub mod errors;
pub mod ids;
pub mod message;
pub mod session;

pub use config::{
    APP_DB_NAME, AgentConfig, AuthConfig, BFF_URL_ENV, GatewayConfig, RevealConfig, StorageConfig,
};
pub use errors::{ChatError, ChatResult};
pub use ids::{MessageId, TermId, UserId};
pub use message::{ChatMessage, Sender};
pub use session::{ChatSession, derive_title, new_session_id};

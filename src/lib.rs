//! Headless client core for the Cadenza music-recommendation chat assistant.
//!
//! All intelligence lives behind an external Backend-for-Frontend (BFF); this
//! crate owns the active session state, the gateway and store clients, the
//! local `SQLite` cache, excluded-term redaction, and authentication.

// No unsafe, and every public item documented.
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(non_upper_case_globals)]
#![deny(nonstandard_style)]
#![forbid(unsafe_op_in_unsafe_fn)]
// Clippy discipline: no panicking shortcuts in library code.
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// Chat client: session engine, gateway, stores, terms, and auth.
pub mod chat;
/// Tracing initialization.
pub mod telemetry;

pub use chat::{
    AgentConfig, AnswerGateway, AskReply, AskRequest, AuthClient, AuthState, AuthUser, ChatEngine,
    ChatError, ChatMessage, ChatResult, ChatSession, ConversationCache, ConversationStore,
    ConversationSummary, EngineDeps, ExchangePhase, ExcludedTerm, ListFilters,
    RemoteConversationStore, SendOutcome, Sender, SessionSnapshot, TermCategory, TermService,
    UserId,
};
pub use telemetry::init_tracing;

//! Session lifecycle engine and the time-sliced answer reveal.

pub mod core;
pub mod reveal;

pub use self::core::{
    APOLOGY_MESSAGE, ChatEngine, EngineDeps, ExchangePhase, SendOutcome, SessionSnapshot,
    WELCOME_MESSAGE,
};

//! Excluded-terms subsystem: models, validation, redaction, and storage.

pub mod filter;
pub mod model;
pub mod service;
pub mod store;

pub use filter::{FilteredText, MatchReport, validate_term};
pub use model::{ExcludedTerm, TermCategory};
pub use service::TermService;
pub use store::SqliteTermStore;

//! Content history services.
//!
//! [`ContentHistory`] is the entry point collaborators call: record versions
//! and revisions, query history, compare two versions, restore an earlier
//! version and verify a stored chain. Every component is generic over the
//! [`scribe_db::Ledger`] backend.

pub mod comparison;
pub mod config;
pub mod query;
pub mod restore;
pub mod retry;
pub mod revision_store;
pub mod service;
pub mod version_store;

pub use config::HistoryConfig;
pub use query::HistoryPage;
pub use restore::RestoreRequest;
pub use service::ContentHistory;

//! Row structs and create DTOs for the ledger tables.

pub mod content_revision;
pub mod content_version;

//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! any Postgres executor (a pool, a connection, or an open transaction) as the
//! first argument.

pub mod content_revision_repo;
pub mod content_version_repo;

pub use content_revision_repo::ContentRevisionRepo;
pub use content_version_repo::ContentVersionRepo;

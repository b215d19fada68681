//! Pure domain logic for the content versioning engine.
//!
//! Nothing in this crate touches storage or the network, so it can be shared
//! by the persistence layer, the service layer and any tooling.

pub mod chain;
pub mod comparison;
pub mod diff;
pub mod entity;
pub mod error;
pub mod history;
pub mod line_diff;
pub mod types;
pub mod validation;

use crate::entity::EntityRef;
use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Version {version_number} not found for {entity}")]
    VersionNotFound {
        entity: EntityRef,
        version_number: i32,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Conflicting write: {0}")]
    ConflictingWrite(String),

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the failed operation may be retried as-is.
    ///
    /// Only a lost append race qualifies; every other kind is surfaced to the
    /// caller unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConflictingWrite(_))
    }

    /// Whether the error reports a missing entity or version.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::VersionNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicting_write_is_retryable() {
        assert!(CoreError::ConflictingWrite("race".into()).is_retryable());
        assert!(!CoreError::InvalidSnapshot("array".into()).is_retryable());
        assert!(!CoreError::TransactionAborted("boom".into()).is_retryable());
        assert!(!CoreError::Validation("bad".into()).is_retryable());
    }

    #[test]
    fn version_not_found_names_entity() {
        let err = CoreError::VersionNotFound {
            entity: EntityRef::document(7),
            version_number: 3,
        };
        assert_eq!(err.to_string(), "Version 3 not found for document:7");
        assert!(err.is_not_found());
    }
}

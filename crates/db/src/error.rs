use scribe_core::error::CoreError;

/// Error type for ledger operations.
///
/// Wraps [`CoreError`] for domain failures and carries raw sqlx errors for
/// everything the database reports that has no domain meaning.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A domain-level error from `scribe_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience alias for ledger return values.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// PostgreSQL unique constraint violation.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL serialization failure.
const PG_SERIALIZATION_FAILURE: &str = "40001";

impl LedgerError {
    /// Whether the error is a lost append race that may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Core(core) if core.is_retryable())
    }

    /// The domain error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            Self::Core(core) => Some(core),
            Self::Database(_) => None,
        }
    }

    /// Flatten into a [`CoreError`], keeping database details as text.
    pub fn into_core(self) -> CoreError {
        match self {
            Self::Core(core) => core,
            Self::Database(err) => CoreError::Internal(err.to_string()),
        }
    }
}

/// Classify an error raised while writing to the chain.
///
/// Unique violations on the chain constraints and serialization failures
/// mean another writer got there first; they become
/// [`CoreError::ConflictingWrite`]. Everything else is passed through.
pub fn classify_write_error(err: sqlx::Error) -> LedgerError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some(PG_UNIQUE_VIOLATION) => {
                let constraint = db_err.constraint().unwrap_or("unknown");
                tracing::debug!(constraint, "Unique violation classified as conflicting write");
                return LedgerError::Core(CoreError::ConflictingWrite(format!(
                    "concurrent append violated {constraint}"
                )));
            }
            Some(PG_SERIALIZATION_FAILURE) => {
                tracing::debug!("Serialization failure classified as conflicting write");
                return LedgerError::Core(CoreError::ConflictingWrite(
                    "serialization failure during append".into(),
                ));
            }
            _ => {}
        }
    }
    LedgerError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_retryable() {
        let err = LedgerError::from(CoreError::ConflictingWrite("race".into()));
        assert!(err.is_retryable());
        assert!(!LedgerError::from(sqlx::Error::RowNotFound).is_retryable());
    }

    #[test]
    fn database_errors_flatten_to_internal() {
        let core = LedgerError::from(sqlx::Error::RowNotFound).into_core();
        assert!(matches!(core, CoreError::Internal(_)));
    }

    #[test]
    fn non_database_errors_pass_through_classification() {
        let err = classify_write_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, LedgerError::Database(sqlx::Error::PoolTimedOut)));
    }
}

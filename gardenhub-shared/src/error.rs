/// Domain error type shared by all services
///
/// Services return `DomainResult<T>`; the API layer maps each variant onto an
/// HTTP status (see `gardenhub_api::error`).
///
/// # Taxonomy
///
/// - `Validation`: malformed client input (422)
/// - `Forbidden`: caller may not perform the action (403)
/// - `NotFound`: referenced entity missing (404)
/// - `Conflict`: duplicates (membership, report) (409)
/// - `InvalidTransition`: status change not allowed from the current state (409)
/// - `External`: a third-party dependency failed (502)
/// - `Store`: persistence failure

use crate::store::StoreError;

/// Result alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Client input failed validation
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Caller lacks permission
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate or conflicting state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Status transition not permitted
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// External dependency failure
    #[error("External service error: {0}")]
    External(String),

    /// Persistence layer failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Shorthand for a validation error on a single field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Unique violations become `Conflict`; other store failures pass through
    pub fn conflict_or_store(err: StoreError, message: impl Into<String>) -> Self {
        match err {
            StoreError::Conflict(_) => DomainError::Conflict(message.into()),
            other => DomainError::Store(other),
        }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Store(StoreError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = DomainError::validation("reason", "must not be empty");
        assert_eq!(err.to_string(), "Invalid reason: must not be empty");
    }

    #[test]
    fn test_not_found_display() {
        let err = DomainError::NotFound("Garden".to_string());
        assert_eq!(err.to_string(), "Garden not found");
    }

    #[test]
    fn test_conflict_or_store() {
        let err = DomainError::conflict_or_store(StoreError::Conflict("k".into()), "already a member");
        assert_eq!(err.to_string(), "Conflict: already a member");

        let err = DomainError::conflict_or_store(StoreError::MissingReference("fk".into()), "x");
        assert!(matches!(err, DomainError::Store(StoreError::MissingReference(_))));
    }

    #[test]
    fn test_store_conflict_passes_through() {
        let err: DomainError = StoreError::Conflict("user_badges".to_string()).into();
        assert!(matches!(err, DomainError::Store(StoreError::Conflict(_))));
    }
}

//! Common error types for Raasta

use thiserror::Error;

/// Common result type for Raasta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Raasta services
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing field, oversized text, unknown enum value
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Illegal status transition or other ordering violation
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// Report does not exist or has been deactivated
    #[error("Not found: {0}")]
    NotFound(String),

    /// Acting user may not perform this operation on the target
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a field-level validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Not-found error for a report id
    pub fn report_not_found(id: impl std::fmt::Display) -> Self {
        Error::NotFound(format!("Report {} not found", id))
    }

    /// Whether this error reflects SQLite write contention rather than a real failure
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => {
                matches!(db_err.code().as_deref(), Some("5") | Some("6"))
                    || db_err.message().contains("database is locked")
            }
            Error::Database(other) => other.to_string().contains("database is locked"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_names_field() {
        let err = Error::validation("description", "cannot be empty");
        assert_eq!(err.to_string(), "Invalid description: cannot be empty");
    }

    #[test]
    fn test_domain_errors_are_not_lock_contention() {
        assert!(!Error::report_not_found("abc").is_lock_contention());
        assert!(!Error::StateConflict("x".into()).is_lock_contention());
        assert!(!Error::Internal("database is locked".into()).is_lock_contention());
    }
}

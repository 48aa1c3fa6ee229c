//! Core error types for strata.
//!
//! [`StrataError`] covers the whole diff-and-apply pipeline: problems found in
//! the declared models before any SQL exists, problems rendering an operation
//! for a dialect, and failures while a migration script runs against a live
//! database.

use thiserror::Error;

/// The primary error type for strata.
///
/// The first group of variants is raised during the pure phase (model loading,
/// comparison, ordering) and is always produced before any statement reaches
/// the database. See [`StrataError::is_fatal_before_sql`].
#[derive(Error, Debug)]
pub enum StrataError {
    // ── Pure-phase errors ────────────────────────────────────────────

    /// Two declared tables share a column-name set or a type signature,
    /// or a relation points at a model that was never declared.
    #[error("Model integrity error: {0}")]
    ModelIntegrity(String),

    /// A structural rename/merge match found more than one candidate table.
    #[error("Ambiguous diff: {0}")]
    DiffAmbiguity(String),

    /// Tables about to be created reference each other in a cycle.
    #[error("Foreign key cycle between tables: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    /// A table or column violates a structural invariant.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    // ── Rendering ────────────────────────────────────────────────────

    /// A dialect cannot express the requested operation.
    #[error("{dialect} cannot render operation: {operation}")]
    UnsupportedOperation {
        /// The dialect asked to render the operation.
        dialect: String,
        /// A description of the operation.
        operation: String,
    },

    /// A generated forward or reverse script contains no operations.
    #[error("Empty {0} script: nothing to migrate")]
    EmptyScript(String),

    // ── Execution ────────────────────────────────────────────────────

    /// A statement failed while a migration script was running. The
    /// surrounding transaction has already been rolled back.
    #[error("Statement failed ({code:?}): {message}\n  statement: {statement}")]
    StatementExecution {
        /// The statement text that failed.
        statement: String,
        /// The driver's error code, if it reported one.
        code: Option<i64>,
        /// The driver's error message.
        message: String,
    },

    /// A driver error outside of a migration script.
    #[error("Database error ({code:?}): {message}")]
    Database {
        /// The driver's error code, if it reported one.
        code: Option<i64>,
        /// The driver's error message.
        message: String,
    },

    /// A named migration does not exist in the history.
    #[error("Migration not found: {0}")]
    MigrationNotFound(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An artifact or models file could not be (de)serialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StrataError {
    /// Creates a [`StrataError::Database`] with no error code.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            code: None,
            message: message.into(),
        }
    }

    /// Returns `true` for errors raised before any SQL is emitted.
    pub const fn is_fatal_before_sql(&self) -> bool {
        matches!(
            self,
            Self::ModelIntegrity(_)
                | Self::DiffAmbiguity(_)
                | Self::CycleDetected(_)
                | Self::InvalidSchema(_)
        )
    }

    /// Returns the driver error code carried by this error, if any.
    pub const fn code(&self) -> Option<i64> {
        match self {
            Self::StatementExecution { code, .. } | Self::Database { code, .. } => *code,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StrataError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// A convenience type alias for `Result<T, StrataError>`.
pub type StrataResult<T> = Result<T, StrataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_phase_errors() {
        assert!(StrataError::ModelIntegrity("x".into()).is_fatal_before_sql());
        assert!(StrataError::DiffAmbiguity("x".into()).is_fatal_before_sql());
        assert!(StrataError::CycleDetected(vec!["a".into()]).is_fatal_before_sql());
        assert!(StrataError::InvalidSchema("x".into()).is_fatal_before_sql());
        assert!(!StrataError::EmptyScript("forward".into()).is_fatal_before_sql());
        assert!(!StrataError::database("boom").is_fatal_before_sql());
    }

    #[test]
    fn test_cycle_display() {
        let err = StrataError::CycleDetected(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "Foreign key cycle between tables: a -> b -> a");
    }

    #[test]
    fn test_statement_execution_display_includes_statement() {
        let err = StrataError::StatementExecution {
            statement: "DROP TABLE users".into(),
            code: Some(1051),
            message: "Unknown table".into(),
        };
        let text = err.to_string();
        assert!(text.contains("DROP TABLE users"));
        assert!(text.contains("Unknown table"));
        assert_eq!(err.code(), Some(1051));
    }

    #[test]
    fn test_unsupported_operation_display() {
        let err = StrataError::UnsupportedOperation {
            dialect: "sqlite".into(),
            operation: "raw".into(),
        };
        assert_eq!(err.to_string(), "sqlite cannot render operation: raw");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: StrataError = io_err.into();
        assert!(matches!(err, StrataError::IoError(_)));
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err: StrataError = json_err.into();
        assert!(matches!(err, StrataError::SerializationError(_)));
    }
}

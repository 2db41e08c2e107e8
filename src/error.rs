//! Error taxonomy shared by every MedQuiz operation

use thiserror::Error;

/// Unified error type for catalog, import, progress and user operations
#[derive(Debug, Error)]
pub enum QuizError {
    /// Referenced quiz or user does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Malformed attempt submission, settings update or import row
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Import source has no entry in the topic table
    #[error("No topic mapping for source '{0}'")]
    MappingMissing(String),

    /// A single row of an import source could not be turned into a question.
    ///
    /// `row` counts data rows from 1; the header line is not included.
    #[error("Data row {row}: {reason}")]
    ImportRow { row: usize, reason: String },

    /// Uniqueness or reference conflicts reported back for correction
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Access denied: trial expired and account is not paid")]
    AccessDenied,

    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type QuizResult<T> = Result<T, QuizError>;

impl QuizError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        QuizError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        QuizError::Validation(message.into())
    }
}

impl From<rusqlite::Error> for QuizError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => QuizError::Constraint(err.to_string()),
            _ => QuizError::Database(err),
        }
    }
}

#[cfg(feature = "python")]
impl From<QuizError> for pyo3::PyErr {
    fn from(err: QuizError) -> Self {
        use pyo3::exceptions::{PyLookupError, PyPermissionError, PyRuntimeError, PyValueError};

        match err {
            QuizError::NotFound { .. } => PyLookupError::new_err(err.to_string()),
            QuizError::Validation(_)
            | QuizError::MappingMissing(_)
            | QuizError::ImportRow { .. }
            | QuizError::Constraint(_) => PyValueError::new_err(err.to_string()),
            QuizError::AccessDenied => PyPermissionError::new_err(err.to_string()),
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

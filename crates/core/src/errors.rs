use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum HalaqaError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HalaqaError {
    /// Shorthand for a validation failure on a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push(field, message);
        HalaqaError::Validation(errors)
    }

    /// The generic denial used everywhere a caller is not allowed to act.
    pub fn forbidden() -> Self {
        HalaqaError::Authorization("You are not allowed to perform this action".to_string())
    }
}

impl From<ValidationErrors> for HalaqaError {
    fn from(errors: ValidationErrors) -> Self {
        HalaqaError::Validation(errors)
    }
}

pub type HalaqaResult<T> = Result<T, HalaqaError>;

use thiserror::Error;

use super::planning::PlanningValidationError;
use super::staging::StagingError;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain entity `{entity}` not found")]
    NotFound { entity: &'static str },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
    #[error("domain invariant violated: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }
}

impl From<PlanningValidationError> for DomainError {
    fn from(error: PlanningValidationError) -> Self {
        Self::validation(error.to_string())
    }
}

impl From<StagingError> for DomainError {
    fn from(error: StagingError) -> Self {
        match error {
            StagingError::IndexOutOfRange { .. } => Self::not_found("staged planning entry"),
            other => Self::invariant(other.to_string()),
        }
    }
}

//! Error types for the SVIP services.

use thiserror::Error;

use crate::validation::ValidationError;

/// Request-level errors surfaced by the SVIP services.
#[derive(Error, Debug)]
pub enum Error {
    /// Body could not be decoded
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Body decoded but failed validation
    #[error("{} invalid field(s)", .0.messages().len())]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) | Self::Validation(_) => 400,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Validation(_) => "INVALID_REQUEST",
        }
    }

    /// One message per offending field; empty for non-validation errors.
    pub fn details(&self) -> Vec<String> {
        match self {
            Self::Validation(err) => err.messages(),
            Self::InvalidInput(_) => Vec::new(),
        }
    }
}

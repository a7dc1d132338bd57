use thiserror::Error;

use crate::anthropic::AnthropicError;

#[derive(Debug, Error)]
pub enum VerdictError {
    #[error("Invalid evaluation request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),
}

/// Rejections raised synchronously at intake, before a job exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be a non-empty string")]
    EmptyField { field: &'static str },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        field: &'static str,
        min: f64,
        value: f64,
    },

    #[error("minPoints ({min}) must not exceed maxPoints ({max})")]
    InvertedRange { min: f64, max: f64 },

    #[error("repetitions must be between 1 and {max}, got {value}")]
    Repetitions { value: u32, max: u32 },
}

/// Failures of a single logical oracle call.
///
/// `Transport` and `Malformed` are attempt-level and are absorbed by the
/// invoker's retry loop. Only `RetriesExhausted` escapes it.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed oracle response: {0}")]
    Malformed(String),

    #[error("oracle call failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<OracleError>,
    },
}

impl OracleError {
    /// Short label used in logs to tell attempt failures apart.
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::Transport(_) => "transport",
            OracleError::Malformed(_) => "malformed",
            OracleError::RetriesExhausted { .. } => "exhausted",
        }
    }
}

impl From<AnthropicError> for OracleError {
    fn from(err: AnthropicError) -> Self {
        OracleError::Transport(err.to_string())
    }
}

/// Job store failures. Anything the database itself reports, such as a
/// locked or unreadable file or a failed write, surfaces as `Unavailable`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job store unavailable: {0}")]
    Unavailable(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("job {id} is {state}, expected ACTIVE")]
    NotActive { id: String, state: String },

    #[error("corrupt job record: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

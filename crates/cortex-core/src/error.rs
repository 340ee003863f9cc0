//! The crate-wide error vocabulary for the cognitive pipeline.
//!
//! Variant names are the error *kinds* the pipeline's propagation policy
//! talks about, not implementation details. Everything below Execution is
//! recovered in place by its owning component (see each crate's module docs);
//! this type is for errors that legitimately cross a crate boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CortexError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("state error: {0}")]
    State(String),

    #[error("memory access error: {0}")]
    MemoryAccess(String),

    #[error("handler '{handler}' timed out after {timeout_ms}ms")]
    HandlerTimeout { handler: String, timeout_ms: u64 },

    #[error("handler '{handler}' failed: {message}")]
    Handler { handler: String, message: String },

    #[error("knowledge synthesis refused: {0}")]
    SynthesisRefused(String),

    #[error("understanding could not resolve a confident interpretation")]
    GuessNotAllowed,

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("llm provider error: {0}")]
    LlmProvider(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation timed out")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(String),
}

impl CortexError {
    /// Stable machine-readable code for audit records and error responses.
    /// Never renamed across releases — downstream log processors key on it.
    pub fn code(&self) -> &'static str {
        match self {
            CortexError::Configuration(_) => "configuration_error",
            CortexError::State(_) => "state_error",
            CortexError::MemoryAccess(_) => "memory_access_error",
            CortexError::HandlerTimeout { .. } => "handler_timeout",
            CortexError::Handler { .. } => "handler_error",
            CortexError::SynthesisRefused(_) => "synthesis_refused",
            CortexError::GuessNotAllowed => "guess_not_allowed",
            CortexError::UserNotFound(_) => "user_not_found",
            CortexError::PermissionDenied(_) => "permission_denied",
            CortexError::Database(_) => "database_error",
            CortexError::LlmProvider(_) => "llm_provider_error",
            CortexError::Serialization(_) => "serialization_error",
            CortexError::Io(_) => "io_error",
            CortexError::Timeout => "timeout",
            CortexError::Internal(_) => "internal_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, CortexError>;

use thiserror::Error;

/// All user-layer errors. Kept separate from `cortex_core::CortexError` so
/// the pipeline can map them to the right propagation policy without
/// coupling layers.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Raised when daily token quota is exceeded — caller decides whether to
    /// hard-block or queue the request for admin approval.
    #[error("Budget exceeded: used {used}, limit {limit}")]
    BudgetExceeded { used: u64, limit: u64 },
}

impl From<UserError> for cortex_core::CortexError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::NotFound(id) => cortex_core::CortexError::UserNotFound(id),
            UserError::PermissionDenied(reason) => cortex_core::CortexError::PermissionDenied(reason),
            UserError::DatabaseError(err) => cortex_core::CortexError::Database(err.to_string()),
            other => cortex_core::CortexError::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, UserError>;

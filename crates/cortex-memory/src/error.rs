use thiserror::Error;

/// Error kinds returned by a single Memory Access sub-query.
///
/// No caller outside this crate ever sees these directly — `get_all_context`
/// (and every individual accessor, when invoked from the pipeline) folds an
/// `Err` into an empty result and logs only the `Display` form of the error,
/// never the message content that triggered it.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("memory not found: {category}/{key}")]
    NotFound { category: String, key: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("sub-query exceeded its budget after {ms}ms")]
    Timeout { ms: u64 },

    #[error("background task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

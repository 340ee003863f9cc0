use thiserror::Error;

/// Error kinds for the Knowledge Retrieval + Synthesis pipeline.
///
/// A zero-hit query is not represented here — it is a successful
/// `KnowledgeAnswer { answer_refused: true, .. }`, not an `Err`. These
/// variants are genuine failures: the embedding call failed, the vector
/// store is unreachable, or synthesis itself errored.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("embedding request failed: {0}")]
    Embedding(#[from] reqwest::Error),

    #[error("embedding response malformed: {0}")]
    EmbeddingResponse(String),

    #[error("vector store error: {0}")]
    VectorStore(String),

    #[error("synthesis error: {0}")]
    Synthesis(String),

    #[error("vector query exceeded its budget after {ms}ms")]
    Timeout { ms: u64 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KnowledgeError>;

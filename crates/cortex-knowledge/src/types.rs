//! Knowledge Retrieval + Synthesis data model.

use cortex_core::types::{Classification, KnowledgeChunk};

/// What the caller is allowed to see, computed once per query. `public` and
/// `internal` are always included — only `confidential` access is
/// conditional on department membership.
#[derive(Debug, Clone)]
pub struct AccessProfile {
    pub accessible_classifications: Vec<Classification>,
    pub accessible_department_ids: Option<Vec<String>>,
}

impl AccessProfile {
    pub fn non_confidential() -> Self {
        Self {
            accessible_classifications: vec![Classification::Public, Classification::Internal],
            accessible_department_ids: None,
        }
    }

    pub fn confidential_for_departments(department_ids: Vec<String>) -> Self {
        Self {
            accessible_classifications: vec![
                Classification::Public,
                Classification::Internal,
                Classification::Confidential,
            ],
            accessible_department_ids: Some(department_ids),
        }
    }
}

/// Vector-store-agnostic filter grammar:
/// `{field ∈ values}`, `{field = value}`, `$and[...]`, `$or[...]`.
///
/// Built once per query by [`crate::access::build_filter`] and translated to
/// a concrete backend filter by [`crate::store::to_qdrant_filter`] — keeping
/// the grammar itself free of any qdrant-specific type.
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeFilter {
    In { field: String, values: Vec<String> },
    Eq { field: String, value: String },
    And(Vec<KnowledgeFilter>),
    Or(Vec<KnowledgeFilter>),
}

/// One chunk surviving the quality/boilerplate filter, with its vector
/// similarity score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: KnowledgeChunk,
    pub score: f32,
}

/// Final result of a knowledge query.
///
/// `answer_refused` and `message` are mutually meaningful: a refusal still
/// carries a polite, well-formed `message` — the core never returns an
/// empty reply.
#[derive(Debug, Clone)]
pub struct KnowledgeAnswer {
    pub answer_refused: bool,
    pub reason: Option<String>,
    pub message: String,
    pub citations: Vec<String>,
    pub chunks_used: Vec<RetrievedChunk>,
}

impl KnowledgeAnswer {
    pub fn refused(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            answer_refused: true,
            reason: Some(reason.into()),
            message: message.into(),
            citations: Vec::new(),
            chunks_used: Vec::new(),
        }
    }
}

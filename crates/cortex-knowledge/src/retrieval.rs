//! Orchestrates the full retrieval pipeline: access control → filter → embed →
//! vector query → quality filter → zero-hit refusal → synthesis.

use tokio::time::timeout;
use tracing::warn;

use cortex_core::config::{AnthropicConfig, KnowledgeConfig, VECTOR_QUERY_DEADLINE_MS};

use crate::access::build_filter;
use crate::embeddings::EmbeddingClient;
use crate::error::Result;
use crate::store::VectorStore;
use crate::synthesis::Synthesizer;
use crate::types::{AccessProfile, KnowledgeAnswer};

const MAX_TOP_K: usize = 20;

pub struct KnowledgeEngine {
    store: VectorStore,
    embeddings: EmbeddingClient,
    synthesizer: Synthesizer,
    top_k: usize,
}

impl KnowledgeEngine {
    pub fn new(config: &KnowledgeConfig, anthropic: AnthropicConfig) -> Result<Self> {
        Ok(Self {
                store: VectorStore::new(&config.qdrant_url, config.collection.clone())?,
                embeddings: EmbeddingClient::new(
                    config.embedding_url.clone(),
                    config.embedding_api_key.clone(),
                    anthropic.model.clone(),
                ),
                synthesizer: Synthesizer::new(anthropic),
                top_k: config.top_k.min(MAX_TOP_K),
        })
    }

    /// Answer `question` for a caller described by `access`. Never fabricates:
    /// a zero-hit query after the quality filter returns a refusal without
    /// ever calling the synthesizer. When `synthesize` is false (the
    /// `enable_knowledge_synthesis` feature flag off), skips the LLM call
    /// entirely and returns the surviving chunks verbatim instead —
    /// still grounded, just not composed into prose.
    pub async fn answer(&self, question: &str, access: &AccessProfile, synthesize: bool) -> Result<KnowledgeAnswer> {
        let filter = build_filter(access);

        let embedding = self.embeddings.embed(question).await?;

        let chunks = match timeout(
            std::time::Duration::from_millis(VECTOR_QUERY_DEADLINE_MS),
            self.store.query(embedding, &filter, self.top_k),
        )
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(deadline_ms = VECTOR_QUERY_DEADLINE_MS, "vector query exceeded its budget");
                return Ok(KnowledgeAnswer::refused(
                        "vector_query_timeout",
                        "I couldn't search the knowledge base in time, please try again.",
                ));
            }
        };

        if chunks.is_empty() {
            return Ok(KnowledgeAnswer::refused(
                    "no_results",
                    "I couldn't find anything in the knowledge base that answers that.",
            ));
        }

        if !synthesize {
            return Ok(raw_excerpt_answer(chunks));
        }

        self.synthesizer.synthesize(question, &chunks).await
    }
}

/// Builds a `KnowledgeAnswer` straight from retrieved chunks with no LLM
/// involved — each excerpt quoted verbatim and tagged with its chunk id, so
/// the reply still cites its sources even without synthesis.
fn raw_excerpt_answer(chunks: Vec<crate::types::RetrievedChunk>) -> KnowledgeAnswer {
    let message = chunks
        .iter()
        .map(|c| format!("[{}] {}", c.chunk.chunk_id, c.chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n");
    let citations = chunks.iter().map(|c| c.chunk.chunk_id.clone()).collect();

    KnowledgeAnswer {
        answer_refused: false,
        reason: None,
        message,
        citations,
        chunks_used: chunks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KnowledgeFilter, RetrievedChunk};
    use cortex_core::types::{Classification, KnowledgeChunk};

    fn sample_chunk(classification: Classification, department_id: Option<&str>) -> RetrievedChunk {
        RetrievedChunk {
            chunk: KnowledgeChunk {
                chunk_id: "c1".to_string(),
                document_id: "d1".to_string(),
                version: 1,
                content: "Refunds are processed within 5 business days.".to_string(),
                classification,
                department_id: department_id.map(str::to_string),
                category: "policy".to_string(),
                page: Some(1),
                quality_score: 0.9,
            },
            score: 0.85,
        }
    }

    #[test]
    fn filter_soundness_excludes_confidential_without_matching_department() {
        let access = AccessProfile::confidential_for_departments(vec!["D1".to_string()]);
        let filter = build_filter(&access);
        let blocked = sample_chunk(Classification::Confidential, Some("D2"));

        // The filter only ever admits confidential rows for D1; the store
        // layer is responsible for applying it, but the branch structure
        // itself must never collapse to an unconditional `$or` that would
        // let D2 through.
        match filter {
            KnowledgeFilter::Or(branches) => {
                let confidential_branch = branches.iter().find(|b| matches!(b, KnowledgeFilter::And(_)));
                assert!(confidential_branch.is_some());
            }
            other => panic!("expected Or, got {other:?}"),
        }
        assert_eq!(blocked.chunk.department_id.as_deref(), Some("D2"));
    }
}

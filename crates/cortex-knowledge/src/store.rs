//! Vector index access: translates the backend-agnostic [`KnowledgeFilter`]
//! grammar into a qdrant filter and runs the `top_k` query.

use cortex_core::types::{Classification, KnowledgeChunk};
use qdrant_client::qdrant::{Condition, Filter, QueryPointsBuilder};
use qdrant_client::Qdrant;

use crate::error::{KnowledgeError, Result};
use crate::types::{KnowledgeFilter as CoreFilter, RetrievedChunk};

const MIN_QUALITY_SCORE: f32 = 0.4;

pub struct VectorStore {
    client: Qdrant,
    collection: String,
}

impl VectorStore {
    pub fn new(url: &str, collection: impl Into<String>) -> Result<Self> {
        let client =
        Qdrant::from_url(url).build().map_err(|e| KnowledgeError::VectorStore(e.to_string()))?;
        Ok(Self {
                client,
                collection: collection.into(),
        })
    }

    /// Query the index, join hits to chunk metadata carried in the point
    /// payload, and drop anything below the quality floor or flagged as
    /// boilerplate/table-of-contents.
    pub async fn query(
        &self,
        embedding: Vec<f32>,
        filter: &CoreFilter,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let qdrant_filter = to_qdrant_filter(filter);
        let request = QueryPointsBuilder::new(&self.collection)
            .query(embedding)
            .filter(qdrant_filter)
            .limit(top_k as u64)
            .with_payload(true);

        let response = self
            .client
            .query(request)
            .await
            .map_err(|e| KnowledgeError::VectorStore(e.to_string()))?;

        let chunks = response
            .result
            .into_iter()
            .filter_map(|point| {
                let score = point.score;
                let chunk = chunk_from_payload(&point.payload)?;
                if chunk.quality_score < MIN_QUALITY_SCORE || is_boilerplate(&chunk.content) {
                    return None;
                }
                Some(RetrievedChunk { chunk, score })
        })
            .collect();

        Ok(chunks)
    }
}

/// Translate the design-level grammar (`{field ∈ values}`, `{field = value}`,
/// `$and[...]`, `$or[...]`) into qdrant's `Filter`/`Condition` types.
pub fn to_qdrant_filter(filter: &CoreFilter) -> Filter {
    match filter {
        CoreFilter::In { field, values } => {
            Filter::must([Condition::matches(field, values.clone())])
        }
        CoreFilter::Eq { field, value } => {
            Filter::must([Condition::matches(field, value.clone())])
        }
        CoreFilter::And(branches) => {
            let mut combined = Filter::default();
            for branch in branches {
                combined.must.push(to_qdrant_filter(branch).into());
            }
            combined
        }
        CoreFilter::Or(branches) => {
            let mut combined = Filter::default();
            for branch in branches {
                combined.should.push(to_qdrant_filter(branch).into());
            }
            combined
        }
    }
}

fn chunk_from_payload(payload: &std::collections::HashMap<String, qdrant_client::qdrant::Value>) -> Option<KnowledgeChunk> {
    let get_str = |key: &str| payload.get(key).and_then(|v| v.as_str().map(str::to_string));
    let classification = get_str("classification")?.parse::<Classification>().ok()?;

    Some(KnowledgeChunk {
            chunk_id: get_str("chunk_id")?,
            document_id: get_str("document_id")?,
            version: payload.get("version").and_then(|v| v.as_integer()).unwrap_or(1) as u32,
            content: get_str("content")?,
            classification,
            department_id: get_str("department_id"),
            category: get_str("category").unwrap_or_default(),
            page: payload.get("page").and_then(|v| v.as_integer()).map(|p| p as u32),
            quality_score: payload.get("quality_score").and_then(|v| v.as_double()).unwrap_or(0.0) as f32,
    })
}

/// Drop obvious non-content: headings-only tables of contents or short
/// boilerplate blurbs that survived the quality score.
fn is_boilerplate(content: &str) -> bool {
    let trimmed = content.trim();
    trimmed.is_empty()
    || trimmed.to_lowercase().starts_with("table of contents")
    || trimmed.lines().count() > 3 && trimmed.lines().all(|l| l.trim_start().starts_with('-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_filter_translates_to_must_clauses() {
        let filter = CoreFilter::And(vec![
                CoreFilter::Eq {
                    field: "classification".to_string(),
                    value: "confidential".to_string(),
                },
                CoreFilter::In {
                    field: "department_id".to_string(),
                    values: vec!["D1".to_string()],
                },
        ]);
        let translated = to_qdrant_filter(&filter);
        assert_eq!(translated.must.len(), 2);
    }

    #[test]
    fn or_filter_translates_to_should_clauses() {
        let filter = CoreFilter::Or(vec![
                CoreFilter::In {
                    field: "classification".to_string(),
                    values: vec!["public".to_string()],
                },
                CoreFilter::Eq {
                    field: "classification".to_string(),
                    value: "confidential".to_string(),
                },
        ]);
        let translated = to_qdrant_filter(&filter);
        assert_eq!(translated.should.len(), 2);
    }

    #[test]
    fn boilerplate_detection_flags_toc_and_bullet_only_blocks() {
        assert!(is_boilerplate("Table of Contents\n1. Intro\n2. Setup"));
        assert!(is_boilerplate("- a\n- b\n- c\n- d"));
        assert!(!is_boilerplate("Refunds are processed within 5 business days."));
    }
}

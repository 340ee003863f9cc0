//! LLM synthesis over retrieved chunks.
//!
//! Deliberately independent of `cortex-pipeline`'s provider trait — this
//! crate sits below the pipeline in the dependency graph, so synthesis talks
//! to Anthropic directly over `reqwest` rather than sharing a trait object.

use cortex_core::config::AnthropicConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{KnowledgeError, Result};
use crate::types::{KnowledgeAnswer, RetrievedChunk};

const API_VERSION: &str = "2023-06-01";
const SYNTHESIS_MAX_TOKENS: u32 = 1024;

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<serde_json::Value>,
}

pub struct Synthesizer {
    http: reqwest::Client,
    config: AnthropicConfig,
}

impl Synthesizer {
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Synthesize a grounded answer. `chunks` is always non-empty here —
    /// the zero-hit case is handled by the caller before this is reached,
    /// so synthesis never has to special-case "no evidence".
    pub async fn synthesize(&self, question: &str, chunks: &[RetrievedChunk]) -> Result<KnowledgeAnswer> {
        let system = "Answer strictly from the provided sources. Cite each source you use by its \
        chunk_id in brackets, e.g. [chunk_id]. Never state a fact that is not present \
        in the sources. If the sources do not answer the question, say so plainly.";

        let sources = chunks
            .iter()
            .map(|c| format!("[{}] {}", c.chunk.chunk_id, c.chunk.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let user_message = format!("Question: {question}\n\nSources:\n{sources}");

        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: SYNTHESIS_MAX_TOKENS,
            system,
            messages: vec![json!({"role": "user", "content": user_message})],
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: MessagesResponse = response.json().await?;
        let answer = parsed
            .content
            .into_iter()
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");

        if answer.trim().is_empty() {
            return Err(KnowledgeError::Synthesis("empty synthesis response".to_string()));
        }

        let citations = chunks
            .iter()
            .filter(|c| answer.contains(&c.chunk.chunk_id))
            .map(|c| c.chunk.chunk_id.clone())
            .collect();

        Ok(KnowledgeAnswer {
                answer_refused: false,
                reason: None,
                message: answer,
                citations,
                chunks_used: chunks.to_vec(),
        })
    }
}

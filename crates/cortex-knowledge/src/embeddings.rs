//! Embedding HTTP client.

use serde::{Deserialize, Serialize};

use crate::error::{KnowledgeError, Result};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

pub struct EmbeddingClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl EmbeddingClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
        }
    }

    /// Embed a single query. Called exactly once per knowledge query —
    /// there is no batching path because the core only ever embeds the
    /// caller's question, never whole documents (ingestion is out of scope).
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut request = self.http.post(&self.endpoint).json(&EmbeddingRequest {
                input: text,
                model: &self.model,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let body: EmbeddingResponse = response.json().await?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| KnowledgeError::EmbeddingResponse("empty embedding data array".to_string()))
    }
}

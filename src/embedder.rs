//! Embedding client: one dense vector per note.
//!
//! Calls `POST /embeddings` on the same OpenAI-compatible base URL the
//! extractor uses. Requests are deliberately single-shot (one note per call)
//! so the contract stays portable across local model backends that do not
//! support batched input.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EmbedError;
use crate::models::{EmbeddedNote, MemoryNote};

/// Seam the orchestrator calls to attach a vector to a note.
#[async_trait]
pub trait NoteEmbedder: Send + Sync {
    /// Embed the note's content, returning the note unchanged alongside its
    /// vector.
    async fn embed(&self, note: MemoryNote) -> Result<EmbeddedNote, EmbedError>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    #[allow(dead_code)]
    code: Option<serde_json::Value>,
    message: String,
}

/// HTTP client for the embeddings endpoint.
#[derive(Debug)]
pub struct EmbeddingClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl EmbeddingClient {
    /// Build a client with a bounded per-request timeout.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        if api_key.is_empty() {
            return Err(EmbedError::EmptyApiKey);
        }
        if base_url.is_empty() {
            return Err(EmbedError::EmptyBaseUrl);
        }
        if model.is_empty() {
            return Err(EmbedError::EmptyModel);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EmbedError::Request)?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let request = EmbeddingRequest {
            input: text,
            model: &self.model,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(EmbedError::Request)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EmbedError::Response(format!("failed to read body: {e}")))?;

        if !status.is_success() {
            return Err(EmbedError::Response(format!(
                "status {}: {}",
                status.as_u16(),
                snippet(&body)
            )));
        }

        parse_embedding_response(&body)
    }
}

#[async_trait]
impl NoteEmbedder for EmbeddingClient {
    async fn embed(&self, note: MemoryNote) -> Result<EmbeddedNote, EmbedError> {
        if note.content.is_empty() {
            return Err(EmbedError::EmptyText);
        }

        let embedding = self.request_embedding(&note.content).await?;
        Ok(EmbeddedNote { note, embedding })
    }
}

/// First part of a response body, for error messages.
fn snippet(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    &body[..end]
}

/// Extract `data[0].embedding` from the response body.
fn parse_embedding_response(body: &str) -> Result<Vec<f32>, EmbedError> {
    let envelope: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| EmbedError::Response(format!("malformed envelope: {e}")))?;

    if let Some(err) = envelope.error {
        return Err(EmbedError::Response(err.message));
    }

    envelope
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| EmbedError::Response("no embedding data returned".to_string()))
}

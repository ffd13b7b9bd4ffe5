//! Embedding Client
//!
//! Produces vector representations of text for the semantic memory index.
//! The HTTP implementation calls an Ollama-compatible embedding endpoint,
//! trying the current `/api/embed` format first and falling back to the
//! legacy `/api/embeddings` format.

use async_trait::async_trait;
use reqwest::Client;
use sdk::errors::EngineError;
use serde_json::{json, Value};
use std::time::Duration;

/// Source of embedding vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Get the embedding vector for a text string
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError>;
}

/// Embedding client for Ollama-compatible endpoints
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Current API: POST /api/embed { model, input } → { embeddings: [[f32...]] }
    async fn embed_current(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        let url = format!("{}/api/embed", self.base_url.trim_end_matches('/'));
        let body = json!({ "model": self.model, "input": text });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::Embedding(format!(
                "embed endpoint returned {}",
                response.status()
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;

        if let Some(first) = value["embeddings"]
            .as_array()
            .and_then(|e| e.first())
            .and_then(|e| e.as_array())
        {
            let vec = parse_f32_array(first);
            if !vec.is_empty() {
                return Ok(vec);
            }
        }

        Err(EngineError::Embedding(
            "embed response contained no vectors".into(),
        ))
    }

    /// Legacy API: POST /api/embeddings { model, prompt } → { embedding: [f32...] }
    async fn embed_legacy(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        let url = format!("{}/api/embeddings", self.base_url.trim_end_matches('/'));
        let body = json!({ "model": self.model, "prompt": text });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::Embedding(format!(
                "embeddings endpoint returned {}",
                response.status()
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;

        if let Some(embedding) = value["embedding"].as_array() {
            let vec = parse_f32_array(embedding);
            if !vec.is_empty() {
                return Ok(vec);
            }
        }

        Err(EngineError::Embedding(
            "embeddings response contained no vector".into(),
        ))
    }
}

fn parse_f32_array(values: &[Value]) -> Vec<f32> {
    values
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        match self.embed_current(text).await {
            Ok(vec) => Ok(vec),
            Err(current_err) => self.embed_legacy(text).await.map_err(|legacy_err| {
                EngineError::Embedding(format!(
                    "current API: {} | legacy API: {}",
                    current_err, legacy_err
                ))
            }),
        }
    }
}

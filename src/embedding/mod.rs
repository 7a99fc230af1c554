use crate::config::{Config, EmbeddingProvider};
use crate::llm::model_path;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Requests accepted by one `batchEmbedContents` call.
const MAX_BATCH: usize = 100;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// No usable API key is configured for a hosted provider.
    #[error("Embedding provider credentials are not configured")]
    MissingCredentials,
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied chunk of text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Hosted Gemini embeddings via `batchEmbedContents`.
pub struct GeminiEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl GeminiEmbeddingClient {
    /// Build a client from configuration.
    pub fn from_config(config: &Config) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder()
            .user_agent("lega/embedding")
            .build()
            .map_err(|error| EmbeddingClientError::GenerationFailed(error.to_string()))?;
        Ok(Self {
            http,
            base_url: config.gemini_api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key().map(str::to_string),
            model: config.embedding_model.clone(),
        })
    }

    async fn embed_batch(
        &self,
        api_key: &str,
        batch: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let model = model_path(&self.model);
        let requests: Vec<_> = batch
            .iter()
            .map(|text| {
                json!({
                    "model": format!("models/{model}"),
                    "content": { "parts": [ { "text": text } ] }
                })
            })
            .collect();

        let response = self
            .http
            .post(format!(
                "{}/v1beta/models/{model}:batchEmbedContents",
                self.base_url
            ))
            .header("x-goog-api-key", api_key)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::GenerationFailed(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(EmbeddingClientError::MissingCredentials);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "embedding API returned {status}: {body}"
            )));
        }

        let body: BatchEmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::GenerationFailed(format!("failed to decode response: {error}"))
        })?;

        if body.embeddings.len() != batch.len() {
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "expected {} embeddings, received {}",
                batch.len(),
                body.embeddings.len()
            )));
        }
        Ok(body.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for GeminiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(EmbeddingClientError::MissingCredentials)?;
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        tracing::debug!(model = %self.model, count = texts.len(), "Generating embeddings");

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            embeddings.extend(self.embed_batch(api_key, batch).await?);
        }
        Ok(embeddings)
    }
}

/// Deterministic offline embeddings: bytes hashed into slots, then L2-normalized.
pub struct HashEmbeddingClient {
    dimension: usize,
}

impl HashEmbeddingClient {
    /// Construct a client producing vectors of `dimension` components.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];
        if text.is_empty() {
            return embedding;
        }

        let lowered = text.to_lowercase();
        for (idx, byte) in lowered.bytes().enumerate() {
            embedding[idx % dimension] += f32::from(byte) / 255.0;
        }

        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|v| *v /= norm);
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }
        Ok(texts
            .iter()
            .map(|text| Self::encode(text, self.dimension))
            .collect())
    }
}

/// Build the embedding client selected by `EMBEDDING_PROVIDER`.
pub fn embedding_client_from_config(
    config: &Config,
) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
    tracing::debug!(
        provider = ?config.embedding_provider,
        model = %config.embedding_model,
        dimension = config.embedding_dimension,
        "Selecting embedding provider"
    );
    Ok(match config.embedding_provider {
        EmbeddingProvider::Gemini => Arc::new(GeminiEmbeddingClient::from_config(config)?),
        EmbeddingProvider::Hash => Arc::new(HashEmbeddingClient::new(config.embedding_dimension)),
    })
}

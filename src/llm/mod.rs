//! Client for the hosted generative-AI API.
//!
//! Every analysis task (risk review, simplification, summary, Q&A) is a single prompt sent to
//! the Gemini `generateContent` endpoint. The client issues plain HTTP requests with `reqwest`
//! and returns the concatenated text of the first candidate.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced while calling the generative-AI API.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No usable API key is configured.
    #[error("AI service credentials are not configured (set GOOGLE_API_KEY)")]
    MissingCredentials,
    /// API rejected the configured key.
    #[error("AI service rejected the credentials: {0}")]
    Unauthorized(String),
    /// API could not be reached.
    #[error("AI service unavailable: {0}")]
    ProviderUnavailable(String),
    /// API returned an error response.
    #[error("Failed to generate content: {0}")]
    GenerationFailed(String),
    /// API response could not be interpreted.
    #[error("Malformed AI service response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Whether the key is missing or was rejected by the API.
    pub fn is_credentials_error(&self) -> bool {
        matches!(self, Self::MissingCredentials | Self::Unauthorized(_))
    }
}

/// Interface implemented by text-generation backends.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Gemini REST client.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    /// Build a client from configuration; a missing key is reported on first use.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let http = Client::builder()
            .user_agent("lega/llm")
            .build()
            .map_err(|error| LlmError::ProviderUnavailable(error.to_string()))?;
        tracing::debug!(
            model = %config.chat_model,
            api_configured = config.api_key().is_some(),
            "Initialized generative AI client"
        );
        Ok(Self {
            http,
            base_url: config.gemini_api_url.clone(),
            api_key: config.api_key().map(str::to_string),
            model: config.chat_model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model_path(&self.model)
        )
    }
}

/// Strip the optional `models/` prefix so the name can be embedded in a URL path.
pub(crate) fn model_path(model: &str) -> &str {
    model.trim().trim_start_matches("models/")
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingCredentials)?;
        let payload = json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] }
            ],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                LlmError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Unauthorized(format!("{status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::GenerationFailed(format!(
                "AI service returned {status}: {body}"
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|error| {
            LlmError::InvalidResponse(format!("failed to decode response: {error}"))
        })?;

        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response has no candidates".into()))?;
        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::InvalidResponse(format!(
                "candidate carried no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> GeminiClient {
        GeminiClient {
            http: Client::builder()
                .user_agent("lega-test")
                .build()
                .expect("client"),
            base_url: server.base_url(),
            api_key: api_key.map(str::to_string),
            model: "models/gemini-1.5-flash".into(),
            temperature: 0.2,
            max_output_tokens: 256,
        }
    }

    #[tokio::test]
    async fn returns_candidate_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-1.5-flash:generateContent")
                    .header("x-goog-api-key", "test-key")
                    .body_contains("Summarize this lease");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": { "parts": [ { "text": "  A one-year " }, { "text": "lease.  " } ] },
                        "finishReason": "STOP"
                    }]
                }));
            })
            .await;

        let text = client_for(&server, Some("test-key"))
            .generate("Summarize this lease")
            .await
            .expect("generation");

        mock.assert();
        assert_eq!(text, "A one-year lease.");
    }

    #[tokio::test]
    async fn missing_key_fails_without_calling_the_api() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;

        let error = client_for(&server, None)
            .generate("anything")
            .await
            .expect_err("missing key");

        assert!(matches!(error, LlmError::MissingCredentials));
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn maps_error_statuses() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).body_contains("forbidden");
                then.status(403).body("API key not valid");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).body_contains("overloaded");
                then.status(503).body("try later");
            })
            .await;

        let client = client_for(&server, Some("bad-key"));
        let unauthorized = client.generate("forbidden").await.expect_err("403");
        assert!(matches!(unauthorized, LlmError::Unauthorized(message) if message.contains("not valid")));

        let failed = client.generate("overloaded").await.expect_err("503");
        assert!(matches!(failed, LlmError::GenerationFailed(message) if message.contains("503")));
    }

    #[tokio::test]
    async fn empty_candidates_are_invalid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({
                    "candidates": [{ "finishReason": "SAFETY" }]
                }));
            })
            .await;

        let error = client_for(&server, Some("key"))
            .generate("prompt")
            .await
            .expect_err("no text");
        assert!(matches!(error, LlmError::InvalidResponse(message) if message.contains("SAFETY")));
    }

    #[test]
    fn model_path_strips_prefix() {
        assert_eq!(model_path("models/embedding-001"), "embedding-001");
        assert_eq!(model_path("gemini-1.5-flash"), "gemini-1.5-flash");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{LlmClient, LlmError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&str) -> Result<String, LlmError> + Send + Sync>;

    /// Test double answering each prompt through a closure and recording what it was sent.
    pub(crate) struct ScriptedLlm {
        responder: Responder,
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        pub(crate) fn new(
            responder: impl Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn replying(text: &str) -> Self {
            let text = text.to_string();
            Self::new(move |_| Ok(text.clone()))
        }

        pub(crate) fn prompt_count(&self) -> usize {
            self.prompts.lock().expect("prompts lock").len()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts
                .lock()
                .expect("prompts lock")
                .push(prompt.to_string());
            (self.responder)(prompt)
        }
    }
}

//! Ollama model implementation.
//!
//! This module provides an implementation of the `Model` trait for Ollama's local API.

use async_trait::async_trait;
use emotune_abstraction::{ChatMessage, Model, ModelError, ModelParameters, ModelResponse, ModelUsage};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default Ollama server address.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Ollama model implementation.
#[derive(Debug, Clone)]
pub struct OllamaModel {
    /// The model ID (e.g., "qwen2.5:1.5b").
    model_id: String,
    /// The base URL for the Ollama API (default: "http://localhost:11434").
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl OllamaModel {
    /// Creates a new `OllamaModel` against the default local server.
    ///
    /// # Errors
    /// Returns a `ModelError` if the HTTP client cannot be created.
    pub fn new(model_id: String) -> Result<Self, ModelError> {
        Self::with_base_url(model_id, DEFAULT_OLLAMA_URL.to_string())
    }

    /// Creates a new `OllamaModel` with a custom base URL.
    ///
    /// # Errors
    /// Returns a `ModelError` if the HTTP client cannot be created.
    pub fn with_base_url(model_id: String, base_url: String) -> Result<Self, ModelError> {
        Self::with_options(model_id, base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a new `OllamaModel` with a custom base URL and per-request timeout.
    ///
    /// The timeout is the only deadline applied to an annotation call.
    ///
    /// # Errors
    /// Returns a `ModelError` if the HTTP client cannot be created.
    pub fn with_options(model_id: String, base_url: String, timeout: Duration) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::RequestError(format!("Failed to build HTTP client: {}", e)))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { model_id, base_url, client })
    }

    /// Returns the configured server address.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

// Ollama API request/response structures
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>, // max_tokens equivalent
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaError {
    error: String,
}

impl OllamaModel {
    /// Build OllamaOptions from ModelParameters
    fn build_options(parameters: Option<ModelParameters>) -> Option<OllamaOptions> {
        parameters.map(|p| OllamaOptions {
            temperature: p.temperature,
            top_p: p.top_p,
            num_predict: p.max_tokens,
            stop: p.stop_sequences,
        })
    }

    fn usage(prompt_eval_count: Option<u32>, eval_count: Option<u32>) -> ModelUsage {
        let prompt_tokens = prompt_eval_count.unwrap_or(0);
        let completion_tokens = eval_count.unwrap_or(0);
        ModelUsage { prompt_tokens, completion_tokens, total_tokens: prompt_tokens + completion_tokens }
    }

    /// POST `body` to `path` and decode a successful JSON reply.
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ModelError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            warn!(error = %e, base_url = %self.base_url, "Failed to connect to Ollama");
            if e.is_connect() {
                ModelError::RequestError(format!(
                    "Ollama server not reachable at {}. Start it with 'ollama serve'.",
                    self.base_url
                ))
            } else if e.is_timeout() {
                ModelError::RequestError(format!("Request to {} timed out", url))
            } else {
                ModelError::RequestError(format!("Network error: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = %status, error = %error_text, "Ollama API returned error status");
            return Err(self.map_status_error(status, &error_text));
        }

        response.json::<R>().await.map_err(|e| {
            warn!(error = %e, "Failed to parse Ollama API response");
            ModelError::SerializationError(format!("Failed to parse response: {}", e))
        })
    }

    fn map_status_error(&self, status: reqwest::StatusCode, error_text: &str) -> ModelError {
        let not_found = || {
            ModelError::ModelResponseError(format!(
                "Model '{}' not found. Pull it with 'ollama pull {}'.",
                self.model_id, self.model_id
            ))
        };

        if let Ok(error_json) = serde_json::from_str::<OllamaError>(error_text) {
            if error_json.error.contains("model") && error_json.error.contains("not found") {
                return not_found();
            }
            if error_json.error.contains("out of memory") || error_json.error.contains("OOM") {
                return ModelError::ModelResponseError(
                    "Insufficient memory to load model. Try a smaller variant.".to_string(),
                );
            }
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return not_found();
        }

        ModelError::ModelResponseError(format!("API error ({}): {}", status, error_text))
    }
}

#[async_trait]
impl Model for OllamaModel {
    async fn generate_text(
        &self,
        prompt: &str,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.model_id,
            prompt_len = prompt.len(),
            parameters = ?parameters,
            "OllamaModel generating text"
        );

        let request_body = OllamaGenerateRequest {
            model: &self.model_id,
            prompt,
            stream: false,
            options: Self::build_options(parameters),
        };

        let reply: OllamaGenerateResponse = self.post_json("/api/generate", &request_body).await?;

        Ok(ModelResponse {
            content: reply.response,
            model_id: Some(self.model_id.clone()),
            usage: Some(Self::usage(reply.prompt_eval_count, reply.eval_count)),
        })
    }

    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            parameters = ?parameters,
            "OllamaModel generating chat completion"
        );

        let request_body = OllamaChatRequest {
            model: &self.model_id,
            messages: messages
                .iter()
                .map(|m| OllamaMessage { role: m.role.clone(), content: m.content.clone() })
                .collect(),
            stream: false,
            options: Self::build_options(parameters),
        };

        let reply: OllamaChatResponse = self.post_json("/api/chat", &request_body).await?;

        Ok(ModelResponse {
            content: reply.message.content,
            model_id: Some(self.model_id.clone()),
            usage: Some(Self::usage(reply.prompt_eval_count, reply.eval_count)),
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

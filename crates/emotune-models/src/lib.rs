//! Model implementations for Emotune.
//!
//! This crate provides concrete implementations of the `Model` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Offline runs and tests
//! - **Ollama**: Local models via Ollama (no API key, local execution)

pub mod factory;
pub mod ollama;

use async_trait::async_trait;
use emotune_abstraction::{ChatMessage, Model, ModelError, ModelParameters, ModelResponse, ModelUsage};
use tracing::debug;

pub use factory::{ModelConfig, ModelFactory, ModelType};
pub use ollama::OllamaModel;

/// A mock implementation of the `Model` trait.
///
/// Replies are a deterministic function of the input so corpus runs without
/// an inference server are reproducible.
#[derive(Debug, Default)]
pub struct MockModel {
    id: String,
}

impl MockModel {
    /// Creates a new `MockModel` with the given ID.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self { id }
    }
}

#[async_trait]
impl Model for MockModel {
    async fn generate_text(
        &self,
        prompt: &str,
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.id,
            prompt_len = prompt.len(),
            parameters = ?parameters,
            "MockModel generating text"
        );

        let content = format!("Mock response from {} for a {}-word prompt.", self.id, count_tokens(prompt));
        Ok(self.respond(prompt, content))
    }

    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.id,
            message_count = messages.len(),
            parameters = ?parameters,
            "MockModel generating chat completion"
        );

        let last = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let content = format!(
            "Mock reasoning from {}: the wording of the text signals the requested emotion ({} words considered).",
            self.id,
            count_tokens(last)
        );
        Ok(self.respond(last, content))
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}

impl MockModel {
    fn respond(&self, prompt: &str, content: String) -> ModelResponse {
        let prompt_tokens = count_tokens(prompt);
        let completion_tokens = count_tokens(&content);
        ModelResponse {
            content,
            model_id: Some(self.id.clone()),
            usage: Some(ModelUsage { prompt_tokens, completion_tokens, total_tokens: prompt_tokens + completion_tokens }),
        }
    }
}

/// Count tokens in a string (simplified: word count).
fn count_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

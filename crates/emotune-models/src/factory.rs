//! Model factory for creating model instances from configuration.

use crate::{MockModel, OllamaModel};
use emotune_abstraction::{Model, ModelError};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Model type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    /// Mock model for offline runs and tests.
    Mock,
    /// Ollama local model.
    Ollama,
}

impl FromStr for ModelType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "ollama" => Ok(Self::Ollama),
            other => Err(ModelError::UnsupportedModelProvider(other.to_string())),
        }
    }
}

/// Model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// The type of model to create.
    pub model_type: ModelType,
    /// The model ID (e.g., "qwen2.5:1.5b").
    pub model_id: String,
    /// Optional base URL override.
    pub base_url: Option<String>,
    /// Optional per-request timeout override.
    pub timeout: Option<Duration>,
}

impl ModelConfig {
    /// Creates a new `ModelConfig` with the given type and model ID.
    #[must_use]
    pub fn new(model_type: ModelType, model_id: String) -> Self {
        Self { model_type, model_id, base_url: None, timeout: None }
    }

    /// Sets the base URL for this configuration.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Sets the per-request timeout for this configuration.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Factory for creating model instances.
pub struct ModelFactory;

impl ModelFactory {
    /// Creates a model instance from the given configuration.
    ///
    /// # Errors
    /// Returns a `ModelError` if the backend client cannot be built.
    pub fn create(config: ModelConfig) -> Result<Arc<dyn Model>, ModelError> {
        debug!(
            model_type = ?config.model_type,
            model_id = %config.model_id,
            "Creating model instance"
        );

        match config.model_type {
            ModelType::Mock => Ok(Arc::new(MockModel::new(config.model_id))),
            ModelType::Ollama => {
                let base_url = config.base_url.unwrap_or_else(|| crate::ollama::DEFAULT_OLLAMA_URL.to_string());
                let timeout = config.timeout.unwrap_or(crate::ollama::DEFAULT_REQUEST_TIMEOUT);
                Ok(Arc::new(OllamaModel::with_options(config.model_id, base_url, timeout)?))
            }
        }
    }

    /// Creates a model from an engine name such as `"ollama"` or `"mock"`.
    ///
    /// # Errors
    /// Returns `ModelError::UnsupportedModelProvider` for unknown engines.
    pub fn create_from_str(engine: &str, model_id: String) -> Result<Arc<dyn Model>, ModelError> {
        let model_type = engine.parse::<ModelType>()?;
        Self::create(ModelConfig::new(model_type, model_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_from_str() {
        assert_eq!("mock".parse::<ModelType>().unwrap(), ModelType::Mock);
        assert_eq!("Ollama".parse::<ModelType>().unwrap(), ModelType::Ollama);
        assert!(matches!(
            "gemini".parse::<ModelType>(),
            Err(ModelError::UnsupportedModelProvider(_))
        ));
    }

    #[test]
    fn test_create_mock_model() {
        let model = ModelFactory::create_from_str("mock", "mock-annotator".to_string()).unwrap();
        assert_eq!(model.model_id(), "mock-annotator");
    }

    #[test]
    fn test_create_ollama_model_with_overrides() {
        let config = ModelConfig::new(ModelType::Ollama, "qwen2.5:1.5b".to_string())
            .with_base_url("http://127.0.0.1:9".to_string())
            .with_timeout(Duration::from_secs(5));
        let model = ModelFactory::create(config).unwrap();
        assert_eq!(model.model_id(), "qwen2.5:1.5b");
    }
}

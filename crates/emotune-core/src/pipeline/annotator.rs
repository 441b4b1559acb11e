//! Reasoning generation for a single example.

use emotune_abstraction::{ChatMessage, Model, ModelParameters};
use emotune_training::Category;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_FALLBACK_TEMPLATE: &str = "The text conveys {emotion}.";

/// A one-sentence justification and whether it came from the fallback template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reasoning {
    pub text: String,
    pub fallback: bool,
}

/// Asks a text-generation model why a text conveys its gold emotion.
///
/// Never fails: any model error, or an empty reply, yields the fallback
/// sentence instead. Each call issues exactly one request.
pub struct Annotator {
    model: Arc<dyn Model>,
    fallback_template: String,
    parameters: Option<ModelParameters>,
}

impl Annotator {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model, fallback_template: DEFAULT_FALLBACK_TEMPLATE.to_string(), parameters: None }
    }

    /// `{emotion}` in the template is replaced by the lower-case category name.
    #[must_use]
    pub fn with_fallback_template(mut self, template: impl Into<String>) -> Self {
        self.fallback_template = template.into();
        self
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: ModelParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub fn prompt(text: &str, category: Category) -> String {
        format!(
            "Analyze the text and explain in ONE concise sentence why it conveys '{category}'. Text: \"{text}\"\nReasoning:"
        )
    }

    pub fn fallback(&self, category: Category) -> String {
        self.fallback_template.replace("{emotion}", category.as_str())
    }

    pub async fn explain(&self, text: &str, category: Category) -> Reasoning {
        let messages = [ChatMessage::user(Self::prompt(text, category))];

        match self.model.generate_chat_completion(&messages, self.parameters.clone()).await {
            Ok(response) => {
                let trimmed = response.content.trim();
                if trimmed.is_empty() {
                    warn!(model_id = %self.model.model_id(), emotion = %category, "Empty reasoning, using fallback");
                    return self.fallback_reasoning(category);
                }
                Reasoning { text: trimmed.to_string(), fallback: false }
            }
            Err(e) => {
                debug!(model_id = %self.model.model_id(), emotion = %category, error = %e, "Reasoning request failed, using fallback");
                self.fallback_reasoning(category)
            }
        }
    }

    fn fallback_reasoning(&self, category: Category) -> Reasoning {
        Reasoning { text: self.fallback(category), fallback: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use emotune_abstraction::{ModelError, ModelResponse};
    use emotune_models::MockModel;
    use std::sync::Mutex;

    /// Replies with a fixed body, or fails, and records every prompt it saw.
    struct ScriptedModel {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
        parameters: Mutex<Vec<Option<ModelParameters>>>,
    }

    #[async_trait]
    impl Model for ScriptedModel {
        async fn generate_text(&self, _: &str, _: Option<ModelParameters>) -> Result<ModelResponse, ModelError> {
            Err(ModelError::Other("unused".to_string()))
        }

        async fn generate_chat_completion(
            &self,
            messages: &[ChatMessage],
            parameters: Option<ModelParameters>,
        ) -> Result<ModelResponse, ModelError> {
            self.prompts.lock().unwrap().extend(messages.iter().map(|m| m.content.clone()));
            self.parameters.lock().unwrap().push(parameters);
            match &self.reply {
                Some(reply) => Ok(ModelResponse { content: reply.clone(), model_id: None, usage: None }),
                None => Err(ModelError::RequestError("connection refused".to_string())),
            }
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }

    fn scripted(reply: Option<&str>) -> Arc<ScriptedModel> {
        Arc::new(ScriptedModel {
            reply: reply.map(str::to_string),
            prompts: Mutex::new(Vec::new()),
            parameters: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = Annotator::prompt("Thanks!", Category::Gratitude);
        assert_eq!(
            prompt,
            "Analyze the text and explain in ONE concise sentence why it conveys 'gratitude'. Text: \"Thanks!\"\nReasoning:"
        );
    }

    #[tokio::test]
    async fn test_reply_is_trimmed() {
        let model = scripted(Some("  The speaker thanks someone.\n"));
        let annotator = Annotator::new(model.clone());
        let reasoning = annotator.explain("Thanks!", Category::Gratitude).await;

        assert_eq!(reasoning, Reasoning { text: "The speaker thanks someone.".to_string(), fallback: false });
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sampling_parameters_reach_the_model() {
        let model = scripted(Some("Fine."));
        let params = ModelParameters { temperature: Some(0.1), top_p: None, max_tokens: Some(48), stop_sequences: None };
        Annotator::new(model.clone()).with_parameters(params.clone()).explain("ok", Category::Approval).await;
        Annotator::new(model.clone()).explain("ok", Category::Approval).await;

        assert_eq!(*model.parameters.lock().unwrap(), vec![Some(params), None]);
    }

    #[tokio::test]
    async fn test_failure_uses_fallback() {
        let annotator = Annotator::new(scripted(None));
        let reasoning = annotator.explain("Thanks!", Category::Gratitude).await;
        assert!(reasoning.fallback);
        assert_eq!(reasoning.text, "The text conveys gratitude.");
    }

    #[tokio::test]
    async fn test_empty_reply_uses_fallback() {
        let annotator = Annotator::new(scripted(Some("   ")))
            .with_fallback_template("The text contains strong signals of {emotion}.");
        let reasoning = annotator.explain("ugh", Category::Annoyance).await;
        assert!(reasoning.fallback);
        assert_eq!(reasoning.text, "The text contains strong signals of annoyance.");
    }

    #[tokio::test]
    async fn test_mock_model_reasoning() {
        let annotator = Annotator::new(Arc::new(MockModel::new("mock".to_string())));
        let reasoning = annotator.explain("I love this", Category::Love).await;
        assert!(!reasoning.fallback);
        assert!(!reasoning.text.is_empty());
    }
}

use crate::error::{TrainingError, TrainingResult};
use crate::labels::{Category, Polarity};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Instruction shared by every emitted example.
pub const INSTRUCTION: &str =
    "Analyze the sentiment. Return JSON with polarity, emotion, confidence_score, and reasoning.";

/// Confidence attached to every gold label.
pub const CONFIDENCE_SCORE: f64 = 1.0;

/// Stable identifier for a corpus (content hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub String);

/// One row of the multi-label source dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExample {
    pub text: String,
    pub labels: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl RawExample {
    pub fn new(text: impl Into<String>, labels: Vec<usize>) -> Self {
        Self { text: text.into(), labels, id: None }
    }
}

/// The structured answer the fine-tuned model is taught to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmotionVerdict {
    pub polarity: Polarity,
    pub emotion: String,
    pub confidence_score: f64,
    pub reasoning: String,
}

impl EmotionVerdict {
    #[must_use]
    pub fn new(category: Category, polarity: Polarity, reasoning: String) -> Self {
        Self { polarity, emotion: category.display_name(), confidence_score: CONFIDENCE_SCORE, reasoning }
    }
}

/// One instruction-tuning record; `output` holds the JSON-encoded verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnotatedExample {
    pub instruction: String,
    pub input: String,
    pub output: String,
}

impl AnnotatedExample {
    pub fn new(input: impl Into<String>, verdict: &EmotionVerdict) -> TrainingResult<Self> {
        Ok(Self { instruction: INSTRUCTION.to_string(), input: input.into(), output: serde_json::to_string(verdict)? })
    }

    /// Decode the nested verdict.
    pub fn verdict(&self) -> TrainingResult<EmotionVerdict> {
        serde_json::from_str(&self.output)
            .map_err(|e| TrainingError::Dataset(format!("output is not a valid verdict: {e}")))
    }
}

pub fn compute_dataset_id(examples: &[AnnotatedExample]) -> TrainingResult<DatasetId> {
    let mut hasher = Sha256::new();

    for ex in examples {
        let bytes = serde_json::to_vec(ex)?;
        hasher.update(bytes);
        hasher.update(b"\n");
    }

    Ok(DatasetId(hex::encode(hasher.finalize())))
}

pub fn validate_examples(examples: &[AnnotatedExample]) -> TrainingResult<()> {
    if examples.is_empty() {
        return Err(TrainingError::Dataset("dataset must not be empty".to_string()));
    }
    for (idx, ex) in examples.iter().enumerate() {
        if ex.instruction.trim().is_empty() {
            return Err(TrainingError::Dataset(format!("example[{idx}] instruction is empty")));
        }
        if ex.input.trim().is_empty() {
            return Err(TrainingError::Dataset(format!("example[{idx}] input is empty")));
        }
        let verdict = ex.verdict().map_err(|e| TrainingError::Dataset(format!("example[{idx}]: {e}")))?;
        if verdict.reasoning.trim().is_empty() {
            return Err(TrainingError::Dataset(format!("example[{idx}] reasoning is empty")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(text: &str) -> AnnotatedExample {
        let verdict = EmotionVerdict::new(Category::Joy, Polarity::Positive, "It is happy.".to_string());
        AnnotatedExample::new(text, &verdict).unwrap()
    }

    #[test]
    fn test_output_keys_are_exact() {
        let ex = example("What a day!");
        let outer: serde_json::Value = serde_json::to_value(&ex).unwrap();
        let mut keys: Vec<_> = outer.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["input", "instruction", "output"]);

        let inner: serde_json::Value = serde_json::from_str(&ex.output).unwrap();
        let mut keys: Vec<_> = inner.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["confidence_score", "emotion", "polarity", "reasoning"]);
        assert_eq!(inner["emotion"], "Joy");
        assert_eq!(inner["polarity"], "Positive");
        assert_eq!(inner["confidence_score"], 1.0);
    }

    #[test]
    fn test_validate_examples_rejects_empty() {
        let examples: Vec<AnnotatedExample> = vec![];
        assert!(validate_examples(&examples).is_err());
    }

    #[test]
    fn test_validate_examples_rejects_bad_output() {
        let mut ex = example("fine");
        ex.output = "{\"polarity\":\"Positive\"}".to_string();
        assert!(validate_examples(&[ex]).is_err());
    }

    #[test]
    fn test_compute_dataset_id_stable_for_same_content() {
        let examples = vec![example("a"), example("b")];
        let id1 = compute_dataset_id(&examples).unwrap();
        let id2 = compute_dataset_id(&examples).unwrap();
        assert_eq!(id1, id2);
        assert_ne!(id1, compute_dataset_id(&examples[..1]).unwrap());
    }

    #[test]
    fn test_raw_example_id_is_optional() {
        let row: RawExample = serde_json::from_str(r#"{"text":"hi","labels":[27]}"#).unwrap();
        assert_eq!(row, RawExample::new("hi", vec![27]));
    }
}

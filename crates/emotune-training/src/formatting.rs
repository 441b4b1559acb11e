//! Prompt rendering for supervised fine-tuning.

use crate::dataset::AnnotatedExample;
use serde::{Deserialize, Serialize};

pub const ALPACA_PREAMBLE: &str = "Below is an instruction that describes a task, paired with an input that provides further context. Write a response that appropriately completes the request.";

/// A pre-rendered training sample, one per line of the formatted dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedSample {
    pub text: String,
}

/// Render a record in the alpaca layout, terminated by the tokenizer's EOS token.
#[must_use]
pub fn format_alpaca(example: &AnnotatedExample, eos_token: &str) -> String {
    format!(
        "{ALPACA_PREAMBLE}\n\n### Instruction:\n{}\n\n### Input:\n{}\n\n### Response:\n{}{eos_token}",
        example.instruction, example.input, example.output
    )
}

#[must_use]
pub fn format_corpus(examples: &[AnnotatedExample], eos_token: &str) -> Vec<FormattedSample> {
    examples.iter().map(|ex| FormattedSample { text: format_alpaca(ex, eos_token) }).collect()
}

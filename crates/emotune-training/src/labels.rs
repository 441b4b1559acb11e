//! The fixed emotion label set and coarse polarity classes.
//!
//! Category indices follow the GoEmotions label order; the dataset's
//! `labels` column refers to these positions.

use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the 28 fine-grained emotion labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Admiration,
    Amusement,
    Anger,
    Annoyance,
    Approval,
    Caring,
    Confusion,
    Curiosity,
    Desire,
    Disappointment,
    Disapproval,
    Disgust,
    Embarrassment,
    Excitement,
    Fear,
    Gratitude,
    Grief,
    Joy,
    Love,
    Nervousness,
    Optimism,
    Pride,
    Realization,
    Relief,
    Remorse,
    Sadness,
    Surprise,
    Neutral,
}

impl Category {
    pub const COUNT: usize = 28;

    /// All categories in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Admiration,
        Self::Amusement,
        Self::Anger,
        Self::Annoyance,
        Self::Approval,
        Self::Caring,
        Self::Confusion,
        Self::Curiosity,
        Self::Desire,
        Self::Disappointment,
        Self::Disapproval,
        Self::Disgust,
        Self::Embarrassment,
        Self::Excitement,
        Self::Fear,
        Self::Gratitude,
        Self::Grief,
        Self::Joy,
        Self::Love,
        Self::Nervousness,
        Self::Optimism,
        Self::Pride,
        Self::Realization,
        Self::Relief,
        Self::Remorse,
        Self::Sadness,
        Self::Surprise,
        Self::Neutral,
    ];

    /// Resolve a dataset label index.
    pub fn from_index(index: usize) -> TrainingResult<Self> {
        Self::ALL.get(index).copied().ok_or(TrainingError::InvalidLabel(index))
    }

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical lower-case name, as used in prompts and priority tables.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admiration => "admiration",
            Self::Amusement => "amusement",
            Self::Anger => "anger",
            Self::Annoyance => "annoyance",
            Self::Approval => "approval",
            Self::Caring => "caring",
            Self::Confusion => "confusion",
            Self::Curiosity => "curiosity",
            Self::Desire => "desire",
            Self::Disappointment => "disappointment",
            Self::Disapproval => "disapproval",
            Self::Disgust => "disgust",
            Self::Embarrassment => "embarrassment",
            Self::Excitement => "excitement",
            Self::Fear => "fear",
            Self::Gratitude => "gratitude",
            Self::Grief => "grief",
            Self::Joy => "joy",
            Self::Love => "love",
            Self::Nervousness => "nervousness",
            Self::Optimism => "optimism",
            Self::Pride => "pride",
            Self::Realization => "realization",
            Self::Relief => "relief",
            Self::Remorse => "remorse",
            Self::Sadness => "sadness",
            Self::Surprise => "surprise",
            Self::Neutral => "neutral",
        }
    }

    /// Display-cased name ("Gratitude") emitted in the training target.
    #[must_use]
    pub fn display_name(self) -> String {
        capitalize(self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| TrainingError::InvalidSpec(format!("unknown emotion category: {s}")))
    }
}

/// Coarse three-way sentiment class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Polarity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Polarity {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(TrainingError::InvalidSpec(format!("unknown polarity: {other}"))),
        }
    }
}

/// Upper-case the first character and lower-case the rest.
#[must_use]
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

//! Priority order, polarity table and the single-label reduction policy.
//!
//! A `Taxonomy` is built once at startup and shared read-only afterwards.
//! Construction is where a missing polarity entry is caught; lookups on a
//! built taxonomy cannot fail.

use crate::error::{TrainingError, TrainingResult};
use crate::labels::{Category, Polarity};
use std::collections::BTreeMap;
use tracing::debug;

/// Strongest emotions first. Names outside the label set are allowed and never match.
pub const DEFAULT_PRIORITY_ORDER: [&str; 31] = [
    // very intense
    "grief",
    "remorse",
    "love",
    "hatred",
    "fury",
    "terror",
    // strong
    "gratitude",
    "admiration",
    "pride",
    "disgust",
    "embarrassment",
    // basic
    "joy",
    "sadness",
    "anger",
    "fear",
    "excitement",
    // mild
    "annoyance",
    "disapproval",
    "disappointment",
    "confusion",
    "amusement",
    "caring",
    "approval",
    "optimism",
    "relief",
    "realization",
    "curiosity",
    "surprise",
    "desire",
    "nervousness",
    "neutral",
];

/// Built-in polarity of each category.
#[must_use]
pub const fn default_polarity(category: Category) -> Polarity {
    match category {
        Category::Admiration
        | Category::Amusement
        | Category::Approval
        | Category::Caring
        | Category::Desire
        | Category::Excitement
        | Category::Gratitude
        | Category::Joy
        | Category::Love
        | Category::Optimism
        | Category::Pride
        | Category::Relief => Polarity::Positive,
        Category::Anger
        | Category::Annoyance
        | Category::Disappointment
        | Category::Disapproval
        | Category::Disgust
        | Category::Embarrassment
        | Category::Fear
        | Category::Grief
        | Category::Nervousness
        | Category::Remorse
        | Category::Sadness => Polarity::Negative,
        Category::Confusion
        | Category::Curiosity
        | Category::Realization
        | Category::Surprise
        | Category::Neutral => Polarity::Neutral,
    }
}

/// Immutable label tables used by reduction and polarity lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    priority: Vec<String>,
    rank: [Option<usize>; Category::COUNT],
    polarity: [Polarity; Category::COUNT],
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::go_emotions()
    }
}

impl Taxonomy {
    /// The built-in GoEmotions tables.
    #[must_use]
    pub fn go_emotions() -> Self {
        let priority = DEFAULT_PRIORITY_ORDER.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        let polarity = Category::ALL.map(default_polarity);
        Self { rank: rank_table(&priority), priority, polarity }
    }

    /// Build from explicit tables.
    ///
    /// `polarity` must name every category exactly by its canonical name;
    /// a missing or unknown entry is a configuration defect.
    pub fn from_tables(priority: Vec<String>, polarity: &BTreeMap<String, Polarity>) -> TrainingResult<Self> {
        for key in polarity.keys() {
            key.parse::<Category>()?;
        }

        let mut table = [Polarity::Neutral; Category::COUNT];
        let mut missing = Vec::new();
        for category in Category::ALL {
            match lookup(polarity, category) {
                Some(p) => table[category.index()] = p,
                None => missing.push(category.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(TrainingError::InvalidSpec(format!(
                "polarity table is missing categories: {}",
                missing.join(", ")
            )));
        }

        let priority = normalize_priority(priority)?;
        Ok(Self { rank: rank_table(&priority), priority, polarity: table })
    }

    /// Start from the built-in tables and apply overrides.
    ///
    /// A replacement priority order swaps the whole list; polarity overrides
    /// replace individual entries.
    pub fn with_overrides(
        priority: Option<Vec<String>>,
        polarity_overrides: &BTreeMap<String, Polarity>,
    ) -> TrainingResult<Self> {
        let base = Self::go_emotions();
        let mut polarity: BTreeMap<String, Polarity> =
            Category::ALL.iter().map(|c| (c.as_str().to_string(), base.polarity(*c))).collect();
        for (name, value) in polarity_overrides {
            let category = name.parse::<Category>()?;
            polarity.insert(category.as_str().to_string(), *value);
        }
        let priority = priority.unwrap_or(base.priority);
        let taxonomy = Self::from_tables(priority, &polarity)?;
        debug!(
            priority_len = taxonomy.priority.len(),
            polarity_overrides = polarity_overrides.len(),
            "Built emotion taxonomy"
        );
        Ok(taxonomy)
    }

    #[must_use]
    pub fn polarity(&self, category: Category) -> Polarity {
        self.polarity[category.index()]
    }

    /// Position in the priority order; `None` ranks after every listed name.
    #[must_use]
    pub fn rank(&self, category: Category) -> Option<usize> {
        self.rank[category.index()]
    }

    #[must_use]
    pub fn priority_order(&self) -> &[String] {
        &self.priority
    }

    /// Collapse a multi-label annotation to its dominant category.
    ///
    /// Labels are stably sorted by rank with unranked categories last, and the
    /// first one wins. Any out-of-range index fails the whole call.
    pub fn reduce(&self, labels: &[usize]) -> TrainingResult<Category> {
        let mut categories = labels.iter().map(|&i| Category::from_index(i)).collect::<TrainingResult<Vec<_>>>()?;
        categories.sort_by_key(|c| self.rank(*c).unwrap_or(usize::MAX));
        categories.first().copied().ok_or(TrainingError::EmptyLabels)
    }
}

fn lookup(table: &BTreeMap<String, Polarity>, category: Category) -> Option<Polarity> {
    table
        .iter()
        .find(|(name, _)| name.trim().eq_ignore_ascii_case(category.as_str()))
        .map(|(_, p)| *p)
}

fn normalize_priority(priority: Vec<String>) -> TrainingResult<Vec<String>> {
    let priority: Vec<String> = priority.into_iter().map(|s| s.trim().to_lowercase()).collect();
    if priority.iter().any(String::is_empty) {
        return Err(TrainingError::InvalidSpec("priority order contains an empty name".to_string()));
    }
    Ok(priority)
}

fn rank_table(priority: &[String]) -> [Option<usize>; Category::COUNT] {
    Category::ALL.map(|c| priority.iter().position(|name| name == c.as_str()))
}

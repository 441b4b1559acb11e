//! Row selection policies for corpus assembly.

use crate::dataset::RawExample;
use crate::error::{TrainingError, TrainingResult};
use crate::labels::Category;
use crate::taxonomy::Taxonomy;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const DEFAULT_QUOTA: usize = 100;
pub const DEFAULT_SEED: u64 = 42;

/// Which rows of the source make it into the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Every row in source order, optionally only the first `limit`.
    Full { limit: Option<usize> },
    /// At most `quota` rows per dominant category from a seeded shuffle.
    Balanced { quota: usize, seed: u64 },
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::Balanced { quota: DEFAULT_QUOTA, seed: DEFAULT_SEED }
    }
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub examples: Vec<RawExample>,
    /// Rows looked at while selecting.
    pub scanned: usize,
    /// Bucket sizes; only known up front in balanced mode.
    pub buckets: Option<BTreeMap<Category, usize>>,
}

pub fn select(rows: Vec<RawExample>, policy: SelectionPolicy, taxonomy: &Taxonomy) -> TrainingResult<Selection> {
    match policy {
        SelectionPolicy::Full { limit } => Ok(select_full(rows, limit)),
        SelectionPolicy::Balanced { quota, seed } => select_balanced(rows, taxonomy, quota, seed),
    }
}

/// Keep rows in source order. Labels are not inspected here.
///
/// A limit of zero means no cap.
#[must_use]
pub fn select_full(mut rows: Vec<RawExample>, limit: Option<usize>) -> Selection {
    if let Some(limit) = limit.filter(|&n| n > 0) {
        if limit < rows.len() {
            debug!(limit, total = rows.len(), "Capping source rows");
            rows.truncate(limit);
        }
    }
    let scanned = rows.len();
    Selection { examples: rows, scanned, buckets: None }
}

/// Fill one bucket per category up to `quota` from a seeded shuffle.
///
/// The whole source is always scanned so rare categories get every chance to
/// fill. Buckets that stay short are kept as they are. The first invalid
/// label aborts selection.
pub fn select_balanced(
    mut rows: Vec<RawExample>,
    taxonomy: &Taxonomy,
    quota: usize,
    seed: u64,
) -> TrainingResult<Selection> {
    if quota == 0 {
        return Err(TrainingError::InvalidSpec("per-category quota must be >= 1".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    rows.shuffle(&mut rng);

    let scanned = rows.len();
    let mut buckets: [Vec<RawExample>; Category::COUNT] = std::array::from_fn(|_| Vec::new());
    for row in rows {
        let category = taxonomy.reduce(&row.labels)?;
        let bucket = &mut buckets[category.index()];
        if bucket.len() < quota {
            bucket.push(row);
        }
    }

    let mut counts = BTreeMap::new();
    let mut examples = Vec::new();
    for (category, bucket) in Category::ALL.into_iter().zip(buckets) {
        debug!(emotion = %category, selected = bucket.len(), quota, "Bucket filled");
        counts.insert(category, bucket.len());
        examples.extend(bucket);
    }

    let short = counts.values().filter(|&&n| n < quota).count();
    info!(selected = examples.len(), scanned, quota, under_quota = short, "Balanced selection complete");
    Ok(Selection { examples, scanned, buckets: Some(counts) })
}

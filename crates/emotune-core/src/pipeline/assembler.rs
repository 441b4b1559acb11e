//! End-to-end corpus preparation: select, annotate, write.

use crate::batch::{BatchError, BatchProcessor, ProgressCallback};
use crate::pipeline::annotator::Annotator;
use emotune_training::{
    AnnotatedExample, Category, EmotionVerdict, RawExample, SelectionPolicy, Taxonomy, TrainingError, select,
    write_jsonl_corpus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Summary of one `prepare` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub policy: SelectionPolicy,
    pub model_id: String,
    pub output: PathBuf,
    /// Source rows looked at during selection.
    pub scanned: usize,
    pub selected: usize,
    pub emitted: usize,
    pub failed: usize,
    /// Records whose reasoning came from the fallback template.
    pub fallbacks: usize,
    /// Emitted records per category.
    pub per_category: BTreeMap<Category, usize>,
    pub duration_ms: u64,
}

struct Annotated {
    example: AnnotatedExample,
    category: Category,
    fallback: bool,
}

/// Reduce, look up polarity, ask for reasoning and build the record.
async fn annotate_one(row: RawExample, taxonomy: &Taxonomy, annotator: &Annotator) -> Result<Annotated, String> {
    let category = taxonomy.reduce(&row.labels).map_err(|e| e.to_string())?;
    let polarity = taxonomy.polarity(category);
    let reasoning = annotator.explain(&row.text, category).await;

    let verdict = EmotionVerdict::new(category, polarity, reasoning.text);
    let example = AnnotatedExample::new(row.text, &verdict).map_err(|e| e.to_string())?;
    Ok(Annotated { example, category, fallback: reasoning.fallback })
}

/// Build an annotated corpus from `rows` and write it to `output`.
///
/// Selection errors (an invalid label while bucketing in balanced mode) abort
/// the run before any request is made. Per-record failures during annotation
/// are logged and the record is dropped. The output file is replaced once,
/// after every record has settled.
pub async fn prepare_corpus(
    rows: Vec<RawExample>,
    policy: SelectionPolicy,
    taxonomy: Arc<Taxonomy>,
    annotator: Arc<Annotator>,
    workers: usize,
    output: &Path,
    progress: Option<ProgressCallback>,
) -> PipelineResult<RunReport> {
    let start = Instant::now();
    let processor = BatchProcessor::new(workers)?;

    let selection = select(rows, policy, &taxonomy)?;
    let selected = selection.examples.len();
    info!(selected, scanned = selection.scanned, workers, model_id = %annotator.model_id(), "Annotating corpus");

    let work_taxonomy = Arc::clone(&taxonomy);
    let work_annotator = Arc::clone(&annotator);
    let result = processor
        .process_batch(
            selection.examples,
            move |row: RawExample| {
                let taxonomy = Arc::clone(&work_taxonomy);
                let annotator = Arc::clone(&work_annotator);
                async move { annotate_one(row, &taxonomy, &annotator).await }
            },
            progress,
        )
        .await;

    for failure in &result.failed {
        warn!(error = %failure, "Skipped record");
    }

    let mut per_category = BTreeMap::new();
    let mut fallbacks = 0;
    let mut examples = Vec::with_capacity(result.successful.len());
    for (_, annotated) in result.successful {
        *per_category.entry(annotated.category).or_insert(0) += 1;
        if annotated.fallback {
            fallbacks += 1;
        }
        examples.push(annotated.example);
    }

    write_jsonl_corpus(output, &examples)?;

    let report = RunReport {
        policy,
        model_id: annotator.model_id().to_string(),
        output: output.to_path_buf(),
        scanned: selection.scanned,
        selected,
        emitted: examples.len(),
        failed: result.failed.len(),
        fallbacks,
        per_category,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        emitted = report.emitted,
        failed = report.failed,
        fallbacks = report.fallbacks,
        output = %output.display(),
        "Corpus written"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotune_models::MockModel;
    use emotune_training::read_corpus;
    use tempfile::TempDir;

    fn annotator() -> Arc<Annotator> {
        Arc::new(Annotator::new(Arc::new(MockModel::new("mock".to_string()))))
    }

    #[tokio::test]
    async fn test_full_mode_skips_invalid_labels() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out").join("corpus.jsonl");
        let rows = vec![
            RawExample::new("thank you so much", vec![15]),
            RawExample::new("broken row", vec![42]),
            RawExample::new("what a day", vec![17, 27]),
        ];

        let report = prepare_corpus(
            rows,
            SelectionPolicy::Full { limit: None },
            Arc::new(Taxonomy::go_emotions()),
            annotator(),
            2,
            &output,
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.selected, 3);
        assert_eq!(report.emitted, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.per_category[&Category::Gratitude], 1);
        assert_eq!(report.per_category[&Category::Joy], 1);
        assert_eq!(read_corpus(&output).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_balanced_invalid_label_aborts_before_writing() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("corpus.jsonl");
        let rows = vec![RawExample::new("fine", vec![1]), RawExample::new("bad", vec![28])];

        let err = prepare_corpus(
            rows,
            SelectionPolicy::default(),
            Arc::new(Taxonomy::go_emotions()),
            annotator(),
            4,
            &output,
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Training(TrainingError::InvalidLabel(28))));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let temp = TempDir::new().unwrap();
        let err = prepare_corpus(
            vec![RawExample::new("fine", vec![1])],
            SelectionPolicy::Full { limit: None },
            Arc::new(Taxonomy::go_emotions()),
            annotator(),
            0,
            &temp.path().join("corpus.jsonl"),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Batch(BatchError::InvalidConfig(_))));
    }
}

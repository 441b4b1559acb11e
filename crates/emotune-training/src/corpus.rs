use crate::dataset::{AnnotatedExample, DatasetId, compute_dataset_id, validate_examples};
use crate::error::{TrainingError, TrainingResult};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write one JSON record per line, replacing whatever was at `path`.
pub fn write_jsonl_corpus(path: &Path, examples: &[AnnotatedExample]) -> TrainingResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut out = BufWriter::new(std::fs::File::create(path)?);
    for ex in examples {
        serde_json::to_writer(&mut out, ex)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Read an emitted corpus back, rejecting records whose shape drifted.
pub fn read_corpus(path: &Path) -> TrainingResult<Vec<AnnotatedExample>> {
    let contents = std::fs::read_to_string(path)?;
    let mut corpus = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let ex: AnnotatedExample = serde_json::from_str(line).map_err(|e| {
            TrainingError::Dataset(format!("failed to parse jsonl line {}: {}", idx + 1, e))
        })?;
        ex.verdict().map_err(|e| TrainingError::Dataset(format!("line {}: {}", idx + 1, e)))?;
        corpus.push(ex);
    }

    Ok(corpus)
}

/// Read, validate and fingerprint a corpus.
pub fn load_validated_corpus(path: &Path) -> TrainingResult<(Vec<AnnotatedExample>, DatasetId)> {
    let corpus = read_corpus(path)?;
    validate_examples(&corpus)?;
    let id = compute_dataset_id(&corpus)?;
    Ok((corpus, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::EmotionVerdict;
    use crate::labels::{Category, Polarity};
    use tempfile::TempDir;

    fn sample(text: &str) -> AnnotatedExample {
        let verdict = EmotionVerdict::new(Category::Grief, Polarity::Negative, "Loss is described.".to_string());
        AnnotatedExample::new(text, &verdict).unwrap()
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("corpus.jsonl");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale line\nstale line\nstale line\n").unwrap();

        write_jsonl_corpus(&path, &[sample("one")]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(!contents.contains("stale"));
    }

    #[test]
    fn test_read_corpus_rejects_extra_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("corpus.jsonl");
        std::fs::write(&path, "{\"instruction\":\"i\",\"input\":\"x\",\"output\":\"{}\",\"extra\":1}\n").unwrap();
        assert!(read_corpus(&path).is_err());
    }

    #[test]
    fn test_load_validated_corpus() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("corpus.jsonl");
        write_jsonl_corpus(&path, &[sample("one"), sample("two")]).unwrap();

        let (corpus, id) = load_validated_corpus(&path).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(id.0.len(), 64);
    }
}

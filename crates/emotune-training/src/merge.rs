//! Folding a trained adapter back into its base model.

use crate::error::{TrainingError, TrainingResult};
use crate::job::DEFAULT_BASE_MODEL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Sharding index left behind by the merge step; stale once weights are consolidated.
pub const SHARD_INDEX_FILE: &str = "model.safetensors.index.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSpec {
    pub base_model: String,
    pub adapter_dir: PathBuf,
    pub merged_dir: PathBuf,
    pub max_seq_len: u32,
    pub load_in_4bit: bool,
}

impl MergeSpec {
    #[must_use]
    pub fn new(adapter_dir: PathBuf, merged_dir: PathBuf) -> Self {
        Self {
            base_model: DEFAULT_BASE_MODEL.to_string(),
            adapter_dir,
            merged_dir,
            max_seq_len: 2048,
            load_in_4bit: false,
        }
    }

    pub fn validate(&self) -> TrainingResult<()> {
        if self.base_model.trim().is_empty() {
            return Err(TrainingError::InvalidSpec("merge base_model is required".to_string()));
        }
        if !self.adapter_dir.is_dir() {
            return Err(TrainingError::Merge(format!(
                "adapter directory does not exist: {}",
                self.adapter_dir.display()
            )));
        }
        if self.merged_dir.as_os_str().is_empty() {
            return Err(TrainingError::InvalidSpec("merged output directory is required".to_string()));
        }
        if self.load_in_4bit {
            return Err(TrainingError::InvalidSpec(
                "load_in_4bit must be false: merging requires 16-bit base weights".to_string(),
            ));
        }
        Ok(())
    }
}

/// Remove the shard index from a merged model directory.
///
/// Returns whether a file was removed.
pub fn finalize_merged_model(merged_dir: &Path) -> TrainingResult<bool> {
    let index = merged_dir.join(SHARD_INDEX_FILE);
    if !index.is_file() {
        return Ok(false);
    }
    std::fs::remove_file(&index)?;
    info!(path = %index.display(), "Removed stale shard index");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_requires_adapter_dir() {
        let temp = TempDir::new().unwrap();
        let spec = MergeSpec::new(temp.path().join("missing"), temp.path().join("merged"));
        assert!(matches!(spec.validate(), Err(TrainingError::Merge(_))));

        let spec = MergeSpec::new(temp.path().to_path_buf(), temp.path().join("merged"));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_4bit() {
        let temp = TempDir::new().unwrap();
        let mut spec = MergeSpec::new(temp.path().to_path_buf(), temp.path().join("merged"));
        spec.load_in_4bit = true;
        assert!(matches!(spec.validate(), Err(TrainingError::InvalidSpec(_))));
    }

    #[test]
    fn test_finalize_removes_index_only() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(SHARD_INDEX_FILE), "{}").unwrap();
        std::fs::write(temp.path().join("model.safetensors"), "weights").unwrap();

        assert!(finalize_merged_model(temp.path()).unwrap());
        assert!(!temp.path().join(SHARD_INDEX_FILE).exists());
        assert!(temp.path().join("model.safetensors").exists());

        assert!(!finalize_merged_model(temp.path()).unwrap());
    }
}

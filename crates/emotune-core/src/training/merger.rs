//! Merging a trained adapter into its base model via an external program.

use crate::training::command::CommandSpec;
use emotune_training::{MergeSpec, TrainingError, TrainingResult, finalize_merged_model};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub merged_dir: PathBuf,
    /// Whether the stale shard index was deleted afterwards.
    pub removed_shard_index: bool,
}

#[derive(Debug, Clone)]
pub struct ExternalMerger {
    command: CommandSpec,
}

impl ExternalMerger {
    #[must_use]
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }

    pub async fn merge(&self, spec: &MergeSpec) -> TrainingResult<MergeOutcome> {
        spec.validate()?;
        std::fs::create_dir_all(&spec.merged_dir)?;

        let vars = [
            ("base_model", spec.base_model.clone()),
            ("adapter_dir", spec.adapter_dir.display().to_string()),
            ("merged_dir", spec.merged_dir.display().to_string()),
            ("max_seq_len", spec.max_seq_len.to_string()),
        ];
        let status = self
            .command
            .run(&vars)
            .await
            .map_err(|e| TrainingError::Merge(format!("failed to launch {}: {e}", self.command.program)))?;
        if !status.success() {
            return Err(TrainingError::Merge(format!("merge command exited with {status}")));
        }

        let removed_shard_index = finalize_merged_model(&spec.merged_dir)?;
        info!(merged_dir = %spec.merged_dir.display(), removed_shard_index, "Merge complete");
        Ok(MergeOutcome { merged_dir: spec.merged_dir.clone(), removed_shard_index })
    }
}

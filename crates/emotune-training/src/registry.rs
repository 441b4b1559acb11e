use crate::artifacts::TrainingManifest;
use crate::error::{TrainingError, TrainingResult};
use crate::job::TrainingJobId;
use crate::layout::TrainingLayout;
use std::path::{Path, PathBuf};

/// A finished fine-tuning job found on disk.
#[derive(Debug, Clone)]
pub struct TrainedAdapterEntry {
    pub job_id: TrainingJobId,
    pub adapter_dir: PathBuf,
    pub manifest: TrainingManifest,
}

/// Scan `.emotune/jobs/*/training_manifest.json`, oldest first.
///
/// Job directories without a manifest (still running or failed) are skipped.
pub fn discover_trained_adapters(workspace_root: &Path) -> TrainingResult<Vec<TrainedAdapterEntry>> {
    let layout = TrainingLayout::for_workspace_root(workspace_root);
    let mut out = Vec::new();

    let dir = match std::fs::read_dir(layout.root()) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(e.into()),
    };

    for entry in dir {
        let job_dir = entry?.path();
        let manifest_path = job_dir.join("training_manifest.json");
        if !manifest_path.is_file() {
            continue;
        }
        let manifest = TrainingManifest::read(&manifest_path)?;
        out.push(TrainedAdapterEntry {
            job_id: manifest.job_id.clone(),
            adapter_dir: manifest.adapter_dir.clone(),
            manifest,
        });
    }

    out.sort_by(|a, b| a.manifest.created_at.cmp(&b.manifest.created_at));
    Ok(out)
}

/// Resolve a job id to the adapter directory its manifest records.
pub fn resolve_adapter_dir(workspace_root: &Path, job_id: &str) -> TrainingResult<PathBuf> {
    let layout = TrainingLayout::for_workspace_root(workspace_root);
    let manifest_path = layout.job_manifest_path(&TrainingJobId(job_id.to_string()));
    if !manifest_path.is_file() {
        return Err(TrainingError::InvalidSpec(format!("trained adapter not found (missing manifest): {job_id}")));
    }
    Ok(TrainingManifest::read(&manifest_path)?.adapter_dir)
}

//! A `Trainer` that hands the optimization loop to an external program.

use crate::training::command::CommandSpec;
use async_trait::async_trait;
use chrono::Utc;
use emotune_training::{
    ArtifactKind, FormattedSample, ProgressEvent, ProgressSink, Trainer, TrainerStatus, TrainingError, TrainingJobId,
    TrainingJobSpec, TrainingLayout, TrainingManifest, TrainingResult, collect_dir_artifacts, format_corpus,
    load_validated_corpus, make_artifact,
};
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Materializes the job under the workspace layout and runs the configured
/// command against it. The command must write the adapter into `{output_dir}`.
///
/// Cancelling a job, or exceeding `resources.max_seconds`, drops the running
/// command, which kills the child process.
#[derive(Clone)]
pub struct ExternalTrainer {
    workspace_root: PathBuf,
    command: CommandSpec,
    statuses: Arc<Mutex<HashMap<String, TrainerStatus>>>,
    cancellation_tokens: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

enum CommandOutcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

impl ExternalTrainer {
    #[must_use]
    pub fn new(workspace_root: PathBuf, command: CommandSpec) -> Self {
        Self {
            workspace_root,
            command,
            statuses: Arc::new(Mutex::new(HashMap::new())),
            cancellation_tokens: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn layout(&self) -> TrainingLayout {
        TrainingLayout::for_workspace_root(&self.workspace_root)
    }

    fn set_status(&self, job_id: &TrainingJobId, status: TrainerStatus) {
        if let Ok(mut s) = self.statuses.lock() {
            s.insert(job_id.0.clone(), status);
        }
    }

    /// The job's token, created on first use so a cancel issued before `run` still applies.
    fn cancellation_token(&self, job_id: &TrainingJobId) -> CancellationToken {
        match self.cancellation_tokens.lock() {
            Ok(mut tokens) => tokens.entry(job_id.0.clone()).or_default().clone(),
            Err(_) => CancellationToken::new(),
        }
    }

    fn release_token(&self, job_id: &TrainingJobId) {
        if let Ok(mut tokens) = self.cancellation_tokens.lock() {
            tokens.remove(&job_id.0);
        }
    }

    async fn run_command(
        &self,
        vars: &[(&str, String)],
        deadline: Option<Duration>,
        token: &CancellationToken,
    ) -> CommandOutcome {
        let launch = self.command.run(vars);
        tokio::select! {
            biased;
            () = token.cancelled() => CommandOutcome::Cancelled,
            outcome = async {
                match deadline {
                    Some(limit) => tokio::time::timeout(limit, launch)
                        .await
                        .map_or(CommandOutcome::TimedOut(limit), CommandOutcome::Exited),
                    None => CommandOutcome::Exited(launch.await),
                }
            } => outcome,
        }
    }

    fn fail(&self, job_id: &TrainingJobId, err: TrainingError) -> TrainingError {
        error!(job_id = %job_id, error = %err, "Training job failed");
        self.set_status(job_id, TrainerStatus::Failed(err.to_string()));
        err
    }
}

fn write_formatted(path: &Path, samples: &[FormattedSample]) -> TrainingResult<()> {
    let mut out = BufWriter::new(std::fs::File::create(path)?);
    for sample in samples {
        serde_json::to_writer(&mut out, sample)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

#[async_trait]
impl Trainer for ExternalTrainer {
    fn id(&self) -> &'static str {
        "external"
    }

    async fn prepare(&self, job: &TrainingJobSpec) -> TrainingResult<()> {
        self.set_status(&job.job_id, TrainerStatus::Preparing);
        job.validate()?;
        let (corpus, dataset_id) = load_validated_corpus(&job.dataset)?;
        debug!(job_id = %job.job_id, examples = corpus.len(), dataset_id = %dataset_id.0, "Corpus validated");
        self.layout().ensure_job_dirs(&job.job_id)?;
        Ok(())
    }

    async fn run(&self, job: &TrainingJobSpec, progress: &dyn ProgressSink) -> TrainingResult<TrainingManifest> {
        let job_id = job.job_id.clone();
        job.validate().map_err(|e| self.fail(&job_id, e))?;

        progress.on_event(ProgressEvent::Started { job_id: job_id.clone() });
        self.set_status(&job_id, TrainerStatus::Preparing);

        let layout = self.layout();
        layout.ensure_job_dirs(&job_id)?;

        let (corpus, dataset_id) = load_validated_corpus(&job.dataset).map_err(|e| self.fail(&job_id, e))?;

        let spec_path = layout.job_spec_path(&job_id);
        std::fs::write(&spec_path, serde_json::to_vec_pretty(job)?)?;

        let formatted_path = layout.formatted_dataset_path(&job_id);
        write_formatted(&formatted_path, &format_corpus(&corpus, &job.hyperparams.eos_token))?;
        progress.on_event(ProgressEvent::Message {
            job_id: job_id.clone(),
            message: format!("formatted {} examples", corpus.len()),
        });

        let adapter_dir = layout.adapter_dir(&job_id);
        let vars = [
            ("job", spec_path.display().to_string()),
            ("dataset", formatted_path.display().to_string()),
            ("output_dir", adapter_dir.display().to_string()),
            ("device", job.resources.device.to_string()),
        ];

        self.set_status(&job_id, TrainerStatus::Running);
        let token = self.cancellation_token(&job_id);
        let deadline = job.resources.max_seconds.map(Duration::from_secs);
        let outcome = self.run_command(&vars, deadline, &token).await;
        self.release_token(&job_id);

        let status = match outcome {
            CommandOutcome::Exited(Ok(status)) => status,
            CommandOutcome::Exited(Err(e)) => {
                return Err(self.fail(
                    &job_id,
                    TrainingError::Trainer(format!("failed to launch {}: {e}", self.command.program)),
                ));
            }
            CommandOutcome::TimedOut(limit) => {
                return Err(self.fail(
                    &job_id,
                    TrainingError::Trainer(format!("training command exceeded {}s and was killed", limit.as_secs())),
                ));
            }
            CommandOutcome::Cancelled => {
                warn!(job_id = %job_id, "Training job cancelled");
                self.set_status(&job_id, TrainerStatus::Cancelled);
                return Err(TrainingError::Cancelled(job_id.0));
            }
        };
        if !status.success() {
            return Err(self.fail(&job_id, TrainingError::Trainer(format!("training command exited with {status}"))));
        }

        let mut artifacts = collect_dir_artifacts(&ArtifactKind::Adapter, &adapter_dir)?;
        if artifacts.is_empty() {
            return Err(self.fail(&job_id, TrainingError::Artifact("training command wrote no adapter files".to_string())));
        }
        artifacts.push(make_artifact(ArtifactKind::DatasetJsonl, formatted_path)?);
        artifacts.push(make_artifact(ArtifactKind::JobSpec, spec_path)?);

        let manifest = TrainingManifest {
            job_id: job_id.clone(),
            created_at: job.created_at,
            finished_at: Utc::now(),
            objective: job.objective.clone(),
            base_model: job.base_model.clone(),
            dataset_id,
            examples: corpus.len(),
            adapter_dir,
            artifacts,
        };
        manifest.write(&layout.job_manifest_path(&job_id))?;

        self.set_status(&job_id, TrainerStatus::Finished);
        progress.on_event(ProgressEvent::Finished { job_id });
        Ok(manifest)
    }

    async fn status(&self, job_id: &TrainingJobId) -> TrainingResult<TrainerStatus> {
        let s = self.statuses.lock().map_err(|_| TrainingError::Trainer("status lock poisoned".to_string()))?;
        Ok(s.get(&job_id.0).cloned().unwrap_or(TrainerStatus::Idle))
    }

    async fn cancel(&self, job_id: &TrainingJobId) -> TrainingResult<()> {
        self.cancellation_token(job_id).cancel();
        self.set_status(job_id, TrainerStatus::Cancelled);
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use emotune_training::{
        AnnotatedExample, Category, EmotionVerdict, ModelSpec, Polarity, StdoutProgressSink, write_jsonl_corpus,
    };
    use tempfile::TempDir;

    fn write_corpus(dir: &Path) -> PathBuf {
        let path = dir.join("corpus.jsonl");
        let verdict = EmotionVerdict::new(Category::Relief, Polarity::Positive, "Tension eases.".to_string());
        write_jsonl_corpus(&path, &[AnnotatedExample::new("phew", &verdict).unwrap()]).unwrap();
        path
    }

    fn shell(script: &str) -> CommandSpec {
        CommandSpec::new("sh", &["-c", script, "trainer", "{job}", "{dataset}", "{output_dir}"])
    }

    #[tokio::test]
    async fn test_run_writes_manifest() {
        let temp = TempDir::new().unwrap();
        let dataset = write_corpus(temp.path());
        let trainer = ExternalTrainer::new(temp.path().to_path_buf(), shell("cp \"$2\" \"$3/adapter_model.bin\""));
        let job = TrainingJobSpec::new(ModelSpec::default(), dataset);

        trainer.prepare(&job).await.unwrap();
        let manifest = trainer.run(&job, &StdoutProgressSink).await.unwrap();

        assert_eq!(manifest.examples, 1);
        assert_eq!(manifest.artifacts_of(&ArtifactKind::Adapter).count(), 1);
        let layout = trainer.layout();
        assert!(layout.job_manifest_path(&job.job_id).is_file());
        let formatted = std::fs::read_to_string(layout.formatted_dataset_path(&job.job_id)).unwrap();
        assert!(formatted.contains("### Response:"));
        assert!(formatted.contains("<|endoftext|>"));
        assert_eq!(trainer.status(&job.job_id).await.unwrap(), TrainerStatus::Finished);
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails_job() {
        let temp = TempDir::new().unwrap();
        let dataset = write_corpus(temp.path());
        let trainer = ExternalTrainer::new(temp.path().to_path_buf(), shell("exit 3"));
        let job = TrainingJobSpec::new(ModelSpec::default(), dataset);

        let err = trainer.run(&job, &StdoutProgressSink).await.unwrap_err();
        assert!(matches!(err, TrainingError::Trainer(_)));
        assert!(matches!(trainer.status(&job.job_id).await.unwrap(), TrainerStatus::Failed(_)));
        assert!(!trainer.layout().job_manifest_path(&job.job_id).exists());
    }

    #[tokio::test]
    async fn test_cancel_kills_running_command() {
        let temp = TempDir::new().unwrap();
        let dataset = write_corpus(temp.path());
        let trainer =
            ExternalTrainer::new(temp.path().to_path_buf(), shell("sleep 2; touch \"$3/adapter_model.bin\""));
        let job = TrainingJobSpec::new(ModelSpec::default(), dataset);

        let canceller = trainer.clone();
        let job_id = job.job_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            canceller.cancel(&job_id).await.unwrap();
        });

        let err = trainer.run(&job, &StdoutProgressSink).await.unwrap_err();
        assert!(matches!(err, TrainingError::Cancelled(_)));
        assert_eq!(trainer.status(&job.job_id).await.unwrap(), TrainerStatus::Cancelled);
        assert!(!trainer.layout().job_manifest_path(&job.job_id).exists());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!trainer.layout().adapter_dir(&job.job_id).join("adapter_model.bin").exists());
    }

    #[tokio::test]
    async fn test_cancel_before_run_stops_job() {
        let temp = TempDir::new().unwrap();
        let dataset = write_corpus(temp.path());
        let trainer = ExternalTrainer::new(temp.path().to_path_buf(), shell("touch \"$3/adapter_model.bin\""));
        let job = TrainingJobSpec::new(ModelSpec::default(), dataset);

        trainer.cancel(&job.job_id).await.unwrap();
        let err = trainer.run(&job, &StdoutProgressSink).await.unwrap_err();
        assert!(matches!(err, TrainingError::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_max_seconds_kills_slow_command() {
        let temp = TempDir::new().unwrap();
        let dataset = write_corpus(temp.path());
        let trainer = ExternalTrainer::new(temp.path().to_path_buf(), shell("exec sleep 5"));
        let mut job = TrainingJobSpec::new(ModelSpec::default(), dataset);
        job.resources.max_seconds = Some(1);

        let started = std::time::Instant::now();
        let err = trainer.run(&job, &StdoutProgressSink).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(err.to_string().contains("exceeded 1s"));
        assert!(matches!(trainer.status(&job.job_id).await.unwrap(), TrainerStatus::Failed(_)));
    }

    #[tokio::test]
    async fn test_device_placeholder_is_substituted() {
        let temp = TempDir::new().unwrap();
        let dataset = write_corpus(temp.path());
        let command =
            CommandSpec::new("sh", &["-c", "printf %s \"$1\" > \"$2/device.txt\"", "trainer", "{device}", "{output_dir}"]);
        let trainer = ExternalTrainer::new(temp.path().to_path_buf(), command);
        let mut job = TrainingJobSpec::new(ModelSpec::default(), dataset);
        job.resources.device = emotune_training::TrainingDevice::Cpu;

        trainer.run(&job, &StdoutProgressSink).await.unwrap();
        let device = std::fs::read_to_string(trainer.layout().adapter_dir(&job.job_id).join("device.txt")).unwrap();
        assert_eq!(device, "cpu");
    }

    #[tokio::test]
    async fn test_prepare_rejects_invalid_corpus() {
        let temp = TempDir::new().unwrap();
        let dataset = temp.path().join("bad.jsonl");
        std::fs::write(&dataset, "{\"instruction\":\"i\",\"input\":\"x\",\"output\":\"not json\"}\n").unwrap();
        let trainer = ExternalTrainer::new(temp.path().to_path_buf(), shell("true"));
        let job = TrainingJobSpec::new(ModelSpec::default(), dataset);

        assert!(trainer.prepare(&job).await.is_err());
    }
}

//! Fine-tuning command implementation.

use crate::commands::types::TrainCommand;
use anyhow::{Context, Result};
use colored::Colorize;
use emotune_core::{EmotuneConfig, ExternalTrainer};
use emotune_training::{
    ModelSpec, ProgressSink, StdoutProgressSink, Trainer, TracingProgressSink, TrainingJobSpec,
    discover_trained_adapters,
};
use serde_json::json;
use std::path::{Path, PathBuf};

pub async fn execute(command: TrainCommand, config: EmotuneConfig) -> Result<()> {
    match command {
        TrainCommand::List { workspace, json } => list_jobs(&workspace, json),
        TrainCommand::Run { dataset, base_model, workspace, epochs, max_steps, learning_rate, max_seconds, json } => {
            let mut config = config;
            if let Some(base_model) = base_model {
                config.train.base_model = base_model;
            }
            if let Some(epochs) = epochs {
                config.train.hyperparams.epochs = epochs;
            }
            if max_steps.is_some() {
                config.train.hyperparams.max_steps = max_steps;
            }
            if let Some(lr) = learning_rate {
                config.train.hyperparams.learning_rate = lr;
            }
            if max_seconds.is_some() {
                config.train.resources.max_seconds = max_seconds;
            }
            let dataset = dataset
                .or_else(|| config.train.dataset.clone())
                .unwrap_or_else(|| config.prepare.output_path());
            run_job(&config, dataset, workspace, json).await
        }
    }
}

async fn run_job(config: &EmotuneConfig, dataset: PathBuf, workspace: PathBuf, json_output: bool) -> Result<()> {
    let mut job = TrainingJobSpec::new(
        ModelSpec { engine: config.train.engine.clone(), model_id: config.train.base_model.clone() },
        dataset,
    );
    job.lora = config.train.lora.clone();
    job.hyperparams = config.train.hyperparams.clone();
    job.resources = config.train.resources.clone();

    let trainer = ExternalTrainer::new(workspace, config.train.command.clone());
    trainer
        .prepare(&job)
        .await
        .with_context(|| format!("Failed to prepare training job for {}", job.dataset.display()))?;

    // Ctrl+C cancels the job, which kills the training command.
    let canceller = trainer.clone();
    let job_id = job.job_id.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{} Cancelling training job {job_id}...", "⚠".yellow());
            let _ = canceller.cancel(&job_id).await;
        }
    });

    let sink: &dyn ProgressSink = if json_output { &TracingProgressSink } else { &StdoutProgressSink };
    let result = trainer.run(&job, sink).await;
    ctrl_c.abort();
    let manifest = result.context("Training job failed")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    println!();
    println!("{}", "Fine-tuning complete".bold().green());
    println!("  Job:      {}", manifest.job_id.0.cyan());
    println!("  Examples: {}", manifest.examples);
    println!("  Adapter:  {}", manifest.adapter_dir.display().to_string().dimmed());
    println!("  Merge:    {}", format!("emotune merge --job {}", manifest.job_id).dimmed());
    println!();
    Ok(())
}

fn list_jobs(workspace: &Path, json_output: bool) -> Result<()> {
    let entries = discover_trained_adapters(workspace).context("Failed to discover training jobs")?;

    if json_output {
        let out: Vec<_> = entries
            .into_iter()
            .map(|e| {
                json!({
                    "job_id": e.job_id.0,
                    "created_at": e.manifest.created_at,
                    "finished_at": e.manifest.finished_at,
                    "base_model": e.manifest.base_model,
                    "dataset_id": e.manifest.dataset_id.0,
                    "examples": e.manifest.examples,
                    "adapter_dir": e.adapter_dir,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Fine-tuning Jobs ({})", entries.len()).bold().cyan());
    println!();

    if entries.is_empty() {
        println!("  {}", "No finished training jobs found in this workspace.".dimmed());
        println!();
        println!("  {}", "Tip: run `emotune train run --dataset <corpus.jsonl>` to start one.".dimmed());
        return Ok(());
    }

    println!("{:<38} {:<30} {}", "Job", "Base model", "Adapter");
    println!("{}", "─".repeat(100));
    for e in entries {
        println!(
            "{:<38} {:<30} {}",
            e.job_id.0.cyan(),
            e.manifest.base_model.model_id.dimmed(),
            e.adapter_dir.display().to_string().dimmed()
        );
    }
    println!();
    Ok(())
}

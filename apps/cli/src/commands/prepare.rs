//! Corpus preparation command.

use crate::commands::types::PrepareArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use emotune_core::pipeline::{Annotator, RunReport, prepare_corpus};
use emotune_core::{BatchProgress, BatchProgressTracker, EmotuneConfig, ProgressCallback, format_duration};
use emotune_models::ModelFactory;
use emotune_training::read_source;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn apply_overrides(args: &PrepareArgs, config: &mut EmotuneConfig) {
    let prepare = &mut config.prepare;
    if let Some(mode) = args.mode {
        prepare.mode = mode.into();
    }
    if let Some(quota) = args.quota {
        prepare.quota = quota;
    }
    if let Some(seed) = args.seed {
        prepare.seed = seed;
    }
    if args.limit.is_some() {
        prepare.limit = args.limit;
    }
    if let Some(workers) = args.workers {
        prepare.workers = workers;
    }
    if args.source.is_some() {
        prepare.source.clone_from(&args.source);
    }
    if let Some(format) = args.format {
        prepare.source_format = Some(format.into());
    }
    if args.output.is_some() {
        prepare.output.clone_from(&args.output);
    }

    let inference = &mut config.inference;
    if let Some(engine) = &args.engine {
        inference.engine.clone_from(engine);
    }
    if let Some(model) = &args.model {
        inference.model.clone_from(model);
    }
    if let Some(url) = &args.ollama_url {
        inference.base_url.clone_from(url);
    }
    if let Some(timeout) = args.timeout_secs {
        inference.timeout_secs = timeout;
    }
}

fn progress_bar(hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} examples {msg}")?
            .progress_chars("#>-"),
    );
    Ok(bar)
}

pub async fn execute(args: PrepareArgs, mut config: EmotuneConfig) -> Result<()> {
    apply_overrides(&args, &mut config);
    config.validate().context("Invalid configuration")?;

    let source = config
        .prepare
        .source
        .clone()
        .context("No source dataset given. Pass --source or set prepare.source in emotune.toml")?;
    let output = config.prepare.output_path();

    let taxonomy = Arc::new(config.taxonomy.build()?);
    let rows = read_source(&source, config.prepare.source_format)
        .with_context(|| format!("Failed to read source dataset {}", source.display()))?;

    let model = ModelFactory::create(config.inference.model_config()?).context("Failed to create inference model")?;
    let mut annotator = Annotator::new(model).with_fallback_template(config.prepare.fallback_template.clone());
    if let Some(parameters) = config.inference.parameters() {
        annotator = annotator.with_parameters(parameters);
    }
    let annotator = Arc::new(annotator);

    let bar = progress_bar(args.no_progress || args.json)?;
    let callback: ProgressCallback = {
        let bar = bar.clone();
        let tracker = Mutex::new(BatchProgressTracker::new(0));
        Arc::new(move |p: BatchProgress| {
            bar.set_length(p.total as u64);
            bar.set_position(p.completed as u64);
            if let Ok(mut tracker) = tracker.lock() {
                tracker.update(&p);
                bar.set_message(progress_message(&tracker));
            }
        })
    };

    let report = prepare_corpus(
        rows,
        config.prepare.policy(),
        taxonomy,
        annotator,
        config.prepare.workers,
        &output,
        Some(callback),
    )
    .await
    .context("Corpus preparation failed")?;
    bar.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn progress_message(tracker: &BatchProgressTracker) -> String {
    let failed = if tracker.failed > 0 { format!(", {} failed", tracker.failed) } else { String::new() };
    format!(
        "({} ok{failed}, {} active, {} queued, ETA {})",
        tracker.successful,
        tracker.active,
        tracker.queued,
        tracker.calculate_eta()
    )
}

fn print_report(report: &RunReport) {
    println!();
    println!("{}", "Corpus ready".bold().green());
    println!("  Output:    {}", report.output.display().to_string().cyan());
    println!("  Model:     {}", report.model_id.dimmed());
    println!("  Scanned:   {}", report.scanned);
    println!("  Selected:  {}", report.selected);
    println!("  Emitted:   {}", report.emitted.to_string().green());
    if report.failed > 0 {
        println!("  Failed:    {}", report.failed.to_string().red());
    }
    if report.fallbacks > 0 {
        println!("  Fallbacks: {}", report.fallbacks.to_string().yellow());
    }
    println!("  Duration:  {}", format_duration(Duration::from_millis(report.duration_ms)));
    println!();

    if !report.per_category.is_empty() {
        println!("{:<16} {}", "Emotion", "Examples");
        println!("{}", "─".repeat(26));
        for (category, count) in &report.per_category {
            println!("{:<16} {}", category.display_name(), count);
        }
        println!();
    }
}

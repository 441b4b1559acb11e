//! Adapter merge command.

use crate::commands::types::MergeArgs;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use emotune_core::{EmotuneConfig, ExternalMerger};
use emotune_training::{MergeSpec, resolve_adapter_dir};

pub async fn execute(args: MergeArgs, config: EmotuneConfig) -> Result<()> {
    let adapter_dir = match (args.adapter_dir, args.job) {
        (Some(dir), _) => dir,
        (None, Some(job)) => resolve_adapter_dir(&args.workspace, &job)
            .with_context(|| format!("Failed to resolve adapter for job {job}"))?,
        (None, None) => bail!("Pass --adapter-dir or --job to choose the adapter to merge"),
    };

    let spec = MergeSpec {
        base_model: args.base_model.unwrap_or(config.merge.base_model),
        adapter_dir,
        merged_dir: args.output_dir.unwrap_or(config.merge.output_dir),
        max_seq_len: config.merge.max_seq_len,
        load_in_4bit: config.merge.load_in_4bit,
    };

    let outcome = ExternalMerger::new(config.merge.command).merge(&spec).await.context("Merge failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!();
    println!("{}", "Merge complete".bold().green());
    println!("  Base model: {}", spec.base_model.dimmed());
    println!("  Adapter:    {}", spec.adapter_dir.display().to_string().dimmed());
    println!("  Merged:     {}", outcome.merged_dir.display().to_string().cyan());
    if outcome.removed_shard_index {
        println!("  {}", "Removed stale model.safetensors.index.json".dimmed());
    }
    println!();
    Ok(())
}

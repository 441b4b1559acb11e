//! Configuration loading for the CLI.

use anyhow::{Context, Result};
use emotune_core::EmotuneConfig;
use std::path::Path;
use tracing::debug;

/// Load the layered configuration, failing on malformed files.
pub fn load_config(explicit: Option<&Path>) -> Result<EmotuneConfig> {
    let config = EmotuneConfig::discover_and_load(explicit).context("Failed to load configuration")?;
    debug!(
        engine = %config.inference.engine,
        model = %config.inference.model,
        base_url = %config.inference.base_url,
        "Configuration loaded"
    );
    Ok(config)
}

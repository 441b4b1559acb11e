//! Layered TOML configuration.
//!
//! Precedence, lowest first: built-in defaults, `~/.emotune/config.toml`,
//! `./emotune.toml`, an explicit `--config` file, `EMOTUNE_*` environment
//! variables. Command-line flags are applied on top by the binary.

use crate::training::CommandSpec;
use emotune_abstraction::ModelParameters;
use emotune_models::ollama::{DEFAULT_OLLAMA_URL, DEFAULT_REQUEST_TIMEOUT};
use emotune_models::{ModelConfig, ModelType};
use emotune_training::{
    DEFAULT_BASE_MODEL, DEFAULT_ENGINE, DEFAULT_QUOTA, DEFAULT_SEED, LoraConfig, Polarity, SelectionPolicy,
    SourceFormat, Taxonomy, TrainingHyperParams, TrainingResources,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_INFERENCE_MODEL: &str = "qwen2.5:1.5b";
pub const DEFAULT_WORKERS: usize = 4;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotuneConfig {
    pub inference: InferenceConfig,
    pub prepare: PrepareConfig,
    pub taxonomy: TaxonomyConfig,
    pub train: TrainConfig,
    pub merge: MergeConfig,
}

/// The model that writes reasoning sentences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// `ollama` or `mock`
    pub engine: String,
    pub model: String,
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Sampling options sent with each request; the backend's defaults apply when unset.
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            engine: "ollama".to_string(),
            model: DEFAULT_INFERENCE_MODEL.to_string(),
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl InferenceConfig {
    pub fn model_config(&self) -> ConfigResult<ModelConfig> {
        let model_type =
            self.engine.parse::<ModelType>().map_err(|e| ConfigError::InvalidValue(format!("inference.engine: {e}")))?;
        Ok(ModelConfig::new(model_type, self.model.clone())
            .with_base_url(self.base_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs)))
    }

    /// `None` when no sampling option is configured.
    pub fn parameters(&self) -> Option<ModelParameters> {
        if self.temperature.is_none() && self.max_tokens.is_none() {
            return None;
        }
        Some(ModelParameters {
            temperature: self.temperature,
            top_p: None,
            max_tokens: self.max_tokens,
            stop_sequences: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepareMode {
    #[default]
    Balanced,
    Full,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    pub mode: PrepareMode,
    /// Per-category cap in balanced mode.
    pub quota: usize,
    pub seed: u64,
    /// Row cap in full mode.
    pub limit: Option<usize>,
    pub workers: usize,
    pub source: Option<PathBuf>,
    pub source_format: Option<SourceFormat>,
    /// Defaults depend on the mode when unset.
    pub output: Option<PathBuf>,
    pub fallback_template: String,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            mode: PrepareMode::Balanced,
            quota: DEFAULT_QUOTA,
            seed: DEFAULT_SEED,
            limit: None,
            workers: DEFAULT_WORKERS,
            source: None,
            source_format: None,
            output: None,
            fallback_template: crate::pipeline::DEFAULT_FALLBACK_TEMPLATE.to_string(),
        }
    }
}

impl PrepareConfig {
    pub fn policy(&self) -> SelectionPolicy {
        match self.mode {
            PrepareMode::Balanced => SelectionPolicy::Balanced { quota: self.quota, seed: self.seed },
            PrepareMode::Full => SelectionPolicy::Full { limit: self.limit },
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| match self.mode {
            PrepareMode::Balanced => PathBuf::from("datasets/train_qwen_28_balanced.jsonl"),
            PrepareMode::Full => PathBuf::from("datasets/train_qwen_28_single_parallel.jsonl"),
        })
    }
}

/// Overrides for the built-in emotion tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    /// Replaces the whole priority order when set.
    pub priority: Option<Vec<String>>,
    /// Per-category polarity overrides, keyed by canonical name.
    pub polarity: BTreeMap<String, Polarity>,
}

impl TaxonomyConfig {
    pub fn build(&self) -> ConfigResult<Taxonomy> {
        Taxonomy::with_overrides(self.priority.clone(), &self.polarity)
            .map_err(|e| ConfigError::InvalidValue(format!("taxonomy: {e}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub engine: String,
    pub base_model: String,
    /// Corpus to train on; defaults to the prepare output.
    pub dataset: Option<PathBuf>,
    pub lora: LoraConfig,
    pub hyperparams: TrainingHyperParams,
    pub resources: TrainingResources,
    pub command: CommandSpec,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            base_model: DEFAULT_BASE_MODEL.to_string(),
            dataset: None,
            lora: LoraConfig::default(),
            hyperparams: TrainingHyperParams::default(),
            resources: TrainingResources::default(),
            command: CommandSpec::default_train(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub base_model: String,
    pub output_dir: PathBuf,
    pub max_seq_len: u32,
    pub load_in_4bit: bool,
    pub command: CommandSpec,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            base_model: DEFAULT_BASE_MODEL.to_string(),
            output_dir: PathBuf::from("qwen_merged_16bit"),
            max_seq_len: 2048,
            load_in_4bit: false,
            command: CommandSpec::default_merge(),
        }
    }
}

impl EmotuneConfig {
    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(".")).join(".emotune").join("config.toml")
    }

    pub fn default_local_path() -> PathBuf {
        PathBuf::from("emotune.toml")
    }

    /// Load a single TOML file on top of the defaults.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        Self::from_table(read_table(path)?)
    }

    /// Overlay `optional` files that exist, then `explicit`, which must exist.
    pub fn load_layered(optional: &[PathBuf], explicit: Option<&Path>) -> ConfigResult<Self> {
        let mut merged = toml::Table::new();
        for path in optional {
            if path.is_file() {
                debug!(path = %path.display(), "Loading config layer");
                merge_tables(&mut merged, read_table(path)?);
            }
        }
        if let Some(path) = explicit {
            merge_tables(&mut merged, read_table(path)?);
        }
        Self::from_table(merged)
    }

    /// Global, local and explicit files, then the process environment.
    pub fn discover_and_load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let mut config = Self::load_layered(&[Self::default_global_path(), Self::default_local_path()], explicit)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `EMOTUNE_*` overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        if let Some(url) = lookup("EMOTUNE_OLLAMA_URL") {
            self.inference.base_url = url;
        }
        if let Some(model) = lookup("EMOTUNE_MODEL") {
            self.inference.model = model;
        }
        if let Some(engine) = lookup("EMOTUNE_ENGINE") {
            self.inference.engine = engine;
        }
        if let Some(workers) = lookup("EMOTUNE_WORKERS") {
            self.prepare.workers = workers
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("EMOTUNE_WORKERS={workers}: {e}")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.prepare.workers == 0 {
            return Err(ConfigError::InvalidValue("prepare.workers must be at least 1".to_string()));
        }
        if self.prepare.mode == PrepareMode::Balanced && self.prepare.quota == 0 {
            return Err(ConfigError::InvalidValue("prepare.quota must be at least 1".to_string()));
        }
        if self.inference.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("inference.timeout_secs must be at least 1".to_string()));
        }
        if let Some(t) = self.inference.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::InvalidValue(format!("inference.temperature must be in [0, 2], got {t}")));
            }
        }
        if self.inference.max_tokens == Some(0) {
            return Err(ConfigError::InvalidValue("inference.max_tokens must be at least 1".to_string()));
        }
        self.train.resources.validate().map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        self.inference.model_config()?;
        self.taxonomy.build()?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(format!("Failed to serialize: {e}")))
    }

    fn from_table(table: toml::Table) -> ConfigResult<Self> {
        toml::Value::Table(table).try_into::<Self>().map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

fn read_table(path: &Path) -> ConfigResult<toml::Table> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
    toml::from_str(&content).map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Deep-merge `overlay` into `base`; nested tables merge, everything else replaces.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => merge_tables(existing, incoming),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

use crate::error::{TrainingError, TrainingResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

pub const DEFAULT_BASE_MODEL: &str = "Qwen/Qwen2.5-1.5B-Instruct";
pub const DEFAULT_ENGINE: &str = "unsloth";

/// Identifier for a training job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingJobId(pub String);

impl TrainingJobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TrainingJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrainingJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Backend-agnostic model reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Training framework identifier (e.g., "unsloth")
    pub engine: String,
    /// Model ID/name (framework-specific, usually a hub id)
    pub model_id: String,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self { engine: DEFAULT_ENGINE.to_string(), model_id: DEFAULT_BASE_MODEL.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingObjective {
    Sft,
}

/// Low-rank adapter settings handed to the training framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoraConfig {
    pub r: u32,
    pub alpha: u32,
    pub dropout: f32,
    pub bias: String,
    pub target_modules: Vec<String>,
    pub use_rslora: bool,
    pub gradient_checkpointing: String,
    pub random_state: u64,
}

impl Default for LoraConfig {
    fn default() -> Self {
        Self {
            r: 16,
            alpha: 16,
            dropout: 0.0,
            bias: "none".to_string(),
            target_modules: ["q_proj", "k_proj", "v_proj", "o_proj", "gate_proj", "up_proj", "down_proj"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            use_rslora: false,
            gradient_checkpointing: "unsloth".to_string(),
            random_state: 3407,
        }
    }
}

impl LoraConfig {
    pub fn validate(&self) -> TrainingResult<()> {
        if self.r == 0 {
            return Err(TrainingError::InvalidSpec("lora.r must be >= 1".to_string()));
        }
        if self.alpha == 0 {
            return Err(TrainingError::InvalidSpec("lora.alpha must be >= 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(TrainingError::InvalidSpec("lora.dropout must be in [0, 1)".to_string()));
        }
        if !matches!(self.bias.as_str(), "none" | "all" | "lora_only") {
            return Err(TrainingError::InvalidSpec(format!("lora.bias must be none, all or lora_only, got {}", self.bias)));
        }
        if self.target_modules.iter().all(|m| m.trim().is_empty()) {
            return Err(TrainingError::InvalidSpec("lora.target_modules must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Supervised fine-tuning settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingHyperParams {
    pub seed: u64,
    pub epochs: u32,
    pub max_steps: Option<u64>,
    pub learning_rate: f64,
    pub batch_size: u32,
    pub gradient_accumulation_steps: u32,
    pub warmup_steps: u32,
    pub weight_decay: f64,
    pub lr_scheduler: String,
    pub optimizer: String,
    pub logging_steps: u32,
    pub max_seq_len: u32,
    pub load_in_4bit: bool,
    pub packing: bool,
    pub eos_token: String,
}

impl Default for TrainingHyperParams {
    fn default() -> Self {
        Self {
            seed: 3407,
            epochs: 1,
            max_steps: None,
            learning_rate: 2e-4,
            batch_size: 1,
            gradient_accumulation_steps: 4,
            warmup_steps: 5,
            weight_decay: 0.01,
            lr_scheduler: "linear".to_string(),
            optimizer: "adamw_8bit".to_string(),
            logging_steps: 1,
            max_seq_len: 2048,
            load_in_4bit: false,
            packing: false,
            eos_token: "<|endoftext|>".to_string(),
        }
    }
}

impl TrainingHyperParams {
    pub fn validate(&self) -> TrainingResult<()> {
        if self.epochs == 0 {
            return Err(TrainingError::InvalidSpec("epochs must be >= 1".to_string()));
        }
        if self.max_steps == Some(0) {
            return Err(TrainingError::InvalidSpec("max_steps must be >= 1 when set".to_string()));
        }
        if !(self.learning_rate.is_finite()) || self.learning_rate <= 0.0 {
            return Err(TrainingError::InvalidSpec("learning_rate must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(TrainingError::InvalidSpec("batch_size must be >= 1".to_string()));
        }
        if self.gradient_accumulation_steps == 0 {
            return Err(TrainingError::InvalidSpec("gradient_accumulation_steps must be >= 1".to_string()));
        }
        if !(self.weight_decay.is_finite()) || self.weight_decay < 0.0 {
            return Err(TrainingError::InvalidSpec("weight_decay must be >= 0".to_string()));
        }
        if self.max_seq_len == 0 {
            return Err(TrainingError::InvalidSpec("max_seq_len must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Examples consumed per optimizer step.
    #[must_use]
    pub fn effective_batch_size(&self) -> u32 {
        self.batch_size * self.gradient_accumulation_steps
    }
}

/// Where the external trainer should run and how long it may take.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingResources {
    /// Handed to the training command as `{device}`.
    pub device: TrainingDevice,
    /// Wall-clock limit for the training command; it is killed once exceeded.
    pub max_seconds: Option<u64>,
}

impl TrainingResources {
    pub fn validate(&self) -> TrainingResult<()> {
        if self.max_seconds == Some(0) {
            return Err(TrainingError::InvalidSpec("resources.max_seconds must be >= 1 when set".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingDevice {
    #[default]
    Auto,
    Cpu,
    Cuda,
    Metal,
}

impl TrainingDevice {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
            Self::Metal => "metal",
        }
    }
}

impl std::fmt::Display for TrainingDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingJobSpec {
    pub job_id: TrainingJobId,
    pub created_at: DateTime<Utc>,
    pub base_model: ModelSpec,
    pub objective: TrainingObjective,
    /// Annotated corpus to train on.
    pub dataset: PathBuf,
    pub lora: LoraConfig,
    pub hyperparams: TrainingHyperParams,
    pub resources: TrainingResources,
}

impl TrainingJobSpec {
    #[must_use]
    pub fn new(base_model: ModelSpec, dataset: PathBuf) -> Self {
        Self {
            job_id: TrainingJobId::new(),
            created_at: Utc::now(),
            base_model,
            objective: TrainingObjective::Sft,
            dataset,
            lora: LoraConfig::default(),
            hyperparams: TrainingHyperParams::default(),
            resources: TrainingResources::default(),
        }
    }

    pub fn validate(&self) -> TrainingResult<()> {
        if self.base_model.engine.trim().is_empty() {
            return Err(TrainingError::InvalidSpec("base_model.engine is required".to_string()));
        }
        if self.base_model.model_id.trim().is_empty() {
            return Err(TrainingError::InvalidSpec("base_model.model_id is required".to_string()));
        }
        if self.dataset.as_os_str().is_empty() {
            return Err(TrainingError::InvalidSpec("dataset path is required".to_string()));
        }
        self.lora.validate()?;
        self.hyperparams.validate()?;
        self.resources.validate()?;
        Ok(())
    }
}

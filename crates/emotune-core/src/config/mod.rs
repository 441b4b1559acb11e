//! Configuration module.

pub mod settings;

pub use settings::{
    ConfigError, ConfigResult, DEFAULT_INFERENCE_MODEL, DEFAULT_WORKERS, EmotuneConfig, InferenceConfig, MergeConfig,
    PrepareConfig, PrepareMode, TaxonomyConfig, TrainConfig,
};

//! Emotune Training
//!
//! Backend-agnostic primitives for:
//! - The emotion taxonomy and label reduction (`Taxonomy`)
//! - Reading source rows and writing annotated corpora
//! - Defining fine-tuning jobs (`TrainingJobSpec`) and merges (`MergeSpec`)
//! - Implementing training backends (`Trainer`)

pub mod artifacts;
pub mod corpus;
pub mod dataset;
pub mod error;
pub mod formatting;
pub mod job;
pub mod labels;
pub mod layout;
pub mod merge;
pub mod progress;
pub mod registry;
pub mod selection;
pub mod source;
pub mod taxonomy;
pub mod trainer;

pub use artifacts::{
    ArtifactKind, TrainingArtifact, TrainingManifest, collect_dir_artifacts, make_artifact, sha256_file,
};
pub use corpus::{load_validated_corpus, read_corpus, write_jsonl_corpus};
pub use dataset::{
    AnnotatedExample, CONFIDENCE_SCORE, DatasetId, EmotionVerdict, INSTRUCTION, RawExample, compute_dataset_id,
    validate_examples,
};
pub use error::{TrainingError, TrainingResult};
pub use formatting::{ALPACA_PREAMBLE, FormattedSample, format_alpaca, format_corpus};
pub use job::{
    DEFAULT_BASE_MODEL, DEFAULT_ENGINE, LoraConfig, ModelSpec, TrainingDevice, TrainingHyperParams, TrainingJobId,
    TrainingJobSpec, TrainingObjective, TrainingResources,
};
pub use labels::{Category, Polarity};
pub use layout::TrainingLayout;
pub use merge::{MergeSpec, SHARD_INDEX_FILE, finalize_merged_model};
pub use progress::{ProgressEvent, ProgressSink, StdoutProgressSink, TracingProgressSink};
pub use registry::{TrainedAdapterEntry, discover_trained_adapters, resolve_adapter_dir};
pub use selection::{DEFAULT_QUOTA, DEFAULT_SEED, Selection, SelectionPolicy, select, select_balanced, select_full};
pub use source::{SourceFormat, parse_label_list, read_source};
pub use taxonomy::{DEFAULT_PRIORITY_ORDER, Taxonomy};
pub use trainer::{Trainer, TrainerStatus};

//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::eval::Aggregation;
use crate::labels::PromptTemplate;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where label bank caches are stored
    pub cache_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("~/.zsbench/cache"),
        }
    }
}

/// Evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Examples per batch read from the dataset
    pub batch_size: usize,

    /// How an example's embeddings are combined: mean, sum, max, first
    pub aggregation: Aggregation,

    /// Prompt template applied to each label before text encoding.
    /// `{}` or `{label}` is replaced by the label; "{}" leaves labels unchanged.
    pub prompt_template: PromptTemplate,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            aggregation: Aggregation::Mean,
            prompt_template: PromptTemplate::default(),
        }
    }
}

/// Text encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextEncoderConfig {
    /// Directory containing `text_model.onnx` and `tokenizer.json`
    pub model_dir: PathBuf,

    /// Token sequence length (CLIP uses 77)
    pub max_length: usize,
}

impl Default for TextEncoderConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.zsbench/models/clip-vit-base-patch32"),
            max_length: 77,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

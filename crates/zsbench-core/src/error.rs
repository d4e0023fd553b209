//! Error types for zero-shot evaluation.
//!
//! Errors are split into configuration problems and evaluation problems so the
//! CLI can tell a bad config file apart from a bad dataset or model.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for zsbench operations.
#[derive(Error, Debug)]
pub enum ZsError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Evaluation errors
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while building a label bank or running an evaluation.
#[derive(Error, Debug)]
pub enum EvalError {
    /// The batch source produced no examples, so no ratio can be computed
    #[error("No examples evaluated: the batch source was empty")]
    NoExamples,

    /// A vector does not match the label embedding dimension
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// An example has no embeddings to aggregate
    #[error("Example {index} has an empty embedding group")]
    EmptyGroup { index: usize },

    /// A batch's labels do not line up with its embeddings
    #[error("Batch shape mismatch: {examples} embedding groups but {labels} labels")]
    BatchShape { examples: usize, labels: usize },

    /// No labels were supplied
    #[error("Label set is empty")]
    EmptyLabelSet,

    /// A label appears more than once
    #[error("Duplicate label: {0:?}")]
    DuplicateLabel(String),

    /// The text embedder returned the wrong number of vectors
    #[error("Text embedder returned {actual} embeddings for {expected} prompts")]
    LabelCountMismatch { expected: usize, actual: usize },

    /// A precomputed text embedding file has no entry for a prompt
    #[error("No precomputed embedding for prompt {0:?}")]
    MissingTextEmbedding(String),

    /// Text encoder loading or inference failed
    #[error("Model error: {message}")]
    Model { message: String },

    /// A dataset record could not be read
    #[error("Dataset error in {}:{line}: {message}", path.display())]
    Dataset {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// The label bank cache could not be read or written
    #[error("Label bank cache error: {message}")]
    Cache { message: String },
}

/// Convenience type alias for zsbench results.
pub type Result<T> = std::result::Result<T, ZsError>;

/// Convenience type alias for evaluation-specific results.
pub type EvalResult<T> = std::result::Result<T, EvalError>;

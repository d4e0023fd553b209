//! zsbench Core - zero-shot classification accuracy for embedding models.
//!
//! Scores precomputed image embeddings against a fixed set of label
//! embeddings and reports top-1, top-5 and top-15 accuracy.
//!
//! # Architecture
//!
//! ```text
//! Batches → Normalize → Aggregate → Score (softmax · τ) → Rank → Accumulate → Ratios
//!                                         ↑
//!                   Labels → Prompt → Text encoder → LabelBank
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use zsbench_core::{Aggregation, JsonlDataset, PrecomputedTextEmbeddings, ZeroShotEvaluator};
//!
//! let labels = zsbench_core::labels::read_labels("labels.txt".as_ref())?;
//! let embedder = PrecomputedTextEmbeddings::load("label_embeddings.jsonl".as_ref())?;
//! let dataset = JsonlDataset::open("val.jsonl".as_ref(), 64)?;
//!
//! let report = ZeroShotEvaluator::new(dataset, labels, Aggregation::Mean, &embedder)?
//!     .evaluate()?;
//! println!("top1 = {:.3}", report.accuracy.top1);
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod eval;
pub mod labels;
pub mod math;
pub mod output;

pub use config::Config;
pub use dataset::JsonlDataset;
pub use error::{ConfigError, EvalError, EvalResult, Result, ZsError};
pub use eval::{
    Aggregate, Aggregation, Batch, EvaluationReport, Example, Prediction, TopKAccuracy,
    ZeroShotEvaluator,
};
pub use labels::{
    LabelBank, LabelTransform, OnnxTextEncoder, PrecomputedTextEmbeddings, PromptTemplate,
    TextEmbedder,
};
pub use output::{OutputFormat, OutputWriter};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Zero-shot classification accuracy evaluation.
//!
//! Each example's raw embeddings are L2-normalized, aggregated into a single
//! vector, scored against the label bank with a temperature-scaled softmax, and
//! ranked. Top-1/5/15 hits are accumulated across batches.
//!
//! # Usage
//!
//! ```rust,ignore
//! use zsbench_core::eval::{Aggregation, ZeroShotEvaluator};
//!
//! let evaluator = ZeroShotEvaluator::new(batches, labels, Aggregation::Mean, &embedder)?;
//! let report = evaluator.evaluate()?;
//! println!("top1={}", report.accuracy.top1);
//! ```

pub mod accuracy;
pub mod aggregate;
pub mod batch;
pub mod evaluator;
pub mod scorer;

pub use accuracy::{AccuracyCounter, EvaluationReport, Hits, TopKAccuracy, MAX_K};
pub use aggregate::{Aggregate, Aggregation};
pub use batch::{Batch, Example};
pub use evaluator::{Prediction, ScoredLabel, ZeroShotEvaluator};
pub use scorer::{BatchScores, ZeroShotScorer, TEMPERATURE};

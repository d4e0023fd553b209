//! CLI enum types for the evaluate command: output format and aggregation.

use clap::ValueEnum;
use zsbench_core::{Aggregation, OutputFormat as CoreOutputFormat};

/// Supported report formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// How multiple embeddings of one example are combined.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AggregationArg {
    /// Element-wise mean (default)
    Mean,
    /// Element-wise sum
    Sum,
    /// Element-wise maximum
    Max,
    /// First embedding only
    First,
}

impl From<AggregationArg> for Aggregation {
    fn from(arg: AggregationArg) -> Self {
        match arg {
            AggregationArg::Mean => Aggregation::Mean,
            AggregationArg::Sum => Aggregation::Sum,
            AggregationArg::Max => Aggregation::Max,
            AggregationArg::First => Aggregation::First,
        }
    }
}

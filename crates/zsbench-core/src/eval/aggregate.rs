//! Reduction of an example's embedding group to a single vector.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Combines a group of unit-norm embeddings (G × D) into one D-vector.
///
/// Implementations must not assume the output is re-normalized: scoring uses
/// the aggregate's raw magnitude.
pub trait Aggregate {
    fn aggregate(&self, group: ArrayView2<'_, f32>) -> Array1<f32>;
}

impl<F> Aggregate for F
where
    F: Fn(ArrayView2<'_, f32>) -> Array1<f32>,
{
    fn aggregate(&self, group: ArrayView2<'_, f32>) -> Array1<f32> {
        self(group)
    }
}

/// Built-in aggregation functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Element-wise mean
    #[default]
    Mean,
    /// Element-wise sum
    Sum,
    /// Element-wise maximum
    Max,
    /// First embedding of the group
    First,
}

impl Aggregate for Aggregation {
    fn aggregate(&self, group: ArrayView2<'_, f32>) -> Array1<f32> {
        let dim = group.ncols();
        if group.nrows() == 0 {
            return Array1::zeros(dim);
        }
        match self {
            Self::Mean => group
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(dim)),
            Self::Sum => group.sum_axis(Axis(0)),
            Self::Max => group.fold_axis(Axis(0), f32::NEG_INFINITY, |&acc, &x| acc.max(x)),
            Self::First => group.row(0).to_owned(),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mean => write!(f, "mean"),
            Self::Sum => write!(f, "sum"),
            Self::Max => write!(f, "max"),
            Self::First => write!(f, "first"),
        }
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" | "avg" | "average" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            "max" => Ok(Self::Max),
            "first" => Ok(Self::First),
            other => Err(format!("unknown aggregation: {other}")),
        }
    }
}

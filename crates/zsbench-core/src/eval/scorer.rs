//! Scoring of aggregated embeddings against the label bank.
//!
//! Computes `softmax(TEMPERATURE · aggregated · labelsᵀ)` for a whole batch with
//! one matrix product, then ranks labels per example.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{EvalError, EvalResult};
use crate::labels::LabelBank;
use crate::math::{softmax_in_place, top_k};

/// Fixed temperature applied to cosine similarities before the softmax.
pub const TEMPERATURE: f32 = 100.0;

/// Scores for one batch: raw logits and their softmax over the label axis.
#[derive(Debug, Clone)]
pub struct BatchScores {
    /// B × L, `TEMPERATURE · aggregated · labelsᵀ`
    pub logits: Array2<f32>,
    /// B × L, each row sums to 1
    pub probabilities: Array2<f32>,
}

impl BatchScores {
    /// Top `k` label indices for one example, highest first.
    ///
    /// Ranks by logit, which orders labels the same way as the probabilities
    /// but does not collapse distant labels into exact-zero ties.
    pub fn top_k(&self, example: usize, k: usize) -> Vec<usize> {
        top_k(self.logits.row(example), k)
    }

    pub fn probabilities(&self, example: usize) -> ArrayView1<'_, f32> {
        self.probabilities.row(example)
    }
}

/// Scores aggregated embeddings against a fixed label bank.
pub struct ZeroShotScorer {
    label_bank: LabelBank,
}

impl ZeroShotScorer {
    pub fn new(label_bank: LabelBank) -> Self {
        Self { label_bank }
    }

    pub fn label_bank(&self) -> &LabelBank {
        &self.label_bank
    }

    /// Score a B × D matrix of aggregated embeddings against every label.
    ///
    /// The aggregated rows are used as-is; they are not re-normalized.
    pub fn score_batch(&self, aggregated: ArrayView2<'_, f32>) -> EvalResult<BatchScores> {
        let dim = self.label_bank.embedding_dim();
        if aggregated.ncols() != dim {
            return Err(EvalError::DimensionMismatch {
                context: "aggregated embeddings".to_string(),
                expected: dim,
                actual: aggregated.ncols(),
            });
        }

        let mut logits = aggregated.dot(&self.label_bank.embeddings().t());
        logits *= TEMPERATURE;

        let mut probabilities = logits.clone();
        for row in probabilities.axis_iter_mut(Axis(0)) {
            softmax_in_place(row);
        }

        Ok(BatchScores {
            logits,
            probabilities,
        })
    }
}

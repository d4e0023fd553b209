//! Streaming top-k accuracy accumulation.

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};

/// Number of ranked labels kept per example; the largest reported k.
pub const MAX_K: usize = 15;

/// Top-1 / top-5 / top-15 accuracy ratios, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopKAccuracy {
    pub top1: f64,
    pub top5: f64,
    pub top15: f64,
}

/// Accuracy plus the counts it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    #[serde(flatten)]
    pub accuracy: TopKAccuracy,

    /// Total examples evaluated
    pub examples: u64,

    /// Examples whose ground-truth label is not in the label set (always misses)
    pub unknown_labels: u64,
}

/// Which top-k windows contained the ground-truth label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hits {
    pub top1: bool,
    pub top5: bool,
    pub top15: bool,
}

/// Running hit counters for one evaluation run.
#[derive(Debug, Clone, Default)]
pub struct AccuracyCounter {
    top1: u64,
    top5: u64,
    top15: u64,
    total: u64,
    unknown: u64,
}

impl AccuracyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a batch of `n` examples toward the denominator.
    pub fn add_examples(&mut self, n: usize) {
        self.total += n as u64;
    }

    /// Record one example's ranking.
    ///
    /// `ranked` holds at most [`MAX_K`] label indices, best first. `truth` is
    /// the ground-truth row index, or `None` for a label outside the label set.
    pub fn record(&mut self, ranked: &[usize], truth: Option<usize>) -> Hits {
        let Some(truth) = truth else {
            self.unknown += 1;
            return Hits::default();
        };

        let ranked = &ranked[..ranked.len().min(MAX_K)];
        let hits = Hits {
            top1: ranked.first() == Some(&truth),
            top5: ranked.iter().take(5).any(|&i| i == truth),
            top15: ranked.contains(&truth),
        };

        self.top1 += u64::from(hits.top1);
        self.top5 += u64::from(hits.top5);
        self.top15 += u64::from(hits.top15);
        hits
    }

    /// Examples counted so far.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Divide the hit counts by the example count.
    ///
    /// Fails with [`EvalError::NoExamples`] when nothing was counted.
    pub fn finish(&self) -> EvalResult<EvaluationReport> {
        if self.total == 0 {
            return Err(EvalError::NoExamples);
        }

        let total = self.total as f64;
        Ok(EvaluationReport {
            accuracy: TopKAccuracy {
                top1: self.top1 as f64 / total,
                top5: self.top5 as f64 / total,
                top15: self.top15 as f64 / total,
            },
            examples: self.total,
            unknown_labels: self.unknown,
        })
    }
}

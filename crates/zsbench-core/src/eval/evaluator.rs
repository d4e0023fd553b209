//! The zero-shot evaluation loop.

use ndarray::Array2;
use serde::Serialize;

use crate::error::{EvalError, EvalResult};
use crate::labels::{Identity, LabelBank, LabelTransform, TextEmbedder};
use crate::math::l2_normalize_rows;

use super::accuracy::{AccuracyCounter, EvaluationReport, Hits, MAX_K};
use super::aggregate::Aggregate;
use super::batch::{Batch, Example};
use super::scorer::ZeroShotScorer;

/// A ranked label with its softmax probability.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredLabel<'a> {
    pub label: &'a str,
    pub probability: f32,
}

/// The outcome for one example, handed to the observer in
/// [`ZeroShotEvaluator::evaluate_with`].
#[derive(Debug, Clone, Serialize)]
pub struct Prediction<'a> {
    /// Position of the example in the stream, starting at 0
    pub index: u64,
    /// Ground-truth label
    pub label: &'a str,
    /// Up to 15 labels, best first
    pub top: Vec<ScoredLabel<'a>>,
    pub hits: Hits,
}

/// Scores a stream of embedding batches against a fixed label set.
///
/// The batch source is any iterator of `Result<Batch, E>`; it is consumed once,
/// in order, by [`evaluate`](Self::evaluate). Errors from the source are passed
/// through unchanged, and evaluation errors convert into `E`.
pub struct ZeroShotEvaluator<S, A> {
    source: S,
    scorer: ZeroShotScorer,
    aggregator: A,
}

impl<S, A: Aggregate> ZeroShotEvaluator<S, A> {
    /// Build an evaluator, embedding the labels as-is.
    pub fn new<T>(source: S, labels: Vec<String>, aggregator: A, embedder: &T) -> EvalResult<Self>
    where
        T: TextEmbedder + ?Sized,
    {
        Self::with_transform(source, labels, aggregator, embedder, &Identity)
    }

    /// Build an evaluator, applying `transform` to each label before embedding.
    ///
    /// The transform only shapes the prompt; results refer to the original labels.
    pub fn with_transform<T, P>(
        source: S,
        labels: Vec<String>,
        aggregator: A,
        embedder: &T,
        transform: &P,
    ) -> EvalResult<Self>
    where
        T: TextEmbedder + ?Sized,
        P: LabelTransform + ?Sized,
    {
        let label_bank = LabelBank::encode(labels, embedder, transform)?;
        Ok(Self::with_label_bank(source, label_bank, aggregator))
    }

    /// Build an evaluator from an already-built label bank.
    pub fn with_label_bank(source: S, label_bank: LabelBank, aggregator: A) -> Self {
        Self {
            source,
            scorer: ZeroShotScorer::new(label_bank),
            aggregator,
        }
    }

    pub fn label_bank(&self) -> &LabelBank {
        self.scorer.label_bank()
    }
}

impl<S, A, E> ZeroShotEvaluator<S, A>
where
    S: IntoIterator<Item = Result<Batch, E>>,
    A: Aggregate,
    E: From<EvalError>,
{
    /// Consume the batch source and compute top-1/5/15 accuracy.
    ///
    /// Returns [`EvalError::NoExamples`] (converted into `E`) if the source
    /// yields no examples. The first error aborts the run.
    pub fn evaluate(self) -> Result<EvaluationReport, E> {
        self.evaluate_with(|_| Ok(()))
    }

    /// Like [`evaluate`](Self::evaluate), calling `observer` once per example.
    pub fn evaluate_with<F>(self, mut observer: F) -> Result<EvaluationReport, E>
    where
        F: FnMut(&Prediction<'_>) -> Result<(), E>,
    {
        let Self {
            source,
            scorer,
            aggregator,
        } = self;
        let label_bank = scorer.label_bank();
        let labels = label_bank.labels();
        let dim = label_bank.embedding_dim();
        let mut counter = AccuracyCounter::new();

        for (batch_idx, batch) in source.into_iter().enumerate() {
            let mut examples = batch?.into_examples();
            let offset = counter.total();

            let aggregated = aggregate_examples(&aggregator, dim, &mut examples, offset)?;
            let scores = scorer.score_batch(aggregated.view())?;
            counter.add_examples(examples.len());

            for (i, example) in examples.iter().enumerate() {
                let ranked = scores.top_k(i, MAX_K);
                let truth = label_bank.index_of(&example.label);
                let hits = counter.record(&ranked, truth);

                let probabilities = scores.probabilities(i);
                let prediction = Prediction {
                    index: offset + i as u64,
                    label: &example.label,
                    top: ranked
                        .iter()
                        .map(|&l| ScoredLabel {
                            label: &labels[l],
                            probability: probabilities[l],
                        })
                        .collect(),
                    hits,
                };
                observer(&prediction)?;
            }

            tracing::debug!(
                "Batch {}: {} examples ({} total)",
                batch_idx,
                examples.len(),
                counter.total()
            );
        }

        let report = counter.finish()?;
        tracing::info!(
            "Evaluated {} examples: top1={:.4} top5={:.4} top15={:.4}",
            report.examples,
            report.accuracy.top1,
            report.accuracy.top5,
            report.accuracy.top15
        );
        if report.unknown_labels > 0 {
            tracing::warn!(
                "{} examples had ground-truth labels outside the label set",
                report.unknown_labels
            );
        }
        Ok(report)
    }
}

/// Normalize each raw embedding, then aggregate every example into one row.
///
/// `offset` is the stream position of the batch's first example.
fn aggregate_examples<A: Aggregate + ?Sized>(
    aggregator: &A,
    dim: usize,
    examples: &mut [Example],
    offset: u64,
) -> EvalResult<Array2<f32>> {
    let mut aggregated = Array2::zeros((examples.len(), dim));

    for (i, (example, mut out)) in examples
        .iter_mut()
        .zip(aggregated.rows_mut())
        .enumerate()
    {
        let index = offset + i as u64;
        if example.embeddings.nrows() == 0 {
            return Err(EvalError::EmptyGroup {
                index: index as usize,
            });
        }
        if example.embeddings.ncols() != dim {
            return Err(EvalError::DimensionMismatch {
                context: format!("embeddings of example {index}"),
                expected: dim,
                actual: example.embeddings.ncols(),
            });
        }

        l2_normalize_rows(example.embeddings.view_mut());
        let row = aggregator.aggregate(example.embeddings.view());

        if row.len() != dim {
            return Err(EvalError::DimensionMismatch {
                context: format!("aggregated embedding of example {index}"),
                expected: dim,
                actual: row.len(),
            });
        }
        out.assign(&row);
    }

    Ok(aggregated)
}

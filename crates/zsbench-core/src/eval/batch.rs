//! Batches of precomputed image embeddings with their ground-truth labels.

use ndarray::{Array2, Array3, Axis};

use crate::error::{EvalError, EvalResult};

/// One example: a group of raw embeddings (G × D) and its ground-truth label.
#[derive(Debug, Clone)]
pub struct Example {
    pub embeddings: Array2<f32>,
    pub label: String,
}

impl Example {
    pub fn new(embeddings: Array2<f32>, label: impl Into<String>) -> Self {
        Self {
            embeddings,
            label: label.into(),
        }
    }

    /// An example with a single embedding.
    pub fn single(embedding: Vec<f32>, label: impl Into<String>) -> Self {
        let dim = embedding.len();
        let embeddings = Array2::from_shape_vec((1, dim), embedding)
            .unwrap_or_else(|_| Array2::zeros((1, dim)));
        Self::new(embeddings, label)
    }

    /// Number of embeddings in the group.
    pub fn group_size(&self) -> usize {
        self.embeddings.nrows()
    }
}

/// A batch of examples. Group sizes may differ between examples.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    examples: Vec<Example>,
}

impl Batch {
    pub fn new(examples: Vec<Example>) -> Self {
        Self { examples }
    }

    /// Build a batch from a dense `[batch × group × dim]` array and one label per example.
    pub fn from_array(embeddings: Array3<f32>, labels: Vec<String>) -> EvalResult<Self> {
        let batch_size = embeddings.len_of(Axis(0));
        if batch_size != labels.len() {
            return Err(EvalError::BatchShape {
                examples: batch_size,
                labels: labels.len(),
            });
        }

        let examples = embeddings
            .outer_iter()
            .zip(labels)
            .map(|(group, label)| Example::new(group.to_owned(), label))
            .collect();

        Ok(Self { examples })
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn into_examples(self) -> Vec<Example> {
        self.examples
    }

    /// Number of examples in the batch.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

impl FromIterator<Example> for Batch {
    fn from_iter<I: IntoIterator<Item = Example>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

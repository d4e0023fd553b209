//! Label handling: prompts, text embeddings and the label bank.
//!
//! Labels are turned into prompt strings, embedded once by a [`TextEmbedder`],
//! and stored as a unit-norm matrix in a [`LabelBank`] that every example is
//! scored against.

pub mod label_bank;
pub mod precomputed;
pub mod prompt;
pub mod text_encoder;

pub use label_bank::LabelBank;
pub use precomputed::PrecomputedTextEmbeddings;
pub use prompt::{Identity, LabelTransform, PromptTemplate};
pub use text_encoder::OnnxTextEncoder;

use std::path::Path;

use crate::error::{EvalError, EvalResult};

/// Produces text embeddings for a batch of strings.
///
/// Called exactly once per label bank, with every prompt in a single call.
pub trait TextEmbedder {
    /// Embed each text, returning one vector per input in the same order.
    fn embed_texts(&self, texts: &[String]) -> EvalResult<Vec<Vec<f32>>>;
}

impl<T: TextEmbedder + ?Sized> TextEmbedder for &T {
    fn embed_texts(&self, texts: &[String]) -> EvalResult<Vec<Vec<f32>>> {
        (**self).embed_texts(texts)
    }
}

impl<T: TextEmbedder + ?Sized> TextEmbedder for Box<T> {
    fn embed_texts(&self, texts: &[String]) -> EvalResult<Vec<Vec<f32>>> {
        (**self).embed_texts(texts)
    }
}

/// Read a labels file: one label per line, `#` comments and blank lines skipped.
pub fn read_labels(path: &Path) -> EvalResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| EvalError::Dataset {
        path: path.to_path_buf(),
        line: 0,
        message: format!("Failed to read labels: {e}"),
    })?;

    let labels: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    tracing::info!("Loaded {} labels from {:?}", labels.len(), path);
    Ok(labels)
}

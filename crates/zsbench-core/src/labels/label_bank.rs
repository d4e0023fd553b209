//! Pre-computed label embeddings for scoring.
//!
//! The label bank stores an L×D matrix of unit-norm text embeddings (one row per
//! label, in label order) together with an explicit label → row index.

use std::collections::HashMap;
use std::path::Path;

use ndarray::{Array2, ArrayView2};

use crate::error::{EvalError, EvalResult};
use crate::math::l2_normalize_rows;

use super::prompt::LabelTransform;
use super::TextEmbedder;

/// Unit-norm label embeddings plus the label ordering they were built from.
#[derive(Debug, Clone)]
pub struct LabelBank {
    labels: Vec<String>,
    index: HashMap<String, usize>,
    /// L × D, row-major, every row unit-norm.
    embeddings: Array2<f32>,
}

impl LabelBank {
    /// Build a label bank from raw (not yet normalized) embeddings.
    ///
    /// Rows are L2-normalized independently. Labels must be unique and
    /// non-empty, and every embedding must share one dimension.
    pub fn from_embeddings(labels: Vec<String>, embeddings: Vec<Vec<f32>>) -> EvalResult<Self> {
        if labels.is_empty() {
            return Err(EvalError::EmptyLabelSet);
        }
        if embeddings.len() != labels.len() {
            return Err(EvalError::LabelCountMismatch {
                expected: labels.len(),
                actual: embeddings.len(),
            });
        }

        let dim = embeddings[0].len();
        if dim == 0 {
            return Err(EvalError::DimensionMismatch {
                context: format!("text embedding for {:?}", labels[0]),
                expected: 1,
                actual: 0,
            });
        }

        let mut flat = Vec::with_capacity(labels.len() * dim);
        for (label, emb) in labels.iter().zip(&embeddings) {
            if emb.len() != dim {
                return Err(EvalError::DimensionMismatch {
                    context: format!("text embedding for {label:?}"),
                    expected: dim,
                    actual: emb.len(),
                });
            }
            flat.extend_from_slice(emb);
        }

        let mut matrix =
            Array2::from_shape_vec((labels.len(), dim), flat).map_err(|e| EvalError::Model {
                message: format!("Failed to build label matrix: {e}"),
            })?;
        l2_normalize_rows(matrix.view_mut());

        Self::from_normalized(labels, matrix)
    }

    /// Assemble a bank from a matrix whose rows are already unit-norm.
    fn from_normalized(labels: Vec<String>, embeddings: Array2<f32>) -> EvalResult<Self> {
        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), i).is_some() {
                return Err(EvalError::DuplicateLabel(label.clone()));
            }
        }

        Ok(Self {
            labels,
            index,
            embeddings,
        })
    }

    /// Prompt every label, embed all prompts in one call, and build the bank.
    pub fn encode<E, T>(labels: Vec<String>, embedder: &E, transform: &T) -> EvalResult<Self>
    where
        E: TextEmbedder + ?Sized,
        T: LabelTransform + ?Sized,
    {
        let prompts = Self::prompts(&labels, transform);

        tracing::info!("Encoding {} label prompts...", prompts.len());
        let embeddings = embedder.embed_texts(&prompts)?;

        let bank = Self::from_embeddings(labels, embeddings)?;
        tracing::info!(
            "Label bank ready: {} labels x {} dims",
            bank.len(),
            bank.embedding_dim()
        );
        Ok(bank)
    }

    /// Apply the label transform to every label, preserving order.
    pub fn prompts<T>(labels: &[String], transform: &T) -> Vec<String>
    where
        T: LabelTransform + ?Sized,
    {
        labels.iter().map(|l| transform.apply(l)).collect()
    }

    /// BLAKE3 hash of the labels and their prompts, used to validate a cache.
    pub fn content_hash(labels: &[String], prompts: &[String]) -> String {
        let mut hasher = blake3::Hasher::new();
        for (label, prompt) in labels.iter().zip(prompts) {
            hasher.update(label.as_bytes());
            hasher.update(b"\t");
            hasher.update(prompt.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Cache key combining a content hash with the identity of the encoder
    /// that produced the embeddings (model path, sequence length, ...).
    pub fn cache_key(content_hash: &str, encoder_id: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(content_hash.as_bytes());
        hasher.update(b"\n");
        hasher.update(encoder_id.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// Save the embedding matrix as raw little-endian f32.
    ///
    /// Also writes a `.meta` sidecar with the content hash and matrix shape.
    pub fn save(&self, path: &Path, content_hash: &str) -> EvalResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EvalError::Cache {
                message: format!("Failed to create {:?}: {}", parent, e),
            })?;
        }

        let bytes: Vec<u8> = self.embeddings.iter().flat_map(|f| f.to_le_bytes()).collect();
        std::fs::write(path, &bytes).map_err(|e| EvalError::Cache {
            message: format!("Failed to save label bank to {:?}: {}", path, e),
        })?;

        let meta_path = path.with_extension("meta");
        let meta = format!(
            "content_hash={}\nlabel_count={}\nembedding_dim={}\n",
            content_hash,
            self.len(),
            self.embedding_dim()
        );
        std::fs::write(&meta_path, meta).map_err(|e| EvalError::Cache {
            message: format!(
                "Failed to save label bank metadata to {:?}: {}",
                meta_path, e
            ),
        })?;

        tracing::info!(
            "Saved label bank to {:?} ({:.1} MB)",
            path,
            bytes.len() as f64 / 1_000_000.0
        );
        Ok(())
    }

    /// Load a label bank saved by [`LabelBank::save`].
    ///
    /// `labels` must be the same labels, in the same order, that were saved.
    pub fn load(path: &Path, labels: Vec<String>) -> EvalResult<Self> {
        let meta_path = path.with_extension("meta");
        let meta = std::fs::read_to_string(&meta_path).map_err(|e| EvalError::Cache {
            message: format!("Failed to read {:?}: {}", meta_path, e),
        })?;

        let label_count = meta_value(&meta, "label_count")?;
        let embedding_dim = meta_value(&meta, "embedding_dim")?;

        if label_count != labels.len() {
            return Err(EvalError::LabelCountMismatch {
                expected: labels.len(),
                actual: label_count,
            });
        }

        let bytes = std::fs::read(path).map_err(|e| EvalError::Cache {
            message: format!("Failed to read label bank from {:?}: {}", path, e),
        })?;

        if label_count == 0 || embedding_dim == 0 {
            return Err(EvalError::Cache {
                message: format!(
                    "Label bank metadata in {:?} describes an empty matrix ({} x {})",
                    meta_path, label_count, embedding_dim
                ),
            });
        }
        let expected_len = label_count
            .checked_mul(embedding_dim)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| EvalError::Cache {
                message: format!(
                    "Label bank metadata in {:?} is corrupt ({} x {})",
                    meta_path, label_count, embedding_dim
                ),
            })?;
        if bytes.len() != expected_len {
            return Err(EvalError::Cache {
                message: format!(
                    "Label bank size mismatch: expected {} bytes ({} labels), got {} bytes",
                    expected_len,
                    label_count,
                    bytes.len()
                ),
            });
        }

        let flat: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let matrix = Array2::from_shape_vec((label_count, embedding_dim), flat).map_err(|e| {
            EvalError::Cache {
                message: format!("Failed to reshape label bank: {e}"),
            }
        })?;

        tracing::info!("Loaded label bank: {} labels from {:?}", label_count, path);
        Self::from_normalized(labels, matrix)
    }

    /// Check if a cached label bank's content hash matches.
    pub fn cache_valid(path: &Path, content_hash: &str) -> bool {
        if !path.exists() {
            return false;
        }
        let meta_path = path.with_extension("meta");
        let Ok(content) = std::fs::read_to_string(&meta_path) else {
            return false;
        };
        content
            .lines()
            .any(|line| line == format!("content_hash={}", content_hash))
    }

    /// Labels in row order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Row index of a label, or `None` if it is not in the bank.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// The L × D unit-norm embedding matrix.
    pub fn embeddings(&self) -> ArrayView2<'_, f32> {
        self.embeddings.view()
    }

    pub fn embedding_dim(&self) -> usize {
        self.embeddings.ncols()
    }

    /// Number of labels in the bank.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn meta_value(meta: &str, key: &str) -> EvalResult<usize> {
    meta.lines()
        .find_map(|line| line.strip_prefix(key)?.strip_prefix('='))
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| EvalError::Cache {
            message: format!("Label bank metadata is missing {key}"),
        })
}

//! JSONL batch source for precomputed image embeddings.
//!
//! Each line holds one example:
//!
//! ```text
//! {"label": "tabby cat", "embeddings": [[0.12, -0.03, ...], [0.10, 0.01, ...]]}
//! {"label": "beagle", "embedding": [0.05, 0.22, ...]}
//! ```
//!
//! A flat `embedding` array is read as a group of one.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::Deserialize;

use crate::error::{EvalError, EvalResult};
use crate::eval::{Batch, Example};

#[derive(Deserialize)]
struct Record {
    #[serde(alias = "text")]
    label: String,
    #[serde(alias = "embedding")]
    embeddings: EmbeddingGroup,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddingGroup {
    Single(Vec<f32>),
    Group(Vec<Vec<f32>>),
}

impl EmbeddingGroup {
    fn into_array(self) -> Result<Array2<f32>, String> {
        match self {
            Self::Single(v) => {
                let dim = v.len();
                Array2::from_shape_vec((1, dim), v).map_err(|e| e.to_string())
            }
            Self::Group(rows) => {
                let dim = rows.first().map_or(0, Vec::len);
                if let Some(bad) = rows.iter().find(|r| r.len() != dim) {
                    return Err(format!(
                        "ragged embedding group: rows of length {} and {}",
                        dim,
                        bad.len()
                    ));
                }
                let count = rows.len();
                let flat: Vec<f32> = rows.into_iter().flatten().collect();
                Array2::from_shape_vec((count, dim), flat).map_err(|e| e.to_string())
            }
        }
    }
}

/// Streams batches of examples from a JSONL file.
///
/// The reader is consumed once; after the first error it yields nothing more.
pub struct JsonlDataset {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    batch_size: usize,
    finished: bool,
}

impl JsonlDataset {
    /// Open a dataset file, yielding batches of up to `batch_size` examples.
    pub fn open(path: &Path, batch_size: usize) -> EvalResult<Self> {
        let file = File::open(path).map_err(|e| EvalError::Dataset {
            path: path.to_path_buf(),
            line: 0,
            message: format!("Failed to open dataset: {e}"),
        })?;

        tracing::debug!("Opened dataset {:?} (batch size {})", path, batch_size);

        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
            batch_size: batch_size.max(1),
            finished: false,
        })
    }

    fn error(&self, message: impl Into<String>) -> EvalError {
        EvalError::Dataset {
            path: self.path.clone(),
            line: self.line_no,
            message: message.into(),
        }
    }

    fn parse_line(&self, line: &str) -> EvalResult<Example> {
        let record: Record = serde_json::from_str(line).map_err(|e| self.error(e.to_string()))?;
        let embeddings = record
            .embeddings
            .into_array()
            .map_err(|message| self.error(message))?;
        Ok(Example::new(embeddings, record.label))
    }

    fn next_batch(&mut self) -> EvalResult<Option<Batch>> {
        let mut examples = Vec::with_capacity(self.batch_size);

        while examples.len() < self.batch_size {
            let Some(line) = self.lines.next() else {
                break;
            };
            self.line_no += 1;
            let line = line.map_err(|e| self.error(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            examples.push(self.parse_line(&line)?);
        }

        if examples.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Batch::new(examples)))
        }
    }
}

impl Iterator for JsonlDataset {
    type Item = EvalResult<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

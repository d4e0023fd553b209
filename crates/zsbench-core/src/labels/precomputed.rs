//! Text embeddings read from a JSONL file instead of a live model.
//!
//! Each line is `{"text": "...", "embedding": [...]}`. Lookups are by exact
//! prompt string, so the file must be produced with the same prompt template.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EvalError, EvalResult};

use super::TextEmbedder;

#[derive(Deserialize)]
struct Record {
    #[serde(alias = "prompt", alias = "label")]
    text: String,
    embedding: Vec<f32>,
}

/// A fixed prompt → embedding table.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedTextEmbeddings {
    by_text: HashMap<String, Vec<f32>>,
}

impl PrecomputedTextEmbeddings {
    /// Load embeddings from a JSONL file.
    pub fn load(path: &Path) -> EvalResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::Dataset {
            path: path.to_path_buf(),
            line: 0,
            message: format!("Failed to read text embeddings: {e}"),
        })?;

        let mut by_text = HashMap::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: Record = serde_json::from_str(line).map_err(|e| EvalError::Dataset {
                path: path.to_path_buf(),
                line: i + 1,
                message: e.to_string(),
            })?;
            by_text.insert(record.text, record.embedding);
        }

        tracing::info!("Loaded {} precomputed text embeddings from {:?}", by_text.len(), path);
        Ok(Self { by_text })
    }

    pub fn len(&self) -> usize {
        self.by_text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_text.is_empty()
    }
}

impl FromIterator<(String, Vec<f32>)> for PrecomputedTextEmbeddings {
    fn from_iter<I: IntoIterator<Item = (String, Vec<f32>)>>(iter: I) -> Self {
        Self {
            by_text: iter.into_iter().collect(),
        }
    }
}

impl TextEmbedder for PrecomputedTextEmbeddings {
    fn embed_texts(&self, texts: &[String]) -> EvalResult<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| {
                self.by_text
                    .get(t)
                    .cloned()
                    .ok_or_else(|| EvalError::MissingTextEmbedding(t.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.jsonl");
        std::fs::write(
            &path,
            "{\"text\":\"cat\",\"embedding\":[1.0,0.0]}\n\n{\"prompt\":\"dog\",\"embedding\":[0.0,1.0]}\n",
        )
        .unwrap();

        let table = PrecomputedTextEmbeddings::load(&path).unwrap();
        assert_eq!(table.len(), 2);

        let out = table
            .embed_texts(&["dog".to_string(), "cat".to_string()])
            .unwrap();
        assert_eq!(out, vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn test_missing_prompt_fails() {
        let table: PrecomputedTextEmbeddings =
            [("cat".to_string(), vec![1.0])].into_iter().collect();
        let err = table.embed_texts(&["a photo of a cat".to_string()]).unwrap_err();
        assert!(matches!(err, EvalError::MissingTextEmbedding(ref t) if t == "a photo of a cat"));
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"text\":\"cat\",\"embedding\":[1.0]}\nnot json\n").unwrap();

        let err = PrecomputedTextEmbeddings::load(&path).unwrap_err();
        assert!(matches!(err, EvalError::Dataset { line: 2, .. }));
    }
}

//! CLIP text encoder for generating label embeddings.
//!
//! Loads a CLIP text tower exported to ONNX together with its tokenizer and
//! encodes prompt strings into vectors in the shared image-text space.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use crate::error::{EvalError, EvalResult};

use super::TextEmbedder;

const TEXT_MODEL_FILENAME: &str = "text_model.onnx";
const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// Output tensor holding the projected text embedding.
const TEXT_EMBEDS_OUTPUT: &str = "text_embeds";

/// ONNX Runtime wrapper around a CLIP text encoder.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct OnnxTextEncoder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    max_length: usize,
    uses_attention_mask: bool,
}

impl OnnxTextEncoder {
    /// Load the text encoder from a model directory.
    ///
    /// Expects `text_model.onnx` and `tokenizer.json` in `model_dir`.
    pub fn new(model_dir: &Path, max_length: usize) -> EvalResult<Self> {
        let text_model_path = model_dir.join(TEXT_MODEL_FILENAME);
        let tokenizer_path = model_dir.join(TOKENIZER_FILENAME);

        if !text_model_path.exists() {
            return Err(EvalError::Model {
                message: format!("Text encoder not found at {:?}", text_model_path),
            });
        }

        if !tokenizer_path.exists() {
            return Err(EvalError::Model {
                message: format!("Tokenizer not found at {:?}", tokenizer_path),
            });
        }

        let session = Session::builder()
            .map_err(|e| EvalError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(&text_model_path)
            .map_err(|e| EvalError::Model {
                message: format!("Failed to load text encoder model: {e}"),
            })?;

        let tokenizer =
            tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| EvalError::Model {
                message: format!("Failed to load tokenizer: {e}"),
            })?;

        let uses_attention_mask = session
            .inputs()
            .iter()
            .any(|i| i.name() == "attention_mask");

        tracing::debug!(
            "Loaded CLIP text encoder (inputs: {:?}, outputs: {:?})",
            session
                .inputs()
                .iter()
                .map(|i| i.name())
                .collect::<Vec<_>>(),
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_length,
            uses_attention_mask,
        })
    }

    /// Check whether the text encoder model files exist.
    pub fn model_exists(model_dir: &Path) -> bool {
        model_dir.join(TEXT_MODEL_FILENAME).exists() && model_dir.join(TOKENIZER_FILENAME).exists()
    }

    /// Tokenize texts into zero-padded `input_ids` and `attention_mask` buffers.
    fn tokenize(&self, texts: &[String]) -> EvalResult<(Vec<i64>, Vec<i64>)> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EvalError::Model {
                message: format!("Tokenization failed: {e}"),
            })?;

        let mut input_ids = vec![0i64; texts.len() * self.max_length];
        let mut attention_mask = vec![0i64; texts.len() * self.max_length];

        for (i, encoding) in encodings.iter().enumerate() {
            let row = i * self.max_length;
            for (j, &id) in encoding.get_ids().iter().take(self.max_length).enumerate() {
                input_ids[row + j] = id as i64;
                attention_mask[row + j] = 1;
            }
        }

        Ok((input_ids, attention_mask))
    }
}

impl TextEmbedder for OnnxTextEncoder {
    /// Encode a batch of prompts in a single inference call.
    ///
    /// Vectors are returned as produced by the model; the label bank
    /// normalizes them.
    fn embed_texts(&self, texts: &[String]) -> EvalResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batch_size = texts.len();
        let (input_ids, attention_mask) = self.tokenize(texts)?;
        let shape = vec![batch_size as i64, self.max_length as i64];

        let input_ids_value =
            Value::from_array((shape.clone(), input_ids)).map_err(|e| EvalError::Model {
                message: format!("Failed to create input_ids tensor: {e}"),
            })?;

        let mut session = self.session.lock().map_err(|e| EvalError::Model {
            message: format!("Text encoder lock poisoned: {e}"),
        })?;

        let outputs = if self.uses_attention_mask {
            let attention_mask_value =
                Value::from_array((shape, attention_mask)).map_err(|e| EvalError::Model {
                    message: format!("Failed to create attention_mask tensor: {e}"),
                })?;
            session.run(ort::inputs![
                "input_ids" => input_ids_value,
                "attention_mask" => attention_mask_value
            ])
        } else {
            session.run(ort::inputs!["input_ids" => input_ids_value])
        }
        .map_err(|e| EvalError::Model {
            message: format!("Text encoder inference failed: {e}"),
        })?;

        // Prefer the projected embedding; older exports only have one output.
        let output = outputs
            .iter()
            .find(|(name, _)| *name == TEXT_EMBEDS_OUTPUT)
            .or_else(|| outputs.iter().next())
            .ok_or_else(|| EvalError::Model {
                message: "Text encoder produced no outputs".to_string(),
            })?;

        let (_shape, data) = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| EvalError::Model {
                message: format!("Failed to extract text embeddings: {e}"),
            })?;

        if data.is_empty() || data.len() % batch_size != 0 {
            return Err(EvalError::Model {
                message: format!(
                    "Text encoder output of {} values cannot be split into {} embeddings",
                    data.len(),
                    batch_size
                ),
            });
        }

        let dim = data.len() / batch_size;
        Ok(data.chunks(dim).map(<[f32]>::to_vec).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_exists_requires_both_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!OnnxTextEncoder::model_exists(dir.path()));

        std::fs::write(dir.path().join(TEXT_MODEL_FILENAME), b"").unwrap();
        assert!(!OnnxTextEncoder::model_exists(dir.path()));

        std::fs::write(dir.path().join(TOKENIZER_FILENAME), b"{}").unwrap();
        assert!(OnnxTextEncoder::model_exists(dir.path()));
    }

    #[test]
    fn test_missing_model_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = match OnnxTextEncoder::new(dir.path(), 77) {
            Err(e) => e,
            Ok(_) => panic!("expected missing model error"),
        };
        assert!(err.to_string().contains("Text encoder not found"));
    }
}

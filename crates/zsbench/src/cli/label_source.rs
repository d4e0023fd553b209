//! Label bank construction shared by `evaluate` and `labels encode`.

use std::path::{Path, PathBuf};

use clap::Args;
use zsbench_core::labels::read_labels;
use zsbench_core::{
    Config, LabelBank, OnnxTextEncoder, PrecomputedTextEmbeddings, PromptTemplate,
};

/// Where the labels come from and how they are embedded.
#[derive(Args, Debug, Clone)]
pub struct LabelSourceArgs {
    /// Labels file: one class label per line, `#` starts a comment
    #[arg(short, long)]
    pub labels: PathBuf,

    /// CLIP text encoder directory (text_model.onnx + tokenizer.json)
    #[arg(long, conflicts_with = "label_embeddings")]
    pub text_model: Option<PathBuf>,

    /// JSONL file of precomputed prompt embeddings ({"text": ..., "embedding": [...]})
    #[arg(long)]
    pub label_embeddings: Option<PathBuf>,

    /// Label bank saved by `zsbench labels encode` for the same labels and prompt
    #[arg(long, conflicts_with_all = ["text_model", "label_embeddings"])]
    pub label_bank: Option<PathBuf>,

    /// Prompt template applied to every label, e.g. "a photo of a {}"
    #[arg(long)]
    pub prompt: Option<String>,
}

/// How prompt strings are turned into vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingSource {
    TextModel(PathBuf),
    Precomputed(PathBuf),
    Prebuilt(PathBuf),
}

/// Everything needed to build a [`LabelBank`], resolved from args and config.
#[derive(Debug, Clone)]
pub struct LabelSetup {
    pub labels: Vec<String>,
    pub template: PromptTemplate,
    pub source: EmbeddingSource,
    pub max_length: usize,
}

impl LabelSetup {
    /// Read the labels file and resolve the embedding source.
    ///
    /// `config` should already carry any `--prompt` override.
    pub fn resolve(args: &LabelSourceArgs, config: &Config) -> anyhow::Result<Self> {
        let labels = read_labels(&args.labels)?;
        if labels.is_empty() {
            anyhow::bail!(
                "No labels found in {:?}\n\n  Hint: The file should list one label per line.",
                args.labels
            );
        }

        let source = match (&args.label_bank, &args.label_embeddings, &args.text_model) {
            (Some(path), _, _) => EmbeddingSource::Prebuilt(path.clone()),
            (None, Some(path), _) => EmbeddingSource::Precomputed(path.clone()),
            (None, None, Some(dir)) => EmbeddingSource::TextModel(dir.clone()),
            (None, None, None) => EmbeddingSource::TextModel(config.text_model_dir()),
        };

        Ok(Self {
            labels,
            template: config.evaluation.prompt_template.clone(),
            source,
            max_length: config.text_encoder.max_length,
        })
    }

    /// Content hash of the labels and their prompts.
    pub fn content_hash(&self) -> String {
        let prompts = LabelBank::prompts(&self.labels, &self.template);
        LabelBank::content_hash(&self.labels, &prompts)
    }

    /// Hash identifying a text-model label bank: labels, prompts, the
    /// canonical model path and the sequence length.
    pub fn cache_hash(&self) -> Option<String> {
        let EmbeddingSource::TextModel(model_dir) = &self.source else {
            return None;
        };
        let model_path = model_dir
            .canonicalize()
            .unwrap_or_else(|_| model_dir.clone());
        let encoder_id = format!("{}#{}", model_path.display(), self.max_length);
        Some(LabelBank::cache_key(&self.content_hash(), &encoder_id))
    }

    /// Cache file for this label set, named after the model directory and cache hash.
    pub fn cache_path(&self, cache_dir: &Path) -> Option<PathBuf> {
        let EmbeddingSource::TextModel(model_dir) = &self.source else {
            return None;
        };
        let hash = self.cache_hash()?;
        let model_name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        Some(cache_dir.join(format!("{}-{}.bin", model_name, &hash[..16])))
    }

    /// Embed all prompts and build the label bank. Blocking.
    pub fn build(self) -> anyhow::Result<LabelBank> {
        match &self.source {
            EmbeddingSource::Precomputed(path) => {
                let table = PrecomputedTextEmbeddings::load(path)?;
                Ok(LabelBank::encode(self.labels, &table, &self.template)?)
            }
            EmbeddingSource::TextModel(model_dir) => {
                if !OnnxTextEncoder::model_exists(model_dir) {
                    anyhow::bail!(
                        "Text encoder not found in {:?}\n\n  \
                         Hint: Export a CLIP text model to text_model.onnx with its tokenizer.json, \
                         or pass --label-embeddings.",
                        model_dir
                    );
                }
                let encoder = OnnxTextEncoder::new(model_dir, self.max_length)?;
                Ok(LabelBank::encode(self.labels, &encoder, &self.template)?)
            }
            EmbeddingSource::Prebuilt(path) => {
                if !LabelBank::cache_valid(path, &self.content_hash()) {
                    anyhow::bail!(
                        "Label bank {:?} was not built for these labels and prompt\n\n  \
                         Hint: Re-run `zsbench labels encode` with the same --labels and --prompt.",
                        path
                    );
                }
                Ok(LabelBank::load(path, self.labels)?)
            }
        }
    }

    /// Like [`build`](Self::build), reusing a cached bank from `cache_dir` when valid.
    ///
    /// Only text-model banks are cached. Cache failures are logged, never fatal.
    pub fn build_cached(self, cache_dir: Option<&Path>) -> anyhow::Result<LabelBank> {
        let (Some(path), Some(hash)) = (
            cache_dir.and_then(|dir| self.cache_path(dir)),
            self.cache_hash(),
        ) else {
            return self.build();
        };

        if LabelBank::cache_valid(&path, &hash) {
            match LabelBank::load(&path, self.labels.clone()) {
                Ok(bank) => return Ok(bank),
                Err(e) => tracing::warn!("Ignoring unreadable label cache {:?}: {}", path, e),
            }
        }

        let bank = self.build()?;
        if let Err(e) = bank.save(&path, &hash) {
            tracing::warn!("Failed to cache label bank: {}", e);
        }
        Ok(bank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dir: &tempfile::TempDir, labels: &str) -> LabelSourceArgs {
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, labels).unwrap();
        LabelSourceArgs {
            labels: path,
            text_model: None,
            label_embeddings: None,
            label_bank: None,
            prompt: None,
        }
    }

    #[test]
    fn test_resolve_defaults_to_configured_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let setup = LabelSetup::resolve(&args(&dir, "cat\n# comment\ndog\n"), &config).unwrap();

        assert_eq!(setup.labels, vec!["cat", "dog"]);
        assert_eq!(
            setup.source,
            EmbeddingSource::TextModel(config.text_model_dir())
        );
        assert!(setup.template.is_identity());
    }

    #[test]
    fn test_resolve_rejects_empty_labels() {
        let dir = tempfile::tempdir().unwrap();
        let result = LabelSetup::resolve(&args(&dir, "# nothing\n\n"), &Config::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_build_from_precomputed() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("prompts.jsonl");
        std::fs::write(
            &table,
            "{\"text\":\"a photo of a cat\",\"embedding\":[3.0,0.0]}\n\
             {\"text\":\"a photo of a dog\",\"embedding\":[0.0,2.0]}\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.evaluation.prompt_template = PromptTemplate::new("a photo of a {}");
        let mut source_args = args(&dir, "cat\ndog\n");
        source_args.label_embeddings = Some(table.clone());

        let setup = LabelSetup::resolve(&source_args, &config).unwrap();
        assert_eq!(setup.source, EmbeddingSource::Precomputed(table));
        assert!(setup.cache_path(dir.path()).is_none());

        let bank = setup.build_cached(Some(dir.path())).unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.index_of("dog"), Some(1));
        assert_eq!(bank.embeddings()[[0, 0]], 1.0);
    }

    #[test]
    fn test_missing_text_model_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut source_args = args(&dir, "cat\n");
        source_args.text_model = Some(dir.path().join("no-model"));

        let setup = LabelSetup::resolve(&source_args, &Config::default()).unwrap();
        let err = setup.build().unwrap_err();
        assert!(err.to_string().contains("Text encoder not found"));
    }

    #[test]
    fn test_cache_path_tracks_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let mut source_args = args(&dir, "cat\ndog\n");
        source_args.text_model = Some(PathBuf::from("/models/clip-vit-b32"));

        let mut config = Config::default();
        let plain = LabelSetup::resolve(&source_args, &config).unwrap();
        config.evaluation.prompt_template = PromptTemplate::new("a photo of a {}");
        let prompted = LabelSetup::resolve(&source_args, &config).unwrap();

        let a = plain.cache_path(Path::new("/cache")).unwrap();
        let b = prompted.cache_path(Path::new("/cache")).unwrap();
        assert_ne!(a, b);
        assert!(a
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("clip-vit-b32-"));
    }

    #[test]
    fn test_cache_path_tracks_model_location_and_length() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Path::new("/cache");
        let config = Config::default();

        let mut first = args(&dir, "cat\n");
        first.text_model = Some(dir.path().join("a").join("onnx"));
        let mut second = first.clone();
        second.text_model = Some(dir.path().join("b").join("onnx"));

        let a = LabelSetup::resolve(&first, &config).unwrap();
        let b = LabelSetup::resolve(&second, &config).unwrap();
        assert_ne!(a.cache_path(cache), b.cache_path(cache));

        let mut shorter = a.clone();
        shorter.max_length = 64;
        assert_ne!(a.cache_path(cache), shorter.cache_path(cache));
    }

    #[test]
    fn test_prebuilt_bank_must_match_labels() {
        let dir = tempfile::tempdir().unwrap();
        let bank_path = dir.path().join("bank.bin");
        let mut source_args = args(&dir, "cat\ndog\n");
        source_args.label_bank = Some(bank_path.clone());

        let setup = LabelSetup::resolve(&source_args, &Config::default()).unwrap();
        assert_eq!(setup.source, EmbeddingSource::Prebuilt(bank_path.clone()));
        assert!(setup.cache_path(dir.path()).is_none());

        let bank = LabelBank::from_embeddings(
            setup.labels.clone(),
            vec![vec![1.0, 0.0], vec![0.0, 2.0]],
        )
        .unwrap();
        bank.save(&bank_path, "stale").unwrap();
        let err = setup.clone().build().unwrap_err();
        assert!(err.to_string().contains("not built for these labels"));

        bank.save(&bank_path, &setup.content_hash()).unwrap();
        let loaded = setup.build_cached(Some(dir.path())).unwrap();
        assert_eq!(loaded.index_of("dog"), Some(1));
    }
}

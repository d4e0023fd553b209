//! The `zsbench evaluate` command.

mod run;
pub mod types;

pub use types::{AggregationArg, OutputFormat};

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use zsbench_core::{Config, JsonlDataset, OutputFormat as CoreOutputFormat, PromptTemplate};

use super::label_source::{LabelSetup, LabelSourceArgs};
use run::{create_progress_spinner, print_summary, run_evaluation, write_report};

/// Arguments for the `evaluate` command.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// JSONL dataset of image embeddings with ground-truth labels
    #[arg(required = true)]
    pub dataset: PathBuf,

    #[command(flatten)]
    pub label_source: LabelSourceArgs,

    /// How to combine several embeddings of one example
    #[arg(long, value_enum)]
    pub aggregation: Option<AggregationArg>,

    /// Examples per batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Write per-example predictions (JSONL) to this file
    #[arg(long)]
    pub predictions: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Report file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Label bank cache directory
    #[arg(long, env = "ZSBENCH_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Always re-encode labels, ignoring the cache
    #[arg(long)]
    pub no_cache: bool,
}

/// Execute the evaluate command.
pub async fn execute(args: EvaluateArgs, mut config: Config) -> anyhow::Result<()> {
    if !args.dataset.exists() {
        anyhow::bail!(
            "Dataset does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.dataset
        );
    }

    apply_overrides(&args, &mut config)?;
    let format = resolve_format(&args, &config)?;

    let setup = LabelSetup::resolve(&args.label_source, &config)?;
    let cache_dir = (!args.no_cache).then(|| config.cache_dir());
    let label_bank =
        tokio::task::spawn_blocking(move || setup.build_cached(cache_dir.as_deref())).await??;

    let dataset = JsonlDataset::open(&args.dataset, config.evaluation.batch_size)?;
    let aggregation = config.evaluation.aggregation;
    tracing::info!(
        "Evaluating {:?} against {} labels (aggregation: {})",
        args.dataset,
        label_bank.len(),
        aggregation
    );

    let progress = create_progress_spinner()?;
    let pb = progress.clone();
    let predictions = args.predictions.clone();
    let start = Instant::now();

    let report = tokio::task::spawn_blocking(move || {
        run_evaluation(dataset, label_bank, aggregation, predictions.as_deref(), &pb)
    })
    .await?;
    progress.finish_and_clear();
    let report = report?;

    write_report(&report, format, config.output.pretty, args.output.as_deref())?;
    print_summary(&report, start.elapsed());
    Ok(())
}

/// Fold command-line overrides into the loaded config and re-validate it.
fn apply_overrides(args: &EvaluateArgs, config: &mut Config) -> anyhow::Result<()> {
    if let Some(batch_size) = args.batch_size {
        config.evaluation.batch_size = batch_size;
    }
    if let Some(aggregation) = args.aggregation {
        config.evaluation.aggregation = aggregation.into();
    }
    if let Some(prompt) = &args.label_source.prompt {
        config.evaluation.prompt_template = PromptTemplate::new(prompt.as_str());
    }
    if let Some(cache_dir) = &args.cache_dir {
        config.general.cache_dir = cache_dir.clone();
    }
    config.validate()?;
    Ok(())
}

fn resolve_format(args: &EvaluateArgs, config: &Config) -> anyhow::Result<CoreOutputFormat> {
    match args.format {
        Some(format) => Ok(format.into()),
        None => CoreOutputFormat::parse(&config.output.format).ok_or_else(|| {
            anyhow::anyhow!("Unknown output format {:?}", config.output.format)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zsbench_core::Aggregation;

    fn args() -> EvaluateArgs {
        EvaluateArgs {
            dataset: PathBuf::from("val.jsonl"),
            label_source: LabelSourceArgs {
                labels: PathBuf::from("labels.txt"),
                text_model: None,
                label_embeddings: None,
                label_bank: None,
                prompt: None,
            },
            aggregation: None,
            batch_size: None,
            predictions: None,
            format: None,
            output: None,
            cache_dir: None,
            no_cache: false,
        }
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let mut args = args();
        args.batch_size = Some(16);
        args.aggregation = Some(AggregationArg::First);
        args.label_source.prompt = Some("a photo of a {label}".to_string());
        args.cache_dir = Some(PathBuf::from("/tmp/zsbench-cache"));

        let mut config = Config::default();
        apply_overrides(&args, &mut config).unwrap();

        assert_eq!(config.evaluation.batch_size, 16);
        assert_eq!(config.evaluation.aggregation, Aggregation::First);
        assert_eq!(
            config.evaluation.prompt_template.as_str(),
            "a photo of a {label}"
        );
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/zsbench-cache"));
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let mut zero_batch = args();
        zero_batch.batch_size = Some(0);
        assert!(apply_overrides(&zero_batch, &mut Config::default()).is_err());

        let mut bad_prompt = args();
        bad_prompt.label_source.prompt = Some("a photo".to_string());
        assert!(apply_overrides(&bad_prompt, &mut Config::default()).is_err());
    }

    #[tokio::test]
    async fn test_evaluate_with_encoded_label_bank() {
        use crate::cli::labels::{self, LabelsArgs, LabelsCommand};

        let dir = tempfile::tempdir().unwrap();
        let labels_path = dir.path().join("labels.txt");
        let table = dir.path().join("prompts.jsonl");
        let bank_path = dir.path().join("labels.bin");
        let dataset = dir.path().join("val.jsonl");
        let report_path = dir.path().join("report.json");
        std::fs::write(&labels_path, "cat\ndog\n").unwrap();
        std::fs::write(
            &table,
            "{\"text\":\"a photo of a cat\",\"embedding\":[2.0,0.0]}\n\
             {\"text\":\"a photo of a dog\",\"embedding\":[0.0,2.0]}\n",
        )
        .unwrap();
        std::fs::write(
            &dataset,
            "{\"label\":\"cat\",\"embedding\":[0.9,0.1]}\n\
             {\"label\":\"dog\",\"embedding\":[0.9,0.1]}\n",
        )
        .unwrap();

        let prompt = Some("a photo of a {}".to_string());
        labels::execute(
            LabelsArgs {
                command: LabelsCommand::Encode {
                    source: LabelSourceArgs {
                        labels: labels_path.clone(),
                        text_model: None,
                        label_embeddings: Some(table),
                        label_bank: None,
                        prompt: prompt.clone(),
                    },
                    output: bank_path.clone(),
                },
            },
            Config::default(),
        )
        .await
        .unwrap();

        let mut eval_args = args();
        eval_args.dataset = dataset;
        eval_args.label_source.labels = labels_path;
        eval_args.label_source.label_bank = Some(bank_path);
        eval_args.label_source.prompt = prompt;
        eval_args.output = Some(report_path.clone());
        eval_args.no_cache = true;
        execute(eval_args, Config::default()).await.unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(report["examples"], 2);
        assert_eq!(report["top1"], 0.5);
        assert_eq!(report["top5"], 1.0);
    }

    #[tokio::test]
    async fn test_evaluate_rejects_bank_built_with_other_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let labels_path = dir.path().join("labels.txt");
        let bank_path = dir.path().join("labels.bin");
        let dataset = dir.path().join("val.jsonl");
        std::fs::write(&labels_path, "cat\ndog\n").unwrap();
        std::fs::write(&dataset, "{\"label\":\"cat\",\"embedding\":[1.0,0.0]}\n").unwrap();
        zsbench_core::LabelBank::from_embeddings(
            vec!["cat".into(), "dog".into()],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap()
        .save(&bank_path, "built-for-something-else")
        .unwrap();

        let mut eval_args = args();
        eval_args.dataset = dataset;
        eval_args.label_source.labels = labels_path;
        eval_args.label_source.label_bank = Some(bank_path);
        eval_args.no_cache = true;

        let err = execute(eval_args, Config::default()).await.unwrap_err();
        assert!(err.to_string().contains("not built for these labels"));
    }

    #[test]
    fn test_format_falls_back_to_config() {
        let mut config = Config::default();
        config.output.format = "jsonl".to_string();
        assert_eq!(
            resolve_format(&args(), &config).unwrap(),
            CoreOutputFormat::JsonLines
        );

        let mut explicit = args();
        explicit.format = Some(OutputFormat::Json);
        assert_eq!(
            resolve_format(&explicit, &config).unwrap(),
            CoreOutputFormat::Json
        );
    }
}

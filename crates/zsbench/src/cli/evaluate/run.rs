//! Blocking evaluation loop, progress reporting and report output.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use zsbench_core::{
    Aggregation, EvaluationReport, JsonlDataset, LabelBank, OutputFormat, OutputWriter,
    ZeroShotEvaluator,
};

/// Score every batch in `dataset`, streaming predictions to `predictions` if set.
pub fn run_evaluation(
    dataset: JsonlDataset,
    label_bank: LabelBank,
    aggregation: Aggregation,
    predictions: Option<&Path>,
    progress: &ProgressBar,
) -> anyhow::Result<EvaluationReport> {
    let mut writer = predictions
        .map(|path| -> anyhow::Result<_> {
            let file = File::create(path)
                .with_context(|| format!("Failed to create predictions file {:?}", path))?;
            Ok(OutputWriter::new(
                BufWriter::new(file),
                OutputFormat::JsonLines,
                false,
            ))
        })
        .transpose()?;

    let source = dataset.map(|batch| batch.map_err(anyhow::Error::from));
    let report = ZeroShotEvaluator::with_label_bank(source, label_bank, aggregation)
        .evaluate_with(|prediction| {
            if let Some(writer) = writer.as_mut() {
                writer.write(prediction)?;
            }
            progress.inc(1);
            Ok(())
        })?;

    if let (Some(mut writer), Some(path)) = (writer, predictions) {
        writer.flush()?;
        tracing::info!(
            "Wrote {} predictions to {:?}",
            writer.items_written(),
            path
        );
    }

    Ok(report)
}

/// Write the report to `output`, or to stdout when unset.
pub fn write_report(
    report: &EvaluationReport,
    format: OutputFormat,
    pretty: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create report file {:?}", path))?;
            let mut writer = OutputWriter::new(BufWriter::new(file), format, pretty);
            writer.write(report)?;
            writer.flush()?;
            tracing::info!("Report written to {:?}", path);
        }
        None => {
            let stdout = io::stdout();
            let mut writer = OutputWriter::new(stdout.lock(), format, pretty);
            writer.write(report)?;
            writer.flush()?;
        }
    }
    Ok(())
}

/// Spinner counting evaluated examples; the dataset length is not known upfront.
pub fn create_progress_spinner() -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} examples ({per_sec}) {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("scoring...");
    Ok(pb)
}

/// Print a formatted summary table after evaluation.
pub fn print_summary(report: &EvaluationReport, elapsed: Duration) {
    let rate = if elapsed.as_secs_f64() > 0.0 {
        report.examples as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Top-1:        {:>7.2}%", report.accuracy.top1 * 100.0);
    eprintln!("    Top-5:        {:>7.2}%", report.accuracy.top5 * 100.0);
    eprintln!("    Top-15:       {:>7.2}%", report.accuracy.top15 * 100.0);
    eprintln!("  ------------------------------------");
    eprintln!("    Examples:     {:>8}", report.examples);
    if report.unknown_labels > 0 {
        eprintln!("    Unknown:      {:>8}", report.unknown_labels);
    }
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} ex/sec", rate);
    eprintln!("  ====================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label_bank() -> LabelBank {
        LabelBank::from_embeddings(
            vec!["cat".to_string(), "dog".to_string()],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap()
    }

    fn dataset(dir: &tempfile::TempDir) -> JsonlDataset {
        let path = dir.path().join("val.jsonl");
        std::fs::write(
            &path,
            "{\"label\":\"cat\",\"embedding\":[0.9,0.1]}\n\
             {\"label\":\"dog\",\"embeddings\":[[0.2,0.8],[0.1,0.9]]}\n\
             {\"label\":\"cat\",\"embedding\":[0.1,0.9]}\n",
        )
        .unwrap();
        JsonlDataset::open(&path, 2).unwrap()
    }

    #[test]
    fn test_run_evaluation_writes_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let predictions = dir.path().join("predictions.jsonl");
        let progress = ProgressBar::hidden();

        let report = run_evaluation(
            dataset(&dir),
            label_bank(),
            Aggregation::Mean,
            Some(&predictions),
            &progress,
        )
        .unwrap();

        assert_eq!(report.examples, 3);
        assert!((report.accuracy.top1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.accuracy.top5, 1.0);
        assert_eq!(progress.position(), 3);

        let content = std::fs::read_to_string(&predictions).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2]["label"], "cat");
        assert_eq!(lines[2]["top"][0]["label"], "dog");
        assert_eq!(lines[2]["hits"]["top1"], false);
    }

    #[test]
    fn test_run_evaluation_propagates_dataset_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jsonl");
        std::fs::write(&path, "{\"label\":\"cat\",\"embedding\":[1.0,0.0]}\nnot json\n").unwrap();
        let dataset = JsonlDataset::open(&path, 1).unwrap();

        let err = run_evaluation(
            dataset,
            label_bank(),
            Aggregation::Mean,
            None,
            &ProgressBar::hidden(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("broken.jsonl:2"));
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = run_evaluation(
            dataset(&dir),
            label_bank(),
            Aggregation::Mean,
            None,
            &ProgressBar::hidden(),
        )
        .unwrap();

        write_report(&report, OutputFormat::Json, true, Some(&path)).unwrap();

        let written: EvaluationReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, report);
    }
}

//! The `zsbench labels` command for building label banks ahead of time.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use zsbench_core::{Config, PromptTemplate};

use super::label_source::{LabelSetup, LabelSourceArgs};

/// Arguments for the `labels` command.
#[derive(Args, Debug)]
pub struct LabelsArgs {
    #[command(subcommand)]
    pub command: LabelsCommand,
}

/// Subcommands for label management.
#[derive(Subcommand, Debug)]
pub enum LabelsCommand {
    /// Embed every label prompt and save the label bank
    Encode {
        #[command(flatten)]
        source: LabelSourceArgs,

        /// Output file (raw little-endian f32, with a .meta sidecar)
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Execute the labels command.
pub async fn execute(args: LabelsArgs, mut config: Config) -> anyhow::Result<()> {
    match args.command {
        LabelsCommand::Encode { source, output } => {
            if let Some(prompt) = &source.prompt {
                config.evaluation.prompt_template = PromptTemplate::new(prompt.as_str());
                config.validate()?;
            }

            let setup = LabelSetup::resolve(&source, &config)?;
            let hash = setup.content_hash();
            let path = output.clone();

            let bank = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
                let bank = setup.build()?;
                bank.save(&path, &hash)?;
                Ok(bank)
            })
            .await??;

            println!(
                "Encoded {} labels ({} dims) to {}",
                bank.len(),
                bank.embedding_dim(),
                output.display()
            );
        }
    }

    Ok(())
}

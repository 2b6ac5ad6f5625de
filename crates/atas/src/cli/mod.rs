pub mod batch;
pub mod parse;
pub mod segments;
pub mod votes;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use atas_core::{ExtractionPolicy, PipelineConfig};

#[derive(Parser)]
#[command(
    name = "atas",
    about = "Turn annotated municipal meeting minutes into publication datasets",
    version
)]
pub struct Cli {
    /// JSON file overriding the extraction policy
    #[arg(long, global = true)]
    pub policy: Option<PathBuf>,
    /// Documents processed concurrently in batch mode
    #[arg(long, global = true)]
    pub workers: Option<usize>,
    /// Verbose logging
    #[arg(long, global = true)]
    pub debug: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze one annotation export: entities, relations and topic sections
    Parse {
        /// INCEpTION JSON export
        file: PathBuf,
        /// Write the analysis here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Align one document's annotations onto its text segments
    Segments {
        /// Segment file produced by the segmenter
        #[arg(long)]
        segments_file: PathBuf,
        /// INCEpTION JSON export of the same document
        #[arg(long)]
        annotations_file: PathBuf,
        /// Publication file to write
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Publish every segment file that has a matching annotation export
    Batch {
        /// Directory of municipio_<name> folders with segment files
        #[arg(long)]
        segments_dir: PathBuf,
        /// Directory of INCEpTION exports
        #[arg(long)]
        annotations_dir: PathBuf,
        /// Where publication files and batch_report.json are written
        #[arg(long)]
        output_dir: PathBuf,
    },
    /// List the consolidated votes of one annotation export
    Votes {
        /// INCEpTION JSON export
        file: PathBuf,
    },
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::from_env().context("Failed to load configuration")?;
        if let Some(path) = &self.policy {
            let policy = ExtractionPolicy::from_json_file(path)
                .with_context(|| format!("Failed to load policy {}", path.display()))?;
            config = config.with_policy(policy);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        Ok(config)
    }
}

/// Pretty-print `value` to `path`, or to stdout when no path is given.
pub async fn write_json(path: Option<&Path>, value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use atas_core::AnnotationPipeline;
use cli::{Cli, Commands};

const DEFAULT_FILTER: &str = "atas=info,atas_core=info";
const DEBUG_FILTER: &str = "atas=debug,atas_core=debug";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new(DEBUG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let pipeline = AnnotationPipeline::new(cli.pipeline_config()?);

    dispatch(cli.command, &pipeline).await
}

async fn dispatch(command: Commands, pipeline: &AnnotationPipeline) -> Result<()> {
    match command {
        Commands::Parse { file, output } => cli::parse::run(pipeline, &file, output.as_deref()).await,
        Commands::Segments {
            segments_file,
            annotations_file,
            output,
        } => cli::segments::run(pipeline, &segments_file, &annotations_file, &output).await,
        Commands::Batch {
            segments_dir,
            annotations_dir,
            output_dir,
        } => cli::batch::run(pipeline, &segments_dir, &annotations_dir, &output_dir).await,
        Commands::Votes { file } => cli::votes::run(pipeline, &file).await,
    }
}

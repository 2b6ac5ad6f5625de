use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use atas_core::AnnotationPipeline;

use super::write_json;

pub async fn run(pipeline: &AnnotationPipeline, file: &Path) -> Result<()> {
    let analysis = pipeline
        .analyze_file(file)
        .await
        .with_context(|| format!("Failed to analyze {}", file.display()))?;
    let votes = analysis.votes();

    write_json(None, &serde_json::to_value(&votes)?).await?;

    let complete = votes.iter().filter(|v| v.complete).count();
    eprintln!(
        "{} {} votes, {complete} complete",
        style("●").blue(),
        votes.len()
    );

    Ok(())
}

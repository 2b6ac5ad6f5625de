use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use atas_core::AnnotationPipeline;

use super::write_json;

pub async fn run(pipeline: &AnnotationPipeline, file: &Path, output: Option<&Path>) -> Result<()> {
    let analysis = pipeline
        .analyze_file(file)
        .await
        .with_context(|| format!("Failed to analyze {}", file.display()))?;

    write_json(output, &serde_json::to_value(&analysis)?).await?;

    eprintln!(
        "{} {}: {} entities, {} relations, {} sections",
        style("✓").green(),
        style(&analysis.meta.filename).bold(),
        analysis.entity_count(),
        analysis.relation_count(),
        analysis.sections.len()
    );
    let filtered = analysis.diagnostics.filtered_count();
    if filtered > 0 {
        eprintln!("  Filtered: {filtered} spans");
    }
    if !analysis.diagnostics.issues.is_empty() {
        eprintln!(
            "  {} {} record issues",
            style("!").yellow(),
            analysis.diagnostics.issues.len()
        );
    }

    Ok(())
}

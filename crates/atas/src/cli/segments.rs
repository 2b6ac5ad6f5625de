use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use atas_core::AnnotationPipeline;

use super::write_json;

pub async fn run(
    pipeline: &AnnotationPipeline,
    segments_file: &Path,
    annotations_file: &Path,
    output: &Path,
) -> Result<()> {
    let published = pipeline
        .publish_files(segments_file, annotations_file)
        .await
        .with_context(|| {
            format!(
                "Failed to publish {} with {}",
                segments_file.display(),
                annotations_file.display()
            )
        })?;

    write_json(Some(output), &serde_json::to_value(&published)?).await?;

    let stats = &published.statistics;
    eprintln!(
        "{} {} segments: {} entities, {} relations",
        style("✓").green(),
        stats.processed_segments,
        stats.total_entities,
        stats.total_relations
    );
    if stats.filtered_entities > 0 {
        eprintln!("  Filtered: {} spans", stats.filtered_entities);
    }
    for failure in &published.failures {
        eprintln!(
            "  {} segment {}: {}",
            style("✗").red(),
            failure.segment_id,
            failure.error
        );
    }
    eprintln!("  Output: {}", output.display());

    Ok(())
}

use std::path::Path;

use anyhow::{bail, Context, Result};
use console::style;

use atas_core::ingest::MUNICIPALITY_DIR_PREFIX;
use atas_core::{find_matching_files, AnnotationPipeline};

use super::write_json;

pub const REPORT_FILE: &str = "batch_report.json";

pub async fn run(
    pipeline: &AnnotationPipeline,
    segments_dir: &Path,
    annotations_dir: &Path,
    output_dir: &Path,
) -> Result<()> {
    let pairs = find_matching_files(segments_dir, annotations_dir)
        .await
        .with_context(|| format!("Failed to scan {}", segments_dir.display()))?;
    if pairs.is_empty() {
        bail!("No matching segment and annotation files found");
    }

    eprintln!("Processing {} documents...", pairs.len());
    let report = pipeline.publish_batch(pairs).await;

    for output in &report.successful {
        let path = output_dir
            .join(format!("{MUNICIPALITY_DIR_PREFIX}{}", output.pair.municipality))
            .join(format!("{}.json", output.meta.key()));
        write_json(Some(&path), &serde_json::to_value(&output.document)?).await?;
        eprintln!(
            "  {} {} ({} segments)",
            style("✓").green(),
            output.meta.key(),
            output.document.statistics.processed_segments
        );
    }
    for (pair, error) in &report.failed {
        eprintln!(
            "  {} {}: {error}",
            style("✗").red(),
            pair.segments_file.display()
        );
    }

    let report_path = output_dir.join(REPORT_FILE);
    write_json(Some(&report_path), &serde_json::to_value(report.summary())?).await?;

    eprintln!(
        "{} {} processed, {} failed; {} entities, {} relations",
        style("●").blue(),
        report.success_count(),
        report.failure_count(),
        report.totals.entities,
        report.totals.relations
    );
    eprintln!("  Report: {}", report_path.display());

    Ok(())
}

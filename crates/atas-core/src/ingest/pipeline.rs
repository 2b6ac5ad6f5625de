use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::aligner::SegmentAligner;
use super::extractor::EntityExtractor;
use super::linker::RelationLinker;
use super::loader::{LoadedDocument, Loader, TextSource};
use crate::config::PipelineConfig;
use crate::dataset::{PublishedDocument, SegmentsFile};
use crate::diagnostics::{AnnotationStats, Diagnostics};
use crate::document::{annotation_file_name, DocumentMeta};
use crate::entity::EntitySpan;
use crate::relationship::RelationAnnotation;
use crate::section::{pair_sections, AssuntoSection, BoundaryMarker};
use crate::voting::{consolidate_votes, vote_links, VoteRecord};
use crate::{Error, Result};

/// Segment folders are named `municipio_<name>`.
pub const MUNICIPALITY_DIR_PREFIX: &str = "municipio_";

/// Whole-document analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAnnotation {
    pub meta: DocumentMeta,
    pub text_source: TextSource,
    pub text: String,
    pub entities: Vec<EntitySpan>,
    pub relations: Vec<RelationAnnotation>,
    pub sections: Vec<AssuntoSection>,
    pub markers: Vec<BoundaryMarker>,
    pub diagnostics: Diagnostics,
    pub stats: AnnotationStats,
}

impl DocumentAnnotation {
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    #[must_use]
    pub fn votes(&self) -> Vec<VoteRecord> {
        consolidate_votes(&vote_links(&self.entities, &self.relations))
    }
}

/// A segment file and the annotation export it was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePair {
    pub segments_file: PathBuf,
    pub annotations_file: PathBuf,
    pub municipality: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub documents: usize,
    pub segments: usize,
    pub failed_segments: usize,
    pub entities: usize,
    pub relations: usize,
    pub filtered_entities: usize,
}

impl BatchStats {
    fn add(&mut self, document: &PublishedDocument) {
        let stats = &document.statistics;
        self.documents += 1;
        self.segments += stats.processed_segments;
        self.failed_segments += stats.failed_segments;
        self.entities += stats.total_entities;
        self.relations += stats.total_relations;
        self.filtered_entities += stats.filtered_entities;
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub pair: FilePair,
    pub meta: DocumentMeta,
    pub document: PublishedDocument,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub successful: Vec<BatchOutput>,
    pub failed: Vec<(FilePair, Error)>,
    pub totals: BatchStats,
}

impl BatchReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn add_success(&mut self, output: BatchOutput) {
        self.totals.add(&output.document);
        self.successful.push(output);
    }

    fn add_failure(&mut self, pair: FilePair, error: Error) {
        self.failed.push((pair, error));
    }

    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successful.len()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Serializable overview of the run.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total_files: self.success_count() + self.failure_count(),
            processed_files: self.success_count(),
            failed_files: self.failure_count(),
            totals: self.totals.clone(),
            documents: self
                .successful
                .iter()
                .map(|output| DocumentSummary {
                    document_id: output.meta.key().to_string(),
                    municipality: output.pair.municipality.clone(),
                    segments: output.document.statistics.processed_segments,
                    failed_segments: output.document.statistics.failed_segments,
                    entities: output.document.statistics.total_entities,
                    relations: output.document.statistics.total_relations,
                })
                .collect(),
            failures: self
                .failed
                .iter()
                .map(|(pair, error)| FileFailure {
                    segments_file: pair.segments_file.clone(),
                    annotations_file: pair.annotations_file.clone(),
                    error: error.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub municipality: String,
    pub segments: usize,
    pub failed_segments: usize,
    pub entities: usize,
    pub relations: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub segments_file: PathBuf,
    pub annotations_file: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub processed_files: usize,
    pub failed_files: usize,
    pub totals: BatchStats,
    pub documents: Vec<DocumentSummary>,
    pub failures: Vec<FileFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationPipeline {
    config: Arc<PipelineConfig>,
}

impl AnnotationPipeline {
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract, link and pair sections over the whole primary buffer.
    pub fn analyze(&self, meta: DocumentMeta, document: &LoadedDocument) -> Result<DocumentAnnotation> {
        let buffer = document.text();
        let records = document.records();

        let extraction = EntityExtractor::new(&self.config.policy).extract(buffer, records, None)?;
        let linkage = RelationLinker::new().link(records, &extraction.id_map);
        let pairing = pair_sections(&extraction.markers, &extraction.entities, buffer);

        let mut diagnostics = extraction.diagnostics;
        diagnostics.merge(linkage.diagnostics);
        diagnostics.merge(pairing.diagnostics);
        diagnostics.limit(self.config.policy.max_filter_examples);

        let mut stats = AnnotationStats {
            total_feature_structures: document.total_feature_structures,
            sofa_count: document.sofa_count,
            ..AnnotationStats::default()
        };
        stats.merge(&extraction.stats);
        stats.merge(&linkage.stats);

        tracing::info!(
            document = meta.key(),
            entities = extraction.entities.len(),
            relations = linkage.relations.len(),
            sections = pairing.sections.len(),
            "analyzed document"
        );

        Ok(DocumentAnnotation {
            meta,
            text_source: document.source,
            text: buffer.as_str().to_string(),
            entities: extraction.entities,
            relations: linkage.relations,
            sections: pairing.sections,
            markers: extraction.markers,
            diagnostics,
            stats,
        })
    }

    pub async fn analyze_file(&self, path: &Path) -> Result<DocumentAnnotation> {
        let document = Loader::new().load_file(path).await?;
        self.analyze(DocumentMeta::from_path(path), &document)
    }

    /// Align the segments of `file` against `document` and assemble the
    /// publication record.
    #[must_use]
    pub fn publish_segments(&self, document: &LoadedDocument, file: &SegmentsFile) -> PublishedDocument {
        let report = SegmentAligner::new(&self.config.policy).align(document, &file.segments);

        let base = AnnotationStats {
            total_feature_structures: document.total_feature_structures,
            sofa_count: document.sofa_count,
            ..AnnotationStats::default()
        };
        let published =
            PublishedDocument::assemble(file, report, base, self.config.policy.max_filter_examples);

        tracing::info!(
            document = file.document_id.as_deref().unwrap_or_default(),
            segments = published.statistics.processed_segments,
            failed = published.statistics.failed_segments,
            entities = published.statistics.total_entities,
            relations = published.statistics.total_relations,
            filtered = published.statistics.filtered_entities,
            "published segments"
        );

        published
    }

    pub async fn publish_files(&self, segments_file: &Path, annotations_file: &Path) -> Result<PublishedDocument> {
        let segments = tokio::fs::read(segments_file).await?;
        let annotations = tokio::fs::read(annotations_file).await?;
        self.publish_bytes(&segments, &annotations)
    }

    fn publish_bytes(&self, segments: &[u8], annotations: &[u8]) -> Result<PublishedDocument> {
        let file = SegmentsFile::from_slice(segments)?;
        let document = Loader::new().load_bytes(annotations)?;
        Ok(self.publish_segments(&document, &file))
    }

    /// Publish every pair, at most `workers` at a time. Results come back
    /// in input order; a failing pair is reported and does not stop the
    /// others.
    pub async fn publish_batch(&self, pairs: Vec<FilePair>) -> BatchReport {
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks = JoinSet::new();

        for (index, pair) in pairs.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let pipeline = self.clone();

            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => pipeline.publish_pair(&pair).await,
                    Err(e) => Err(Error::Task(e.to_string())),
                };
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<Result<PublishedDocument>>> =
            std::iter::repeat_with(|| None).take(pairs.len()).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => tracing::warn!(error = %e, "batch task aborted"),
            }
        }

        let mut report = BatchReport::new();
        for (pair, outcome) in pairs.into_iter().zip(outcomes) {
            match outcome.unwrap_or_else(|| Err(Error::Task("task did not complete".into()))) {
                Ok(document) => {
                    let meta = DocumentMeta::from_path(&pair.annotations_file);
                    report.add_success(BatchOutput { pair, meta, document });
                }
                Err(e) => {
                    tracing::warn!(
                        file = %pair.segments_file.display(),
                        error = %e,
                        "failed to publish document"
                    );
                    report.add_failure(pair, e);
                }
            }
        }

        tracing::info!(
            processed = report.success_count(),
            failed = report.failure_count(),
            entities = report.totals.entities,
            relations = report.totals.relations,
            "batch complete"
        );

        report
    }

    async fn publish_pair(&self, pair: &FilePair) -> Result<PublishedDocument> {
        let segments = tokio::fs::read(&pair.segments_file).await?;
        let annotations = tokio::fs::read(&pair.annotations_file).await?;
        let pipeline = self.clone();

        tokio::task::spawn_blocking(move || pipeline.publish_bytes(&segments, &annotations))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }
}

/// Pair every `municipio_<name>/*_annotations.json` segment file with the
/// annotation export of the same base name in `annotations_dir`. Segment
/// files without a counterpart are logged and skipped.
pub async fn find_matching_files(segments_dir: &Path, annotations_dir: &Path) -> Result<Vec<FilePair>> {
    let mut pairs = Vec::new();
    let mut municipalities = tokio::fs::read_dir(segments_dir).await?;

    while let Some(entry) = municipalities.next_entry().await? {
        let dir = entry.path();
        let Some(municipality) = dir
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(MUNICIPALITY_DIR_PREFIX))
            .map(String::from)
        else {
            continue;
        };
        if !entry.file_type().await?.is_dir() {
            continue;
        }

        let mut files = tokio::fs::read_dir(&dir).await?;
        while let Some(file) = files.next_entry().await? {
            let segments_file = file.path();
            let Some(base) = segments_file
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(annotation_file_name)
            else {
                continue;
            };

            let annotations_file = annotations_dir.join(&base);
            if tokio::fs::try_exists(&annotations_file).await? {
                pairs.push(FilePair {
                    segments_file,
                    annotations_file,
                    municipality: municipality.clone(),
                });
            } else {
                tracing::warn!(file = %segments_file.display(), "no matching annotation file");
            }
        }
    }

    pairs.sort_by(|a, b| a.annotations_file.cmp(&b.annotations_file));
    tracing::info!(pairs = pairs.len(), "found matching file pairs");
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionPolicy;
    use serde_json::{json, Value};

    const MINUTES: &str = "Fronteira: Proposta n.º 12 aprovada por unanimidade. Fim do ponto.";

    fn annotations() -> Value {
        json!({"%FEATURE_STRUCTURES": [
            {"%ID": 1, "%TYPE": "uima.cas.Sofa", "sofaString": MINUTES},
            {"%ID": 2, "%TYPE": "custom.Span", "@sofa": 1, "begin": 0, "end": 9, "label": "Assunto", "Fronteira": "Fronteira Inicial"},
            {"%ID": 3, "%TYPE": "custom.Span", "@sofa": 1, "begin": 11, "end": 26, "label": "Assunto", "Tema": "Obras"},
            {"%ID": 4, "%TYPE": "custom.Span", "@sofa": 1, "begin": 11, "end": 26, "label": "Posicionamento", "Posicionamento": "Votação"},
            {"%ID": 5, "%TYPE": "custom.Span", "@sofa": 1, "begin": 36, "end": 51, "label": "Posicionamento", "Posicionamento": "Resultado"},
            {"%ID": 6, "%TYPE": "custom.Span", "@sofa": 1, "begin": 53, "end": 56, "label": "Assunto", "Fronteira": "Fronteira Final"},
            {"%ID": 7, "%TYPE": "custom.Relation", "@sofa": 1, "label": "resultado", "@Governor": 4, "@Dependent": 5, "resultado": "por unanimidade"},
            {"%ID": 8, "%TYPE": "custom.Span", "@sofa": 1, "begin": 24, "end": 26, "label": "Votação"}
        ]})
    }

    fn segments() -> Value {
        json!({
            "document_id": "Evora_cm_001",
            "segments": [
                {"segment_id": 1, "text": "Fronteira: Proposta n.º 12 aprovada", "start_pos": 0, "end_pos": 35},
                {"segment_id": 2, "text": " por unanimidade. Fim do ponto.", "start_pos": 35, "end_pos": 66}
            ]
        })
    }

    fn load() -> LoadedDocument {
        Loader::new().load_value(&annotations()).unwrap()
    }

    #[test]
    fn test_analyze_document() {
        let pipeline = AnnotationPipeline::default();
        let meta = DocumentMeta::from_filename("Evora_cm_001_2021-03-04.json");

        let analysis = pipeline.analyze(meta, &load()).unwrap();

        assert_eq!(analysis.entity_count(), 3);
        assert_eq!(analysis.relation_count(), 1);
        assert_eq!(analysis.markers.len(), 2);
        assert_eq!(analysis.sections.len(), 1);
        let section = &analysis.sections[0];
        assert_eq!((section.begin, section.end), (9, 53));
        assert_eq!(section.keyword_entities.len(), 1);
        assert_eq!(section.keyword_entities[0].semantics.tema.as_deref(), Some("Obras"));
        assert_eq!(analysis.diagnostics.count(crate::FilterReason::ShortNumeric), 1);
        assert_eq!(analysis.stats.total_feature_structures, 8);
        assert_eq!(analysis.stats.span_types.get("Assunto"), Some(&3));
    }

    #[test]
    fn test_document_votes() {
        let analysis = AnnotationPipeline::default()
            .analyze(DocumentMeta::from_filename("x.json"), &load())
            .unwrap();

        let votes = analysis.votes();

        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].vote_text, "Proposta n.º 12");
        assert_eq!(votes[0].resultado.as_deref(), Some("por unanimidade"));
        assert!(!votes[0].complete);
    }

    #[test]
    fn test_publish_segments() {
        let pipeline = AnnotationPipeline::default();
        let file: SegmentsFile = serde_json::from_value(segments()).unwrap();

        let published = pipeline.publish_segments(&load(), &file);

        assert_eq!(published.statistics.processed_segments, 2);
        assert_eq!(published.segments[0].entities.len(), 2);
        assert_eq!(published.segments[0].relations.len(), 0);
        assert_eq!(published.segments[1].entities[0].text, "por unanimidade");
        assert_eq!(published.segments[1].entities[0].begin, 1);
        assert_eq!(published.statistics.annotation_stats.total_feature_structures, 8);
        assert_eq!(published.statistics.diagnostics.unresolved_relations, 2);
    }

    #[test]
    fn test_policy_is_applied() {
        let policy = ExtractionPolicy {
            min_numeric_chars: 2,
            ..ExtractionPolicy::default()
        };
        let pipeline = AnnotationPipeline::new(PipelineConfig::default().with_policy(policy));

        let analysis = pipeline.analyze(DocumentMeta::from_filename("x.json"), &load()).unwrap();

        assert_eq!(analysis.entity_count(), 4);
    }

    fn write_corpus(root: &Path) -> (PathBuf, PathBuf) {
        let segments_dir = root.join("segments");
        let annotations_dir = root.join("annotations");
        let muni = segments_dir.join("municipio_evora");
        std::fs::create_dir_all(&muni).unwrap();
        std::fs::create_dir_all(&annotations_dir).unwrap();
        std::fs::create_dir_all(segments_dir.join("outros")).unwrap();

        for name in ["Evora_cm_001_2021-03-04", "Evora_cm_002_2021-04-01"] {
            std::fs::write(muni.join(format!("{name}_annotations.json")), segments().to_string()).unwrap();
        }
        std::fs::write(muni.join("Evora_cm_009_2021-09-09_annotations.json"), "{}").unwrap();
        std::fs::write(muni.join("notas.txt"), "").unwrap();

        std::fs::write(
            annotations_dir.join("Evora_cm_001_2021-03-04.json"),
            annotations().to_string(),
        )
        .unwrap();
        std::fs::write(
            annotations_dir.join("Evora_cm_002_2021-04-01.json"),
            json!({"%FEATURE_STRUCTURES": []}).to_string(),
        )
        .unwrap();

        (segments_dir, annotations_dir)
    }

    #[tokio::test]
    async fn test_find_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        let (segments_dir, annotations_dir) = write_corpus(dir.path());

        let pairs = find_matching_files(&segments_dir, &annotations_dir).await.unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].municipality, "evora");
        assert!(pairs[0].annotations_file.ends_with("Evora_cm_001_2021-03-04.json"));
    }

    #[tokio::test]
    async fn test_publish_batch_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let (segments_dir, annotations_dir) = write_corpus(dir.path());
        let pairs = find_matching_files(&segments_dir, &annotations_dir).await.unwrap();
        let pipeline = AnnotationPipeline::new(PipelineConfig::default().with_workers(2));

        let report = pipeline.publish_batch(pairs).await;

        assert_eq!(report.success_count(), 1);
        assert_eq!(report.failure_count(), 1);
        assert!(matches!(report.failed[0].1, Error::MissingText));
        assert_eq!(report.successful[0].meta.document_id, "Evora_cm_001");
        assert_eq!(report.totals.documents, 1);
        assert_eq!(report.totals.segments, 2);

        let summary = report.summary();
        assert_eq!(summary.total_files, 2);
        assert_eq!(summary.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Evora_cm_001_2021-03-04.json");
        std::fs::write(&path, annotations().to_string()).unwrap();

        let analysis = AnnotationPipeline::default().analyze_file(&path).await.unwrap();

        assert_eq!(analysis.meta.municipality, "Evora");
        assert_eq!(analysis.text_source, TextSource::FeatureStructures);
    }
}

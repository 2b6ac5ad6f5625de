//! Re-scoping a document's annotations onto externally supplied segments.
//!
//! Every segment is an independent extraction over its own window: entity ids
//! restart at `T1`, relations only link entities of the same segment, and an
//! annotation overlapping several segments appears in each of them.

use serde::{Deserialize, Serialize};

use super::extractor::{EntityExtractor, Window};
use super::linker::RelationLinker;
use super::loader::LoadedDocument;
use crate::config::ExtractionPolicy;
use crate::dataset::{Segment, SegmentId};
use crate::diagnostics::{AnnotationStats, Diagnostics};
use crate::entity::EntitySpan;
use crate::error::RecordError;
use crate::relationship::RelationAnnotation;
use crate::text::TextBuffer;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedSegment {
    pub segment_id: SegmentId,
    pub window: Window,
    pub entities: Vec<EntitySpan>,
    pub relations: Vec<RelationAnnotation>,
    pub diagnostics: Diagnostics,
    pub stats: AnnotationStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentFailure {
    pub segment_id: SegmentId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub aligned: Vec<AlignedSegment>,
    pub failed: Vec<SegmentFailure>,
    /// Malformed records, counted once for the whole document.
    pub document_diagnostics: Diagnostics,
    /// Per-label tallies over every record of the document.
    pub document_stats: AnnotationStats,
}

impl SegmentReport {
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.aligned.iter().map(|s| s.entities.len()).sum()
    }

    #[must_use]
    pub fn relation_count(&self) -> usize {
        self.aligned.iter().map(|s| s.relations.len()).sum()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SegmentAligner<'p> {
    policy: &'p ExtractionPolicy,
    extractor: EntityExtractor<'p>,
    linker: RelationLinker,
}

impl<'p> SegmentAligner<'p> {
    #[must_use]
    pub fn new(policy: &'p ExtractionPolicy) -> Self {
        Self {
            policy,
            extractor: EntityExtractor::new(policy),
            linker: RelationLinker::segment_scoped(),
        }
    }

    /// Align every segment, in input order. A segment that cannot be
    /// aligned is reported and does not affect its siblings.
    #[must_use]
    pub fn align(&self, document: &LoadedDocument, segments: &[Segment]) -> SegmentReport {
        let (document_diagnostics, document_stats) = self.document_scope(document);
        let mut report = SegmentReport {
            document_diagnostics,
            document_stats,
            ..SegmentReport::default()
        };

        for segment in segments {
            match self.align_one(document, segment) {
                Ok(aligned) => report.aligned.push(aligned),
                Err(e) => {
                    tracing::warn!(segment = %segment.segment_id, error = %e, "segment skipped");
                    report.failed.push(SegmentFailure {
                        segment_id: segment.segment_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    pub fn align_one(&self, document: &LoadedDocument, segment: &Segment) -> Result<AlignedSegment> {
        let window = segment.window();
        let records = document.records();

        let mut extraction = self.extractor.extract(document.text(), records, Some(window))?;
        let linkage = self.linker.link(records, &extraction.id_map);

        let segment_text = TextBuffer::new(segment.text.as_str());
        for entity in &mut extraction.entities {
            match segment_text.slice(entity.begin, entity.end) {
                Some(text) => text.clone_into(&mut entity.text),
                None => extraction.diagnostics.segment_text_mismatches += 1,
            }
        }
        if extraction.diagnostics.segment_text_mismatches > 0 {
            tracing::debug!(
                segment = %segment.segment_id,
                mismatches = extraction.diagnostics.segment_text_mismatches,
                "segment text shorter than its window"
            );
        }

        let mut diagnostics = extraction.diagnostics;
        diagnostics.merge(linkage.diagnostics);
        diagnostics.limit(self.policy.max_filter_examples);
        let mut stats = extraction.stats;
        stats.merge(&linkage.stats);

        tracing::debug!(
            segment = %segment.segment_id,
            entities = extraction.entities.len(),
            relations = linkage.relations.len(),
            "aligned segment"
        );

        Ok(AlignedSegment {
            segment_id: segment.segment_id.clone(),
            window,
            entities: extraction.entities,
            relations: linkage.relations,
            diagnostics,
            stats,
        })
    }

    /// Records that no window owns: malformed spans and relations, plus the
    /// label tallies every segment scan would otherwise repeat.
    fn document_scope(&self, document: &LoadedDocument) -> (Diagnostics, AnnotationStats) {
        let records = document.records();
        let Ok(extraction) = self.extractor.extract(document.text(), records, None) else {
            return (Diagnostics::new(), AnnotationStats::default());
        };
        let linkage = RelationLinker::new().link(records, &extraction.id_map);

        let mut diagnostics = Diagnostics::new();
        diagnostics.malformed_records =
            extraction.diagnostics.malformed_records + linkage.diagnostics.malformed_records;
        diagnostics.issues = extraction
            .diagnostics
            .issues
            .into_iter()
            .chain(linkage.diagnostics.issues)
            .filter(|issue| matches!(issue, RecordError::MalformedRecord { .. }))
            .collect();
        diagnostics.limit(self.policy.max_filter_examples);

        let stats = AnnotationStats {
            span_types: extraction.stats.span_types,
            validation_stats: extraction.stats.validation_stats,
            relation_types: linkage.stats.relation_types,
            ..AnnotationStats::default()
        };
        (diagnostics, stats)
    }
}

//! Segment input files and the publication records built from them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostics::{AnnotationStats, Diagnostics};
use crate::entity::{EntitySpan, LabelKind};
use crate::ingest::{AlignedSegment, SegmentFailure, SegmentReport, Window};
use crate::relationship::RelationAnnotation;
use crate::Result;

pub const DATASET_NAME: &str = "Portuguese Municipal Voting Annotations";
pub const DATASET_DESCRIPTION: &str =
    "Bilingual dataset of Portuguese municipal council voting records with NER annotations";
pub const DATASET_VERSION: &str = "2.0";
pub const DATASET_LICENSE: &str = "CC BY 4.0";
pub const DATASET_LANGUAGES: &[&str] = &["pt", "en"];

/// Segment ids appear both as numbers and as strings in segment files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One text window over a document, as produced by the segmenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: SegmentId,
    pub text: String,
    #[serde(default)]
    pub text_en: Option<String>,
    pub start_pos: usize,
    pub end_pos: usize,
    #[serde(default)]
    pub topics: Option<Vec<Value>>,
    #[serde(default)]
    pub topics_en: Option<Vec<Value>>,
    #[serde(default)]
    pub tema: Option<String>,
    #[serde(default)]
    pub tema_en: Option<String>,
}

impl Segment {
    #[must_use]
    pub fn new(segment_id: SegmentId, start_pos: usize, end_pos: usize, text: String) -> Self {
        Self {
            segment_id,
            text,
            text_en: None,
            start_pos,
            end_pos,
            topics: None,
            topics_en: None,
            tema: None,
            tema_en: None,
        }
    }

    #[must_use]
    pub fn window(&self) -> Window {
        Window::new(self.start_pos, self.end_pos)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentsFile {
    #[serde(default)]
    pub document_id: Option<String>,
    pub segments: Vec<Segment>,
}

impl SegmentsFile {
    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        Self::from_slice(&data)
    }

    pub fn from_slice(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// An entity as it appears in a publication record. Only a subject's theme
/// is carried over from the semantic fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub label: String,
    pub begin: usize,
    pub end: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tema: Option<String>,
}

impl From<EntitySpan> for PublishedEntity {
    fn from(entity: EntitySpan) -> Self {
        let tema = match entity.label_kind() {
            LabelKind::Subject => entity.semantics.tema,
            _ => None,
        };
        Self {
            id: entity.id,
            label: entity.label,
            begin: entity.begin,
            end: entity.end,
            text: entity.text,
            subtype: entity.subtype,
            attributes: entity.attributes,
            tema,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedSegment {
    pub segment_id: SegmentId,
    pub document_id: Option<String>,
    pub start_position: usize,
    pub end_position: usize,
    pub length: usize,
    pub text_pt: String,
    pub text_en: String,
    pub entities: Vec<PublishedEntity>,
    pub relations: Vec<RelationAnnotation>,
    pub topics: Vec<Value>,
    pub topics_en: Vec<Value>,
    pub tema: String,
    pub tema_en: String,
}

impl PublishedSegment {
    #[must_use]
    pub fn new(segment: &Segment, document_id: Option<&str>, aligned: AlignedSegment) -> Self {
        Self {
            segment_id: aligned.segment_id,
            document_id: document_id.map(String::from),
            start_position: segment.start_pos,
            end_position: segment.end_pos,
            length: segment.end_pos.saturating_sub(segment.start_pos),
            text_pt: segment.text.clone(),
            text_en: segment.text_en.clone().unwrap_or_default(),
            entities: aligned.entities.into_iter().map(PublishedEntity::from).collect(),
            relations: aligned.relations,
            topics: segment.topics.clone().unwrap_or_default(),
            topics_en: segment.topics_en.clone().unwrap_or_default(),
            tema: segment.tema.clone().unwrap_or_default(),
            tema_en: segment.tema_en.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSchema {
    pub entities: BTreeSet<String>,
    pub relations: BTreeSet<String>,
}

impl AnnotationSchema {
    pub fn observe(&mut self, segment: &PublishedSegment) {
        self.entities
            .extend(segment.entities.iter().map(|e| e.label.clone()));
        self.relations
            .extend(segment.relations.iter().map(|r| r.label.clone()));
    }

    pub fn merge(&mut self, other: &Self) {
        self.entities.extend(other.entities.iter().cloned());
        self.relations.extend(other.relations.iter().cloned());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "language")]
    pub languages: Vec<String>,
    pub annotation_schema: AnnotationSchema,
    pub version: String,
    pub license: String,
}

impl DatasetInfo {
    #[must_use]
    pub fn new(annotation_schema: AnnotationSchema) -> Self {
        Self {
            name: DATASET_NAME.to_string(),
            description: DATASET_DESCRIPTION.to_string(),
            languages: DATASET_LANGUAGES.iter().map(|l| (*l).to_string()).collect(),
            annotation_schema,
            version: DATASET_VERSION.to_string(),
            license: DATASET_LICENSE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStatistics {
    pub total_segments: usize,
    pub processed_segments: usize,
    pub failed_segments: usize,
    pub total_entities: usize,
    pub total_relations: usize,
    pub filtered_entities: usize,
    pub annotation_stats: AnnotationStats,
    pub diagnostics: Diagnostics,
}

/// Publication record for one document: its aligned segments plus the
/// aggregate counts over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedDocument {
    pub dataset_info: DatasetInfo,
    pub statistics: DocumentStatistics,
    pub segments: Vec<PublishedSegment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SegmentFailure>,
}

impl PublishedDocument {
    /// Assemble the publication record from an alignment report over
    /// `file`. `base_stats` carries the document-level counts (feature
    /// structures, sofas) that no single segment owns; example and issue
    /// lists are trimmed to `max_examples`.
    #[must_use]
    pub fn assemble(
        file: &SegmentsFile,
        report: SegmentReport,
        base_stats: AnnotationStats,
        max_examples: usize,
    ) -> Self {
        let mut statistics = DocumentStatistics {
            total_segments: file.segments.len(),
            failed_segments: report.failed.len(),
            annotation_stats: base_stats,
            diagnostics: report.document_diagnostics,
            ..DocumentStatistics::default()
        };
        statistics.annotation_stats.merge(&report.document_stats);
        let mut schema = AnnotationSchema::default();
        let mut segments = Vec::with_capacity(report.aligned.len());

        for mut aligned in report.aligned {
            let Some(source) = file
                .segments
                .iter()
                .find(|s| s.segment_id == aligned.segment_id && s.window() == aligned.window)
            else {
                continue;
            };

            statistics.annotation_stats.total_spans += aligned.stats.total_spans;
            statistics.annotation_stats.total_relations += aligned.stats.total_relations;
            statistics.diagnostics.merge(std::mem::take(&mut aligned.diagnostics));

            let published = PublishedSegment::new(source, file.document_id.as_deref(), aligned);
            schema.observe(&published);
            statistics.total_entities += published.entities.len();
            statistics.total_relations += published.relations.len();
            segments.push(published);
        }

        statistics.diagnostics.limit(max_examples);
        statistics.processed_segments = segments.len();
        statistics.filtered_entities = statistics.diagnostics.filtered_count();
        statistics.annotation_stats.has_annotations =
            statistics.total_entities > 0 || statistics.total_relations > 0;

        Self {
            dataset_info: DatasetInfo::new(schema),
            statistics,
            segments,
            failures: report.failed,
        }
    }
}

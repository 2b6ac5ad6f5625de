pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod document;
pub mod entity;
pub mod error;
pub mod ingest;
pub mod record;
pub mod relationship;
pub mod section;
pub mod text;
pub mod voting;

pub use config::{ExtractionPolicy, PipelineConfig};
pub use dataset::{
    AnnotationSchema, DatasetInfo, DocumentStatistics, PublishedDocument, PublishedEntity,
    PublishedSegment, Segment, SegmentId, SegmentsFile,
};
pub use diagnostics::{AnnotationStats, Diagnostics, FilterReason, FilteredSpan};
pub use document::DocumentMeta;
pub use entity::{EntitySpan, LabelKind, SemanticFields};
pub use error::{Error, RecordError, Result};
pub use ingest::{
    find_matching_files, AlignedSegment, AnnotationPipeline, BatchReport, DocumentAnnotation,
    EntityExtractor, FilePair, Loader, RelationLinker, SegmentAligner, Window,
};
pub use record::{AnnotationRecord, RecordKind};
pub use relationship::{RelationAnnotation, VoteRelation};
pub use section::{pair_sections, AssuntoSection, BoundaryKind, BoundaryMarker};
pub use text::TextBuffer;
pub use voting::{consolidate_votes, vote_links, VoteLink, VoteRecord};

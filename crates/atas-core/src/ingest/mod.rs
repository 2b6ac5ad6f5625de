mod aligner;
mod extractor;
mod linker;
mod loader;
mod pipeline;

pub use aligner::{AlignedSegment, SegmentAligner, SegmentFailure, SegmentReport};
pub use extractor::{EntityExtraction, EntityExtractor, IdMap, Window};
pub use linker::{Linkage, RelationLinker};
pub use loader::{LoadedDocument, Loader, TextSource};
pub use pipeline::{
    find_matching_files, AnnotationPipeline, BatchOutput, BatchReport, BatchStats, BatchSummary,
    DocumentAnnotation, DocumentSummary, FileFailure, FilePair, MUNICIPALITY_DIR_PREFIX,
};

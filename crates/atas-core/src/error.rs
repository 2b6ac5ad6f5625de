use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::section::BoundaryKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No usable text buffer in annotation payload")]
    MissingText,

    #[error("Invalid annotation payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid segment window {start}..{end} for buffer of length {len}")]
    InvalidWindow { start: usize, end: usize, len: usize },

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Worker task failed: {0}")]
    Task(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Problems with a single record. These never abort a scan; they are
/// collected into the diagnostics of the call that hit them.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum RecordError {
    #[error("Malformed record {record_id:?}: {reason}")]
    MalformedRecord {
        record_id: Option<u64>,
        reason: String,
    },

    #[error("Relation {relation_id:?} references span {endpoint} outside the extracted set")]
    UnresolvedReference {
        relation_id: Option<u64>,
        endpoint: u64,
    },

    #[error("Unbalanced {marker} marker {record_id:?} at {begin}")]
    UnbalancedMarker {
        record_id: Option<u64>,
        marker: BoundaryKind,
        begin: usize,
    },
}

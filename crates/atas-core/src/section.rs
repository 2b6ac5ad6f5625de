//! Topic sections delimited by frontier markers.
//!
//! Markers are not linked to each other in the source data; only their text
//! order relates an opening to its closing. Pairing is a single greedy pass:
//! each opening takes the first closing after it. Nested or interleaved
//! sections cannot be represented and collapse into fewer sections.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::entity::EntitySpan;
use crate::error::RecordError;
use crate::text::TextBuffer;

pub const OPENING_MARKER: &str = "Fronteira Inicial";
pub const CLOSING_MARKER: &str = "Fronteira Final";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    Opening,
    Closing,
}

impl BoundaryKind {
    #[must_use]
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value.trim() {
            OPENING_MARKER => Some(Self::Opening),
            CLOSING_MARKER => Some(Self::Closing),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Closing => "closing",
        }
    }
}

impl std::fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A frontier span set aside during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryMarker {
    pub record_id: Option<u64>,
    pub kind: BoundaryKind,
    pub begin: usize,
    pub end: usize,
}

impl BoundaryMarker {
    fn unbalanced(&self) -> RecordError {
        RecordError::UnbalancedMarker {
            record_id: self.record_id,
            marker: self.kind,
            begin: self.begin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssuntoSection {
    pub id: String,
    pub begin: usize,
    pub end: usize,
    pub text: String,
    pub section_number: usize,
    pub keyword_entities: Vec<EntitySpan>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPairing {
    pub sections: Vec<AssuntoSection>,
    pub diagnostics: Diagnostics,
}

/// Pair frontier markers into sections over `buffer`. Each section spans
/// from the end of its opening marker to the start of its closing marker
/// and lists the themed subject entities lying fully inside it.
#[must_use]
pub fn pair_sections(
    markers: &[BoundaryMarker],
    entities: &[EntitySpan],
    buffer: &TextBuffer,
) -> SectionPairing {
    let mut ordered: Vec<&BoundaryMarker> = markers.iter().collect();
    ordered.sort_by_key(|m| (m.begin, m.end));

    let mut pairing = SectionPairing::default();
    let mut i = 0;

    while i < ordered.len() {
        let current = ordered[i];

        if current.kind == BoundaryKind::Closing {
            tracing::debug!(begin = current.begin, "closing marker without opening");
            pairing.diagnostics.record_issue(current.unbalanced());
            i += 1;
            continue;
        }

        let Some(offset) = ordered[i + 1..]
            .iter()
            .position(|m| m.kind == BoundaryKind::Closing)
        else {
            tracing::debug!(begin = current.begin, "opening marker without closing");
            pairing.diagnostics.record_issue(current.unbalanced());
            i += 1;
            continue;
        };
        let j = i + 1 + offset;

        for skipped in &ordered[i + 1..j] {
            tracing::debug!(begin = skipped.begin, "opening marker inside an open section");
            pairing.diagnostics.record_issue(skipped.unbalanced());
        }

        let closing = ordered[j];
        let (begin, end) = (current.end, closing.begin);
        if begin < end {
            let number = pairing.sections.len() + 1;
            pairing.sections.push(AssuntoSection {
                id: format!("section_{number}"),
                begin,
                end,
                text: buffer.slice(begin, end).unwrap_or_default().to_string(),
                section_number: number,
                keyword_entities: entities
                    .iter()
                    .filter(|e| e.is_keyword() && e.lies_within(begin, end))
                    .cloned()
                    .collect(),
            });
        }

        i = j + 1;
    }

    pairing
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ExtractionPolicy;
use crate::diagnostics::{AnnotationStats, Diagnostics, FilterReason, FilteredSpan};
use crate::entity::{derive_subtype, keys, EntitySpan, LabelKind, SemanticFields};
use crate::error::RecordError;
use crate::record::{AnnotationRecord, SpanRecord};
use crate::section::{BoundaryKind, BoundaryMarker};
use crate::text::TextBuffer;
use crate::{Error, Result};

/// A `[start, end)` character range of a buffer that an extraction is
/// restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn whole(buffer: &TextBuffer) -> Self {
        Self::new(0, buffer.char_len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn overlaps(&self, begin: usize, end: usize) -> bool {
        begin < self.end && end > self.start
    }

    /// Translate global offsets into window offsets, clamped to the window.
    #[must_use]
    pub fn to_local(&self, begin: usize, end: usize) -> (usize, usize) {
        (
            begin.saturating_sub(self.start),
            end.saturating_sub(self.start).min(self.len()),
        )
    }

    #[must_use]
    pub fn to_global(&self, begin: usize, end: usize) -> (usize, usize) {
        (begin + self.start, end + self.start)
    }

    fn check(&self, buffer: &TextBuffer) -> Result<()> {
        let len = buffer.char_len();
        if self.start > self.end || self.end > len {
            return Err(Error::InvalidWindow {
                start: self.start,
                end: self.end,
                len,
            });
        }
        Ok(())
    }
}

/// Maps source record ids to the `T<n>` ids assigned by one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMap(BTreeMap<u64, String>);

impl IdMap {
    #[must_use]
    pub fn get(&self, record_id: u64) -> Option<&str> {
        self.0.get(&record_id).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, record_id: u64) -> bool {
        self.0.contains_key(&record_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, record_id: u64, entity_id: String) {
        self.0.insert(record_id, entity_id);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityExtraction {
    pub entities: Vec<EntitySpan>,
    pub markers: Vec<BoundaryMarker>,
    pub id_map: IdMap,
    pub diagnostics: Diagnostics,
    pub stats: AnnotationStats,
}

struct Candidate<'r> {
    order: usize,
    record: &'r SpanRecord,
    label: &'r str,
    begin: usize,
    end: usize,
}

/// Applies the inclusion policy to span records and numbers the survivors.
#[derive(Debug, Clone, Copy)]
pub struct EntityExtractor<'p> {
    policy: &'p ExtractionPolicy,
}

impl<'p> EntityExtractor<'p> {
    #[must_use]
    pub fn new(policy: &'p ExtractionPolicy) -> Self {
        Self { policy }
    }

    /// Extract entities from `records` over `buffer`, restricted to
    /// `window` (the whole buffer when `None`). Offsets and text of the
    /// result are relative to the window.
    ///
    /// Malformed span records belong to no window, so only a document-scope
    /// call (`window == None`) reports them.
    pub fn extract(
        &self,
        buffer: &TextBuffer,
        records: &[AnnotationRecord],
        window: Option<Window>,
    ) -> Result<EntityExtraction> {
        let document_scope = window.is_none();
        let window = window.unwrap_or_else(|| Window::whole(buffer));
        window.check(buffer)?;

        let mut output = EntityExtraction::default();
        let mut candidates = Vec::new();

        for (order, record) in records.iter().enumerate() {
            let AnnotationRecord::Span(span) = record else {
                continue;
            };

            if let Some(label) = &span.label {
                *output.stats.span_types.entry(label.clone()).or_insert(0) += 1;
            }
            if let Some(validated) = &span.validated {
                *output.stats.validation_stats.entry(validated.clone()).or_insert(0) += 1;
            }

            let (begin, end) = match span_offsets(span, buffer) {
                Ok(offsets) => offsets,
                Err(reason) => {
                    if document_scope {
                        tracing::debug!(record = ?span.id, %reason, "malformed span");
                        output.diagnostics.record_issue(RecordError::MalformedRecord {
                            record_id: span.id,
                            reason,
                        });
                    }
                    continue;
                }
            };

            if !window.overlaps(begin, end) {
                continue;
            }

            let Some(label) = span.label.as_deref() else {
                if document_scope {
                    tracing::debug!(record = ?span.id, "span without label");
                    output.diagnostics.record_issue(RecordError::MalformedRecord {
                        record_id: span.id,
                        reason: "missing label".into(),
                    });
                }
                continue;
            };

            let text = buffer.slice(begin, end).unwrap_or_default();

            if let Some(validated) = span.validated.as_deref() {
                if self.policy.rejects_validation(validated) {
                    self.reject(
                        &mut output.diagnostics,
                        span,
                        label,
                        text,
                        FilterReason::NotValidated,
                        format!("Validated={validated}"),
                    );
                    continue;
                }
            }

            if self.policy.is_personal_info(label) {
                continue;
            }

            if LabelKind::from_label(label) == LabelKind::Subject {
                if let Some(frontier) = span.feature(keys::FRONTEIRA) {
                    if let Some(kind) = BoundaryKind::from_attribute(frontier) {
                        let (begin, end) = window.to_local(begin, end);
                        output.markers.push(BoundaryMarker {
                            record_id: span.id,
                            kind,
                            begin,
                            end,
                        });
                    }
                    continue;
                }
                if span.feature(keys::TEMA).is_none() {
                    self.reject(
                        &mut output.diagnostics,
                        span,
                        label,
                        text,
                        FilterReason::MissingTheme,
                        "subject without theme".into(),
                    );
                    continue;
                }
            }

            if let Err((reason, detail)) = self.validate_text(text, label, end - begin) {
                self.reject(&mut output.diagnostics, span, label, text, reason, detail);
                continue;
            }

            candidates.push(Candidate {
                order,
                record: span,
                label,
                begin,
                end,
            });
        }

        candidates.sort_by_key(|c| (c.begin, c.end, c.order));

        for (index, candidate) in candidates.iter().enumerate() {
            let entity_id = format!("T{}", index + 1);
            let (local_begin, local_end) = window.to_local(candidate.begin, candidate.end);
            let (global_begin, global_end) = window.to_global(local_begin, local_end);
            let text = buffer
                .slice(global_begin, global_end)
                .unwrap_or_default()
                .to_string();

            let kind = LabelKind::from_label(candidate.label);
            let (subtype, attributes) = derive_subtype(candidate.record, kind);

            if let Some(record_id) = candidate.record.id {
                output.id_map.insert(record_id, entity_id.clone());
            }

            output.entities.push(
                EntitySpan::new(
                    entity_id,
                    candidate.label.to_string(),
                    local_begin,
                    local_end,
                    text,
                )
                .with_subtype(subtype)
                .with_attributes(attributes)
                .with_semantics(SemanticFields::from_record(candidate.record))
                .with_source_id(candidate.record.id),
            );
        }

        output.diagnostics.limit(self.policy.max_filter_examples);
        output.stats.total_spans = output.entities.len();
        output.stats.has_annotations = !output.entities.is_empty();

        let filtered = output.diagnostics.filtered_count();
        if filtered > 0 {
            tracing::info!(
                window_start = window.start,
                window_end = window.end,
                filtered,
                accepted = output.entities.len(),
                "filtered spans"
            );
        }

        Ok(output)
    }

    /// Content rules for span text, in the order they are reported.
    pub fn validate_text(
        &self,
        text: &str,
        label: &str,
        span_chars: usize,
    ) -> std::result::Result<(), (FilterReason, String)> {
        let policy = self.policy;

        if span_chars < policy.min_span_chars && !policy.allows_short_span(label) {
            return Err((
                FilterReason::TooShort,
                format!(
                    "too short (length={span_chars}, minimum={})",
                    policy.min_span_chars
                ),
            ));
        }

        let stripped = text.trim();
        let stripped_chars = stripped.chars().count();

        let mut chars = stripped.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if policy.punctuation.contains(&c) {
                return Err((FilterReason::Punctuation, format!("single punctuation '{c}'")));
            }
            if !policy.allowed_single_letters.contains(&c) {
                return Err((
                    FilterReason::SingleCharacter,
                    format!("single meaningless character '{c}'"),
                ));
            }
        }

        if stripped_chars > 0
            && stripped.chars().all(char::is_numeric)
            && stripped_chars < policy.min_numeric_chars
        {
            return Err((
                FilterReason::ShortNumeric,
                format!(
                    "short numeric content '{stripped}' (minimum={})",
                    policy.min_numeric_chars
                ),
            ));
        }

        Ok(())
    }

    fn reject(
        &self,
        diagnostics: &mut Diagnostics,
        span: &SpanRecord,
        label: &str,
        text: &str,
        reason: FilterReason,
        detail: String,
    ) {
        tracing::debug!(record = ?span.id, label, text, %reason, %detail, "filtered span");
        diagnostics.record_filtered(
            FilteredSpan {
                record_id: span.id,
                label: label.to_string(),
                text: text.to_string(),
                reason,
                detail,
            },
            self.policy.max_filter_examples,
        );
    }
}

fn span_offsets(span: &SpanRecord, buffer: &TextBuffer) -> std::result::Result<(usize, usize), String> {
    let (Some(begin), Some(end)) = (span.begin, span.end) else {
        return Err("missing begin/end".into());
    };
    let (Ok(begin), Ok(end)) = (usize::try_from(begin), usize::try_from(end)) else {
        return Err(format!("negative offsets {begin}..{end}"));
    };
    if begin >= end {
        return Err(format!("empty or inverted range {begin}..{end}"));
    }
    if end > buffer.char_len() {
        return Err(format!(
            "range {begin}..{end} exceeds buffer length {}",
            buffer.char_len()
        ));
    }
    Ok((begin, end))
}

//! Per-call extraction reports.
//!
//! Every extraction, linking and pairing call returns its own
//! [`Diagnostics`] value instead of writing to shared state, so callers can
//! merge reports from independent scopes in any order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    NotValidated,
    MissingTheme,
    TooShort,
    Punctuation,
    SingleCharacter,
    ShortNumeric,
}

impl FilterReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotValidated => "not_validated",
            Self::MissingTheme => "missing_theme",
            Self::TooShort => "too_short",
            Self::Punctuation => "punctuation",
            Self::SingleCharacter => "single_character",
            Self::ShortNumeric => "short_numeric",
        }
    }
}

impl std::fmt::Display for FilterReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected span kept as an example in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredSpan {
    pub record_id: Option<u64>,
    pub label: String,
    pub text: String,
    pub reason: FilterReason,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub filtered: BTreeMap<FilterReason, usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<FilteredSpan>,
    pub malformed_records: usize,
    pub unresolved_relations: usize,
    pub unbalanced_markers: usize,
    pub segment_text_mismatches: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<RecordError>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_filtered(&mut self, example: FilteredSpan, max_examples: usize) {
        *self.filtered.entry(example.reason).or_insert(0) += 1;
        if self.examples.len() < max_examples {
            self.examples.push(example);
        }
    }

    pub fn record_issue(&mut self, issue: RecordError) {
        match &issue {
            RecordError::MalformedRecord { .. } => self.malformed_records += 1,
            RecordError::UnresolvedReference { .. } => self.unresolved_relations += 1,
            RecordError::UnbalancedMarker { .. } => self.unbalanced_markers += 1,
        }
        self.issues.push(issue);
    }

    /// Total spans rejected by the content and validation rules.
    #[must_use]
    pub fn filtered_count(&self) -> usize {
        self.filtered.values().sum()
    }

    #[must_use]
    pub fn count(&self, reason: FilterReason) -> usize {
        self.filtered.get(&reason).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.filtered.is_empty()
            && self.issues.is_empty()
            && self.segment_text_mismatches == 0
    }

    pub fn merge(&mut self, other: Self) {
        for (reason, count) in other.filtered {
            *self.filtered.entry(reason).or_insert(0) += count;
        }
        self.examples.extend(other.examples);
        self.malformed_records += other.malformed_records;
        self.unresolved_relations += other.unresolved_relations;
        self.unbalanced_markers += other.unbalanced_markers;
        self.segment_text_mismatches += other.segment_text_mismatches;
        self.issues.extend(other.issues);
    }

    /// Trim the example and issue lists to `max` entries each. Counters keep
    /// their full totals.
    pub fn limit(&mut self, max: usize) {
        self.examples.truncate(max);
        self.issues.truncate(max);
    }
}

/// Counts describing the records seen by one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationStats {
    pub total_feature_structures: usize,
    pub sofa_count: usize,
    pub total_spans: usize,
    pub total_relations: usize,
    pub span_types: BTreeMap<String, usize>,
    pub relation_types: BTreeMap<String, usize>,
    pub validation_stats: BTreeMap<String, usize>,
    pub has_annotations: bool,
}

impl AnnotationStats {
    pub fn merge(&mut self, other: &Self) {
        self.total_feature_structures += other.total_feature_structures;
        self.sofa_count += other.sofa_count;
        self.total_spans += other.total_spans;
        self.total_relations += other.total_relations;
        for (label, count) in &other.span_types {
            *self.span_types.entry(label.clone()).or_insert(0) += count;
        }
        for (label, count) in &other.relation_types {
            *self.relation_types.entry(label.clone()).or_insert(0) += count;
        }
        for (value, count) in &other.validation_stats {
            *self.validation_stats.entry(value.clone()).or_insert(0) += count;
        }
        self.has_annotations |= other.has_annotations;
    }
}

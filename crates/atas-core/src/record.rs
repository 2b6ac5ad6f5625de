//! Typed view over the feature structures of a UIMA CAS JSON export.
//!
//! Every entry of `%FEATURE_STRUCTURES` becomes one [`AnnotationRecord`].
//! Conversion never fails: missing or mistyped fields are kept as `None`
//! and judged later by the extractor, which reports them as malformed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SOFA_TYPE: &str = "uima.cas.Sofa";
pub const SPAN_TYPE: &str = "custom.Span";
pub const RELATION_TYPE: &str = "custom.Relation";

const RESERVED_KEYS: &[&str] = &["begin", "end", "label", "Validated"];

pub type Features = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Sofa,
    Span,
    Relation,
    Other,
}

impl RecordKind {
    #[must_use]
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name {
            SOFA_TYPE => Self::Sofa,
            SPAN_TYPE => Self::Span,
            RELATION_TYPE => Self::Relation,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sofa => "sofa",
            Self::Span => "span",
            Self::Relation => "relation",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SofaRecord {
    pub id: Option<u64>,
    pub sofa_num: Option<u64>,
    pub sofa_id: Option<String>,
    pub text: Option<String>,
}

impl SofaRecord {
    /// The text, when it has any non-whitespace content.
    #[must_use]
    pub fn usable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRecord {
    pub id: Option<u64>,
    pub sofa: Option<u64>,
    pub begin: Option<i64>,
    pub end: Option<i64>,
    pub label: Option<String>,
    pub validated: Option<String>,
    pub features: Features,
}

impl SpanRecord {
    /// A named attribute, if present and non-empty.
    #[must_use]
    pub fn feature(&self, key: &str) -> Option<&str> {
        non_empty(&self.features, key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationRecord {
    pub id: Option<u64>,
    pub sofa: Option<u64>,
    pub begin: Option<i64>,
    pub end: Option<i64>,
    pub label: Option<String>,
    pub governor: Option<u64>,
    pub dependent: Option<u64>,
    pub features: Features,
}

impl RelationRecord {
    #[must_use]
    pub fn feature(&self, key: &str) -> Option<&str> {
        non_empty(&self.features, key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationRecord {
    Sofa(SofaRecord),
    Span(SpanRecord),
    Relation(RelationRecord),
    Other {
        id: Option<u64>,
        sofa: Option<u64>,
        type_name: String,
    },
}

impl AnnotationRecord {
    /// Classify one feature structure. Returns `None` for non-object entries.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let type_name = map.get("%TYPE").and_then(Value::as_str).unwrap_or_default();
        let id = map.get("%ID").and_then(Value::as_u64);
        let sofa = map.get("@sofa").and_then(Value::as_u64);

        let record = match RecordKind::from_type_name(type_name) {
            RecordKind::Sofa => Self::Sofa(SofaRecord {
                id,
                sofa_num: map.get("sofaNum").and_then(Value::as_u64),
                sofa_id: string_field(map, "sofaID"),
                text: string_field(map, "sofaString"),
            }),
            RecordKind::Span => Self::Span(SpanRecord {
                id,
                sofa,
                begin: map.get("begin").and_then(Value::as_i64),
                end: map.get("end").and_then(Value::as_i64),
                label: string_field(map, "label"),
                validated: scalar_string(map.get("Validated")),
                features: collect_features(map),
            }),
            RecordKind::Relation => Self::Relation(RelationRecord {
                id,
                sofa,
                begin: map.get("begin").and_then(Value::as_i64),
                end: map.get("end").and_then(Value::as_i64),
                label: string_field(map, "label"),
                governor: map.get("@Governor").and_then(Value::as_u64),
                dependent: map.get("@Dependent").and_then(Value::as_u64),
                features: collect_features(map),
            }),
            RecordKind::Other => Self::Other {
                id,
                sofa,
                type_name: type_name.to_string(),
            },
        };

        Some(record)
    }

    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Sofa(_) => RecordKind::Sofa,
            Self::Span(_) => RecordKind::Span,
            Self::Relation(_) => RecordKind::Relation,
            Self::Other { .. } => RecordKind::Other,
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Sofa(r) => r.id,
            Self::Span(r) => r.id,
            Self::Relation(r) => r.id,
            Self::Other { id, .. } => *id,
        }
    }

    /// The buffer this record is attached to. Sofas own themselves.
    #[must_use]
    pub fn sofa(&self) -> Option<u64> {
        match self {
            Self::Sofa(_) => None,
            Self::Span(r) => r.sofa,
            Self::Relation(r) => r.sofa,
            Self::Other { sofa, .. } => *sofa,
        }
    }

    #[must_use]
    pub fn as_span(&self) -> Option<&SpanRecord> {
        match self {
            Self::Span(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_relation(&self) -> Option<&RelationRecord> {
        match self {
            Self::Relation(r) => Some(r),
            _ => None,
        }
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(String::from)
}

fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn collect_features(map: &Map<String, Value>) -> Features {
    map.iter()
        .filter(|(key, _)| {
            !key.starts_with('%') && !key.starts_with('@') && !RESERVED_KEYS.contains(&key.as_str())
        })
        .filter_map(|(key, value)| scalar_string(Some(value)).map(|v| (key.clone(), v)))
        .collect()
}

fn non_empty<'a>(features: &'a Features, key: &str) -> Option<&'a str> {
    features
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

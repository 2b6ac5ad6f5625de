use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::SpanRecord;

pub const SUBJECT_LABEL: &str = "Assunto";
pub const POSITION_LABEL: &str = "Posicionamento";
pub const METADATA_LABEL: &str = "Metadados";

/// Attribute keys as spelled by the annotation project export.
pub mod keys {
    pub const FRONTEIRA: &str = "Fronteira";
    pub const POSICIONAMENTO: &str = "Posicionamento";
    pub const TEMA: &str = "Tema";
    pub const RESUMO: &str = "Resumo";
    pub const HORARIO: &str = "Horrio";
    pub const TIPO_REUNIAO: &str = "TipodeReunio";
    pub const PARTICIPANTES: &str = "Participantes";
    pub const PRESENCA: &str = "Presena";
    pub const PARTIDO: &str = "Partido";
    pub const METADADOS: &str = "Metadados";
}

/// Metadata attributes copied into [`EntitySpan::attributes`].
pub const METADATA_ATTRIBUTES: &[&str] = &[
    keys::TIPO_REUNIAO,
    keys::PRESENCA,
    keys::POSICIONAMENTO,
    keys::HORARIO,
    keys::PARTICIPANTES,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelKind {
    Subject,
    Position,
    Metadata,
    Other,
}

impl LabelKind {
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            SUBJECT_LABEL => Self::Subject,
            POSITION_LABEL => Self::Position,
            METADATA_LABEL => Self::Metadata,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Position => "position",
            Self::Metadata => "metadata",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for LabelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fronteira: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posicionamento: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resumo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_reuniao: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participantes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presenca: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partido: Option<String>,
}

impl SemanticFields {
    #[must_use]
    pub fn from_record(record: &SpanRecord) -> Self {
        let get = |key: &str| record.feature(key).map(String::from);
        Self {
            fronteira: get(keys::FRONTEIRA),
            posicionamento: get(keys::POSICIONAMENTO),
            tema: get(keys::TEMA),
            resumo: get(keys::RESUMO),
            horario: get(keys::HORARIO),
            tipo_reuniao: get(keys::TIPO_REUNIAO),
            participantes: get(keys::PARTICIPANTES),
            presenca: get(keys::PRESENCA),
            partido: get(keys::PARTIDO),
        }
    }
}

/// An accepted span, with offsets and text in the coordinates of the scope
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
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
    #[serde(flatten)]
    pub semantics: SemanticFields,
    #[serde(skip)]
    pub source_id: Option<u64>,
}

impl EntitySpan {
    #[must_use]
    pub fn new(id: String, label: String, begin: usize, end: usize, text: String) -> Self {
        Self {
            id,
            label,
            begin,
            end,
            text,
            subtype: None,
            attributes: BTreeMap::new(),
            semantics: SemanticFields::default(),
            source_id: None,
        }
    }

    #[must_use]
    pub fn with_subtype(mut self, subtype: Option<String>) -> Self {
        self.subtype = subtype;
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn with_semantics(mut self, semantics: SemanticFields) -> Self {
        self.semantics = semantics;
        self
    }

    #[must_use]
    pub fn with_source_id(mut self, source_id: Option<u64>) -> Self {
        self.source_id = source_id;
        self
    }

    #[must_use]
    pub fn label_kind(&self) -> LabelKind {
        LabelKind::from_label(&self.label)
    }

    /// Subject entities carrying a theme; these are the section keywords.
    #[must_use]
    pub fn is_keyword(&self) -> bool {
        self.label_kind() == LabelKind::Subject && self.semantics.tema.is_some()
    }

    #[must_use]
    pub fn lies_within(&self, begin: usize, end: usize) -> bool {
        self.begin >= begin && self.end <= end
    }

    #[must_use]
    pub fn char_len(&self) -> usize {
        self.end - self.begin
    }
}

/// Derive `subtype` and the copied attributes for a span, by label.
#[must_use]
pub fn derive_subtype(record: &SpanRecord, kind: LabelKind) -> (Option<String>, BTreeMap<String, String>) {
    match kind {
        LabelKind::Position => (record.feature(keys::POSICIONAMENTO).map(String::from), BTreeMap::new()),
        LabelKind::Metadata => {
            let attributes = METADATA_ATTRIBUTES
                .iter()
                .filter_map(|key| record.feature(key).map(|v| ((*key).to_string(), v.to_string())))
                .collect();
            (record.feature(keys::METADADOS).map(String::from), attributes)
        }
        LabelKind::Subject | LabelKind::Other => (None, BTreeMap::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Features;

    fn span(label: &str, features: &[(&str, &str)]) -> SpanRecord {
        SpanRecord {
            id: Some(1),
            sofa: Some(1),
            begin: Some(0),
            end: Some(5),
            label: Some(label.into()),
            validated: None,
            features: features
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<Features>(),
        }
    }

    #[test]
    fn test_label_kind() {
        assert_eq!(LabelKind::from_label("Assunto"), LabelKind::Subject);
        assert_eq!(LabelKind::from_label("Metadados"), LabelKind::Metadata);
        assert_eq!(LabelKind::from_label("Votação"), LabelKind::Other);
    }

    #[test]
    fn test_position_subtype() {
        let record = span("Posicionamento", &[("Posicionamento", "Votante")]);
        let (subtype, attributes) = derive_subtype(&record, LabelKind::Position);

        assert_eq!(subtype.as_deref(), Some("Votante"));
        assert!(attributes.is_empty());
    }

    #[test]
    fn test_metadata_attributes_allow_list() {
        let record = span(
            "Metadados",
            &[
                ("Metadados", "Tipo de reunião"),
                ("TipodeReunio", "Ordinária"),
                ("Horrio", "10h00"),
                ("Partido", "PS"),
                ("Presena", ""),
            ],
        );
        let (subtype, attributes) = derive_subtype(&record, LabelKind::Metadata);

        assert_eq!(subtype.as_deref(), Some("Tipo de reunião"));
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes.get("Horrio").map(String::as_str), Some("10h00"));
        assert!(!attributes.contains_key("Partido"));
        assert!(!attributes.contains_key("Presena"));
    }

    #[test]
    fn test_serialization_omits_empty_fields() {
        let entity = EntitySpan::new("T1".into(), "Assunto".into(), 2, 12, "Presidente".into())
            .with_semantics(SemanticFields {
                tema: Some("Administração".into()),
                ..SemanticFields::default()
            })
            .with_source_id(Some(5));

        let value = serde_json::to_value(&entity).unwrap();

        assert_eq!(value["type"], "Assunto");
        assert_eq!(value["tema"], "Administração");
        assert!(value.get("subtype").is_none());
        assert!(value.get("attributes").is_none());
        assert!(value.get("source_id").is_none());
        assert!(entity.is_keyword());
    }
}

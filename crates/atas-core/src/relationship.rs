use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const POSICIONAMENTO: &str = "posicionamento";
pub const RESULTADO: &str = "resultado";

/// Relation attributes carried into the output; everything else is dropped.
pub const RELATION_ATTRIBUTES: &[&str] = &[POSICIONAMENTO, RESULTADO];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteRelation {
    Posicionamento,
    Resultado,
}

impl VoteRelation {
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            POSICIONAMENTO => Some(Self::Posicionamento),
            RESULTADO => Some(Self::Resultado),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Posicionamento => POSICIONAMENTO,
            Self::Resultado => RESULTADO,
        }
    }
}

impl std::fmt::Display for VoteRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed link between two entities of the same scope. `arg1` is the
/// governor and `arg2` the dependent, following BRAT naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationAnnotation {
    pub id: String,
    #[serde(rename = "type")]
    pub label: String,
    pub arg1: String,
    pub arg2: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl RelationAnnotation {
    #[must_use]
    pub fn new(id: String, label: String, arg1: String, arg2: String) -> Self {
        Self {
            id,
            label,
            arg1,
            arg2,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn vote_relation(&self) -> Option<VoteRelation> {
        VoteRelation::from_label(&self.label)
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

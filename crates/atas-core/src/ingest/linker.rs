use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::extractor::IdMap;
use crate::diagnostics::{AnnotationStats, Diagnostics};
use crate::error::RecordError;
use crate::record::{AnnotationRecord, RelationRecord};
use crate::relationship::{RelationAnnotation, RELATION_ATTRIBUTES};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Linkage {
    pub relations: Vec<RelationAnnotation>,
    pub diagnostics: Diagnostics,
    pub stats: AnnotationStats,
}

impl Linkage {
    #[must_use]
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }
}

/// Rewrites relation endpoints from source record ids to the entity ids of
/// one extraction. Relations with an endpoint outside that extraction are
/// dropped and reported.
///
/// A segment-scoped linker only reports relations that touch its segment:
/// malformed relations and relations with neither endpoint extracted are
/// dropped silently, since the document-scope scan already owns them.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationLinker {
    segment_scope: bool,
}

impl RelationLinker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn segment_scoped() -> Self {
        Self { segment_scope: true }
    }

    pub fn link(&self, records: &[AnnotationRecord], id_map: &IdMap) -> Linkage {
        let mut linkage = Linkage::default();

        for relation in records.iter().filter_map(AnnotationRecord::as_relation) {
            if let Some(label) = &relation.label {
                *linkage.stats.relation_types.entry(label.clone()).or_insert(0) += 1;
            }

            let (Some(label), Some(governor), Some(dependent)) =
                (relation.label.as_deref(), relation.governor, relation.dependent)
            else {
                if !self.segment_scope {
                    tracing::debug!(record = ?relation.id, "relation without label or endpoints");
                    linkage.diagnostics.record_issue(RecordError::MalformedRecord {
                        record_id: relation.id,
                        reason: "missing label or endpoints".into(),
                    });
                }
                continue;
            };

            let (arg1, arg2) = match (id_map.get(governor), id_map.get(dependent)) {
                (Some(arg1), Some(arg2)) => (arg1, arg2),
                (None, None) if self.segment_scope => continue,
                (None, _) => {
                    linkage.unresolved(relation, governor);
                    continue;
                }
                (_, None) => {
                    linkage.unresolved(relation, dependent);
                    continue;
                }
            };

            let id = format!("R{}", linkage.relations.len() + 1);
            linkage.relations.push(
                RelationAnnotation::new(id, label.to_string(), arg1.to_string(), arg2.to_string())
                    .with_attributes(relation_attributes(relation)),
            );
        }

        linkage.stats.total_relations = linkage.relations.len();
        linkage
    }
}

impl Linkage {
    fn unresolved(&mut self, relation: &RelationRecord, endpoint: u64) {
        tracing::debug!(record = ?relation.id, endpoint, "relation endpoint not extracted");
        self.diagnostics.record_issue(RecordError::UnresolvedReference {
            relation_id: relation.id,
            endpoint,
        });
    }
}

fn relation_attributes(relation: &RelationRecord) -> BTreeMap<String, String> {
    RELATION_ATTRIBUTES
        .iter()
        .filter_map(|key| relation.feature(key).map(|v| ((*key).to_string(), v.to_string())))
        .collect()
}

//! Vote outcomes recovered from `posicionamento` / `resultado` relations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entity::EntitySpan;
use crate::relationship::{RelationAnnotation, VoteRelation};

/// `Posicionamento` value marking the entity that names the item voted on.
pub const VOTE_ITEM_ROLE: &str = "Votação";

/// One vote relation, oriented so `vote_item_id` is the item voted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteLink {
    pub relation_id: String,
    pub relation: VoteRelation,
    pub vote_item_id: String,
    pub vote_text: String,
    pub target_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_role: Option<String>,
    pub target_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub vote_id: String,
    pub vote_text: String,
    pub posicionamento: Option<String>,
    pub resultado: Option<String>,
    pub complete: bool,
}

/// Collect the vote links of one scope. Relations whose endpoints are not
/// among `entities` are skipped.
#[must_use]
pub fn vote_links(entities: &[EntitySpan], relations: &[RelationAnnotation]) -> Vec<VoteLink> {
    let lookup: HashMap<&str, &EntitySpan> = entities.iter().map(|e| (e.id.as_str(), e)).collect();

    relations
        .iter()
        .filter_map(|relation| {
            let kind = relation.vote_relation()?;
            let governor = lookup.get(relation.arg1.as_str())?;
            let dependent = lookup.get(relation.arg2.as_str())?;

            let (item, target) = if is_vote_item(dependent) {
                (dependent, governor)
            } else {
                (governor, dependent)
            };

            Some(VoteLink {
                relation_id: relation.id.clone(),
                relation: kind,
                vote_item_id: item.id.clone(),
                vote_text: item.text.clone(),
                target_id: target.id.clone(),
                target_role: target.semantics.posicionamento.clone(),
                target_text: target.text.clone(),
                value: relation.attribute(kind.as_str()).map(String::from),
            })
        })
        .collect()
}

/// Merge links per vote item, in order of first appearance.
#[must_use]
pub fn consolidate_votes(links: &[VoteLink]) -> Vec<VoteRecord> {
    let mut records: Vec<VoteRecord> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for link in links {
        let slot = *index.entry(link.vote_item_id.as_str()).or_insert_with(|| {
            records.push(VoteRecord {
                vote_id: link.vote_item_id.clone(),
                vote_text: link.vote_text.clone(),
                posicionamento: None,
                resultado: None,
                complete: false,
            });
            records.len() - 1
        });

        let record = &mut records[slot];
        let field = match link.relation {
            VoteRelation::Posicionamento => &mut record.posicionamento,
            VoteRelation::Resultado => &mut record.resultado,
        };
        if field.is_none() {
            field.clone_from(&link.value);
        }
    }

    for record in &mut records {
        record.complete = record.posicionamento.is_some() && record.resultado.is_some();
    }

    records
}

fn is_vote_item(entity: &EntitySpan) -> bool {
    entity.semantics.posicionamento.as_deref() == Some(VOTE_ITEM_ROLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::SemanticFields;
    use std::collections::BTreeMap;

    fn entity(id: &str, text: &str, role: Option<&str>) -> EntitySpan {
        EntitySpan::new(id.into(), "Posicionamento".into(), 0, text.chars().count(), text.into())
            .with_semantics(SemanticFields {
                posicionamento: role.map(String::from),
                ..SemanticFields::default()
            })
    }

    fn relation(id: &str, label: &str, arg1: &str, arg2: &str, value: Option<&str>) -> RelationAnnotation {
        let attributes: BTreeMap<_, _> = value
            .map(|v| (label.to_string(), v.to_string()))
            .into_iter()
            .collect();
        RelationAnnotation::new(id.into(), label.into(), arg1.into(), arg2.into()).with_attributes(attributes)
    }

    fn scene() -> (Vec<EntitySpan>, Vec<RelationAnnotation>) {
        let entities = vec![
            entity("T1", "Proposta n.º 12", Some("Votação")),
            entity("T2", "a favor", Some("Favor")),
            entity("T3", "por unanimidade", Some("Resultado")),
            entity("T4", "Proposta n.º 13", Some("Votação")),
        ];
        let relations = vec![
            relation("R1", "posicionamento", "T2", "T1", Some("a favor")),
            relation("R2", "resultado", "T1", "T3", Some("por unanimidade")),
            relation("R3", "posicionamento", "T4", "T2", None),
            relation("R4", "outra", "T1", "T2", None),
            relation("R5", "resultado", "T9", "T3", Some("por maioria")),
        ];
        (entities, relations)
    }

    #[test]
    fn test_links_are_oriented_to_the_vote_item() {
        let (entities, relations) = scene();

        let links = vote_links(&entities, &relations);

        assert_eq!(links.len(), 3);
        assert_eq!(links[0].vote_item_id, "T1");
        assert_eq!(links[0].target_id, "T2");
        assert_eq!(links[0].target_role.as_deref(), Some("Favor"));
        assert_eq!(links[1].vote_item_id, "T1");
        assert_eq!(links[1].value.as_deref(), Some("por unanimidade"));
        assert_eq!(links[2].vote_item_id, "T4");
    }

    #[test]
    fn test_consolidate_votes() {
        let (entities, relations) = scene();

        let votes = consolidate_votes(&vote_links(&entities, &relations));

        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].vote_id, "T1");
        assert_eq!(votes[0].posicionamento.as_deref(), Some("a favor"));
        assert_eq!(votes[0].resultado.as_deref(), Some("por unanimidade"));
        assert!(votes[0].complete);
        assert_eq!(votes[1].vote_text, "Proposta n.º 13");
        assert!(!votes[1].complete);
    }
}

//! Merge per-entity mappings into one de-duplicated graph
//!
//! Node ids are only meaningful inside the mapping that produced them, so
//! every reference is resolved local id → de-dup key → surviving node id.

use lineage_domain::{LineageMapping, LineageNode, LineageRelationship, MergedLineageMapping, NodeType};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Merge `mappings` in order
///
/// Nodes are de-duplicated on [`LineageNode::dedup_key`] with the first
/// occurrence winning. Relationships whose endpoints do not resolve are
/// dropped, the rest are de-duplicated on (source, target, type) and get the
/// id `"{source}-{target}"`. Column parents are resolved the same way as
/// relationship endpoints.
pub fn merge_mappings(mappings: &[LineageMapping]) -> MergedLineageMapping {
    let mut key_to_id: HashMap<&str, &str> = HashMap::new();
    let mut survivors: Vec<(&LineageMapping, &LineageNode)> = Vec::new();

    for mapping in mappings {
        for node in &mapping.lineage_nodes {
            let key = node.dedup_key();
            if !key_to_id.contains_key(key) {
                key_to_id.insert(key, &node.node_id);
                survivors.push((mapping, node));
            }
        }
    }

    let resolve = |mapping: &LineageMapping, local_id: &str| -> Option<String> {
        let node = mapping.find_node(local_id)?;
        key_to_id.get(node.dedup_key()).map(|id| id.to_string())
    };

    let lineage_nodes: Vec<LineageNode> = survivors
        .iter()
        .map(|(mapping, node)| {
            let mut merged = (*node).clone();
            if node.node_type == NodeType::Column {
                if let Some(parent) = node.parent_id.as_deref().and_then(|p| resolve(mapping, p)) {
                    merged.parent_id = Some(parent);
                }
            }
            merged
        })
        .collect();

    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let mut lineage_relationships = Vec::new();
    let mut dropped = 0usize;

    for mapping in mappings {
        for relationship in &mapping.lineage_relationships {
            let (source, target) = match (
                resolve(mapping, &relationship.source_node_id),
                resolve(mapping, &relationship.target_node_id),
            ) {
                (Some(source), Some(target)) => (source, target),
                _ => {
                    dropped += 1;
                    continue;
                }
            };

            let triple = (source.clone(), target.clone(), relationship.relationship_type.clone());
            if !seen.insert(triple) {
                continue;
            }

            lineage_relationships.push(LineageRelationship {
                relationship_id: Some(format!("{}-{}", source, target)),
                source_node_id: source,
                target_node_id: target,
                relationship_type: relationship.relationship_type.clone(),
                confidence: relationship.confidence,
                business_rule: relationship.business_rule.clone(),
            });
        }
    }

    debug!(
        mappings = mappings.len(),
        nodes = lineage_nodes.len(),
        relationships = lineage_relationships.len(),
        dropped_relationships = dropped,
        "Merged lineage mappings"
    );

    MergedLineageMapping {
        lineage_nodes,
        lineage_relationships,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_domain::{BusinessRule, NodeMetadata};
    use proptest::prelude::*;

    fn table(id: &str, qualified: Option<&str>, confidence: f64) -> LineageNode {
        LineageNode {
            node_id: id.to_string(),
            node_type: NodeType::Table,
            node_name: id.to_string(),
            qualified_name: qualified.map(str::to_string),
            parent_id: None,
            metadata: NodeMetadata {
                confidence_score: Some(confidence),
                ..NodeMetadata::default()
            },
        }
    }

    fn column(id: &str, qualified: &str, parent: &str) -> LineageNode {
        LineageNode {
            node_id: id.to_string(),
            node_type: NodeType::Column,
            node_name: id.to_string(),
            qualified_name: Some(qualified.to_string()),
            parent_id: Some(parent.to_string()),
            metadata: NodeMetadata::default(),
        }
    }

    fn rel(source: &str, target: &str, kind: &str) -> LineageRelationship {
        LineageRelationship {
            relationship_id: Some(format!("r_{}_{}", source, target)),
            source_node_id: source.to_string(),
            target_node_id: target.to_string(),
            relationship_type: kind.to_string(),
            confidence: Some(0.9),
            business_rule: BusinessRule {
                description: format!("{} to {}", source, target),
            },
        }
    }

    fn mapping(nodes: Vec<LineageNode>, relationships: Vec<LineageRelationship>) -> LineageMapping {
        LineageMapping {
            lineage_nodes: nodes,
            lineage_relationships: relationships,
        }
    }

    #[test]
    fn test_single_mapping_is_preserved() {
        let m = mapping(
            vec![
                table("a", Some("domain.a"), 0.9),
                column("a_x", "domain.a.x", "a"),
                table("b", Some("domain.b"), 0.8),
            ],
            vec![rel("a", "b", "business_reference")],
        );

        let merged = merge_mappings(std::slice::from_ref(&m));

        assert_eq!(merged.lineage_nodes, m.lineage_nodes);
        assert_eq!(merged.lineage_relationships.len(), 1);
        let r = &merged.lineage_relationships[0];
        assert_eq!((r.source_node_id.as_str(), r.target_node_id.as_str()), ("a", "b"));
        assert_eq!(r.business_rule, m.lineage_relationships[0].business_rule);
        assert_eq!(r.relationship_id.as_deref(), Some("a-b"));
    }

    #[test]
    fn test_first_write_wins() {
        let first = mapping(vec![table("m1_acct", Some("tbl_account"), 0.95)], vec![]);
        let second = mapping(vec![table("m2_acct", Some("tbl_account"), 0.1)], vec![]);

        let merged = merge_mappings(&[first, second]);

        assert_eq!(merged.lineage_nodes.len(), 1);
        assert_eq!(merged.lineage_nodes[0].node_id, "m1_acct");
        assert_eq!(merged.lineage_nodes[0].confidence(), 0.95);
    }

    #[test]
    fn test_relationship_endpoints_resolved_across_mappings() {
        let first = mapping(vec![table("one_orders", Some("domain.orders"), 0.9)], vec![]);
        let second = mapping(
            vec![
                table("two_orders", Some("domain.orders"), 0.9),
                table("two_items", Some("domain.items"), 0.9),
            ],
            vec![rel("two_items", "two_orders", "business_reference")],
        );

        let merged = merge_mappings(&[first, second]);

        assert_eq!(merged.lineage_relationships.len(), 1);
        let r = &merged.lineage_relationships[0];
        assert_eq!(r.source_node_id, "two_items");
        assert_eq!(r.target_node_id, "one_orders");
        assert_eq!(r.relationship_id.as_deref(), Some("two_items-one_orders"));
        assert!(merged.has_referential_integrity());
    }

    #[test]
    fn test_dangling_relationships_dropped() {
        let m = mapping(
            vec![table("a", Some("domain.a"), 0.9)],
            vec![rel("a", "ghost", "business_reference"), rel("ghost", "a", "x")],
        );

        let merged = merge_mappings(&[m]);

        assert!(merged.lineage_relationships.is_empty());
    }

    #[test]
    fn test_endpoint_must_exist_in_own_mapping() {
        // "b" exists globally but not in the mapping that references it
        let first = mapping(vec![table("b", Some("domain.b"), 0.9)], vec![]);
        let second = mapping(
            vec![table("a", Some("domain.a"), 0.9)],
            vec![rel("a", "b", "business_reference")],
        );

        let merged = merge_mappings(&[first, second]);

        assert!(merged.lineage_relationships.is_empty());
    }

    #[test]
    fn test_relationship_triples_deduplicated() {
        let first = mapping(
            vec![table("a1", Some("domain.a"), 0.9), table("b1", Some("domain.b"), 0.9)],
            vec![rel("a1", "b1", "business_reference"), rel("a1", "b1", "technical_reference")],
        );
        let second = mapping(
            vec![table("a2", Some("domain.a"), 0.9), table("b2", Some("domain.b"), 0.9)],
            vec![rel("a2", "b2", "business_reference")],
        );

        let merged = merge_mappings(&[first, second]);

        assert_eq!(merged.lineage_relationships.len(), 2);
        assert_eq!(merged.lineage_relationships[0].relationship_type, "business_reference");
        assert_eq!(merged.lineage_relationships[1].relationship_type, "technical_reference");
    }

    #[test]
    fn test_key_falls_back_to_node_id() {
        let first = mapping(vec![table("x", None, 0.9)], vec![]);
        let second = mapping(vec![table("x", Some(""), 0.5), table("y", None, 0.5)], vec![]);

        let merged = merge_mappings(&[first, second]);

        assert_eq!(merged.lineage_nodes.len(), 2);
        assert_eq!(merged.lineage_nodes[0].confidence(), 0.9);
    }

    #[test]
    fn test_column_parent_follows_surviving_table() {
        let first = mapping(vec![table("one_orders", Some("domain.orders"), 0.9)], vec![]);
        let second = mapping(
            vec![
                table("two_orders", Some("domain.orders"), 0.9),
                column("two_orders_total", "domain.orders.total", "two_orders"),
            ],
            vec![],
        );

        let merged = merge_mappings(&[first, second]);

        assert_eq!(merged.lineage_nodes.len(), 2);
        assert_eq!(merged.lineage_nodes[1].parent_id.as_deref(), Some("one_orders"));
    }

    #[test]
    fn test_local_id_collision_keeps_both_nodes() {
        let first = mapping(vec![table("n1", Some("domain.orders"), 0.9)], vec![]);
        let second = mapping(vec![table("n1", Some("domain.customer"), 0.9)], vec![]);

        let merged = merge_mappings(&[first, second]);

        // Distinct keys survive even though the local ids clash
        assert_eq!(merged.lineage_nodes.len(), 2);
        assert!(merged.lineage_nodes.iter().all(|n| n.node_id == "n1"));
    }

    #[test]
    fn test_empty_input() {
        let merged = merge_mappings(&[]);
        assert!(merged.lineage_nodes.is_empty());
        assert!(merged.lineage_relationships.is_empty());
    }

    type MappingShape = (Vec<usize>, Vec<(usize, usize)>);

    fn build(shapes: &[MappingShape]) -> Vec<LineageMapping> {
        shapes
            .iter()
            .enumerate()
            .map(|(m, (keys, rels))| {
                let nodes = keys
                    .iter()
                    .enumerate()
                    .map(|(n, key)| table(&format!("m{}_n{}", m, n), Some(&format!("domain.k{}", key)), 0.9))
                    .collect();
                let relationships = rels
                    .iter()
                    .map(|(s, t)| rel(&format!("m{}_n{}", m, s), &format!("m{}_n{}", m, t), "business_reference"))
                    .collect();
                mapping(nodes, relationships)
            })
            .collect()
    }

    fn shapes() -> impl Strategy<Value = Vec<MappingShape>> {
        prop::collection::vec(
            (
                prop::collection::vec(0usize..5, 0..5),
                prop::collection::vec((0usize..6, 0usize..6), 0..6),
            ),
            0..4,
        )
    }

    proptest! {
        #[test]
        fn prop_referential_integrity(shapes in shapes()) {
            let merged = merge_mappings(&build(&shapes));
            prop_assert!(merged.has_referential_integrity());
        }

        #[test]
        fn prop_unique_keys_first_wins(shapes in shapes()) {
            let mappings = build(&shapes);
            let merged = merge_mappings(&mappings);

            let mut keys = HashSet::new();
            for node in &merged.lineage_nodes {
                prop_assert!(keys.insert(node.dedup_key().to_string()));
                let first = mappings
                    .iter()
                    .flat_map(|m| m.lineage_nodes.iter())
                    .find(|n| n.dedup_key() == node.dedup_key());
                prop_assert_eq!(first.map(|n| n.node_id.as_str()), Some(node.node_id.as_str()));
            }
        }

        #[test]
        fn prop_relationship_triples_unique(shapes in shapes()) {
            let merged = merge_mappings(&build(&shapes));
            let mut triples = HashSet::new();
            for r in &merged.lineage_relationships {
                prop_assert!(triples.insert((
                    r.source_node_id.clone(),
                    r.target_node_id.clone(),
                    r.relationship_type.clone(),
                )));
                prop_assert_eq!(
                    r.relationship_id.clone(),
                    Some(format!("{}-{}", r.source_node_id, r.target_node_id))
                );
            }
        }
    }
}

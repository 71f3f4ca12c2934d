//! Extraction input: logical entities and their relationships
//!
//! These shapes are produced by an upstream extraction step and are
//! treated as immutable input.

use crate::lineage::MetadataValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One attribute (future column) of a logical entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name as extracted
    pub attribute_name: String,

    /// Business description
    #[serde(default)]
    pub description: String,

    /// Example values, used for type inference
    #[serde(default)]
    pub sample_values: Vec<String>,
}

/// A business concept discovered during extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalEntity {
    /// Identifier, unique within a document
    pub entity_id: String,

    /// Human-readable name (may contain spaces)
    #[serde(default)]
    pub entity_name: String,

    /// Description of the entity's purpose
    #[serde(default)]
    pub entity_description: String,

    /// Ordered attributes
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// A relationship between two logical entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRelationship {
    /// `entity_id` of the source entity
    pub source_entity: String,

    /// `entity_id` of the target entity
    pub target_entity: String,

    /// Relationship kind as extracted (e.g. "fulfills")
    #[serde(default)]
    pub relationship_type: String,

    /// Description of the relationship
    #[serde(default)]
    pub description: String,

    /// Extraction confidence [0.0, 1.0]
    #[serde(default)]
    pub confidence: f64,
}

impl EntityRelationship {
    /// Whether `entity_id` is the source or target of this relationship
    pub fn involves(&self, entity_id: &str) -> bool {
        self.source_entity == entity_id || self.target_entity == entity_id
    }
}

/// Wrapper for the `logical_entities` array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    /// Entities in document order
    #[serde(default)]
    pub logical_entities: Vec<LogicalEntity>,
}

/// Wrapper for the `entity_relationships` array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataRelationships {
    /// Relationships between entities
    #[serde(default)]
    pub entity_relationships: Vec<EntityRelationship>,
}

/// Body of a document extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionBody {
    /// Extracted entities
    #[serde(default)]
    pub extracted_data_entities: ExtractedEntities,

    /// Extracted relationships
    #[serde(default)]
    pub data_relationships: DataRelationships,

    /// Optional document-level metadata forwarded to prompts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_metadata: Option<BTreeMap<String, MetadataValue>>,
}

/// The object fetched from the extraction source for one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentExtraction {
    /// Extraction body
    pub extraction: ExtractionBody,
}

impl DocumentExtraction {
    /// Build an extraction from entities and relationships
    pub fn new(entities: Vec<LogicalEntity>, relationships: Vec<EntityRelationship>) -> Self {
        Self {
            extraction: ExtractionBody {
                extracted_data_entities: ExtractedEntities {
                    logical_entities: entities,
                },
                data_relationships: DataRelationships {
                    entity_relationships: relationships,
                },
                document_metadata: None,
            },
        }
    }

    /// Entities in document order
    pub fn logical_entities(&self) -> &[LogicalEntity] {
        &self.extraction.extracted_data_entities.logical_entities
    }

    /// All entity relationships
    pub fn entity_relationships(&self) -> &[EntityRelationship] {
        &self.extraction.data_relationships.entity_relationships
    }

    /// Document-level metadata, if any
    pub fn document_metadata(&self) -> Option<&BTreeMap<String, MetadataValue>> {
        self.extraction.document_metadata.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relationship(source: &str, target: &str) -> EntityRelationship {
        EntityRelationship {
            source_entity: source.to_string(),
            target_entity: target.to_string(),
            relationship_type: "references".to_string(),
            description: String::new(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_parse_extraction_shape() {
        let json = r#"{
            "extraction": {
                "extracted_data_entities": {
                    "logical_entities": [
                        {
                            "entity_id": "material_inventory",
                            "entity_name": "Material Inventory",
                            "entity_description": "Inventory of materials",
                            "attributes": [
                                {"attribute_name": "quantity", "description": "Amount", "sample_values": ["100"]}
                            ]
                        }
                    ]
                },
                "data_relationships": {
                    "entity_relationships": [
                        {"source_entity": "material_inventory", "target_entity": "sales_order",
                         "relationship_type": "fulfills", "description": "d", "confidence": 0.92}
                    ]
                }
            }
        }"#;

        let extraction: DocumentExtraction = serde_json::from_str(json).unwrap();
        assert_eq!(extraction.logical_entities().len(), 1);
        assert_eq!(extraction.logical_entities()[0].attributes[0].sample_values, vec!["100"]);
        assert_eq!(extraction.entity_relationships()[0].confidence, 0.92);
        assert!(extraction.document_metadata().is_none());
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let extraction: DocumentExtraction = serde_json::from_str(r#"{"extraction": {}}"#).unwrap();
        assert!(extraction.logical_entities().is_empty());
        assert!(extraction.entity_relationships().is_empty());
    }

    #[test]
    fn test_involves_matches_either_end() {
        let extraction = DocumentExtraction::new(
            vec![],
            vec![
                relationship("a", "b"),
                relationship("c", "a"),
                relationship("b", "c"),
            ],
        );

        let for_a: Vec<_> = extraction
            .entity_relationships()
            .iter()
            .filter(|r| r.involves("a"))
            .collect();
        assert_eq!(for_a.len(), 2);
        assert_eq!(for_a[0].target_entity, "b");
        assert_eq!(for_a[1].source_entity, "c");

        assert!(!extraction.entity_relationships().iter().any(|r| r.involves("z")));
    }
}

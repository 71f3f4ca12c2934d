//! LLM prompt engineering for per-entity lineage generation

use lineage_domain::{DataType, EntityRelationship, LogicalEntity, MetadataValue};
use serde_json::json;
use std::collections::BTreeMap;

/// Builds the prompt for one logical entity
///
/// The prompt carries the entity and the relationships it takes part in as
/// literal JSON, the exact output schema, the naming and type rules, and an
/// instruction to answer with the JSON object only.
pub struct PromptBuilder<'a> {
    entity: &'a LogicalEntity,
    relationships: Vec<&'a EntityRelationship>,
    job_id: String,
    qualified_name_prefix: String,
    timestamp: String,
    document_metadata: Option<&'a BTreeMap<String, MetadataValue>>,
    include_type_hints: bool,
}

impl<'a> PromptBuilder<'a> {
    /// Create a builder for `entity`
    ///
    /// Only relationships whose source or target is the entity's id are kept.
    pub fn new(entity: &'a LogicalEntity, relationships: &'a [EntityRelationship]) -> Self {
        Self {
            entity,
            relationships: relationships
                .iter()
                .filter(|r| r.involves(&entity.entity_id))
                .collect(),
            job_id: "job1".to_string(),
            qualified_name_prefix: "domain".to_string(),
            timestamp: String::new(),
            document_metadata: None,
            include_type_hints: true,
        }
    }

    /// Job id used in node and relationship ids
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = job_id.into();
        self
    }

    /// First segment of qualified names
    pub fn with_qualified_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.qualified_name_prefix = prefix.into();
        self
    }

    /// Value the model should put in `metadata.last_updated`
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Document-level metadata to show the model
    pub fn with_document_metadata(mut self, metadata: Option<&'a BTreeMap<String, MetadataValue>>) -> Self {
        self.document_metadata = metadata;
        self
    }

    /// Whether to list locally inferred attribute types
    pub fn with_type_hints(mut self, enabled: bool) -> Self {
        self.include_type_hints = enabled;
        self
    }

    /// Relationships that made it through the entity filter
    pub fn relationships(&self) -> &[&'a EntityRelationship] {
        &self.relationships
    }

    /// Build the complete prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        // 1. Role and output contract
        prompt.push_str(SYSTEM_CONTEXT);
        prompt.push_str("\n\n");
        prompt.push_str(OUTPUT_SCHEMA);
        prompt.push_str("\n\n");

        // 2. Naming conventions for this job
        prompt.push_str(&self.naming_rules());
        prompt.push('\n');

        // 3. Type and confidence rules
        prompt.push_str(TYPE_RULES);
        prompt.push_str("\n\n");
        prompt.push_str(CONFIDENCE_RULES);
        prompt.push_str("\n\n");

        // 4. Document context
        prompt.push_str("Document details:\n");
        match self.document_metadata {
            Some(metadata) => {
                prompt.push_str(&format!("{:#}", json!(metadata)));
                prompt.push('\n');
            }
            None => prompt.push_str("No metadata available\n"),
        }
        prompt.push('\n');

        // 5. The entity and its relationships
        prompt.push_str("Entity to process:\n");
        prompt.push_str(&format!("{:#}", json!(self.entity)));
        prompt.push_str("\n\n");

        prompt.push_str("Relationships involving this entity:\n");
        prompt.push_str(&format!("{:#}", json!(self.relationships)));
        prompt.push_str("\n\n");

        if self.include_type_hints && !self.entity.attributes.is_empty() {
            prompt.push_str("Inferred data types from sample values:\n");
            for attribute in &self.entity.attributes {
                prompt.push_str(&format!(
                    "- {}: {}\n",
                    attribute.attribute_name,
                    DataType::infer(attribute.sample_values.as_slice())
                ));
            }
            prompt.push('\n');
        }

        // 6. Output format reminder
        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }

    fn naming_rules(&self) -> String {
        let table_id = format!("{}_{}", self.job_id, self.entity.entity_id);
        let table_name = format!("{}.{}", self.qualified_name_prefix, self.entity.entity_id);
        let timestamp = if self.timestamp.is_empty() {
            "the current time in ISO 8601 format".to_string()
        } else {
            format!("\"{}\"", self.timestamp)
        };

        format!(
            r#"Naming conventions (job id "{job}"):
- Table node: nodeId "{table_id}", nodeType "table", qualifiedName "{table_name}", parentId null
- nodeName: the entity_name normalised to lower snake_case (spaces to underscores, lowercase)
- Column nodes: nodeId "{table_id}_{{attribute_name}}", qualifiedName "{table_name}.{{attribute_name}}", parentId "{table_id}"
- Other entities named in a relationship: add a table node for each (nodeId "{job}_{{entity_id}}", qualifiedName "{prefix}.{{entity_id}}") so every relationship endpoint exists in your output
- relationshipId: "{job}_{{source_entity}}_{{target_entity}}"; sourceNodeId and targetNodeId are table nodeIds
- relationshipType: "business_reference" unless the relationship clearly calls for another type
- businessRule.description: the relationship description, or "Relationship derived from LLM extraction"
- metadata.last_updated: {timestamp}
"#,
            job = self.job_id,
            table_id = table_id,
            table_name = table_name,
            prefix = self.qualified_name_prefix,
            timestamp = timestamp,
        )
    }
}

const SYSTEM_CONTEXT: &str = r#"You are a data architecture assistant. Transform ONE extracted business entity and the relationships it takes part in into a lineage graph of tables, columns and relationships."#;

const OUTPUT_SCHEMA: &str = r#"Required output schema (use these keys exactly):
{
  "lineageNodes": [
    {
      "nodeId": "string",
      "nodeType": "table" | "column",
      "nodeName": "string",
      "qualifiedName": "string",
      "parentId": "string" | null,
      "metadata": {
        "description": "string",
        "data_type": "string" | "number" | "boolean" | "date",
        "confidence_score": 0.0-1.0,
        "last_updated": "ISO 8601 timestamp"
      }
    }
  ],
  "lineageRelationships": [
    {
      "relationshipId": "string",
      "sourceNodeId": "string",
      "targetNodeId": "string",
      "relationshipType": "string",
      "confidence": 0.0-1.0,
      "businessRule": { "description": "string" }
    }
  ]
}

Rules:
- nodeType must be exactly "table" or "column"
- parentId is null (not a string) for tables and the parent table's nodeId for columns
- data_type applies to columns only
- sourceNodeId and targetNodeId must be nodeIds from your own lineageNodes"#;

const TYPE_RULES: &str = r#"Data type inference rules, applied in order:
- All sample_values numeric (decimals allowed): "number"
- All sample_values match common date patterns (YYYY-MM-DD, MM/DD/YYYY): "date"
- All sample_values are "true" or "false" (case insensitive): "boolean"
- Otherwise: "string""#;

const CONFIDENCE_RULES: &str = r#"Confidence score guidelines:
- Entity with a complete description and all attributes defined: 0.9-1.0
- Entity with a partial description or unclear attribute names: 0.7-0.9
- Attribute with a clear description and sample values: 0.8-1.0
- Attribute with minimal information: 0.6-0.8
- Type that cannot be reasonably inferred: use "string" and 0.7
- Relationship confidence: the confidence given in the input"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Return ONLY the JSON object described above. No markdown code fences, no explanation, no text before or after it."#;

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_domain::Attribute;

    fn entity() -> LogicalEntity {
        LogicalEntity {
            entity_id: "material_inventory".to_string(),
            entity_name: "Material Inventory at Location".to_string(),
            entity_description: "Inventory of materials stored at specific locations".to_string(),
            attributes: vec![
                Attribute {
                    attribute_name: "inventory_id".to_string(),
                    description: "Unique identifier for inventory entry".to_string(),
                    sample_values: vec!["INV001".to_string(), "INV002".to_string()],
                },
                Attribute {
                    attribute_name: "quantity".to_string(),
                    description: "Amount of material available".to_string(),
                    sample_values: vec!["100".to_string(), "250".to_string()],
                },
            ],
        }
    }

    fn relationships() -> Vec<EntityRelationship> {
        vec![
            EntityRelationship {
                source_entity: "material_inventory".to_string(),
                target_entity: "sales_order".to_string(),
                relationship_type: "fulfills".to_string(),
                description: "Inventory items fulfill sales orders".to_string(),
                confidence: 0.92,
            },
            EntityRelationship {
                source_entity: "customer".to_string(),
                target_entity: "sales_order".to_string(),
                relationship_type: "places".to_string(),
                description: "Customers place sales orders".to_string(),
                confidence: 0.88,
            },
        ]
    }

    #[test]
    fn test_relationships_filtered_by_entity_id() {
        let entity = entity();
        let relationships = relationships();
        let builder = PromptBuilder::new(&entity, &relationships);

        assert_eq!(builder.relationships().len(), 1);
        let prompt = builder.build();
        assert!(prompt.contains("Inventory items fulfill sales orders"));
        assert!(!prompt.contains("Customers place sales orders"));
    }

    #[test]
    fn test_prompt_contains_entity_and_schema() {
        let entity = entity();
        let prompt = PromptBuilder::new(&entity, &[]).build();

        assert!(prompt.contains("\"entity_id\": \"material_inventory\""));
        assert!(prompt.contains("\"lineageNodes\""));
        assert!(prompt.contains("\"lineageRelationships\""));
        assert!(prompt.contains("\"table\" | \"column\""));
        assert!(prompt.contains("Return ONLY the JSON object"));
    }

    #[test]
    fn test_naming_uses_job_and_prefix() {
        let entity = entity();
        let prompt = PromptBuilder::new(&entity, &[])
            .with_job_id("doc-42")
            .with_qualified_name_prefix("erp")
            .with_timestamp("2025-07-17T08:32:49Z")
            .build();

        assert!(prompt.contains("nodeId \"doc-42_material_inventory\""));
        assert!(prompt.contains("qualifiedName \"erp.material_inventory\""));
        assert!(prompt.contains("\"2025-07-17T08:32:49Z\""));
    }

    #[test]
    fn test_type_hints() {
        let entity = entity();
        let prompt = PromptBuilder::new(&entity, &[]).build();
        assert!(prompt.contains("- inventory_id: string"));
        assert!(prompt.contains("- quantity: number"));

        let prompt = PromptBuilder::new(&entity, &[]).with_type_hints(false).build();
        assert!(!prompt.contains("Inferred data types"));
    }

    #[test]
    fn test_document_metadata() {
        let entity = entity();
        let prompt = PromptBuilder::new(&entity, &[]).build();
        assert!(prompt.contains("No metadata available"));

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "source_system".to_string(),
            MetadataValue::String("SAP".to_string()),
        );
        let prompt = PromptBuilder::new(&entity, &[])
            .with_document_metadata(Some(&metadata))
            .build();
        assert!(prompt.contains("\"source_system\": \"SAP\""));
        assert!(!prompt.contains("No metadata available"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let entity = entity();
        let relationships = relationships();
        let a = PromptBuilder::new(&entity, &relationships).with_timestamp("t").build();
        let b = PromptBuilder::new(&entity, &relationships).with_timestamp("t").build();
        assert_eq!(a, b);
    }
}

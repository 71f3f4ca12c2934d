//! Lineage graph produced by the model
//!
//! Field names follow the model output contract exactly (`lineageNodes`,
//! `nodeId`, `metadata.confidence_score`, ...), so these types are both the
//! parse target for model responses and the merge/persistence currency.

use crate::data_type::DataType;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Default relationship type when the model omits one
pub const DEFAULT_RELATIONSHIP_TYPE: &str = "business_reference";

/// Kind of lineage node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// A table (from a logical entity)
    Table,
    /// A column (from an entity attribute)
    Column,
}

impl NodeType {
    /// Get the node type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Table => "table",
            NodeType::Column => "column",
        }
    }

    /// Parse a node type from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(NodeType::Table),
            "column" => Some(NodeType::Column),
            _ => None,
        }
    }
}

/// A metadata value from the closed set the engine understands
///
/// Deserialization never fails on shape: arrays, which fall outside the set,
/// are kept as their compact JSON text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// JSON null
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// String
    String(String),
    /// Nested mapping
    Map(BTreeMap<String, MetadataValue>),
}

impl From<Value> for MetadataValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => MetadataValue::Null,
            Value::Bool(b) => MetadataValue::Bool(b),
            Value::Number(n) => match n.as_f64() {
                Some(f) => MetadataValue::Number(f),
                None => MetadataValue::String(n.to_string()),
            },
            Value::String(s) => MetadataValue::String(s),
            Value::Object(map) => {
                MetadataValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            array @ Value::Array(_) => MetadataValue::String(array.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for MetadataValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(MetadataValue::from)
    }
}

/// Node metadata
///
/// Well-known keys are typed fields; any other key the model emits is kept
/// in `extra`, folded into [`MetadataValue`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Description text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Column data type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,

    /// Extraction confidence [0.0, 1.0]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,

    /// RFC 3339 timestamp of extraction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    /// Additional keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetadataValue>,
}

/// A vertex in the lineage graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageNode {
    /// Identifier, unique within one model call only
    pub node_id: String,

    /// Table or column
    pub node_type: NodeType,

    /// Normalised name
    #[serde(default)]
    pub node_name: String,

    /// Cross-call stable identity (e.g. `domain.table.column`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,

    /// Owning table's `nodeId` for columns, null for tables
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Node metadata
    #[serde(default)]
    pub metadata: NodeMetadata,
}

impl LineageNode {
    /// The merge de-duplication key: `qualifiedName`, falling back to `nodeId`
    pub fn dedup_key(&self) -> &str {
        match self.qualified_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.node_id,
        }
    }

    /// Confidence score, treating a missing score as 0.0
    pub fn confidence(&self) -> f64 {
        self.metadata.confidence_score.unwrap_or(0.0)
    }
}

/// Business rule attached to a relationship
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessRule {
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

fn default_relationship_type() -> String {
    DEFAULT_RELATIONSHIP_TYPE.to_string()
}

/// A directed edge between two lineage nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageRelationship {
    /// Identifier as emitted by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_id: Option<String>,

    /// Source node id (same mapping)
    pub source_node_id: String,

    /// Target node id (same mapping)
    pub target_node_id: String,

    /// Relationship kind
    #[serde(default = "default_relationship_type")]
    pub relationship_type: String,

    /// Extraction confidence [0.0, 1.0]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Business rule
    #[serde(default)]
    pub business_rule: BusinessRule,
}

/// Graph fragment produced by one model call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageMapping {
    /// Nodes in model order
    #[serde(default)]
    pub lineage_nodes: Vec<LineageNode>,

    /// Relationships in model order
    #[serde(default)]
    pub lineage_relationships: Vec<LineageRelationship>,
}

impl LineageMapping {
    /// Find the first node with `node_id`
    pub fn find_node(&self, node_id: &str) -> Option<&LineageNode> {
        self.lineage_nodes.iter().find(|n| n.node_id == node_id)
    }

    /// Whether the mapping carries no nodes and no relationships
    pub fn is_empty(&self) -> bool {
        self.lineage_nodes.is_empty() && self.lineage_relationships.is_empty()
    }
}

/// De-duplicated graph assembled from per-entity mappings
///
/// Every relationship endpoint resolves to a node in `lineage_nodes` and
/// every de-duplication key appears once. Node ids keep the first mapping's
/// local `nodeId`, so they are only unique across mappings when the model
/// follows the `{job}_{entity}` naming it is prompted with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedLineageMapping {
    /// Unique nodes, first occurrence order
    pub lineage_nodes: Vec<LineageNode>,

    /// Resolved, de-duplicated relationships
    pub lineage_relationships: Vec<LineageRelationship>,
}

impl MergedLineageMapping {
    /// Set of node ids present in the graph
    pub fn node_ids(&self) -> HashSet<&str> {
        self.lineage_nodes.iter().map(|n| n.node_id.as_str()).collect()
    }

    /// Whether every relationship endpoint resolves to a node
    pub fn has_referential_integrity(&self) -> bool {
        let ids = self.node_ids();
        self.lineage_relationships
            .iter()
            .all(|r| ids.contains(r.source_node_id.as_str()) && ids.contains(r.target_node_id.as_str()))
    }

    /// Nodes whose confidence is below `threshold`
    pub fn nodes_below(&self, threshold: f64) -> Vec<&LineageNode> {
        self.lineage_nodes
            .iter()
            .filter(|n| n.confidence() < threshold)
            .collect()
    }
}

//! Persisted record shapes and the consumer-facing projection

use crate::job::JobStatus;
use crate::lineage::{BusinessRule, LineageNode, LineageRelationship, NodeMetadata, NodeType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A lineage node ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewNodeRecord {
    /// Owning job's `job_id`
    pub job_id: String,
    /// Merged node id
    pub node_id: String,
    /// Table or column
    pub node_type: NodeType,
    /// Node name
    pub node_name: String,
    /// De-duplication key
    pub qualified_name: String,
    /// Parent table id for columns
    pub parent_id: Option<String>,
    /// Node metadata
    pub metadata: NodeMetadata,
    /// Whether confidence met the verification threshold
    pub is_verified: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl NewNodeRecord {
    /// Build a record from a merged node
    pub fn from_node(
        job_id: &str,
        node: &LineageNode,
        threshold: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            node_id: node.node_id.clone(),
            node_type: node.node_type,
            node_name: node.node_name.clone(),
            qualified_name: node.dedup_key().to_string(),
            parent_id: node.parent_id.clone(),
            metadata: node.metadata.clone(),
            is_verified: node.confidence() >= threshold,
            created_at: now,
        }
    }
}

/// A persisted lineage node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Repository-assigned id
    pub record_id: i64,
    /// Owning job's `job_id`
    pub job_id: String,
    /// Merged node id
    pub node_id: String,
    /// Table or column
    pub node_type: NodeType,
    /// Node name
    pub node_name: String,
    /// De-duplication key
    pub qualified_name: String,
    /// Parent table id for columns
    pub parent_id: Option<String>,
    /// Node metadata
    pub metadata: NodeMetadata,
    /// Whether confidence met the verification threshold
    pub is_verified: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

/// A lineage relationship ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewRelationshipRecord {
    /// Owning job's `job_id`
    pub job_id: String,
    /// Deterministic merged id
    pub relationship_id: String,
    /// Merged source node id
    pub source_node_id: String,
    /// Merged target node id
    pub target_node_id: String,
    /// Relationship kind
    pub relationship_type: String,
    /// Extraction confidence
    pub confidence: Option<f64>,
    /// Business rule
    pub business_rule: BusinessRule,
    /// Whether confidence met the verification threshold
    pub is_verified: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl NewRelationshipRecord {
    /// Build a record from a merged relationship
    pub fn from_relationship(
        job_id: &str,
        relationship: &LineageRelationship,
        threshold: f64,
        now: DateTime<Utc>,
    ) -> Self {
        let relationship_id = relationship.relationship_id.clone().unwrap_or_else(|| {
            format!("{}-{}", relationship.source_node_id, relationship.target_node_id)
        });

        Self {
            job_id: job_id.to_string(),
            relationship_id,
            source_node_id: relationship.source_node_id.clone(),
            target_node_id: relationship.target_node_id.clone(),
            relationship_type: relationship.relationship_type.clone(),
            confidence: relationship.confidence,
            business_rule: relationship.business_rule.clone(),
            is_verified: relationship.confidence.unwrap_or(0.0) >= threshold,
            created_at: now,
        }
    }
}

/// A persisted lineage relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// Repository-assigned id
    pub record_id: i64,
    /// Owning job's `job_id`
    pub job_id: String,
    /// Deterministic merged id
    pub relationship_id: String,
    /// Merged source node id
    pub source_node_id: String,
    /// Merged target node id
    pub target_node_id: String,
    /// Relationship kind
    pub relationship_type: String,
    /// Extraction confidence
    pub confidence: Option<f64>,
    /// Business rule
    pub business_rule: BusinessRule,
    /// Whether confidence met the verification threshold
    pub is_verified: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

/// Node entry of [`DocumentMappingResponse`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedNode {
    /// Node id
    pub node_id: String,
    /// Table or column
    pub node_type: NodeType,
    /// Node name
    pub node_name: String,
    /// Qualified name
    pub qualified_name: String,
    /// Parent table id for columns
    pub parent_id: Option<String>,
    /// Node metadata
    pub metadata: NodeMetadata,
    /// Verification flag
    pub is_verified: bool,
}

impl From<NodeRecord> for MappedNode {
    fn from(record: NodeRecord) -> Self {
        Self {
            node_id: record.node_id,
            node_type: record.node_type,
            node_name: record.node_name,
            qualified_name: record.qualified_name,
            parent_id: record.parent_id,
            metadata: record.metadata,
            is_verified: record.is_verified,
        }
    }
}

/// Relationship entry of [`DocumentMappingResponse`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedRelationship {
    /// Relationship id
    pub relationship_id: String,
    /// Source node id
    pub source_node: String,
    /// Target node id
    pub target_node: String,
    /// Relationship kind
    pub relationship_type: String,
    /// Extraction confidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Business rule
    pub business_rule: BusinessRule,
    /// Verification flag
    pub is_verified: bool,
}

impl From<RelationshipRecord> for MappedRelationship {
    fn from(record: RelationshipRecord) -> Self {
        Self {
            relationship_id: record.relationship_id,
            source_node: record.source_node_id,
            target_node: record.target_node_id,
            relationship_type: record.relationship_type,
            confidence: record.confidence,
            business_rule: record.business_rule,
            is_verified: record.is_verified,
        }
    }
}

/// Persisted graph of a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMappings {
    /// Persisted nodes
    pub nodes: Vec<MappedNode>,
    /// Persisted relationships
    pub relationships: Vec<MappedRelationship>,
}

/// Read-only projection of a document's job status and persisted graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMappingResponse {
    /// Document identifier
    pub document_id: String,
    /// Current job status
    pub status: JobStatus,
    /// Persisted graph
    pub mappings: DocumentMappings,
}

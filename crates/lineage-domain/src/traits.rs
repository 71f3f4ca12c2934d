//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the lineage engine and
//! infrastructure. Implementations live in other crates (lineage-store).
//! Core logic depends only on these contracts, never on a specific backend.

use crate::{
    DocumentExtraction, DocumentJob, JobStatus, NewNodeRecord, NewRelationshipRecord, NodeRecord,
    NodeType, RelationshipRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Trait for storing and updating document jobs
pub trait JobRepository {
    /// Error type for job operations
    type Error;

    /// Register a new job
    fn create_job(&mut self, job: DocumentJob) -> Result<(), Self::Error>;

    /// Move the job for `document_id` to `status`
    ///
    /// Fails if no job exists for the document.
    fn update_status(
        &mut self,
        document_id: &str,
        status: JobStatus,
        error_message: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Self::Error>;

    /// Get the job for `document_id`
    fn find_by_document_id(&self, document_id: &str) -> Result<Option<DocumentJob>, Self::Error>;
}

/// Trait for persisting lineage nodes
pub trait NodeRepository {
    /// Error type for node operations
    type Error;

    /// Persist nodes, returning them with repository-assigned ids
    fn bulk_create_nodes(&mut self, nodes: Vec<NewNodeRecord>) -> Result<Vec<NodeRecord>, Self::Error>;

    /// Nodes persisted for a job, in insertion order
    fn find_nodes_by_job_id(&self, job_id: &str) -> Result<Vec<NodeRecord>, Self::Error>;

    /// Nodes of a given type across all jobs
    fn find_nodes_by_type(&self, node_type: NodeType) -> Result<Vec<NodeRecord>, Self::Error>;
}

/// Trait for persisting lineage relationships
pub trait RelationshipRepository {
    /// Error type for relationship operations
    type Error;

    /// Persist relationships, returning them with repository-assigned ids
    fn bulk_create_relationships(
        &mut self,
        relationships: Vec<NewRelationshipRecord>,
    ) -> Result<Vec<RelationshipRecord>, Self::Error>;

    /// Relationships persisted for a job, in insertion order
    fn find_relationships_by_job_id(&self, job_id: &str) -> Result<Vec<RelationshipRecord>, Self::Error>;

    /// Every persisted relationship
    fn find_all_relationships(&self) -> Result<Vec<RelationshipRecord>, Self::Error>;
}

/// Trait for writing a job's lineage graph as one unit
pub trait GraphRepository {
    /// Error type for graph operations
    type Error;

    /// Replace every node and relationship stored under `job_id`
    ///
    /// Either the whole new graph is stored or nothing changes.
    fn replace_graph(
        &mut self,
        job_id: &str,
        nodes: Vec<NewNodeRecord>,
        relationships: Vec<NewRelationshipRecord>,
    ) -> Result<(Vec<NodeRecord>, Vec<RelationshipRecord>), Self::Error>;
}

/// Trait for fetching document extractions from an object store
#[async_trait]
pub trait ExtractionSource: Send + Sync {
    /// Error type for fetch operations
    type Error: std::fmt::Display + Send;

    /// Fetch and decode the extraction stored at `bucket`/`key`
    async fn fetch_extraction(&self, bucket: &str, key: &str) -> Result<DocumentExtraction, Self::Error>;
}

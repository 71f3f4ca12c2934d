//! Lineage Storage Layer
//!
//! Implements the job, node and relationship repositories using SQLite, and
//! an extraction source that reads extraction documents from a directory tree.
//!
//! # Architecture
//!
//! - SQLite for jobs and the persisted lineage graph
//! - Metadata and business rules stored as JSON text columns
//! - Timestamps stored as RFC 3339 text
//!
//! # Examples
//!
//! ```no_run
//! use lineage_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for job and lineage operations
//! ```

#![warn(missing_docs)]

pub mod source;

use chrono::{DateTime, SecondsFormat, Utc};
use lineage_domain::traits::{GraphRepository, JobRepository, NodeRepository, RelationshipRepository};
use lineage_domain::{
    DocumentJob, JobId, JobStatus, NewNodeRecord, NewRelationshipRecord, NodeRecord, NodeType,
    RelationshipRecord,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;

pub use source::FsExtractionSource;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

const JOB_COLUMNS: &str = "job_id, document_id, bucket, object_key, status, error_message, \
     created_at, updated_at, completed_at";

const NODE_COLUMNS: &str = "id, job_id, node_id, node_type, node_name, qualified_name, parent_id, \
     metadata, is_verified, created_at, updated_at";

const RELATIONSHIP_COLUMNS: &str = "id, job_id, relationship_id, source_node_id, target_node_id, \
     relationship_type, confidence, business_rule, is_verified, created_at, updated_at";

/// SQLite-based implementation of the lineage repositories
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share a store between tasks by
/// wrapping it in a mutex.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lineage_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("lineage.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    fn job_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentJob> {
        let job_id: String = row.get(0)?;
        let status: String = row.get(4)?;
        let completed_at: Option<String> = row.get(8)?;

        Ok(DocumentJob {
            job_id: JobId::from_string(&job_id).map_err(|e| invalid(0, e))?,
            document_id: row.get(1)?,
            bucket: row.get(2)?,
            key: row.get(3)?,
            status: JobStatus::parse(&status)
                .ok_or_else(|| invalid(4, format!("Unknown job status: {}", status)))?,
            error_message: row.get(5)?,
            created_at: parse_time(6, row.get(6)?)?,
            updated_at: parse_time(7, row.get(7)?)?,
            completed_at: completed_at.map(|t| parse_time(8, t)).transpose()?,
        })
    }

    fn node_from_row(row: &Row<'_>) -> rusqlite::Result<NodeRecord> {
        let node_type: String = row.get(3)?;
        let metadata: String = row.get(7)?;

        Ok(NodeRecord {
            record_id: row.get(0)?,
            job_id: row.get(1)?,
            node_id: row.get(2)?,
            node_type: NodeType::parse(&node_type)
                .ok_or_else(|| invalid(3, format!("Unknown node type: {}", node_type)))?,
            node_name: row.get(4)?,
            qualified_name: row.get(5)?,
            parent_id: row.get(6)?,
            metadata: serde_json::from_str(&metadata).map_err(|e| conversion(7, e))?,
            is_verified: row.get(8)?,
            created_at: parse_time(9, row.get(9)?)?,
            updated_at: parse_time(10, row.get(10)?)?,
        })
    }

    fn relationship_from_row(row: &Row<'_>) -> rusqlite::Result<RelationshipRecord> {
        let business_rule: String = row.get(7)?;

        Ok(RelationshipRecord {
            record_id: row.get(0)?,
            job_id: row.get(1)?,
            relationship_id: row.get(2)?,
            source_node_id: row.get(3)?,
            target_node_id: row.get(4)?,
            relationship_type: row.get(5)?,
            confidence: row.get(6)?,
            business_rule: serde_json::from_str(&business_rule).map_err(|e| conversion(7, e))?,
            is_verified: row.get(8)?,
            created_at: parse_time(9, row.get(9)?)?,
            updated_at: parse_time(10, row.get(10)?)?,
        })
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(idx: usize, text: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion(idx, e))
}

fn conversion<E>(idx: usize, error: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(error))
}

fn invalid(idx: usize, message: impl Into<String>) -> rusqlite::Error {
    conversion(idx, StoreError::InvalidData(message.into()))
}

impl JobRepository for SqliteStore {
    type Error = StoreError;

    fn create_job(&mut self, job: DocumentJob) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO document_jobs (job_id, document_id, bucket, object_key, status, error_message,
                                        created_at, updated_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                job.job_id.to_string(),
                &job.document_id,
                &job.bucket,
                &job.key,
                job.status.as_str(),
                &job.error_message,
                format_time(job.created_at),
                format_time(job.updated_at),
                job.completed_at.map(format_time),
            ],
        )?;

        tracing::debug!(document_id = %job.document_id, status = %job.status, "Created document job");
        Ok(())
    }

    fn update_status(
        &mut self,
        document_id: &str,
        status: JobStatus,
        error_message: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Self::Error> {
        let completed_at = status.is_settled().then(|| format_time(updated_at));

        let changed = self.conn.execute(
            "UPDATE document_jobs
             SET status = ?1, error_message = ?2, updated_at = ?3, completed_at = ?4
             WHERE document_id = ?5",
            params![
                status.as_str(),
                error_message,
                format_time(updated_at),
                completed_at,
                document_id,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(format!("No job for document {}", document_id)));
        }

        tracing::debug!(document_id, status = %status, "Updated job status");
        Ok(())
    }

    fn find_by_document_id(&self, document_id: &str) -> Result<Option<DocumentJob>, Self::Error> {
        let sql = format!("SELECT {} FROM document_jobs WHERE document_id = ?1", JOB_COLUMNS);
        let job = self
            .conn
            .query_row(&sql, params![document_id], Self::job_from_row)
            .optional()?;
        Ok(job)
    }
}

impl NodeRepository for SqliteStore {
    type Error = StoreError;

    fn bulk_create_nodes(&mut self, nodes: Vec<NewNodeRecord>) -> Result<Vec<NodeRecord>, Self::Error> {
        let tx = self.conn.transaction()?;
        let created = insert_nodes(&tx, nodes)?;
        tx.commit()?;
        Ok(created)
    }

    fn find_nodes_by_job_id(&self, job_id: &str) -> Result<Vec<NodeRecord>, Self::Error> {
        let sql = format!("SELECT {} FROM lineage_nodes WHERE job_id = ?1 ORDER BY id", NODE_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let nodes = stmt
            .query_map(params![job_id], Self::node_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nodes)
    }

    fn find_nodes_by_type(&self, node_type: NodeType) -> Result<Vec<NodeRecord>, Self::Error> {
        let sql = format!("SELECT {} FROM lineage_nodes WHERE node_type = ?1 ORDER BY id", NODE_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let nodes = stmt
            .query_map(params![node_type.as_str()], Self::node_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nodes)
    }
}

impl RelationshipRepository for SqliteStore {
    type Error = StoreError;

    fn bulk_create_relationships(
        &mut self,
        relationships: Vec<NewRelationshipRecord>,
    ) -> Result<Vec<RelationshipRecord>, Self::Error> {
        let tx = self.conn.transaction()?;
        let created = insert_relationships(&tx, relationships)?;
        tx.commit()?;
        Ok(created)
    }

    fn find_relationships_by_job_id(&self, job_id: &str) -> Result<Vec<RelationshipRecord>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM lineage_relationships WHERE job_id = ?1 ORDER BY id",
            RELATIONSHIP_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let relationships = stmt
            .query_map(params![job_id], Self::relationship_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(relationships)
    }

    fn find_all_relationships(&self) -> Result<Vec<RelationshipRecord>, Self::Error> {
        let sql = format!("SELECT {} FROM lineage_relationships ORDER BY id", RELATIONSHIP_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let relationships = stmt
            .query_map([], Self::relationship_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(relationships)
    }
}

impl GraphRepository for SqliteStore {
    type Error = StoreError;

    fn replace_graph(
        &mut self,
        job_id: &str,
        nodes: Vec<NewNodeRecord>,
        relationships: Vec<NewRelationshipRecord>,
    ) -> Result<(Vec<NodeRecord>, Vec<RelationshipRecord>), Self::Error> {
        let tx = self.conn.transaction()?;

        let removed_nodes = tx.execute("DELETE FROM lineage_nodes WHERE job_id = ?1", params![job_id])?;
        let removed_relationships =
            tx.execute("DELETE FROM lineage_relationships WHERE job_id = ?1", params![job_id])?;

        let nodes = insert_nodes(&tx, nodes)?;
        let relationships = insert_relationships(&tx, relationships)?;
        tx.commit()?;

        tracing::debug!(
            job_id,
            removed_nodes,
            removed_relationships,
            nodes = nodes.len(),
            relationships = relationships.len(),
            "Replaced lineage graph"
        );
        Ok((nodes, relationships))
    }
}

fn insert_nodes(conn: &Connection, nodes: Vec<NewNodeRecord>) -> Result<Vec<NodeRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "INSERT INTO lineage_nodes (job_id, node_id, node_type, node_name, qualified_name,
                                    parent_id, metadata, is_verified, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
    )?;
    let mut created = Vec::with_capacity(nodes.len());

    for node in nodes {
        let metadata = serde_json::to_string(&node.metadata)?;
        stmt.execute(params![
            &node.job_id,
            &node.node_id,
            node.node_type.as_str(),
            &node.node_name,
            &node.qualified_name,
            &node.parent_id,
            metadata,
            node.is_verified,
            format_time(node.created_at),
        ])?;

        created.push(NodeRecord {
            record_id: conn.last_insert_rowid(),
            job_id: node.job_id,
            node_id: node.node_id,
            node_type: node.node_type,
            node_name: node.node_name,
            qualified_name: node.qualified_name,
            parent_id: node.parent_id,
            metadata: node.metadata,
            is_verified: node.is_verified,
            created_at: node.created_at,
            updated_at: node.created_at,
        });
    }

    Ok(created)
}

fn insert_relationships(
    conn: &Connection,
    relationships: Vec<NewRelationshipRecord>,
) -> Result<Vec<RelationshipRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "INSERT INTO lineage_relationships (job_id, relationship_id, source_node_id, target_node_id,
                                            relationship_type, confidence, business_rule,
                                            is_verified, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
    )?;
    let mut created = Vec::with_capacity(relationships.len());

    for rel in relationships {
        let business_rule = serde_json::to_string(&rel.business_rule)?;
        stmt.execute(params![
            &rel.job_id,
            &rel.relationship_id,
            &rel.source_node_id,
            &rel.target_node_id,
            &rel.relationship_type,
            rel.confidence,
            business_rule,
            rel.is_verified,
            format_time(rel.created_at),
        ])?;

        created.push(RelationshipRecord {
            record_id: conn.last_insert_rowid(),
            job_id: rel.job_id,
            relationship_id: rel.relationship_id,
            source_node_id: rel.source_node_id,
            target_node_id: rel.target_node_id,
            relationship_type: rel.relationship_type,
            confidence: rel.confidence,
            business_rule: rel.business_rule,
            is_verified: rel.is_verified,
            created_at: rel.created_at,
            updated_at: rel.created_at,
        });
    }

    Ok(created)
}

//! Lineage Domain Layer
//!
//! This crate contains the data model for the lineage engine: the extraction
//! input produced upstream, the lineage graph produced by the model, the
//! document job state machine and the records persisted downstream. It also
//! defines the trait interfaces that infrastructure crates implement.
//!
//! ## Key Concepts
//!
//! - **Logical Entity**: a business concept discovered during extraction
//! - **Lineage Node**: a table or column vertex in the lineage graph
//! - **Lineage Relationship**: a directed edge between two lineage nodes
//! - **Lineage Mapping**: the graph fragment produced by one model call
//! - **Document Job**: the unit of work tracking one document's status
//!
//! ## Architecture
//!
//! - Pure data and business rules only
//! - Storage, model and object-store adapters live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod data_type;
pub mod entity;
pub mod job;
pub mod lineage;
pub mod record;
pub mod traits;

// Re-exports for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use data_type::DataType;
pub use entity::{
    Attribute, DocumentExtraction, EntityRelationship, ExtractionBody, LogicalEntity,
};
pub use job::{DocumentJob, DocumentProcessRequest, JobId, JobStatus};
pub use lineage::{
    BusinessRule, LineageMapping, LineageNode, LineageRelationship, MergedLineageMapping,
    MetadataValue, NodeMetadata, NodeType,
};
pub use record::{
    DocumentMappingResponse, DocumentMappings, MappedNode, MappedRelationship, NewNodeRecord,
    NewRelationshipRecord, NodeRecord, RelationshipRecord,
};

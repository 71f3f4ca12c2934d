//! Lineage Engine
//!
//! Turns extracted document entities into a verified data-lineage graph.
//!
//! # Overview
//!
//! Each logical entity of a document is sent to a text-generation model on
//! its own, together with the relationships it takes part in. The per-entity
//! graphs are merged into one de-duplicated graph, persisted, and gated on
//! node confidence to decide the document job's status.
//!
//! # Architecture
//!
//! ```text
//! Extraction → (Prompt → Model → Parse) per entity → Merge → Persist → Gate
//! ```
//!
//! # Key Features
//!
//! - **Per-entity prompts**: bounded prompt size, isolated entity failures
//! - **Resilient invocation**: throttled calls retried with jittered backoff
//! - **Output recovery**: truncated JSON repaired before giving up
//! - **Graph merge**: first-write-wins nodes, dangling edges dropped
//! - **Confidence gate**: `ENRICHMENTED` or `MANUAL_REVIEW`
//!
//! # Example Usage
//!
//! ```no_run
//! use lineage_domain::DocumentProcessRequest;
//! use lineage_engine::{EngineConfig, LineageProcessor};
//! use lineage_llm::MockProvider;
//! use lineage_store::{FsExtractionSource, SqliteStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = MockProvider::new(r#"{"lineageNodes": [], "lineageRelationships": []}"#);
//! let store = SqliteStore::new(":memory:")?;
//! let source = FsExtractionSource::new("./extractions");
//!
//! let processor = LineageProcessor::new(llm, store, source, EngineConfig::default())?;
//!
//! let request = DocumentProcessRequest {
//!     bucket: "documents".to_string(),
//!     key: "doc-1.json".to_string(),
//!     document_id: "doc-1".to_string(),
//! };
//! processor.process_document(&request).await?;
//!
//! let response = processor.get_document_with_mappings("doc-1")?;
//! println!("{}: {} nodes", response.status, response.mappings.nodes.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod gate;
mod generator;
mod merger;
mod parser;
mod processor;
mod prompt;
mod repair;


pub use config::EngineConfig;
pub use error::EngineError;
pub use gate::{ConfidenceGate, GateDecision};
pub use generator::{EntityFailure, GenerationOutcome, LineageGenerator};
pub use merger::merge_mappings;
pub use parser::parse_lineage_response;
pub use processor::{LineageProcessor, ReviewNotifier, ReviewTicket};
pub use prompt::PromptBuilder;
pub use repair::repair_json;

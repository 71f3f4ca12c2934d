//! Error types for the lineage engine

use lineage_llm::InvokeError;
use thiserror::Error;

/// Errors that can occur while generating and persisting lineage
#[derive(Error, Debug)]
pub enum EngineError {
    /// The extraction for the document could not be fetched or decoded
    #[error("Failed to fetch extraction: {0}")]
    ExtractionFetch(String),

    /// The model call failed fatally or ran out of retries
    #[error("Model invocation failed: {0}")]
    ModelInvocation(#[from] InvokeError),

    /// The model output could not be parsed, even after repair
    #[error("Failed to parse model response: {message}")]
    ResponseParse {
        /// Parse failure detail
        message: String,
        /// Raw model text, kept for diagnostics
        raw: String,
    },

    /// Every entity failed, so there is nothing to merge
    #[error("no entity mappings generated")]
    NoMappingsGenerated,

    /// A repository operation failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// No job exists for the document
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Whether the error is isolated to a single entity
    ///
    /// The generator logs and skips entities failing this way; any other
    /// error fails the whole job.
    pub fn is_entity_scoped(&self) -> bool {
        matches!(
            self,
            EngineError::ModelInvocation(_) | EngineError::ResponseParse { .. }
        )
    }

    pub(crate) fn persistence(error: impl std::fmt::Display) -> Self {
        EngineError::Persistence(error.to_string())
    }
}

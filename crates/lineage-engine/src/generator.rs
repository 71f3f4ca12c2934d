//! Per-entity lineage generation
//!
//! Entities are processed one at a time, in document order. Each entity gets
//! its own prompt, model call and parse; a failure is logged and recorded and
//! the next entity still runs.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::parser::parse_lineage_response;
use crate::prompt::PromptBuilder;
use lineage_domain::{Clock, DocumentExtraction, LineageMapping, LogicalEntity, SystemClock};
use lineage_llm::{ModelClient, ResilientInvoker, Sleeper};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument, Span};

/// An entity that produced no mapping
#[derive(Debug, Clone, PartialEq)]
pub struct EntityFailure {
    /// The entity's id
    pub entity_id: String,
    /// Why it failed
    pub reason: String,
}

/// Result of running every entity of a document
#[derive(Debug, Clone, Default)]
pub struct GenerationOutcome {
    /// Mappings of the entities that succeeded, in document order
    pub mappings: Vec<LineageMapping>,
    /// Entities that failed
    pub failures: Vec<EntityFailure>,
}

/// Drives prompt building, model invocation and parsing per entity
pub struct LineageGenerator<M> {
    invoker: ResilientInvoker<M>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    span: Span,
}

impl<M: ModelClient> LineageGenerator<M> {
    /// Create a generator calling `client` with the retry policy from `config`
    pub fn new(client: M, config: EngineConfig) -> Self {
        let invoker = ResilientInvoker::new(client).with_policy(config.retry_policy());
        Self {
            invoker,
            clock: Arc::new(SystemClock),
            config,
            span: tracing::info_span!("lineage_generator"),
        }
    }

    /// Use `clock` for prompt and parse timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use `sleeper` for retry backoff
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.invoker = self.invoker.with_sleeper(sleeper);
        self
    }

    /// Log under `span` instead of the default component span
    pub fn with_span(mut self, span: Span) -> Self {
        self.invoker = self.invoker.with_span(tracing::info_span!(parent: &span, "resilient_invoker"));
        self.span = span;
        self
    }

    /// The model behind this generator
    pub fn client(&self) -> &M {
        self.invoker.client()
    }

    /// Generate mappings for every entity of `extraction`
    ///
    /// `job_id` seeds the node and relationship ids the model is asked to use.
    ///
    /// # Errors
    ///
    /// `NoMappingsGenerated` when no entity produced a mapping.
    pub async fn generate(
        &self,
        extraction: &DocumentExtraction,
        job_id: &str,
    ) -> Result<GenerationOutcome, EngineError> {
        self.generate_inner(extraction, job_id)
            .instrument(self.span.clone())
            .await
    }

    async fn generate_inner(
        &self,
        extraction: &DocumentExtraction,
        job_id: &str,
    ) -> Result<GenerationOutcome, EngineError> {
        let entities = extraction.logical_entities();
        info!(job_id, entities = entities.len(), "Generating lineage per entity");

        let mut outcome = GenerationOutcome::default();

        for entity in entities {
            match self.generate_for_entity(extraction, entity, job_id).await {
                Ok(mapping) => {
                    debug!(
                        entity_id = %entity.entity_id,
                        nodes = mapping.lineage_nodes.len(),
                        relationships = mapping.lineage_relationships.len(),
                        "Entity mapped"
                    );
                    outcome.mappings.push(mapping);
                }
                Err(e) if e.is_entity_scoped() => {
                    match &e {
                        EngineError::ResponseParse { message, raw } => warn!(
                            entity_id = %entity.entity_id,
                            error = %message,
                            raw = %raw,
                            "Skipping entity with unparseable model response"
                        ),
                        _ => warn!(entity_id = %entity.entity_id, error = %e, "Skipping entity"),
                    }
                    outcome.failures.push(EntityFailure {
                        entity_id: entity.entity_id.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            job_id,
            succeeded = outcome.mappings.len(),
            failed = outcome.failures.len(),
            "Entity generation finished"
        );

        if outcome.mappings.is_empty() {
            return Err(EngineError::NoMappingsGenerated);
        }
        Ok(outcome)
    }

    /// Prompt, invoke and parse for a single entity
    pub async fn generate_for_entity(
        &self,
        extraction: &DocumentExtraction,
        entity: &LogicalEntity,
        job_id: &str,
    ) -> Result<LineageMapping, EngineError> {
        let prompt = PromptBuilder::new(entity, extraction.entity_relationships())
            .with_job_id(job_id)
            .with_qualified_name_prefix(self.config.qualified_name_prefix.as_str())
            .with_timestamp(self.clock.now_rfc3339())
            .with_document_metadata(extraction.document_metadata())
            .with_type_hints(self.config.include_type_hints)
            .build();

        debug!(entity_id = %entity.entity_id, prompt_len = prompt.len(), "Invoking model");
        let raw = self.invoker.invoke(&prompt).await?;
        debug!(entity_id = %entity.entity_id, response_len = raw.len(), "Model responded");

        parse_lineage_response(&raw, self.clock.as_ref())
    }
}

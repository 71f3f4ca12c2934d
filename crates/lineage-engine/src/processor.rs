//! Document processing pipeline and job state machine

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::gate::ConfidenceGate;
use crate::generator::LineageGenerator;
use crate::merger::merge_mappings;
use async_trait::async_trait;
use lineage_domain::traits::{
    ExtractionSource, GraphRepository, JobRepository, NodeRepository, RelationshipRepository,
};
use lineage_domain::{
    Clock, DocumentJob, DocumentMappingResponse, DocumentMappings, DocumentProcessRequest, JobStatus,
    MergedLineageMapping, NewNodeRecord, NewRelationshipRecord, SystemClock,
};
use lineage_llm::{ModelClient, Sleeper};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn, Instrument, Span};

/// Notice that a document needs human verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTicket {
    /// Document identifier
    pub document_id: String,
    /// Bucket holding the extraction
    pub bucket: String,
    /// Key of the extraction
    pub key: String,
    /// Why review is needed
    pub reason: String,
    /// Nodes below the confidence threshold
    pub low_confidence_nodes: Vec<String>,
}

/// Receives documents routed to manual review
#[async_trait]
pub trait ReviewNotifier: Send + Sync {
    /// Deliver `ticket`
    async fn notify(&self, ticket: &ReviewTicket) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Runs the lineage pipeline for documents and records job status
///
/// The store is shared behind a mutex; it is only locked for synchronous
/// repository calls, never across a model round trip.
pub struct LineageProcessor<M, S, X> {
    generator: LineageGenerator<M>,
    store: Arc<Mutex<S>>,
    source: X,
    gate: ConfidenceGate,
    clock: Arc<dyn Clock>,
    notifier: Option<Arc<dyn ReviewNotifier>>,
    span: Span,
}

impl<M, S, X> LineageProcessor<M, S, X>
where
    M: ModelClient,
    S: JobRepository + NodeRepository + RelationshipRepository + GraphRepository + Send,
    <S as JobRepository>::Error: Display,
    <S as NodeRepository>::Error: Display,
    <S as RelationshipRepository>::Error: Display,
    <S as GraphRepository>::Error: Display,
    X: ExtractionSource,
{
    /// Create a processor
    ///
    /// # Errors
    ///
    /// `Config` if `config` does not validate.
    pub fn new(client: M, store: S, source: X, config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_shared_store(client, Arc::new(Mutex::new(store)), source, config)
    }

    /// Create a processor over a store shared with other components
    pub fn with_shared_store(
        client: M,
        store: Arc<Mutex<S>>,
        source: X,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::Config)?;
        let gate = ConfidenceGate::new(config.confidence_threshold);

        Ok(Self {
            generator: LineageGenerator::new(client, config),
            store,
            source,
            gate,
            clock: Arc::new(SystemClock),
            notifier: None,
            span: tracing::info_span!("lineage_processor"),
        })
    }

    /// Use `clock` for every timestamp the pipeline writes
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.generator = self.generator.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    /// Use `sleeper` for retry backoff
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.generator = self.generator.with_sleeper(sleeper);
        self
    }

    /// Send manual-review tickets to `notifier`
    pub fn with_notifier(mut self, notifier: Arc<dyn ReviewNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Log under `span` instead of the default component span
    pub fn with_span(mut self, span: Span) -> Self {
        self.generator = self
            .generator
            .with_span(tracing::info_span!(parent: &span, "lineage_generator"));
        self.span = span;
        self
    }

    /// The shared store
    pub fn store(&self) -> &Arc<Mutex<S>> {
        &self.store
    }

    /// Run the full pipeline for one document
    ///
    /// On success the job ends in `ENRICHMENTED` or `MANUAL_REVIEW` and its
    /// stored graph is replaced by this run's graph. Any failure marks the
    /// job `FAILED` with the error message and is returned; the graph of the
    /// last successful run stays in place.
    pub async fn process_document(&self, request: &DocumentProcessRequest) -> Result<(), EngineError> {
        let span = tracing::info_span!(parent: &self.span, "process_document", document_id = %request.document_id);
        let result = self.run_pipeline(request).instrument(span).await;

        if let Err(e) = &result {
            error!(document_id = %request.document_id, error = %e, "Lineage generation failed");
            if !matches!(e, EngineError::DocumentNotFound(_)) {
                let message = e.to_string();
                if let Err(mark) = self.set_status(&request.document_id, JobStatus::Failed, Some(&message)) {
                    error!(document_id = %request.document_id, error = %mark, "Could not mark job as failed");
                }
            }
        }

        result
    }

    async fn run_pipeline(&self, request: &DocumentProcessRequest) -> Result<(), EngineError> {
        let document_id = request.document_id.as_str();
        info!(bucket = %request.bucket, key = %request.key, "Starting lineage generation");

        let job = self.find_job(document_id)?;
        self.set_status(document_id, JobStatus::Enrichmenting, None)?;

        let extraction = self
            .source
            .fetch_extraction(&request.bucket, &request.key)
            .await
            .map_err(|e| EngineError::ExtractionFetch(e.to_string()))?;

        let outcome = self.generator.generate(&extraction, document_id).await?;
        let merged = merge_mappings(&outcome.mappings);
        self.persist(&job, &merged)?;

        let decision = self.gate.evaluate(&merged);
        self.set_status(document_id, decision.status, None)?;

        info!(
            status = %decision.status,
            nodes = merged.lineage_nodes.len(),
            relationships = merged.lineage_relationships.len(),
            failed_entities = outcome.failures.len(),
            "Lineage generation complete"
        );

        if decision.status == JobStatus::ManualReview {
            if let Some(notifier) = &self.notifier {
                let ticket = ReviewTicket {
                    document_id: document_id.to_string(),
                    bucket: request.bucket.clone(),
                    key: request.key.clone(),
                    reason: format!(
                        "{} node(s) below confidence threshold {}",
                        decision.low_confidence_nodes.len(),
                        self.gate.threshold()
                    ),
                    low_confidence_nodes: decision.low_confidence_nodes,
                };
                if let Err(e) = notifier.notify(&ticket).await {
                    warn!(error = %e, "Failed to send manual review notification");
                }
            }
        }

        Ok(())
    }

    fn persist(&self, job: &DocumentJob, merged: &MergedLineageMapping) -> Result<(), EngineError> {
        let now = self.clock.now();
        let threshold = self.gate.threshold();
        let job_id = job.job_id.to_string();

        let nodes: Vec<NewNodeRecord> = merged
            .lineage_nodes
            .iter()
            .map(|n| NewNodeRecord::from_node(&job_id, n, threshold, now))
            .collect();
        let relationships: Vec<NewRelationshipRecord> = merged
            .lineage_relationships
            .iter()
            .map(|r| NewRelationshipRecord::from_relationship(&job_id, r, threshold, now))
            .collect();

        self.with_store(|store| {
            let (nodes, relationships) = store
                .replace_graph(&job_id, nodes, relationships)
                .map_err(EngineError::persistence)?;
            info!(
                job_id = %job_id,
                nodes = nodes.len(),
                relationships = relationships.len(),
                "Persisted lineage graph"
            );
            Ok(())
        })
    }

    /// Persisted graph and job status of a document
    ///
    /// # Errors
    ///
    /// `DocumentNotFound` if no job exists for `document_id`.
    pub fn get_document_with_mappings(&self, document_id: &str) -> Result<DocumentMappingResponse, EngineError> {
        self.with_store(|store| {
            let job = store
                .find_by_document_id(document_id)
                .map_err(EngineError::persistence)?
                .ok_or_else(|| EngineError::DocumentNotFound(document_id.to_string()))?;
            let job_id = job.job_id.to_string();
            let nodes = store
                .find_nodes_by_job_id(&job_id)
                .map_err(EngineError::persistence)?;
            let relationships = store
                .find_relationships_by_job_id(&job_id)
                .map_err(EngineError::persistence)?;

            Ok(DocumentMappingResponse {
                document_id: job.document_id,
                status: job.status,
                mappings: DocumentMappings {
                    nodes: nodes.into_iter().map(Into::into).collect(),
                    relationships: relationships.into_iter().map(Into::into).collect(),
                },
            })
        })
    }

    fn find_job(&self, document_id: &str) -> Result<DocumentJob, EngineError> {
        self.with_store(|store| {
            store
                .find_by_document_id(document_id)
                .map_err(EngineError::persistence)?
                .ok_or_else(|| EngineError::DocumentNotFound(document_id.to_string()))
        })
    }

    fn set_status(&self, document_id: &str, status: JobStatus, error_message: Option<&str>) -> Result<(), EngineError> {
        let now = self.clock.now();
        self.with_store(|store| {
            store
                .update_status(document_id, status, error_message, now)
                .map_err(EngineError::persistence)
        })
    }

    fn with_store<T>(&self, op: impl FnOnce(&mut S) -> Result<T, EngineError>) -> Result<T, EngineError> {
        let mut guard = self
            .store
            .lock()
            .map_err(|e| EngineError::Persistence(format!("Store lock poisoned: {}", e)))?;
        op(&mut guard)
    }
}

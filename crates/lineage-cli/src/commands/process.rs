//! Process command implementation.

use super::CliProcessor;
use crate::cli::ProcessArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use chrono::Utc;
use lineage_domain::traits::JobRepository;
use lineage_domain::{DocumentJob, DocumentProcessRequest, JobStatus};
use lineage_llm::ModelClient;
use tracing::info;

/// Execute the process command.
///
/// A job in `EXTRACTED` is registered for the document when none exists yet.
pub async fn execute_process<M: ModelClient>(
    args: ProcessArgs,
    processor: &CliProcessor<M>,
    formatter: &Formatter,
) -> Result<String> {
    if args.document_id.trim().is_empty() {
        return Err(CliError::InvalidInput("Document id must not be empty".to_string()));
    }

    {
        let mut store = processor
            .store()
            .lock()
            .map_err(|e| CliError::Config(format!("Store lock poisoned: {}", e)))?;
        if store.find_by_document_id(&args.document_id)?.is_none() {
            info!(document_id = %args.document_id, "Registering document job");
            store.create_job(DocumentJob::new(
                args.document_id.as_str(),
                args.bucket.as_str(),
                args.key.as_str(),
                JobStatus::Extracted,
                Utc::now(),
            ))?;
        }
    }

    let request = DocumentProcessRequest {
        bucket: args.bucket,
        key: args.key,
        document_id: args.document_id,
    };
    processor.process_document(&request).await?;

    let response = processor.get_document_with_mappings(&request.document_id)?;
    Ok(formatter.processed(&request.document_id, response.status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open_processor;
    use crate::config::{Config, OutputFormat};
    use lineage_llm::MockProvider;
    use std::fs;

    const OUTPUT: &str = r#"{
        "lineageNodes": [
            {"nodeId": "doc-1_orders", "nodeType": "table", "nodeName": "orders",
             "qualifiedName": "domain.orders", "parentId": null,
             "metadata": {"confidence_score": 0.9}}
        ],
        "lineageRelationships": []
    }"#;

    fn config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.store.path = dir.join("lineage.db");
        config.source.root = dir.join("extractions");
        config
    }

    fn write_extraction(config: &Config) {
        let bucket = config.source.root.join("documents");
        fs::create_dir_all(&bucket).unwrap();
        fs::write(
            bucket.join("doc-1.json"),
            r#"{"extraction": {"extracted_data_entities": {"logical_entities": [
                {"entity_id": "orders", "entity_name": "Orders", "attributes": []}
            ]}}}"#,
        )
        .unwrap();
    }

    fn args() -> ProcessArgs {
        ProcessArgs {
            bucket: "documents".to_string(),
            key: "doc-1.json".to_string(),
            document_id: "doc-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_process_registers_job_and_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        write_extraction(&config);

        let processor = open_processor(&config, MockProvider::new(OUTPUT)).unwrap();
        let formatter = Formatter::new(OutputFormat::Table, false);

        let message = execute_process(args(), &processor, &formatter).await.unwrap();
        assert_eq!(message, "✓ Processed doc-1: ENRICHMENTED");

        let response = processor.get_document_with_mappings("doc-1").unwrap();
        assert_eq!(response.mappings.nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_extraction_fails_job() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let processor = open_processor(&config, MockProvider::new(OUTPUT)).unwrap();
        let formatter = Formatter::new(OutputFormat::Table, false);

        let result = execute_process(args(), &processor, &formatter).await;
        assert!(matches!(result, Err(CliError::Engine(_))));

        let response = processor.get_document_with_mappings("doc-1").unwrap();
        assert_eq!(response.status, JobStatus::Failed);
    }
}

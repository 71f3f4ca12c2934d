//! Manual review notifier that writes tickets to the log

use async_trait::async_trait;
use lineage_engine::{ReviewNotifier, ReviewTicket};
use tracing::warn;

/// Logs every manual-review ticket at warn level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl ReviewNotifier for LogNotifier {
    async fn notify(&self, ticket: &ReviewTicket) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let payload = serde_json::to_string(ticket)?;
        warn!(
            document_id = %ticket.document_id,
            low_confidence = ticket.low_confidence_nodes.len(),
            ticket = %payload,
            "Document needs manual review"
        );
        Ok(())
    }
}

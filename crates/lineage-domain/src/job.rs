//! Document job module - the unit of work tracked through the state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a document job based on UUIDv7
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(uuid::Uuid);

impl JobId {
    /// Generate a new UUIDv7-based JobId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Parse a JobId from its string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid job id: {}", e))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a document job
///
/// The lineage engine drives `ENRICHMENTING → ENRICHMENTED | MANUAL_REVIEW | FAILED`;
/// the earlier states are written by upstream stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Job registered, nothing done yet
    Pending,
    /// Document uploaded to the object store
    Uploaded,
    /// Text extraction running
    Extracting,
    /// Text extraction finished
    Extracted,
    /// Classification running
    Classifying,
    /// Classification finished
    Classified,
    /// Lineage generation running
    Enrichmenting,
    /// Lineage generated and every node verified
    Enrichmented,
    /// Lineage generated but needs human verification
    ManualReview,
    /// Processing failed
    Failed,
}

impl JobStatus {
    /// Get the status name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Uploaded => "UPLOADED",
            JobStatus::Extracting => "EXTRACTING",
            JobStatus::Extracted => "EXTRACTED",
            JobStatus::Classifying => "CLASSIFYING",
            JobStatus::Classified => "CLASSIFIED",
            JobStatus::Enrichmenting => "ENRICHMENTING",
            JobStatus::Enrichmented => "ENRICHMENTED",
            JobStatus::ManualReview => "MANUAL_REVIEW",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Parse a status from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(JobStatus::Pending),
            "UPLOADED" => Some(JobStatus::Uploaded),
            "EXTRACTING" => Some(JobStatus::Extracting),
            "EXTRACTED" => Some(JobStatus::Extracted),
            "CLASSIFYING" => Some(JobStatus::Classifying),
            "CLASSIFIED" => Some(JobStatus::Classified),
            "ENRICHMENTING" => Some(JobStatus::Enrichmenting),
            "ENRICHMENTED" => Some(JobStatus::Enrichmented),
            "MANUAL_REVIEW" => Some(JobStatus::ManualReview),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Whether the lineage stage has finished with this status
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            JobStatus::Enrichmented | JobStatus::ManualReview | JobStatus::Failed
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document processing job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentJob {
    /// Job identifier
    pub job_id: JobId,

    /// Document identifier (one job per document)
    pub document_id: String,

    /// Bucket holding the extraction
    pub bucket: String,

    /// Key of the extraction inside the bucket
    pub key: String,

    /// Current status
    pub status: JobStatus,

    /// Failure detail, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// When the job was created
    pub created_at: DateTime<Utc>,

    /// When the job was last updated
    pub updated_at: DateTime<Utc>,

    /// When the lineage stage settled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl DocumentJob {
    /// Create a job in `status` at `now`
    pub fn new(
        document_id: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
        status: JobStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            document_id: document_id.into(),
            bucket: bucket.into(),
            key: key.into(),
            status,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

/// Request to run the lineage pipeline for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentProcessRequest {
    /// Bucket holding the extraction
    pub bucket: String,

    /// Key of the extraction
    pub key: String,

    /// Document identifier
    pub document_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_names() {
        for status in [
            JobStatus::Pending,
            JobStatus::Extracted,
            JobStatus::Enrichmenting,
            JobStatus::Enrichmented,
            JobStatus::ManualReview,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("bogus"), None);
    }

    #[test]
    fn test_status_serde_matches_stored_name() {
        let json = serde_json::to_string(&JobStatus::ManualReview).unwrap();
        assert_eq!(json, "\"MANUAL_REVIEW\"");
    }

    #[test]
    fn test_settled_states() {
        assert!(JobStatus::Enrichmented.is_settled());
        assert!(JobStatus::ManualReview.is_settled());
        assert!(JobStatus::Failed.is_settled());
        assert!(!JobStatus::Enrichmenting.is_settled());
        assert!(!JobStatus::Extracted.is_settled());
    }

    #[test]
    fn test_job_id_display_and_parse() {
        let id = JobId::new();
        let parsed = JobId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(JobId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_process_request_camel_case() {
        let req: DocumentProcessRequest = serde_json::from_str(
            r#"{"bucket": "b", "key": "k.json", "documentId": "doc-1"}"#,
        )
        .unwrap();
        assert_eq!(req.document_id, "doc-1");
    }
}

//! Confidence gate deciding the job status after generation

use lineage_domain::{JobStatus, MergedLineageMapping};

/// Outcome of gating a merged mapping
#[derive(Debug, Clone, PartialEq)]
pub struct GateDecision {
    /// Status to record for the job
    pub status: JobStatus,
    /// Ids of nodes below the threshold, in graph order
    pub low_confidence_nodes: Vec<String>,
}

impl GateDecision {
    /// Whether every node met the threshold
    pub fn all_verified(&self) -> bool {
        self.low_confidence_nodes.is_empty()
    }
}

/// Compares node confidence against a verification threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    threshold: f64,
}

impl ConfidenceGate {
    /// Create a gate with `threshold`
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Verification threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// `ENRICHMENTED` when every node's confidence is at least the
    /// threshold (missing scores count as 0.0), otherwise `MANUAL_REVIEW`
    pub fn evaluate(&self, mapping: &MergedLineageMapping) -> GateDecision {
        let low_confidence_nodes: Vec<String> = mapping
            .nodes_below(self.threshold)
            .into_iter()
            .map(|n| n.node_id.clone())
            .collect();

        let status = if low_confidence_nodes.is_empty() {
            JobStatus::Enrichmented
        } else {
            JobStatus::ManualReview
        };

        GateDecision {
            status,
            low_confidence_nodes,
        }
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(0.7)
    }
}

//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use lineage_domain::{DocumentMappingResponse, JobStatus, MappedNode, MappedRelationship};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a document's stored lineage.
    pub fn format_mappings(&self, response: &DocumentMappingResponse) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(response)?),
            OutputFormat::Table => Ok(self.format_mappings_table(response)),
            OutputFormat::Quiet => Ok(response
                .mappings
                .nodes
                .iter()
                .map(|n| n.node_id.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    fn format_mappings_table(&self, response: &DocumentMappingResponse) -> String {
        let header = format!(
            "Document {} [{}]",
            response.document_id,
            self.status(response.status)
        );

        if response.mappings.nodes.is_empty() {
            return format!("{}\n{}", header, self.colorize("No lineage nodes found.", "yellow"));
        }

        format!(
            "{}\n{}\n{}",
            header,
            self.nodes_table(&response.mappings.nodes),
            self.relationships_table(&response.mappings.relationships)
        )
    }

    fn nodes_table(&self, nodes: &[MappedNode]) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Node", "Type", "Qualified Name", "Parent", "Data Type", "Confidence", "Verified"]);

        for node in nodes {
            builder.push_record([
                node.node_id.clone(),
                node.node_type.as_str().to_string(),
                node.qualified_name.clone(),
                node.parent_id.clone().unwrap_or_default(),
                node.metadata.data_type.map(|t| t.to_string()).unwrap_or_default(),
                confidence(node.metadata.confidence_score),
                self.verified(node.is_verified),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    fn relationships_table(&self, relationships: &[MappedRelationship]) -> String {
        if relationships.is_empty() {
            return self.colorize("No lineage relationships found.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Relationship", "Source", "Target", "Type", "Confidence", "Verified"]);

        for relationship in relationships {
            builder.push_record([
                relationship.relationship_id.clone(),
                relationship.source_node.clone(),
                relationship.target_node.clone(),
                relationship.relationship_type.clone(),
                confidence(relationship.confidence),
                self.verified(relationship.is_verified),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Format the outcome of processing a document.
    pub fn processed(&self, document_id: &str, status: JobStatus) -> String {
        let message = format!("Processed {}: {}", document_id, status);
        match status {
            JobStatus::Enrichmented => self.success(&message),
            JobStatus::ManualReview => self.warning(&message),
            _ => self.error(&message),
        }
    }

    fn status(&self, status: JobStatus) -> String {
        let color = match status {
            JobStatus::Enrichmented => "green",
            JobStatus::ManualReview => "yellow",
            JobStatus::Failed => "red",
            _ => "cyan",
        };
        self.colorize(status.as_str(), color)
    }

    fn verified(&self, verified: bool) -> String {
        if verified {
            self.colorize("yes", "green")
        } else {
            self.colorize("no", "red")
        }
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn confidence(score: Option<f64>) -> String {
    score.map(|c| format!("{:.2}", c)).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_domain::{BusinessRule, DocumentMappings, NodeMetadata, NodeType};

    fn response() -> DocumentMappingResponse {
        DocumentMappingResponse {
            document_id: "doc-1".to_string(),
            status: JobStatus::ManualReview,
            mappings: DocumentMappings {
                nodes: vec![
                    MappedNode {
                        node_id: "doc-1_orders".to_string(),
                        node_type: NodeType::Table,
                        node_name: "orders".to_string(),
                        qualified_name: "domain.orders".to_string(),
                        parent_id: None,
                        metadata: NodeMetadata {
                            confidence_score: Some(0.9),
                            ..NodeMetadata::default()
                        },
                        is_verified: true,
                    },
                    MappedNode {
                        node_id: "doc-1_orders_total".to_string(),
                        node_type: NodeType::Column,
                        node_name: "total".to_string(),
                        qualified_name: "domain.orders.total".to_string(),
                        parent_id: Some("doc-1_orders".to_string()),
                        metadata: NodeMetadata::default(),
                        is_verified: false,
                    },
                ],
                relationships: vec![MappedRelationship {
                    relationship_id: "doc-1_orders-doc-1_customer".to_string(),
                    source_node: "doc-1_orders".to_string(),
                    target_node: "doc-1_customer".to_string(),
                    relationship_type: "business_reference".to_string(),
                    confidence: Some(0.8),
                    business_rule: BusinessRule::default(),
                    is_verified: true,
                }],
            },
        }
    }

    #[test]
    fn test_quiet_lists_node_ids() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_mappings(&response()).unwrap();
        assert_eq!(output, "doc-1_orders\ndoc-1_orders_total");
    }

    #[test]
    fn test_json_uses_camel_case() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_mappings(&response()).unwrap();
        assert!(output.contains("\"documentId\": \"doc-1\""));
        assert!(output.contains("\"MANUAL_REVIEW\""));
        assert!(output.contains("\"isVerified\": false"));
    }

    #[test]
    fn test_table_without_color() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_mappings(&response()).unwrap();
        assert!(output.starts_with("Document doc-1 [MANUAL_REVIEW]"));
        assert!(output.contains("domain.orders.total"));
        assert!(output.contains("business_reference"));
        assert!(output.contains("0.90"));
    }

    #[test]
    fn test_empty_graph() {
        let mut empty = response();
        empty.mappings = DocumentMappings::default();
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_mappings(&empty).unwrap();
        assert!(output.contains("No lineage nodes found."));
    }
}

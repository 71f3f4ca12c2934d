//! Show command implementation.

use super::CliProcessor;
use crate::cli::ShowArgs;
use crate::error::Result;
use crate::output::Formatter;
use lineage_llm::ModelClient;

/// Execute the show command.
pub fn execute_show<M: ModelClient>(
    args: ShowArgs,
    processor: &CliProcessor<M>,
    formatter: &Formatter,
) -> Result<String> {
    let response = processor.get_document_with_mappings(&args.document_id)?;
    formatter.format_mappings(&response)
}

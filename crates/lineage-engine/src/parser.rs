//! Parse LLM output into a lineage mapping

use crate::error::EngineError;
use crate::repair::repair_json;
use lineage_domain::lineage::DEFAULT_RELATIONSHIP_TYPE;
use lineage_domain::{Clock, LineageMapping, LineageNode, LineageRelationship};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

/// Parse the raw model text into a [`LineageMapping`]
///
/// Leading and trailing prose (including markdown fences) is ignored. Text
/// that fails to parse gets one pass through [`repair_json`]. Missing or
/// null `lineageNodes`/`lineageRelationships` count as empty; nodes without
/// `metadata.last_updated` are stamped with `clock`.
pub fn parse_lineage_response(raw: &str, clock: &dyn Clock) -> Result<LineageMapping, EngineError> {
    let candidate = extract_json_object(raw).ok_or_else(|| parse_error("No JSON object found", raw))?;

    let value: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(first) => {
            debug!(error = %first, "Model output is not valid JSON, attempting repair");
            let repaired = repair_json(candidate);
            serde_json::from_str(&repaired)
                .map_err(|e| parse_error(format!("Invalid JSON after repair: {}", e), raw))?
        }
    };

    let object = value
        .as_object()
        .ok_or_else(|| parse_error("Expected a JSON object", raw))?;

    let mut nodes: Vec<LineageNode> = array_field(object, "lineageNodes", raw)?;
    let mut relationships: Vec<LineageRelationship> = array_field(object, "lineageRelationships", raw)?;

    let now = clock.now_rfc3339();
    for node in &mut nodes {
        if node.metadata.last_updated.as_deref().map_or(true, str::is_empty) {
            node.metadata.last_updated = Some(now.clone());
        }
    }
    for relationship in &mut relationships {
        if relationship.relationship_type.trim().is_empty() {
            relationship.relationship_type = DEFAULT_RELATIONSHIP_TYPE.to_string();
        }
    }

    Ok(LineageMapping {
        lineage_nodes: nodes,
        lineage_relationships: relationships,
    })
}

/// Slice from the first `{` to the last `}` (or to the end when truncated)
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    match raw.rfind('}') {
        Some(end) if end > start => Some(&raw[start..=end]),
        _ => Some(&raw[start..]),
    }
}

fn array_field<T: DeserializeOwned>(
    object: &Map<String, Value>,
    field: &str,
    raw: &str,
) -> Result<Vec<T>, EngineError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value @ Value::Array(_)) => serde_json::from_value(value.clone())
            .map_err(|e| parse_error(format!("Invalid '{}': {}", field, e), raw)),
        Some(_) => Err(parse_error(format!("'{}' must be an array", field), raw)),
    }
}

fn parse_error(message: impl Into<String>, raw: &str) -> EngineError {
    EngineError::ResponseParse {
        message: message.into(),
        raw: raw.to_string(),
    }
}

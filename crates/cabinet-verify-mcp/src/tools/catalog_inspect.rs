//! Tool: catalog_inspect — report which tools can be checked automatically.

use serde::Deserialize;
use serde_json::{json, Value};

use cabinet_verify::{ToolCatalog, ToolRecord};

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct InspectParams {
    tools: Vec<ToolRecord>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "catalog_inspect".to_string(),
        description: Some(
            "Validate a tool catalog and split it into positioned and unpositioned tools".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "tools": { "type": "array", "items": { "type": "object" } }
            },
            "required": ["tools"]
        }),
    }
}

pub fn execute(args: Value) -> McpResult<ToolCallResult> {
    let params: InspectParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let catalog = ToolCatalog::from_records(&params.tools)?;
    let positioned: Vec<u64> = catalog.positioned().map(|(id, _)| id).collect();

    Ok(ToolCallResult::json(&json!({
        "total": catalog.len(),
        "positioned": positioned,
        "unpositioned": catalog.unpositioned_ids(),
    })))
}

//! Tool registration and dispatch.

use serde_json::Value;

use ::cabinet_verify::{CancelToken, Verifier};

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{cabinet_verify, catalog_inspect};

/// Per-call state handed to a tool.
pub struct ToolContext<'a> {
    pub verifier: &'a Verifier,
    /// Cancelled when the client sends `notifications/cancelled` for this call.
    pub cancel: CancelToken,
}

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![cabinet_verify::definition(), catalog_inspect::definition()]
    }

    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        ctx: &ToolContext<'_>,
    ) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        match name {
            "cabinet_verify" => cabinet_verify::execute(args, ctx).await,
            "catalog_inspect" => catalog_inspect::execute(args),
            _ => Err(McpError::ToolNotFound(name.to_string())),
        }
    }
}

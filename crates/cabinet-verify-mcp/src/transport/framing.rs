//! Message framing for newline-delimited JSON.

use crate::types::{
    JsonRpcError, JsonRpcErrorObject, JsonRpcMessage, McpError, McpResult, RequestId,
    JSONRPC_VERSION,
};

/// Parse a single line of text as a JSON-RPC message.
pub fn parse_message(line: &str) -> McpResult<JsonRpcMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(McpError::ParseError("Empty message".to_string()));
    }

    serde_json::from_str(trimmed).map_err(|e| McpError::ParseError(e.to_string()))
}

/// Serialize a value to a JSON line (with trailing newline).
pub fn frame_message(value: &serde_json::Value) -> McpResult<String> {
    let mut json = serde_json::to_string(value).map_err(McpError::Json)?;
    json.push('\n');
    Ok(json)
}

/// Error response for a line that could not be parsed; the id is unknown, so it is null.
pub fn parse_error_response(error: &McpError) -> McpResult<serde_json::Value> {
    let response = JsonRpcError {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id: RequestId::Null,
        error: JsonRpcErrorObject {
            code: error.code(),
            message: error.to_string(),
            data: None,
        },
    };
    serde_json::to_value(response).map_err(McpError::Json)
}

//! JSON-RPC request validation.

use serde_json::Value;

use crate::types::{JsonRpcRequest, McpError, McpResult, RequestId, JSONRPC_VERSION};

/// Reject requests that are not well-formed JSON-RPC 2.0.
pub fn validate_request(request: &JsonRpcRequest) -> McpResult<()> {
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got \"{}\"",
            request.jsonrpc
        )));
    }

    if request.method.is_empty() {
        return Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        ));
    }

    // Requests are tracked by id for cancellation, so a null id cannot be addressed.
    if request.id == RequestId::Null {
        return Err(McpError::InvalidRequest(
            "Request id must be a string or number".to_string(),
        ));
    }

    match &request.params {
        None | Some(Value::Object(_)) | Some(Value::Array(_)) => Ok(()),
        Some(_) => Err(McpError::InvalidRequest(
            "params must be an object or array".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(jsonrpc: &str, id: RequestId, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: jsonrpc.to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }

    #[test]
    fn test_valid_request() {
        let r = request("2.0", RequestId::Number(1), "ping", None);
        assert!(validate_request(&r).is_ok());
    }

    #[test]
    fn test_rejections() {
        assert!(validate_request(&request("1.0", RequestId::Number(1), "ping", None)).is_err());
        assert!(validate_request(&request("2.0", RequestId::Number(1), "", None)).is_err());
        assert!(validate_request(&request("2.0", RequestId::Null, "ping", None)).is_err());
        let scalar = request("2.0", RequestId::Number(1), "ping", Some(Value::from(3)));
        assert_eq!(validate_request(&scalar).unwrap_err().code(), -32600);
    }
}

//! Error types and JSON-RPC error codes for the verification server.

use serde_json::{json, Value};

use cabinet_verify::{CatalogError, VerifyError};

use super::message::{JsonRpcError, JsonRpcErrorObject, RequestId, JSONRPC_VERSION};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP and engine-specific error codes.
pub mod mcp_error_codes {
    pub const REQUEST_CANCELLED: i32 = -32800;
    pub const TOOL_NOT_FOUND: i32 = -32803;
    pub const IMAGE_LOAD_ERROR: i32 = -32860;
    pub const PREPROCESS_ERROR: i32 = -32861;
    pub const SHAPE_MISMATCH: i32 = -32862;
}

/// All errors that can occur in the server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Request cancelled")]
    RequestCancelled,

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Image load error: {0}")]
    ImageLoad(String),

    #[error("Preprocess error: {0}")]
    Preprocess(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_) | McpError::Config(_) | McpError::Io(_) => INTERNAL_ERROR,
            McpError::RequestCancelled => REQUEST_CANCELLED,
            McpError::ToolNotFound(_) => TOOL_NOT_FOUND,
            McpError::ImageLoad(_) => IMAGE_LOAD_ERROR,
            McpError::Preprocess(_) => PREPROCESS_ERROR,
            McpError::ShapeMismatch(_) => SHAPE_MISMATCH,
            McpError::Json(_) => PARSE_ERROR,
        }
    }

    /// Structured detail for engine failures, so callers can decide on retry.
    pub fn data(&self) -> Option<Value> {
        let (kind, retryable) = match self {
            McpError::ImageLoad(_) => ("ImageLoadError", true),
            McpError::Preprocess(_) => ("PreprocessError", false),
            McpError::ShapeMismatch(_) => ("ShapeMismatchError", false),
            McpError::RequestCancelled => ("Cancelled", false),
            _ => return None,
        };
        Some(json!({ "kind": kind, "retryable": retryable }))
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: JsonRpcErrorObject {
                code: self.code(),
                message: self.to_string(),
                data: self.data(),
            },
        }
    }
}

impl From<VerifyError> for McpError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::ImageLoad(msg) => McpError::ImageLoad(msg),
            VerifyError::Preprocess(msg) => McpError::Preprocess(msg),
            e @ VerifyError::ShapeMismatch { .. } => McpError::ShapeMismatch(e.to_string()),
            VerifyError::Cancelled => McpError::RequestCancelled,
        }
    }
}

impl From<CatalogError> for McpError {
    fn from(e: CatalogError) -> Self {
        McpError::InvalidParams(format!("Invalid tool catalog: {e}"))
    }
}

pub type McpResult<T> = Result<T, McpError>;

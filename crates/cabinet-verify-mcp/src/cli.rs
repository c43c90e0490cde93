//! Helpers for the one-shot `verify` command.

use std::path::Path;

use cabinet_verify::{ImageRef, ToolRecord};

use crate::types::{McpError, McpResult};

/// Interpret a command-line image argument: URLs (including `data:`) stay URLs,
/// anything else is a local file path.
pub fn image_ref_from_arg(arg: &str) -> ImageRef {
    let lower = arg.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:") {
        ImageRef::url(arg)
    } else {
        ImageRef::File { path: arg.into() }
    }
}

/// Read a JSON array of tool records. No file means an empty catalog.
pub fn load_catalog_file(path: Option<&Path>) -> McpResult<Vec<ToolRecord>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        McpError::InvalidParams(format!("Failed to read catalog {}: {e}", path.display()))
    })?;
    serde_json::from_str(&text)
        .map_err(|e| McpError::InvalidParams(format!("Invalid catalog {}: {e}", path.display())))
}

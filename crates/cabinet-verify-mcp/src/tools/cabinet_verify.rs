//! Tool: cabinet_verify — compare a reference and a captured cabinet photo.

use serde::Deserialize;
use serde_json::{json, Value};

use ::cabinet_verify::{GridResolution, ImageRef, ToolCatalog, ToolRecord};

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::registry::ToolContext;

#[derive(Debug, Deserialize)]
struct VerifyParams {
    reference: ImageRef,
    captured: ImageRef,
    #[serde(default)]
    tools: Vec<ToolRecord>,
    #[serde(default)]
    grid_resolution: Option<GridResolution>,
}

fn image_ref_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "properties": {
            "type": {
                "type": "string",
                "enum": ["url", "base64", "file"],
                "description": "Source type"
            },
            "url": { "type": "string", "description": "http(s) or data: URL (for type=url)" },
            "data": { "type": "string", "description": "Base64 data (for type=base64)" },
            "mime": { "type": "string", "description": "MIME type (for type=base64)" },
            "path": { "type": "string", "description": "Local path (for type=file)" }
        },
        "required": ["type"]
    })
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "cabinet_verify".to_string(),
        description: Some(
            "Compare a cabinet's reference photo with a new capture and list tools that are likely missing"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "reference": image_ref_schema("Stored reference image"),
                "captured": image_ref_schema("Freshly captured image"),
                "tools": {
                    "type": "array",
                    "description": "Tool catalog; positions are normalized to [0, 1]",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "name": { "type": "string" },
                            "position_x": { "type": ["number", "null"] },
                            "position_y": { "type": ["number", "null"] },
                            "position_width": { "type": ["number", "null"] },
                            "position_height": { "type": ["number", "null"] }
                        },
                        "required": ["id"]
                    }
                },
                "grid_resolution": { "type": "integer", "minimum": 1, "maximum": 224, "default": 8 }
            },
            "required": ["reference", "captured"]
        }),
    }
}

pub async fn execute(args: Value, ctx: &ToolContext<'_>) -> McpResult<ToolCallResult> {
    let params: VerifyParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let catalog = ToolCatalog::from_records(&params.tools)?;

    let result = ctx
        .verifier
        .verify(
            &params.reference,
            &params.captured,
            &catalog,
            params.grid_resolution,
            &ctx.cancel,
        )
        .await?;

    Ok(ToolCallResult::json(&result))
}

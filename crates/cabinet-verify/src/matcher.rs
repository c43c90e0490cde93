//! Mapping flagged regions onto catalogued tool positions.

use serde::{Deserialize, Serialize};

use crate::catalog::ToolCatalog;
use crate::types::{GridRegion, MissingTool};

/// Confidence used by [`ConfidencePolicy::legacy`].
pub const LEGACY_FIXED_CONFIDENCE: f64 = 0.8;

/// How a missing tool's confidence is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidencePolicy {
    /// Highest confidence among the regions containing the tool's center.
    #[default]
    MaxRegion,
    /// The same constant for every missing tool.
    Fixed(f64),
}

impl ConfidencePolicy {
    /// Flat 0.8 for every hit, matching earlier deployments' reports.
    pub fn legacy() -> Self {
        ConfidencePolicy::Fixed(LEGACY_FIXED_CONFIDENCE)
    }
}

/// Report every positioned tool whose bounding-box center lies in a flagged region.
///
/// Output follows catalog order. Unpositioned tools are never reported.
pub fn find_missing_tools(
    catalog: &ToolCatalog,
    regions: &[GridRegion],
    policy: ConfidencePolicy,
) -> Vec<MissingTool> {
    if regions.is_empty() {
        return Vec::new();
    }

    catalog
        .positioned()
        .filter_map(|(tool_id, bbox)| {
            let (cx, cy) = bbox.center();
            let best = regions
                .iter()
                .filter(|r| r.contains(cx, cy))
                .map(|r| r.confidence)
                .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |a| a.max(c))))?;

            let confidence = match policy {
                ConfidencePolicy::MaxRegion => best,
                ConfidencePolicy::Fixed(c) => c,
            };
            Some(MissingTool {
                tool_id,
                confidence,
            })
        })
        .collect()
}

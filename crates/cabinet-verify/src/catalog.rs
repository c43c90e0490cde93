//! Tool catalog records and their resolution into positioned / unpositioned tools.

use serde::{Deserialize, Serialize};

/// A tool as handed over by the cabinet registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub position_x: Option<f64>,
    #[serde(default)]
    pub position_y: Option<f64>,
    #[serde(default)]
    pub position_width: Option<f64>,
    #[serde(default)]
    pub position_height: Option<f64>,
}

impl ToolRecord {
    pub fn positioned(id: u64, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id,
            position_x: Some(x),
            position_y: Some(y),
            position_width: Some(width),
            position_height: Some(height),
            ..Self::default()
        }
    }

    pub fn unpositioned(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// A normalized bounding box, every component in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A catalog entry after resolution. Only `Positioned` tools take part in matching.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogTool {
    Positioned {
        id: u64,
        name: Option<String>,
        bbox: BoundingBox,
    },
    Unpositioned {
        id: u64,
        name: Option<String>,
    },
}

impl CatalogTool {
    pub fn id(&self) -> u64 {
        match self {
            CatalogTool::Positioned { id, .. } | CatalogTool::Unpositioned { id, .. } => *id,
        }
    }

    pub fn bbox(&self) -> Option<&BoundingBox> {
        match self {
            CatalogTool::Positioned { bbox, .. } => Some(bbox),
            CatalogTool::Unpositioned { .. } => None,
        }
    }
}

/// Errors raised while loading a tool catalog.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Tool {id}: {field} = {value} is outside [0, 1]")]
    OutOfRange {
        id: u64,
        field: &'static str,
        value: f64,
    },

    #[error("Tool {id}: {field} is not a finite number")]
    NotFinite { id: u64, field: &'static str },

    #[error("Duplicate tool id {0}")]
    DuplicateId(u64),
}

/// An ordered, validated tool catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCatalog {
    tools: Vec<CatalogTool>,
}

impl ToolCatalog {
    /// Resolve raw records once.
    ///
    /// A record is positioned only when all four position fields are present.
    /// Any present field must be a finite number in `[0, 1]`.
    pub fn from_records(records: &[ToolRecord]) -> Result<Self, CatalogError> {
        let mut seen = std::collections::HashSet::with_capacity(records.len());
        let mut tools = Vec::with_capacity(records.len());

        for record in records {
            if !seen.insert(record.id) {
                return Err(CatalogError::DuplicateId(record.id));
            }

            let fields = [
                ("position_x", record.position_x),
                ("position_y", record.position_y),
                ("position_width", record.position_width),
                ("position_height", record.position_height),
            ];
            for (field, value) in fields {
                if let Some(v) = value {
                    check_unit(record.id, field, v)?;
                }
            }

            let tool = match (
                record.position_x,
                record.position_y,
                record.position_width,
                record.position_height,
            ) {
                (Some(x), Some(y), Some(width), Some(height)) => CatalogTool::Positioned {
                    id: record.id,
                    name: record.name.clone(),
                    bbox: BoundingBox {
                        x,
                        y,
                        width,
                        height,
                    },
                },
                _ => CatalogTool::Unpositioned {
                    id: record.id,
                    name: record.name.clone(),
                },
            };
            tools.push(tool);
        }

        Ok(Self { tools })
    }

    pub fn tools(&self) -> &[CatalogTool] {
        &self.tools
    }

    pub fn positioned(&self) -> impl Iterator<Item = (u64, &BoundingBox)> {
        self.tools.iter().filter_map(|t| t.bbox().map(|b| (t.id(), b)))
    }

    pub fn unpositioned_ids(&self) -> Vec<u64> {
        self.tools
            .iter()
            .filter(|t| t.bbox().is_none())
            .map(CatalogTool::id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn check_unit(id: u64, field: &'static str, value: f64) -> Result<(), CatalogError> {
    if !value.is_finite() {
        return Err(CatalogError::NotFinite { id, field });
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(CatalogError::OutOfRange { id, field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_into_variants() {
        let mut partial = ToolRecord::unpositioned(3);
        partial.position_x = Some(0.2);
        partial.position_y = Some(0.2);

        let catalog = ToolCatalog::from_records(&[
            ToolRecord::positioned(1, 0.0, 0.0, 0.25, 0.25),
            ToolRecord::unpositioned(2),
            partial,
        ])
        .unwrap();

        assert_eq!(catalog.len(), 3);
        let positioned: Vec<u64> = catalog.positioned().map(|(id, _)| id).collect();
        assert_eq!(positioned, vec![1]);
        assert_eq!(catalog.unpositioned_ids(), vec![2, 3]);
    }

    #[test]
    fn test_center() {
        let b = BoundingBox {
            x: 0.5,
            y: 0.5,
            width: 0.25,
            height: 0.25,
        };
        assert_eq!(b.center(), (0.625, 0.625));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = ToolCatalog::from_records(&[ToolRecord::positioned(9, 1.2, 0.0, 0.1, 0.1)])
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::OutOfRange {
                id: 9,
                field: "position_x",
                value: 1.2
            }
        );

        let err = ToolCatalog::from_records(&[ToolRecord::positioned(9, 0.0, f64::NAN, 0.1, 0.1)])
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFinite { field: "position_y", .. }));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = ToolCatalog::from_records(&[ToolRecord::unpositioned(4), ToolRecord::unpositioned(4)])
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateId(4));
    }

    #[test]
    fn test_records_from_registry_json() {
        let records: Vec<ToolRecord> = serde_json::from_str(
            r#"[
                {"id": 1, "name": "Hammer", "position_x": 0.1, "position_y": 0.2,
                 "position_width": 0.1, "position_height": 0.1},
                {"id": 2, "position_x": null}
            ]"#,
        )
        .unwrap();
        let catalog = ToolCatalog::from_records(&records).unwrap();
        assert_eq!(catalog.tools()[0].bbox().map(|b| b.x), Some(0.1));
        assert!(catalog.tools()[1].bbox().is_none());
    }
}

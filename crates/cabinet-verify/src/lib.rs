//! Cabinet verification engine — compares a reference and a captured photo of a
//! tool cabinet and reports which catalogued tools are likely missing.

pub mod cancel;
pub mod catalog;
pub mod config;
pub mod decode;
pub mod diff;
pub mod grid;
pub mod matcher;
pub mod preprocess;
pub mod resources;
pub mod types;
pub mod verify;

pub use cancel::CancelToken;
pub use catalog::{BoundingBox, CatalogError, CatalogTool, ToolCatalog, ToolRecord};
pub use config::{ConfigError, VerifyConfig};
pub use decode::{decode_bytes, load_image, ImageRef};
pub use diff::{compare_tensors, TensorComparison};
pub use grid::{GridAnalyzer, GridResolution, InvalidGridResolution};
pub use matcher::{find_missing_tools, ConfidencePolicy};
pub use preprocess::{preprocess, Resampling};
pub use resources::SharedResources;
pub use types::*;
pub use verify::{verify, Verifier};

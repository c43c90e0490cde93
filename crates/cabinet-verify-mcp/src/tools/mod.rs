//! Tool implementations.

pub mod cabinet_verify;
pub mod catalog_inspect;
pub mod registry;

pub use registry::{ToolContext, ToolRegistry};

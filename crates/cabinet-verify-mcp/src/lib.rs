//! Cabinet verification server — exposes the verification engine over MCP (stdio) and a CLI.

pub mod cli;
pub mod config;
pub mod protocol;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::{load_config, resolve_config_path};
pub use protocol::ProtocolHandler;
pub use transport::StdioTransport;

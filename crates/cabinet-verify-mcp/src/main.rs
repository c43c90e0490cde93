//! Cabinet verification server — entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use cabinet_verify::{CancelToken, GridResolution, SharedResources, ToolCatalog, Verifier};
use cabinet_verify_mcp::cli::{image_ref_from_arg, load_catalog_file};
use cabinet_verify_mcp::config::load_config;
use cabinet_verify_mcp::protocol::ProtocolHandler;
use cabinet_verify_mcp::tools::ToolRegistry;
use cabinet_verify_mcp::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "cabinet-verify-mcp",
    about = "Detect missing tools by comparing cabinet photos against a reference",
    version
)]
struct Cli {
    /// Path to a JSON config file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve,

    /// Run one verification and print the result as JSON.
    ///
    /// Images may be http(s) URLs, data: URLs, or local file paths.
    Verify {
        /// Reference image.
        reference: String,

        /// Captured image.
        captured: String,

        /// JSON file holding an array of tool records.
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Grid resolution (cells per side).
        #[arg(long)]
        grid: Option<GridResolution>,
    },

    /// Print server capabilities as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   cabinet-verify-mcp completions bash > ~/.local/share/bash-completion/completions/cabinet-verify-mcp
    ///   cabinet-verify-mcp completions zsh > ~/.zfunc/_cabinet-verify-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = load_config(cli.config.as_deref())?;
            tracing::info!("Cabinet verification MCP server (grid {})", config.grid_resolution);
            let handler = ProtocolHandler::new(Verifier::new(config));
            let transport = StdioTransport::new(handler);
            transport.run().await?;
            SharedResources::teardown();
        }

        Commands::Verify {
            reference,
            captured,
            catalog,
            grid,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let records = load_catalog_file(catalog.as_deref())?;
            let catalog = ToolCatalog::from_records(&records)?;

            let outcome = Verifier::new(config)
                .verify(
                    &image_ref_from_arg(&reference),
                    &image_ref_from_arg(&captured),
                    &catalog,
                    grid,
                    &CancelToken::new(),
                )
                .await;
            SharedResources::teardown();

            match outcome {
                Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                Err(e) => {
                    eprintln!("{}: {e}", e.kind());
                    std::process::exit(1);
                }
            }
        }

        Commands::Info => {
            let capabilities = cabinet_verify_mcp::types::InitializeResult::default_result();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(
                shell,
                &mut cmd,
                "cabinet-verify-mcp",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

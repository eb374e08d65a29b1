//! Shirokuma MCP Server
//!
//! Exposes the Shirokuma item store (§1-§5) over MCP JSON-RPC on stdio
//! (§6): create/read/update/delete items, list/search/relate them, and
//! read/update the singleton current-state record.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use shirokuma_core::enrichment::NullEnrichmentProvider;
use shirokuma_core::Storage;

use shirokuma_mcp::protocol::stdio::StdioTransport;
use shirokuma_mcp::server::McpServer;

/// Parse command-line arguments and return the optional data directory path.
/// Returns `None` for the path if no `--data-dir` was specified.
/// Exits the process if `--help` or `--version` is requested.
fn parse_args() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut data_dir: Option<PathBuf> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!("Shirokuma MCP Server v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("MCP server exposing the Shirokuma item store as durable agent memory.");
                println!();
                println!("USAGE:");
                println!("    shirokuma-mcp [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help              Print help information");
                println!("    -V, --version           Print version information");
                println!("    --data-dir <PATH>       Custom data directory");
                println!();
                println!("ENVIRONMENT:");
                println!("    RUST_LOG               Log level filter (e.g., debug, info, warn, error)");
                println!();
                println!("EXAMPLES:");
                println!("    shirokuma-mcp");
                println!("    shirokuma-mcp --data-dir /custom/path");
                println!("    RUST_LOG=debug shirokuma-mcp");
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("shirokuma-mcp {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--data-dir" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --data-dir requires a path argument");
                    eprintln!("Usage: shirokuma-mcp --data-dir <PATH>");
                    std::process::exit(1);
                }
                data_dir = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with("--data-dir=") => {
                let path = arg.strip_prefix("--data-dir=").unwrap_or("");
                if path.is_empty() {
                    eprintln!("error: --data-dir requires a path argument");
                    eprintln!("Usage: shirokuma-mcp --data-dir <PATH>");
                    std::process::exit(1);
                }
                data_dir = Some(PathBuf::from(path));
            }
            arg => {
                eprintln!("error: unknown argument '{}'", arg);
                eprintln!("Usage: shirokuma-mcp [OPTIONS]");
                eprintln!("Try 'shirokuma-mcp --help' for more information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    data_dir
}

/// How long the write pipeline waits on the enrichment provider before
/// treating it as failed (§4.8 step 4, §5).
const ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let data_dir = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    info!("Shirokuma MCP Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let storage = match Storage::new(data_dir) {
        Ok(s) => {
            info!("Storage initialized successfully");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            std::process::exit(1);
        }
    };

    let enrichment = Arc::new(NullEnrichmentProvider);
    let server = McpServer::new(storage, enrichment, ENRICHMENT_TIMEOUT);
    let transport = StdioTransport::new();

    info!("Starting MCP server on stdio...");

    if let Err(e) = transport.run(server).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Shirokuma MCP Server shutting down");
}

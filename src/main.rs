//! Device MCP Server
//!
//! A Model Context Protocol (MCP) server that exposes device capabilities
//! (speaker, screen, camera, system control) as tools over stdio.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use device_mcp_server::board::simulated::simulated_board;
use device_mcp_server::board::tools::build_registry;
use device_mcp_server::config::{server, Config};
use device_mcp_server::error::Result;
use device_mcp_server::executor::DeviceExecutor;
use device_mcp_server::mcp::server::McpServer;
use device_mcp_server::transport::StdoutTransport;

/// Device MCP Server
#[derive(Parser)]
#[command(name = "device-mcp-server")]
#[command(author, version, about = "Device MCP Server - exposes device capabilities as MCP tools")]
struct Cli {
    /// Board name reported to the remote controller
    #[arg(long, default_value = server::DEFAULT_BOARD_NAME)]
    board_name: String,

    /// Override the settings directory (default: ~/.device-mcp)
    #[arg(long)]
    settings_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the protocol.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.settings_dir {
        Some(dir) => Config::with_settings_dir(cli.board_name, dir)?,
        None => Config::new(cli.board_name)?,
    };

    // Board bring-up: the registry is assembled before the message path
    // goes live and is read-only afterwards.
    let board = Arc::new(simulated_board(&config.server_name));
    let registry = Arc::new(build_registry(&board, &config.settings_dir)?);

    let executor = DeviceExecutor::start();
    let server = McpServer::new(
        registry,
        executor,
        Arc::new(StdoutTransport),
        board.camera(),
        &config,
    );

    server.run_stdio().await
}

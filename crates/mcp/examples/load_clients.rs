//! Load an `mcpServers` config, print each server's tools, then disconnect.
//!
//! Usage:
//!   cargo run -p mcp-client-manager --example load_clients -- <config.json>
//!
//! Set `RUST_LOG=debug` to see per-server diagnostics.

use anyhow::{Context, Result};
use mcp_client_manager::{ClientLoader, NotificationKind, RmcpClient};
use std::env;
use std::path::PathBuf;
use tracing::Level;

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let Some(path) = env::args().nth(1).map(PathBuf::from) else {
        eprintln!("Usage: load_clients <config.json>");
        std::process::exit(2);
    };

    let mut loader = ClientLoader::new();
    let loaded = loader.load(path.as_path()).await.map(|_| ());
    if let Err(error) = loaded {
        // Release whatever did connect before giving up.
        loader.disconnect().await;
        return Err(error).context("loading MCP servers");
    }

    loader.register_notification_handler(NotificationKind::ToolListChanged, |server, _| {
        println!("[{server}] tool list changed");
        Ok(())
    })?;
    loader.register_notification_handler(NotificationKind::LoggingMessage, |server, payload| {
        if let Some(params) = payload.as_notification() {
            println!("[{server}] log: {params}");
        }
        Ok(())
    })?;
    loader.register_error_handler(|server, payload| {
        if let Some(error) = payload.as_error() {
            eprintln!("[{server}] error: {error}");
        }
        Ok(())
    })?;
    loader.register_transport_close_handler(|server, _| {
        println!("[{server}] transport closed");
        Ok(())
    })?;

    for connection in loader.clients()?.iter() {
        println!("{} ({}, {})", connection.name(), connection.transport_kind(), connection.state());
        let Some(peer) = connection.client_as::<RmcpClient>().and_then(RmcpClient::peer) else {
            continue;
        };
        match peer.list_all_tools().await {
            Ok(tools) => {
                for tool in tools {
                    println!("  - {}", tool.name);
                }
            }
            Err(error) => eprintln!("  list_tools failed: {error}"),
        }
    }

    loader.disconnect().await;
    Ok(())
}

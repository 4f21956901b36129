//! loggate server binary
//!
//! Accepts log records over HTTP, gRPC and legacy RPC and forwards them to storage.

use clap::Parser;
use loggate::config::{GatewayConfig, StorageBackendKind};
use loggate::server::LogServer;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "loggate-server")]
#[command(about = "Multi-protocol log ingestion gateway")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/gateway.toml")]
    config: PathBuf,

    /// HTTP listener port
    #[arg(long)]
    http_port: Option<u16>,

    /// gRPC listener port
    #[arg(long)]
    rpc_port: Option<u16>,

    /// Legacy RPC listener port
    #[arg(long)]
    legacy_port: Option<u16>,

    /// Storage backend (file, memory, mongo)
    #[arg(long, value_parser = parse_backend)]
    storage: Option<StorageBackendKind>,

    /// Output directory for the file backend
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_backend(value: &str) -> Result<StorageBackendKind, String> {
    match value {
        "file" => Ok(StorageBackendKind::File),
        "memory" => Ok(StorageBackendKind::Memory),
        "mongo" => Ok(StorageBackendKind::Mongo),
        other => Err(format!("unknown storage backend: {}", other)),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if args.verbose {
            "loggate=debug,info"
        } else {
            "loggate=info,warn,error"
        })
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting loggate v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args).await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }

    info!("loggate stopped");
}

async fn run(args: Args) -> loggate::Result<()> {
    let mut config = GatewayConfig::load(&args.config)?;

    // Override config with CLI arguments
    if let Some(port) = args.http_port {
        config.server.http_port = port;
    }
    if let Some(port) = args.rpc_port {
        config.server.rpc_port = port;
    }
    if let Some(port) = args.legacy_port {
        config.server.legacy_port = port;
    }
    if let Some(backend) = args.storage {
        config.storage.backend = backend;
    }
    if let Some(output) = args.output {
        config.storage.output_directory = output;
    }

    info!(
        "Listeners: http={} rpc={} legacy={}",
        config.server.http_addr(),
        config.server.rpc_addr(),
        config.server.legacy_addr()
    );
    info!("Storage backend: {:?}", config.storage.backend);

    LogServer::new(config)?.run().await
}

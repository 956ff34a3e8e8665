//! NimbusKV Server Binary
//!
//! Starts the TCP server for NimbusKV.

use std::sync::Arc;

use clap::Parser;
use nimbuskv::config::DEFAULT_TTL_SECS;
use nimbuskv::network::Server;
use nimbuskv::{Config, Engine, NamespaceConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// NimbusKV Server
#[derive(Parser, Debug)]
#[command(name = "nimbuskv-server")]
#[command(about = "Record-oriented key-value store")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    listen: String,

    /// Namespace to serve (repeatable)
    #[arg(short, long = "namespace", default_value = "test")]
    namespaces: Vec<String>,

    /// Default record TTL in seconds for every namespace
    #[arg(long, default_value_t = DEFAULT_TTL_SECS)]
    default_ttl: u32,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Worker threads serving connections
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// Expiry scan interval in milliseconds (0 disables the scan)
    #[arg(long, default_value = "1000")]
    expiry_scan_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,nimbuskv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("NimbusKV Server v{}", nimbuskv::VERSION);
    tracing::info!("Namespaces: {}", args.namespaces.join(", "));

    // Build config from args
    let namespaces = args
        .namespaces
        .iter()
        .map(|name| NamespaceConfig::new(name.as_str()).default_ttl_secs(args.default_ttl))
        .collect();

    let config = Config::builder()
        .namespaces(namespaces)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .worker_threads(args.workers)
        .expiry_scan_interval_ms(args.expiry_scan_ms)
        .build();

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    // Start server
    let server = match Server::bind(config, engine) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

//! Store Node Binary
//!
//! Starts a durable wide-column store node for pksd.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use pksd::network::Server;
use pksd::{Engine, NodeConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// pksd Store Node
#[derive(Parser, Debug)]
#[command(name = "keystore-node")]
#[command(about = "Durable wide-column store node for pksd")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./keystore_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:9160")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "64")]
    max_connections: usize,

    /// Keyspace to serve (repeatable)
    #[arg(short, long = "keyspace", default_value = "pgpkeys")]
    keyspaces: Vec<String>,

    /// Column family present in every keyspace (repeatable)
    #[arg(short, long = "column-family", default_value = "keys")]
    column_families: Vec<String>,

    /// WAL size in MB that triggers a snapshot
    #[arg(long, default_value = "64")]
    checkpoint_mb: u64,
}

fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,pksd=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("pksd store node v{}", pksd::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);
    tracing::info!("Keyspaces: {:?}", args.keyspaces);

    let config = match NodeConfig::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .keyspaces(args.keyspaces)
        .column_families(args.column_families)
        .checkpoint_size_mb(args.checkpoint_mb)
    {
        Ok(builder) => builder.build(),
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    watch_ctrl_c(server.shutdown_handle());

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine cleanly: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Set `shutdown` when Ctrl+C is received
fn watch_ctrl_c(shutdown: Arc<AtomicBool>) {
    let spawned = std::thread::Builder::new()
        .name("signal-watcher".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!("Failed to start signal runtime: {}", e);
                    return;
                }
            };

            match runtime.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, initiating shutdown...");
                    shutdown.store(true, Ordering::Relaxed);
                }
                Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
            }
        });

    if let Err(e) = spawned {
        tracing::error!("Failed to spawn signal watcher: {}", e);
    }
}

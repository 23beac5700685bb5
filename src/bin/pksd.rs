//! pksd Key Server Binary
//!
//! Serves `/pks/add` and `/pks/lookup` over HTTP.

use std::sync::Arc;

use clap::Parser;
use pksd::store::open_store;
use pksd::{Config, Counters, MetricsSink, OpenPgpParser, PksHandler};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

/// pksd Key Server
#[derive(Parser, Debug)]
#[command(name = "pksd")]
#[command(about = "HKP-style public key server")]
#[command(version)]
struct Args {
    /// HTTP bind address (host:port)
    #[arg(short, long, default_value = "[::]:11371")]
    bind: String,

    /// Store node address (host:port), or "memory" for an in-process store
    #[arg(short, long, default_value = "localhost:9160")]
    store_server: String,

    /// Keyspace to select on the store
    #[arg(short, long, default_value = "pgpkeys")]
    keyspace: String,

    /// Directory of HTML templates
    #[arg(long, default_value = "/var/www/templates")]
    template_dir: String,

    /// Store connect/read/write timeout in milliseconds
    #[arg(long, default_value = "10000")]
    store_timeout_ms: u64,
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

    tracing::info!("pksd v{}", pksd::VERSION);
    tracing::info!("Bind address: {}", args.bind);
    tracing::info!("Store server: {} (keyspace {})", args.store_server, args.keyspace);

    let config = Config::builder()
        .bind_addr(&args.bind)
        .store_server(&args.store_server)
        .keyspace(&args.keyspace)
        .template_dir(&args.template_dir)
        .store_timeout_ms(args.store_timeout_ms)
        .build();

    let store = match open_store(&config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store {}: {}", config.store_server, e);
            std::process::exit(1);
        }
    };

    let counters = Arc::new(Counters::new());
    let handler = Arc::new(PksHandler::new(
        store,
        Arc::new(OpenPgpParser),
        Arc::clone(&counters) as Arc<dyn MetricsSink>,
    ));

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(async {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        pksd::http::serve(listener, handler, shutdown_signal()).await
    });

    tracing::info!("Final counters: {:?}", counters.snapshot());

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, initiating shutdown..."),
        Err(e) => {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

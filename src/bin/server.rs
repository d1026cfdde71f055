//! proglog Server Binary
//!
//! Opens the log and serves produce/consume requests over TCP.
//!
//! Ctrl+C or SIGTERM stops accepting, waits for open connections and closes
//! the log, which trims every index to its used size. A harder stop leaves
//! indexes pre-allocated; they are reconciled against the stores on the next
//! start.

use std::sync::Arc;

use clap::Parser;
use proglog::network::Server;
use proglog::{Config, Log, LogService, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// proglog Server
#[derive(Parser, Debug)]
#[command(name = "proglog-server")]
#[command(about = "Durable segmented commit log server")]
#[command(version)]
struct Args {
    /// Data directory holding segment files
    #[arg(short, long, default_value = "./proglog_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Connection worker threads
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// Store size limit per segment in MB before rotation
    #[arg(short = 's', long, default_value = "64")]
    max_store_mb: u64,

    /// Index size limit per segment in bytes before rotation
    #[arg(short = 'i', long, default_value = "1048576")]
    max_index_bytes: u64,

    /// Offset of the first record in an empty log
    #[arg(long, default_value = "0")]
    initial_offset: u64,

    /// fsync the store after every append instead of every N appends
    #[arg(long)]
    sync_every_write: bool,

    /// Appends between fsyncs when not syncing every write
    #[arg(long, default_value = "100")]
    sync_interval: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,proglog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("proglog Server v{}", proglog::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let sync_strategy = if args.sync_every_write {
        SyncStrategy::EveryWrite
    } else {
        SyncStrategy::EveryNEntries {
            count: args.sync_interval,
        }
    };

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .worker_threads(args.workers)
        .max_store_bytes(args.max_store_mb * 1024 * 1024)
        .max_index_bytes(args.max_index_bytes)
        .initial_offset(args.initial_offset)
        .sync_strategy(sync_strategy)
        .build();

    // Open log
    let log = match Log::open(config.clone()) {
        Ok(log) => Arc::new(log),
        Err(e) => {
            tracing::error!("Failed to open log: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Log initialized successfully");

    let service = LogService::new(Arc::clone(&log));
    let server = match Server::bind(config, service) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Failed to install signal handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = log.close() {
        tracing::error!("Failed to close log: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

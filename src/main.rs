//! Edge gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     config.toml ──▶ loader ──▶ RouteDefinitionLocator ──▶ RouteDefinitionRouteLocator
//!                                                               │ (factory registry)
//!                                                               ▼
//!     Client ──▶ axum server ──▶ RouteTable (arc-swap) ──▶ filter chain
//!                                                               │
//!                                     forward:// ◀──────────────┼──────────▶ http://
//!                                  local dispatcher                      upstream backend
//! ```
//!
//! A config watcher recompiles the route table on every valid file change.

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use edge_gateway::config::{load_config, ConfigRouteDefinitionLocator, ConfigWatcher, GatewayConfig};
use edge_gateway::lifecycle::{wait_for_signal, Shutdown};
use edge_gateway::observability::{logging, metrics};
use edge_gateway::routing::events::LoggingPublisher;
use edge_gateway::routing::{default_registry, FactoryRegistry, RouteDefinitionRouteLocator, RouteTable};
use edge_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "Declarative edge gateway", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not reload the configuration when the file changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        default_filters = config.default_filters.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = Arc::new(default_registry());
    tracing::debug!(registry = ?registry, "Factories registered");

    let definitions = Arc::new(ConfigRouteDefinitionLocator::new(&config));
    let table = compile(&definitions, &registry, &config).await;
    tracing::info!(
        compiled = table.len(),
        declared = config.routes.len(),
        "Routes compiled"
    );
    let routes = Arc::new(ArcSwap::from_pointee(table));

    let shutdown = Shutdown::new();

    // Keep the watcher handle alive for the lifetime of the server.
    let _watcher = match (&cli.config, cli.no_watch) {
        (Some(path), false) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            tokio::spawn(reload_routes(
                updates,
                definitions.clone(),
                registry.clone(),
                routes.clone(),
                shutdown.subscribe(),
            ));
            Some(handle)
        }
        _ => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, routes);
    tokio::spawn(wait_for_signal(shutdown.clone()));
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn compile(
    definitions: &Arc<ConfigRouteDefinitionLocator>,
    registry: &Arc<FactoryRegistry>,
    config: &GatewayConfig,
) -> RouteTable {
    RouteDefinitionRouteLocator::from_config(definitions.clone(), registry.clone(), config)
        .with_publisher(Arc::new(LoggingPublisher))
        .route_table()
        .await
}

/// Recompile and swap the route table for every reloaded configuration.
async fn reload_routes(
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    definitions: Arc<ConfigRouteDefinitionLocator>,
    registry: Arc<FactoryRegistry>,
    routes: Arc<ArcSwap<RouteTable>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            Some(config) = updates.recv() => {
                definitions.reload(&config);
                let table = compile(&definitions, &registry, &config).await;
                tracing::info!(compiled = table.len(), declared = config.routes.len(), "Route table swapped");
                routes.store(Arc::new(table));
            }
            _ = shutdown.recv() => break,
            else => break,
        }
    }
    tracing::debug!("Route reload loop stopped");
}

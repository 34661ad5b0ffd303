use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;

use edge_gateway::config::{load_config, ConfigRouteDefinitionLocator};
use edge_gateway::observability::logging;
use edge_gateway::routing::{default_registry, FactoryKind, RouteDefinitionRouteLocator};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Offline tooling for edge-gateway configurations", long_about = None)]
struct Cli {
    /// Log level for compiler diagnostics.
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and compile every route
    Check { file: PathBuf },
    /// Print the compiled routes of a config file
    Routes { file: PathBuf },
    /// List the registered predicate and filter factories
    Factories,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let registry = Arc::new(default_registry());

    match command {
        Commands::Check { file } => {
            let config = load_config(&file)?;
            let definitions = Arc::new(ConfigRouteDefinitionLocator::new(&config));
            let compiler = RouteDefinitionRouteLocator::from_config(definitions, registry, &config);

            let results: Vec<_> = compiler.try_routes().collect().await;
            let mut failed = 0;
            for result in &results {
                match result {
                    Ok(route) => println!("ok    {}", route.id()),
                    Err(e) => {
                        failed += 1;
                        println!("FAIL  {}", e.route_id);
                        for error in &e.errors {
                            println!("        {}: {}", error.declaration, error.kind);
                        }
                    }
                }
            }
            println!("{} routes, {} failed", results.len(), failed);
            Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Routes { file } => {
            let config = load_config(&file)?;
            let definitions = Arc::new(ConfigRouteDefinitionLocator::new(&config));
            let table = RouteDefinitionRouteLocator::from_config(definitions, registry, &config)
                .route_table()
                .await;

            for route in table.routes() {
                println!("{} (order {}) -> {}", route.id(), route.order(), route.uri());
                for filter in route.filters() {
                    let order = filter
                        .order()
                        .map(|o| o.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("    [{:>4}] {}", order, filter.name());
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Factories => {
            for kind in [FactoryKind::Predicate, FactoryKind::Filter] {
                println!("{}:", kind);
                for name in registry.names(kind) {
                    println!("    {}", name);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

//! Edge gateway library.
//!
//! Declarative routes (predicates + filters looked up by name in a factory
//! registry) are compiled into executable routes and served by an axum
//! front end. `forward://` targets are handled in process.

pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use http::{Exchange, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::{default_registry, FactoryRegistry, RouteDefinitionRouteLocator};

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (startup and every reload):
//!     RouteDefinitionLocator (locator.rs)
//!     → compiler.rs (per definition)
//!         → registry.rs (factory lookup by name)
//!         → binder.rs (shortcut modes, expressions, typed config)
//!         → predicate.rs (AND of all predicates)
//!         → filter subsystem (ordered filter list)
//!     → router.rs (immutable RouteTable)
//!
//! Incoming Request:
//!     → RouteTable::lookup (first matching route by order)
//!     → request_url (route scheme/authority + request path)
//! ```
//!
//! # Design Decisions
//! - Factories are registered once, looked up by name at compile time
//! - Compiled routes are immutable; reload swaps the whole table
//! - A broken definition never takes the other routes down

pub mod binder;
pub mod builtin;
pub mod compiler;
pub mod definition;
pub mod error;
pub mod events;
pub mod factory;
pub mod locator;
pub mod matcher;
pub mod predicate;
pub mod registry;
pub mod router;

pub use compiler::RouteDefinitionRouteLocator;
pub use definition::{Args, FilterDefinition, PredicateDefinition, RouteDefinition};
pub use error::{CompilationError, ConfigurationError, ConfigurationErrorKind};
pub use locator::{CompositeRouteDefinitionLocator, InMemoryRouteDefinitionLocator, RouteDefinitionLocator};
pub use registry::{FactoryKind, FactoryRegistry};
pub use router::{Route, RouteTable};

/// Registry holding every built-in predicate and filter factory.
pub fn default_registry() -> FactoryRegistry {
    let mut registry = FactoryRegistry::new();
    builtin::register_predicates(&mut registry);
    crate::filter::builtin::register_filters(&mut registry);
    registry
}

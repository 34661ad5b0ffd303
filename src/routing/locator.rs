//! Route definition suppliers.
//!
//! # Responsibilities
//! - Expose route definitions as a lazy stream
//! - Hold a replaceable in-memory snapshot (config file, reload)
//! - Combine several suppliers into one stream
//!
//! # Design Decisions
//! - Every call returns a fresh stream over the current snapshot
//! - Snapshots are swapped atomically via `arc-swap`; readers never block
//! - Missing ids are filled with a UUID once, when the snapshot is stored

use std::sync::Arc;

use arc_swap::ArcSwap;
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::routing::definition::RouteDefinition;

/// Supplier of declarative route definitions.
pub trait RouteDefinitionLocator: Send + Sync {
    fn route_definitions(&self) -> BoxStream<'static, RouteDefinition>;
}

/// Definitions held in memory and replaceable at runtime.
#[derive(Debug)]
pub struct InMemoryRouteDefinitionLocator {
    definitions: ArcSwap<Vec<RouteDefinition>>,
}

impl InMemoryRouteDefinitionLocator {
    pub fn new(definitions: Vec<RouteDefinition>) -> Self {
        Self {
            definitions: ArcSwap::from_pointee(with_ids(definitions)),
        }
    }

    /// Replace the snapshot; subsequent streams see the new definitions.
    pub fn replace(&self, definitions: Vec<RouteDefinition>) {
        let definitions = with_ids(definitions);
        tracing::info!(routes = definitions.len(), "Route definitions replaced");
        self.definitions.store(Arc::new(definitions));
    }

    pub fn snapshot(&self) -> Arc<Vec<RouteDefinition>> {
        self.definitions.load_full()
    }
}

fn with_ids(mut definitions: Vec<RouteDefinition>) -> Vec<RouteDefinition> {
    for def in definitions.iter_mut().filter(|d| d.id.is_empty()) {
        def.id = uuid::Uuid::new_v4().to_string();
    }
    definitions
}

impl RouteDefinitionLocator for InMemoryRouteDefinitionLocator {
    fn route_definitions(&self) -> BoxStream<'static, RouteDefinition> {
        let snapshot = self.definitions.load_full();
        stream::iter((0..snapshot.len()).map(move |i| snapshot[i].clone())).boxed()
    }
}

/// Concatenates the definitions of several suppliers, in order.
pub struct CompositeRouteDefinitionLocator {
    delegates: Vec<Arc<dyn RouteDefinitionLocator>>,
}

impl CompositeRouteDefinitionLocator {
    pub fn new(delegates: Vec<Arc<dyn RouteDefinitionLocator>>) -> Self {
        Self { delegates }
    }
}

impl RouteDefinitionLocator for CompositeRouteDefinitionLocator {
    fn route_definitions(&self) -> BoxStream<'static, RouteDefinition> {
        let streams: Vec<_> = self.delegates.iter().map(|d| d.route_definitions()).collect();
        stream::iter(streams).flatten().boxed()
    }
}

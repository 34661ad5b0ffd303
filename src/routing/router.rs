//! Compiled routes and route lookup.
//!
//! # Responsibilities
//! - Hold the executable form of a route definition
//! - Store a snapshot of compiled routes
//! - Look up the first route matching an exchange
//!
//! # Design Decisions
//! - Routes are immutable once built (thread-safe without locks)
//! - Lookup is an ordered scan; lower `order` is checked first
//! - First match wins; ties keep supplier order
//! - Explicit `None` rather than a silent default route

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::GatewayError;
use crate::filter::BoxFilter;
use crate::http::exchange::Exchange;
use crate::routing::predicate::BoxPredicate;

/// The compiled, executable form of a route definition.
pub struct Route {
    id: String,
    uri: Url,
    order: i32,
    metadata: serde_json::Map<String, serde_json::Value>,
    predicate: BoxPredicate,
    filters: Vec<BoxFilter>,
}

impl Route {
    pub fn builder(id: impl Into<String>, uri: Url, predicate: BoxPredicate) -> RouteBuilder {
        RouteBuilder {
            route: Route {
                id: id.into(),
                uri,
                order: 0,
                metadata: serde_json::Map::new(),
                predicate,
                filters: Vec::new(),
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn metadata(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.metadata
    }

    /// Sorted filter chain of this route.
    pub fn filters(&self) -> &[BoxFilter] {
        &self.filters
    }

    pub async fn matches(&self, exchange: &Exchange) -> Result<bool, GatewayError> {
        self.predicate.test(exchange).await
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("uri", &self.uri.as_str())
            .field("order", &self.order)
            .field("filters", &self.filters)
            .finish()
    }
}

/// Assembles a [`Route`]; nothing is visible until [`RouteBuilder::build`].
pub struct RouteBuilder {
    route: Route,
}

impl RouteBuilder {
    pub fn order(mut self, order: i32) -> Self {
        self.route.order = order;
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.route.metadata = metadata;
        self
    }

    /// Filters must already be sorted.
    pub fn filters(mut self, filters: Vec<BoxFilter>) -> Self {
        self.route.filters = filters;
        self
    }

    pub fn build(self) -> Route {
        self.route
    }
}

/// Immutable snapshot of compiled routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    /// Build a table; routes are stably sorted by `order`.
    pub fn new(mut routes: Vec<Route>) -> Self {
        routes.sort_by_key(Route::order);
        Self {
            routes: routes.into_iter().map(Arc::new).collect(),
        }
    }

    /// Find the first route whose predicate matches.
    pub async fn lookup(&self, exchange: &Exchange) -> Result<Option<Arc<Route>>, GatewayError> {
        for route in &self.routes {
            if route.matches(exchange).await? {
                tracing::debug!(
                    request_id = %exchange.request_id(),
                    route_id = %route.id(),
                    "Route matched"
                );
                return Ok(Some(route.clone()));
            }
            tracing::trace!(route_id = %route.id(), "Route did not match");
        }
        Ok(None)
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Resolve the outbound URL: route scheme/authority plus the request path and query.
pub fn request_url(route_uri: &Url, exchange: &Exchange) -> Url {
    let mut url = route_uri.clone();
    url.set_path(exchange.path());
    url.set_query(exchange.uri().query());
    url
}

//! In-process dispatcher for `forward://` routes.
//!
//! Local endpoints are an ordinary axum `Router` invoked through
//! `tower::ServiceExt::oneshot`, so no socket is involved.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower::ServiceExt;

use crate::error::GatewayError;
use crate::filter::Handler;
use crate::http::exchange::Exchange;
use crate::routing::router::RouteTable;

/// Serves exchanges with a local axum router.
#[derive(Clone)]
pub struct RouterDispatcher {
    router: Router,
}

impl RouterDispatcher {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Dispatcher exposing the built-in gateway endpoints.
    pub fn with_gateway_endpoints(routes: Arc<ArcSwap<RouteTable>>) -> Self {
        Self::new(gateway_endpoints(routes))
    }
}

#[async_trait]
impl Handler for RouterDispatcher {
    async fn handle(&self, exchange: &mut Exchange) -> Result<(), GatewayError> {
        let request = exchange.take_request();
        tracing::debug!(
            request_id = %exchange.request_id(),
            path = %request.uri().path(),
            "Dispatching locally"
        );
        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(infallible) => match infallible {},
        };
        exchange.set_response(response);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct RouteSummary {
    id: String,
    uri: String,
    order: i32,
    filters: Vec<String>,
}

/// `/gateway/health` and `/gateway/routes`.
pub fn gateway_endpoints(routes: Arc<ArcSwap<RouteTable>>) -> Router {
    Router::new()
        .route("/gateway/health", get(health))
        .route("/gateway/routes", get(list_routes))
        .with_state(routes)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "UP" }))
}

async fn list_routes(State(routes): State<Arc<ArcSwap<RouteTable>>>) -> impl IntoResponse {
    let table = routes.load();
    let summaries: Vec<RouteSummary> = table
        .routes()
        .iter()
        .map(|route| RouteSummary {
            id: route.id().to_string(),
            uri: route.uri().to_string(),
            order: route.order(),
            filters: route.filters().iter().map(|f| f.name().to_string()).collect(),
        })
        .collect();
    Json(summaries)
}

//! HTTP server setup and request entry point.
//!
//! # Responsibilities
//! - Create the Axum Router with the gateway handler
//! - Wire up middleware (timeout, request ID, tracing)
//! - Wrap each request into an `Exchange` and resolve its route
//! - Run the filter chain and turn the outcome into a response
//! - Graceful shutdown with a drain deadline
//!
//! # Design Decisions
//! - The route table is read through `arc-swap`; reloads never block requests
//! - Local dispatch is a global filter, network forwarding is the terminal stage
//! - In-flight exchanges are cancelled only after the drain deadline

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::{GatewayConfig, TimeoutConfig};
use crate::error::GatewayError;
use crate::filter::{FilteringHandler, LocalDispatchFilter};
use crate::http::dispatch::RouterDispatcher;
use crate::http::exchange::Exchange;
use crate::http::transport::HttpTransport;
use crate::observability::metrics;
use crate::routing::router::{request_url, RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<ArcSwap<RouteTable>>,
    pub handler: Arc<FilteringHandler>,
    pub cancellation: CancellationToken,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    timeouts: TimeoutConfig,
    cancellation: CancellationToken,
}

impl HttpServer {
    /// Create a server serving the routes held in `routes`.
    pub fn new(config: &GatewayConfig, routes: Arc<ArcSwap<RouteTable>>) -> Self {
        let dispatcher = Arc::new(RouterDispatcher::with_gateway_endpoints(routes.clone()));
        let transport = Arc::new(HttpTransport::new(Duration::from_secs(
            config.timeouts.connect_secs,
        )));
        let handler = FilteringHandler::new(
            vec![Arc::new(LocalDispatchFilter::new(dispatcher))],
            transport,
        );
        let cancellation = CancellationToken::new();

        let state = AppState {
            routes,
            handler: Arc::new(handler),
            cancellation: cancellation.clone(),
        };

        Self {
            router: Self::build_router(&config.timeouts, state),
            timeouts: config.timeouts.clone(),
            cancellation,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(timeouts: &TimeoutConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, e.g. for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let cancellation = self.cancellation.clone();
        let drain = Duration::from_secs(self.timeouts.shutdown_secs);
        let signal = async move {
            let _ = shutdown.recv().await;
            tracing::info!(drain_secs = drain.as_secs(), "Shutdown signal received, draining");
            tokio::spawn(async move {
                tokio::time::sleep(drain).await;
                tracing::warn!("Drain deadline reached, cancelling in-flight requests");
                cancellation.cancel();
            });
        };

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main gateway handler.
/// Resolves the route, runs the filter chain, and returns the exchange response.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let mut exchange = Exchange::new(request).with_cancellation(state.cancellation.child_token());

    tracing::debug!(
        request_id = %exchange.request_id(),
        method = %method,
        path = %exchange.path(),
        "Handling request"
    );

    let response = match route_and_filter(&state, &mut exchange).await {
        Ok(()) => exchange
            .take_response()
            .unwrap_or_else(|| StatusCode::OK.into_response()),
        Err(e) => {
            match &e {
                GatewayError::NoRoute(path) => {
                    tracing::warn!(request_id = %exchange.request_id(), path = %path, "No route matched");
                }
                other => {
                    tracing::error!(request_id = %exchange.request_id(), error = %other, "Request failed");
                }
            }
            e.into_response()
        }
    };

    metrics::record_request(
        &method,
        response.status().as_u16(),
        exchange.route_id().unwrap_or("none"),
        start_time,
    );
    response
}

async fn route_and_filter(state: &AppState, exchange: &mut Exchange) -> Result<(), GatewayError> {
    let table = state.routes.load_full();
    let route = table
        .lookup(exchange)
        .await?
        .ok_or_else(|| GatewayError::NoRoute(exchange.path().to_string()))?;

    exchange.set_route_id(route.id());
    let url = request_url(route.uri(), exchange);
    exchange.set_request_url(url);

    state.handler.handle(exchange, route.filters()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::definition::RouteDefinition;
    use crate::routing::locator::InMemoryRouteDefinitionLocator;
    use crate::routing::{default_registry, RouteDefinitionRouteLocator};
    use axum::body::to_bytes;
    use tower::ServiceExt;
    use url::Url;

    async fn server(definitions: Vec<RouteDefinition>) -> HttpServer {
        let compiler = RouteDefinitionRouteLocator::new(
            Arc::new(InMemoryRouteDefinitionLocator::new(definitions)),
            Arc::new(default_registry()),
            Vec::new(),
        );
        let table = compiler.route_table().await;
        HttpServer::new(&GatewayConfig::default(), Arc::new(ArcSwap::from_pointee(table)))
    }

    fn forward_route(id: &str, path: &str) -> RouteDefinition {
        RouteDefinition::new(id, Url::parse("forward:///").unwrap())
            .predicate(format!("Path={}", path).parse().unwrap())
    }

    #[tokio::test]
    async fn test_no_route_is_404() {
        let server = server(vec![forward_route("local", "/gateway/**")]).await;
        let response = server
            .router()
            .oneshot(Request::builder().uri("/elsewhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_forward_route_served_locally() {
        let server = server(vec![forward_route("local", "/gateway/**")]).await;
        let response = server
            .router()
            .oneshot(Request::builder().uri("/gateway/routes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let routes: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(routes[0]["id"], "local");
    }

    #[tokio::test]
    async fn test_filters_apply_before_local_dispatch() {
        let route = RouteDefinition::new("prefixed", Url::parse("forward:///").unwrap())
            .predicate("Path=/admin/**".parse().unwrap())
            .filter("StripPrefix=1".parse().unwrap())
            .filter("PrefixPath=/gateway".parse().unwrap());
        let server = server(vec![route]).await;

        let response = server
            .router()
            .oneshot(Request::builder().uri("/admin/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

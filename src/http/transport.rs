//! Upstream transport: the terminal stage for network targets.
//!
//! # Responsibilities
//! - Forward the exchange to the resolved `http` URL
//! - Propagate the request id to the backend
//! - Store the backend response on the exchange
//!
//! # Design Decisions
//! - Skips exchanges that another stage already routed
//! - Outbound path comes from the exchange, so path-rewriting filters apply
//! - Cancellation aborts the in-flight upstream call

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, Uri};
use axum::response::Response;
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::error::GatewayError;
use crate::filter::Handler;
use crate::http::exchange::{Exchange, X_REQUEST_ID};
use crate::routing::router::request_url;

/// Forwards requests to upstream backends with the hyper-util client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Body>,
}

impl HttpTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        Self {
            client: Client::builder(TokioExecutor::new()).build(connector),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl Handler for HttpTransport {
    async fn handle(&self, exchange: &mut Exchange) -> Result<(), GatewayError> {
        if exchange.is_already_routed() {
            return Ok(());
        }
        let base = exchange
            .request_url()
            .ok_or(GatewayError::MissingRequestUrl)?;
        if base.scheme() != "http" {
            return Err(GatewayError::UnsupportedScheme(base.scheme().to_string()));
        }

        let target = request_url(base, exchange);
        let uri: Uri = target
            .as_str()
            .parse()
            .map_err(|e| GatewayError::Upstream(format!("invalid upstream uri '{}': {}", target, e)))?;
        exchange.mark_routed();

        let mut request = exchange.take_request();
        *request.uri_mut() = uri;
        request.headers_mut().remove(header::HOST);
        if let Ok(value) = HeaderValue::from_str(exchange.request_id()) {
            request.headers_mut().insert(X_REQUEST_ID, value);
        }

        tracing::debug!(
            request_id = %exchange.request_id(),
            upstream = %target,
            "Forwarding request upstream"
        );

        let response: hyper::Response<Incoming> = tokio::select! {
            result = self.client.request(request) => result.map_err(|e| {
                tracing::error!(request_id = %exchange.request_id(), upstream = %target, error = %e, "Upstream error");
                GatewayError::Upstream(e.to_string())
            })?,
            _ = exchange.cancellation().cancelled() => return Err(GatewayError::Cancelled),
        };

        exchange.set_response(into_gateway_response(response));
        Ok(())
    }
}

/// Re-wrap the streamed upstream body without buffering it.
fn into_gateway_response(response: hyper::Response<Incoming>) -> Response {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(body))
}

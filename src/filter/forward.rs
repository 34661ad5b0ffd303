//! Local dispatch for `forward://` targets.
//!
//! # Responsibilities
//! - Detect requests whose resolved URL uses the forward scheme
//! - Mark them routed and serve them in-process
//! - Leave every other request untouched
//!
//! # Design Decisions
//! - Lowest precedence: runs last unless placed earlier explicitly
//! - The routed flag is checked and set on the exchange, so a request
//!   is either dispatched locally or forwarded, never both

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::filter::{FilterChain, GatewayFilter, Handler, LOWEST_PRECEDENCE};
use crate::http::exchange::{Exchange, FORWARD_SCHEME};
use crate::observability::metrics;

/// Serves `forward://` requests through an in-process dispatcher.
pub struct LocalDispatchFilter {
    dispatcher: Arc<dyn Handler>,
}

impl LocalDispatchFilter {
    pub fn new(dispatcher: Arc<dyn Handler>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl GatewayFilter for LocalDispatchFilter {
    async fn filter(&self, exchange: &mut Exchange, chain: FilterChain<'_>) -> Result<(), GatewayError> {
        let url = exchange
            .request_url()
            .ok_or(GatewayError::MissingRequestUrl)?;

        if exchange.is_already_routed() || url.scheme() != FORWARD_SCHEME {
            return chain.filter(exchange).await;
        }

        tracing::trace!(
            request_id = %exchange.request_id(),
            url = %url,
            "Forwarding to local dispatcher"
        );
        exchange.mark_routed();
        metrics::record_local_dispatch(exchange.route_id().unwrap_or("none"));

        self.dispatcher.handle(exchange).await
    }

    fn order(&self) -> Option<i32> {
        Some(LOWEST_PRECEDENCE)
    }

    fn name(&self) -> &str {
        "LocalDispatch"
    }
}

//! Filter chain execution.
//!
//! # Responsibilities
//! - Run sorted filters with cooperative continuation
//! - Hand the exchange to the terminal handler after the last filter
//! - Stop continuing once the exchange is cancelled
//! - Merge global filters with a route's own filters

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::filter::{sort_by_order, BoxFilter};
use crate::http::exchange::Exchange;

/// A stage that fully handles an exchange (transport or in-process dispatch).
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, exchange: &mut Exchange) -> Result<(), GatewayError>;
}

/// The remaining filters of a chain plus its terminal handler.
#[derive(Clone, Copy)]
pub struct FilterChain<'a> {
    filters: &'a [BoxFilter],
    terminal: &'a dyn Handler,
}

impl<'a> FilterChain<'a> {
    pub fn new(filters: &'a [BoxFilter], terminal: &'a dyn Handler) -> Self {
        Self { filters, terminal }
    }

    /// Invoke the next stage.
    pub async fn filter(self, exchange: &mut Exchange) -> Result<(), GatewayError> {
        if exchange.is_cancelled() {
            tracing::debug!(request_id = %exchange.request_id(), "Exchange cancelled, chain stopped");
            return Err(GatewayError::Cancelled);
        }

        match self.filters.split_first() {
            Some((current, rest)) => {
                let next = FilterChain {
                    filters: rest,
                    terminal: self.terminal,
                };
                current.filter(exchange, next).await
            }
            None => self.terminal.handle(exchange).await,
        }
    }

    /// Number of filters left before the terminal handler.
    pub fn remaining(&self) -> usize {
        self.filters.len()
    }
}

/// Runs global and route filters, then the terminal handler.
pub struct FilteringHandler {
    global_filters: Vec<BoxFilter>,
    terminal: Arc<dyn Handler>,
}

impl FilteringHandler {
    pub fn new(global_filters: Vec<BoxFilter>, terminal: Arc<dyn Handler>) -> Self {
        Self {
            global_filters,
            terminal,
        }
    }

    /// Combined chain for a route: globals first, then a stable sort by order.
    pub fn combine(&self, route_filters: &[BoxFilter]) -> Vec<BoxFilter> {
        let mut combined: Vec<BoxFilter> = self
            .global_filters
            .iter()
            .chain(route_filters.iter())
            .cloned()
            .collect();
        sort_by_order(&mut combined);
        combined
    }

    pub async fn handle(
        &self,
        exchange: &mut Exchange,
        route_filters: &[BoxFilter],
    ) -> Result<(), GatewayError> {
        let combined = self.combine(route_filters);
        tracing::trace!(
            request_id = %exchange.request_id(),
            filters = combined.len(),
            "Running filter chain"
        );
        FilterChain::new(&combined, self.terminal.as_ref())
            .filter(exchange)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{GatewayFilter, OrderedFilter};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Mutex;

    struct Recording {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl GatewayFilter for Recording {
        async fn filter(&self, exchange: &mut Exchange, chain: FilterChain<'_>) -> Result<(), GatewayError> {
            self.log.lock().unwrap().push(self.label);
            chain.filter(exchange).await
        }
    }

    struct Terminal {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Handler for Terminal {
        async fn handle(&self, _exchange: &mut Exchange) -> Result<(), GatewayError> {
            self.log.lock().unwrap().push("terminal");
            Ok(())
        }
    }

    fn recording(label: &'static str, order: i32, log: &Arc<Mutex<Vec<&'static str>>>) -> BoxFilter {
        let inner: BoxFilter = Arc::new(Recording { label, log: log.clone() });
        Arc::new(OrderedFilter::new(inner, order))
    }

    fn exchange() -> Exchange {
        Exchange::new(Request::builder().uri("/").body(Body::empty()).unwrap())
    }

    #[tokio::test]
    async fn test_globals_and_route_filters_sorted_together() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = FilteringHandler::new(
            vec![recording("global-late", 10, &log)],
            Arc::new(Terminal { log: log.clone() }),
        );
        let route_filters = vec![recording("route-2", 2, &log), recording("route-1", 1, &log)];

        handler.handle(&mut exchange(), &route_filters).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["route-1", "route-2", "global-late", "terminal"]
        );
    }

    #[tokio::test]
    async fn test_equal_orders_keep_declaration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = FilteringHandler::new(Vec::new(), Arc::new(Terminal { log: log.clone() }));
        let filters = vec![recording("a", 1, &log), recording("b", 1, &log)];

        handler.handle(&mut exchange(), &filters).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "terminal"]);
    }

    #[tokio::test]
    async fn test_cancelled_exchange_stops_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = FilteringHandler::new(Vec::new(), Arc::new(Terminal { log: log.clone() }));
        let mut ex = exchange();
        ex.cancellation().cancel();

        let err = handler.handle(&mut ex, &[recording("a", 1, &log)]).await.unwrap_err();
        assert!(matches!(err, GatewayError::Cancelled));
        assert!(log.lock().unwrap().is_empty());
    }
}

//! Request filter subsystem.
//!
//! # Data Flow
//! ```text
//! Matched Route
//!     → chain.rs (global filters + route filters, stable sort by order)
//!     → each filter: inspect/modify exchange, then chain.filter(exchange)
//!     → terminal handler (network transport)
//!
//! forward:// targets:
//!     → forward.rs (local dispatch, lowest precedence)
//!     → in-process dispatcher instead of the next stage
//! ```
//!
//! # Design Decisions
//! - Filters decide whether and when to invoke the next stage
//! - Lower order runs first; ties keep declaration order
//! - Filters hold no per-request state

pub mod builtin;
pub mod chain;
pub mod forward;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::http::exchange::Exchange;

pub use chain::{FilterChain, FilteringHandler, Handler};
pub use forward::LocalDispatchFilter;

/// Order value that runs first.
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;

/// Order value that runs last.
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// A unit of request-chain behavior.
#[async_trait]
pub trait GatewayFilter: Send + Sync {
    async fn filter(&self, exchange: &mut Exchange, chain: FilterChain<'_>) -> Result<(), GatewayError>;

    /// Explicit position in the chain, if this filter declares one.
    fn order(&self) -> Option<i32> {
        None
    }

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Shared, type-erased filter.
pub type BoxFilter = Arc<dyn GatewayFilter>;

impl fmt::Debug for dyn GatewayFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayFilter")
            .field("name", &self.name())
            .field("order", &self.order())
            .finish()
    }
}

/// Wraps a filter without an explicit order and assigns one.
pub struct OrderedFilter {
    inner: BoxFilter,
    order: i32,
}

impl OrderedFilter {
    pub fn new(inner: BoxFilter, order: i32) -> Self {
        Self { inner, order }
    }
}

#[async_trait]
impl GatewayFilter for OrderedFilter {
    async fn filter(&self, exchange: &mut Exchange, chain: FilterChain<'_>) -> Result<(), GatewayError> {
        self.inner.filter(exchange, chain).await
    }

    fn order(&self) -> Option<i32> {
        Some(self.order)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Effective order of a filter; unordered filters sort last.
pub fn effective_order(filter: &dyn GatewayFilter) -> i32 {
    filter.order().unwrap_or(LOWEST_PRECEDENCE)
}

/// Stable ascending sort by effective order.
pub fn sort_by_order(filters: &mut [BoxFilter]) {
    filters.sort_by_key(|f| effective_order(f.as_ref()));
}

//! Asynchronous route predicates.
//!
//! # Design Decisions
//! - Predicates return a future so factories may consult async state
//! - Conjunction sequences two futures and short-circuits on false or error
//! - Predicates are stateless and shared behind `Arc`

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::http::exchange::Exchange;

/// Boolean match test over an incoming exchange.
#[async_trait]
pub trait AsyncPredicate: Send + Sync {
    async fn test(&self, exchange: &Exchange) -> Result<bool, GatewayError>;
}

/// Shared, type-erased predicate.
pub type BoxPredicate = Arc<dyn AsyncPredicate>;

/// Combine two predicates with short-circuit AND.
pub fn and(left: BoxPredicate, right: BoxPredicate) -> BoxPredicate {
    Arc::new(AndPredicate { left, right })
}

/// Wrap a synchronous test as an [`AsyncPredicate`].
pub fn from_fn<F>(f: F) -> BoxPredicate
where
    F: Fn(&Exchange) -> bool + Send + Sync + 'static,
{
    Arc::new(FnPredicate(f))
}

struct AndPredicate {
    left: BoxPredicate,
    right: BoxPredicate,
}

#[async_trait]
impl AsyncPredicate for AndPredicate {
    async fn test(&self, exchange: &Exchange) -> Result<bool, GatewayError> {
        if !self.left.test(exchange).await? {
            return Ok(false);
        }
        self.right.test(exchange).await
    }
}

struct FnPredicate<F>(F);

#[async_trait]
impl<F> AsyncPredicate for FnPredicate<F>
where
    F: Fn(&Exchange) -> bool + Send + Sync + 'static,
{
    async fn test(&self, exchange: &Exchange) -> Result<bool, GatewayError> {
        Ok((self.0)(exchange))
    }
}

impl fmt::Debug for dyn AsyncPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AsyncPredicate")
    }
}

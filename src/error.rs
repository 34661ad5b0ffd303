//! Request-time error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised while matching or processing a single request.
///
/// These are never swallowed by predicates or filters; they surface to the
/// request pipeline which maps them to a response.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("predicate evaluation failed: {0}")]
    Predicate(String),

    #[error("filter '{filter}' failed: {message}")]
    Filter { filter: String, message: String },

    #[error("request URL was not resolved before routing")]
    MissingRequestUrl,

    #[error("request was cancelled")]
    Cancelled,

    #[error("no route matched {0}")]
    NoRoute(String),

    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),
}

impl GatewayError {
    pub fn filter(filter: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Filter {
            filter: filter.into(),
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoRoute(_) => StatusCode::NOT_FOUND,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UnsupportedScheme(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatewayError::NoRoute("/x".into()).into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(GatewayError::Upstream("refused".into()).into_response().status(), StatusCode::BAD_GATEWAY);
        assert_eq!(GatewayError::Cancelled.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            GatewayError::filter("StripPrefix", "boom").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

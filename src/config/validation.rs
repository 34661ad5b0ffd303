//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Route ids must be unique
//! - Declaration names must not be empty
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Factory names and predicate-less routes are not checked here; both fail only their
//!   own route at compile time

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid listener address '{0}'")]
    ListenerAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("duplicate route id '{0}'")]
    DuplicateRouteId(String),

    #[error("route '{route}' has a {kind} with an empty name")]
    EmptyDeclarationName { route: String, kind: &'static str },

    #[error("default filter at position {0} has an empty name")]
    EmptyDefaultFilterName(usize),
}

/// Check a parsed configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::ListenerAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    for (i, filter) in config.default_filters.iter().enumerate() {
        if filter.name.trim().is_empty() {
            errors.push(ValidationError::EmptyDefaultFilterName(i));
        }
    }

    let mut seen = HashSet::new();
    for route in &config.routes {
        // Empty ids are filled in later.
        if !route.id.is_empty() && !seen.insert(route.id.as_str()) {
            errors.push(ValidationError::DuplicateRouteId(route.id.clone()));
        }
        if route.predicates.iter().any(|p| p.name.trim().is_empty()) {
            errors.push(ValidationError::EmptyDeclarationName {
                route: route.id.clone(),
                kind: "predicate",
            });
        }
        if route.filters.iter().any(|f| f.name.trim().is_empty()) {
            errors.push(ValidationError::EmptyDeclarationName {
                route: route.id.clone(),
                kind: "filter",
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

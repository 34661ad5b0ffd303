//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::routing::definition::{FilterDefinition, RouteDefinition};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Declarative route definitions.
    pub routes: Vec<RouteDefinition>,

    /// Filters applied to every route, ahead of the route's own filters.
    pub default_filters: Vec<FilterDefinition>,

    /// Named values reachable from `#{@name}` expressions.
    pub beans: HashMap<String, serde_json::Value>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Time in-flight requests get to finish after shutdown starts.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            shutdown_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.request_secs, 30);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config: GatewayConfig = toml::from_str(
            r#"
            default_filters = ["AddRequestHeader=X-Gateway, edge"]

            [listener]
            bind_address = "127.0.0.1:9000"

            [beans]
            apiPrefix = "/v2"
            maxParts = 2

            [[routes]]
            id = "users"
            uri = "http://localhost:3000"
            order = 1
            predicates = ["Path=/users/**", { name = "Method", args = { _genkey_0 = "GET" } }]
            filters = ["StripPrefix=1"]

            [routes.metadata]
            team = "identity"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.default_filters[0].name, "AddRequestHeader");
        assert_eq!(config.beans["maxParts"], serde_json::json!(2));

        let route = &config.routes[0];
        assert_eq!(route.id, "users");
        assert_eq!(route.order, 1);
        assert_eq!(route.predicates[1].name, "Method");
        assert_eq!(route.predicates[1].args.get("_genkey_0"), Some("GET"));
        assert_eq!(route.metadata["team"], "identity");
    }
}

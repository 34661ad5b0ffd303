//! Built-in route predicate factories.
//!
//! Each factory pairs a serde config with an explicit field schema; the
//! registry looks them up by [`Factory::name`].

use axum::http::Method;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::routing::factory::{
    Factory, FieldKind, FieldSpec, RoutePredicateFactory, ShortcutType, Validate,
};
use crate::routing::matcher::{HostPattern, PathPattern};
use crate::routing::predicate::{from_fn, BoxPredicate};
use crate::routing::registry::FactoryRegistry;

/// Register every built-in predicate factory.
pub fn register_predicates(registry: &mut FactoryRegistry) {
    registry
        .register_predicate(PathRoutePredicateFactory)
        .register_predicate(HostRoutePredicateFactory)
        .register_predicate(MethodRoutePredicateFactory)
        .register_predicate(HeaderRoutePredicateFactory);
}

/// Ant-style path matching, e.g. `Path=/api/**,/v2/**`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathRoutePredicateFactory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub patterns: Vec<String>,
    /// `/a/x/` also matches `/a/x`-style patterns unless turned off.
    pub match_trailing_slash: bool,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            match_trailing_slash: true,
        }
    }
}

impl Validate for PathConfig {
    fn validate(&self) -> Result<(), String> {
        if self.patterns.is_empty() {
            return Err("at least one pattern is required".to_string());
        }
        Ok(())
    }
}

impl Factory for PathRoutePredicateFactory {
    type Config = PathConfig;

    fn name(&self) -> &str {
        "Path"
    }

    fn schema(&self) -> &'static [FieldSpec] {
        const SCHEMA: &[FieldSpec] = &[
            FieldSpec::new("patterns", FieldKind::List),
            FieldSpec::new("match_trailing_slash", FieldKind::Bool),
        ];
        SCHEMA
    }

    fn shortcut_type(&self) -> ShortcutType {
        ShortcutType::GatherListTailFlag
    }

    fn shortcut_field_order(&self) -> &'static [&'static str] {
        &["patterns", "match_trailing_slash"]
    }
}

impl RoutePredicateFactory for PathRoutePredicateFactory {
    fn apply_async(&self, config: PathConfig) -> BoxPredicate {
        let patterns: Vec<PathPattern> = config.patterns.into_iter().map(PathPattern::new).collect();
        let trailing = config.match_trailing_slash;
        from_fn(move |exchange| {
            let path = exchange.path();
            patterns.iter().any(|p| p.matches(path, trailing))
        })
    }
}

/// Host header matching, e.g. `Host=**.example.com`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostRoutePredicateFactory;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    pub patterns: Vec<String>,
}

impl Validate for HostConfig {
    fn validate(&self) -> Result<(), String> {
        if self.patterns.is_empty() {
            return Err("at least one host pattern is required".to_string());
        }
        Ok(())
    }
}

impl Factory for HostRoutePredicateFactory {
    type Config = HostConfig;

    fn name(&self) -> &str {
        "Host"
    }

    fn schema(&self) -> &'static [FieldSpec] {
        const SCHEMA: &[FieldSpec] = &[FieldSpec::new("patterns", FieldKind::List)];
        SCHEMA
    }

    fn shortcut_type(&self) -> ShortcutType {
        ShortcutType::GatherList
    }

    fn shortcut_field_order(&self) -> &'static [&'static str] {
        &["patterns"]
    }
}

impl RoutePredicateFactory for HostRoutePredicateFactory {
    fn apply_async(&self, config: HostConfig) -> BoxPredicate {
        let patterns: Vec<HostPattern> = config.patterns.into_iter().map(HostPattern::new).collect();
        from_fn(move |exchange| {
            let host = exchange
                .headers()
                .get("host")
                .and_then(|h| h.to_str().ok())
                .or_else(|| exchange.uri().host());
            match host {
                Some(host) => patterns.iter().any(|p| p.matches(host)),
                None => false,
            }
        })
    }
}

/// HTTP method matching, e.g. `Method=GET,POST`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodRoutePredicateFactory;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodConfig {
    pub methods: Vec<String>,
}

impl Validate for MethodConfig {
    fn validate(&self) -> Result<(), String> {
        if self.methods.is_empty() {
            return Err("at least one method is required".to_string());
        }
        for m in &self.methods {
            Method::from_bytes(m.to_uppercase().as_bytes())
                .map_err(|_| format!("invalid method '{}'", m))?;
        }
        Ok(())
    }
}

impl Factory for MethodRoutePredicateFactory {
    type Config = MethodConfig;

    fn name(&self) -> &str {
        "Method"
    }

    fn schema(&self) -> &'static [FieldSpec] {
        const SCHEMA: &[FieldSpec] = &[FieldSpec::new("methods", FieldKind::List)];
        SCHEMA
    }

    fn shortcut_type(&self) -> ShortcutType {
        ShortcutType::GatherList
    }

    fn shortcut_field_order(&self) -> &'static [&'static str] {
        &["methods"]
    }
}

impl RoutePredicateFactory for MethodRoutePredicateFactory {
    fn apply_async(&self, config: MethodConfig) -> BoxPredicate {
        let methods: Vec<Method> = config
            .methods
            .iter()
            .filter_map(|m| Method::from_bytes(m.to_uppercase().as_bytes()).ok())
            .collect();
        from_fn(move |exchange| methods.contains(exchange.method()))
    }
}

/// Header presence or value matching, e.g. `Header=X-Request-Id, \d+`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderRoutePredicateFactory;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderConfig {
    pub header: String,
    pub regexp: Option<String>,
}

impl Validate for HeaderConfig {
    fn validate(&self) -> Result<(), String> {
        if self.header.is_empty() {
            return Err("header name is required".to_string());
        }
        if let Some(re) = &self.regexp {
            Regex::new(re).map_err(|e| format!("invalid regexp: {}", e))?;
        }
        Ok(())
    }
}

impl Factory for HeaderRoutePredicateFactory {
    type Config = HeaderConfig;

    fn name(&self) -> &str {
        "Header"
    }

    fn schema(&self) -> &'static [FieldSpec] {
        const SCHEMA: &[FieldSpec] = &[
            FieldSpec::new("header", FieldKind::Str),
            FieldSpec::new("regexp", FieldKind::Str),
        ];
        SCHEMA
    }

    fn shortcut_field_order(&self) -> &'static [&'static str] {
        &["header", "regexp"]
    }
}

impl RoutePredicateFactory for HeaderRoutePredicateFactory {
    fn apply_async(&self, config: HeaderConfig) -> BoxPredicate {
        // Validated during binding.
        let regex = config
            .regexp
            .as_deref()
            .and_then(|re| Regex::new(&format!("^(?:{})$", re)).ok());
        let header = config.header;
        from_fn(move |exchange| {
            let values = exchange.headers().get_all(header.as_str());
            match &regex {
                None => values.iter().next().is_some(),
                Some(re) => values
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .any(|v| re.is_match(v)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::exchange::Exchange;
    use crate::routing::binder::{normalize, NoBeans};
    use crate::routing::definition::PredicateDefinition;
    use crate::routing::factory::PredicateFactoryEntry;
    use axum::body::Body;
    use axum::http::Request;

    fn build(text: &str) -> BoxPredicate {
        let mut registry = FactoryRegistry::new();
        register_predicates(&mut registry);
        let def: PredicateDefinition = text.parse().unwrap();
        let factory = registry.predicate(&def.name).unwrap();
        let props = normalize(&def.args, &factory.shortcut(), &NoBeans).unwrap();
        factory.build(&props).unwrap()
    }

    fn request(method: &str, uri: &str, headers: &[(&str, &str)]) -> Exchange {
        let mut builder = Request::builder().method(method).uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        Exchange::new(builder.body(Body::empty()).unwrap())
    }

    #[tokio::test]
    async fn test_path_predicate() {
        let p = build("Path=/api/**,/v2/*");
        assert!(p.test(&request("GET", "/api/x", &[])).await.unwrap());
        assert!(p.test(&request("GET", "/v2/a", &[])).await.unwrap());
        assert!(!p.test(&request("GET", "/other", &[])).await.unwrap());
    }

    #[tokio::test]
    async fn test_path_trailing_slash() {
        let lenient = build("Path=/api/x");
        assert!(lenient.test(&request("GET", "/api/x/", &[])).await.unwrap());

        let strict = build("Path=/api/x, false");
        assert!(strict.test(&request("GET", "/api/x", &[])).await.unwrap());
        assert!(!strict.test(&request("GET", "/api/x/", &[])).await.unwrap());
    }

    #[tokio::test]
    async fn test_path_trailing_comma_does_not_widen() {
        let p = build("Path=/api/**,");
        assert!(p.test(&request("GET", "/api/a", &[])).await.unwrap());
        assert!(!p.test(&request("GET", "/", &[])).await.unwrap());
    }

    #[tokio::test]
    async fn test_host_predicate() {
        let p = build("Host=**.example.com");
        assert!(p.test(&request("GET", "/", &[("host", "API.example.com")])).await.unwrap());
        assert!(!p.test(&request("GET", "/", &[("host", "example.org")])).await.unwrap());
        assert!(!p.test(&request("GET", "/", &[])).await.unwrap());
    }

    #[tokio::test]
    async fn test_method_predicate() {
        let p = build("Method=get,POST");
        assert!(p.test(&request("GET", "/", &[])).await.unwrap());
        assert!(p.test(&request("POST", "/", &[])).await.unwrap());
        assert!(!p.test(&request("DELETE", "/", &[])).await.unwrap());
    }

    #[tokio::test]
    async fn test_header_predicate() {
        let p = build("Header=X-Version,\\d+");
        assert!(p.test(&request("GET", "/", &[("x-version", "12")])).await.unwrap());
        assert!(!p.test(&request("GET", "/", &[("x-version", "v1")])).await.unwrap());

        let presence = build("Header=X-Debug");
        assert!(presence.test(&request("GET", "/", &[("x-debug", "")])).await.unwrap());
        assert!(!presence.test(&request("GET", "/", &[])).await.unwrap());
    }
}

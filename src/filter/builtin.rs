//! Built-in gateway filter factories.

use async_trait::async_trait;
use axum::http::{uri::PathAndQuery, HeaderName, HeaderValue, Uri};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GatewayError;
use crate::filter::{BoxFilter, FilterChain, GatewayFilter};
use crate::http::exchange::Exchange;
use crate::routing::factory::{Factory, FieldKind, FieldSpec, GatewayFilterFactory, Validate};
use crate::routing::registry::FactoryRegistry;

/// Register every built-in filter factory.
pub fn register_filters(registry: &mut FactoryRegistry) {
    registry
        .register_filter(AddRequestHeaderGatewayFilterFactory)
        .register_filter(RemoveRequestHeaderGatewayFilterFactory)
        .register_filter(StripPrefixGatewayFilterFactory)
        .register_filter(PrefixPathGatewayFilterFactory);
}

fn validate_header_name(name: &str) -> Result<(), String> {
    HeaderName::from_bytes(name.as_bytes())
        .map(|_| ())
        .map_err(|_| format!("invalid header name '{}'", name))
}

/// Replace the path of `uri`, keeping its query.
fn with_path(uri: &Uri, path: &str) -> Result<Uri, String> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query.as_str()).map_err(|e| e.to_string())?,
    );
    Uri::from_parts(parts).map_err(|e| e.to_string())
}

// --- AddRequestHeader ---

/// Adds a header to the forwarded request, e.g. `AddRequestHeader=X-Gateway, edge`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddRequestHeaderGatewayFilterFactory;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddRequestHeaderConfig {
    pub name: String,
    pub value: String,
    /// Explicit chain position; assigned by declaration order when absent.
    pub order: Option<i32>,
}

impl Validate for AddRequestHeaderConfig {
    fn validate(&self) -> Result<(), String> {
        validate_header_name(&self.name)?;
        HeaderValue::from_str(&self.value).map_err(|_| format!("invalid header value for '{}'", self.name))?;
        Ok(())
    }
}

impl Factory for AddRequestHeaderGatewayFilterFactory {
    type Config = AddRequestHeaderConfig;

    fn name(&self) -> &str {
        "AddRequestHeader"
    }

    fn schema(&self) -> &'static [FieldSpec] {
        const SCHEMA: &[FieldSpec] = &[
            FieldSpec::new("name", FieldKind::Str),
            FieldSpec::new("value", FieldKind::Str),
            FieldSpec::new("order", FieldKind::Int),
        ];
        SCHEMA
    }

    fn shortcut_field_order(&self) -> &'static [&'static str] {
        &["name", "value", "order"]
    }
}

impl GatewayFilterFactory for AddRequestHeaderGatewayFilterFactory {
    fn apply(&self, config: AddRequestHeaderConfig) -> BoxFilter {
        Arc::new(AddRequestHeaderFilter {
            name: config.name,
            value: config.value,
            order: config.order,
        })
    }
}

struct AddRequestHeaderFilter {
    name: String,
    value: String,
    order: Option<i32>,
}

#[async_trait]
impl GatewayFilter for AddRequestHeaderFilter {
    async fn filter(&self, exchange: &mut Exchange, chain: FilterChain<'_>) -> Result<(), GatewayError> {
        let name = HeaderName::from_bytes(self.name.as_bytes())
            .map_err(|e| GatewayError::filter(self.name(), e.to_string()))?;
        let value = HeaderValue::from_str(&self.value)
            .map_err(|e| GatewayError::filter(self.name(), e.to_string()))?;
        exchange.headers_mut().append(name, value);
        chain.filter(exchange).await
    }

    fn order(&self) -> Option<i32> {
        self.order
    }

    fn name(&self) -> &str {
        "AddRequestHeader"
    }
}

// --- RemoveRequestHeader ---

/// Removes a header from the forwarded request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveRequestHeaderGatewayFilterFactory;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameConfig {
    pub name: String,
}

impl Validate for NameConfig {
    fn validate(&self) -> Result<(), String> {
        validate_header_name(&self.name)
    }
}

impl Factory for RemoveRequestHeaderGatewayFilterFactory {
    type Config = NameConfig;

    fn name(&self) -> &str {
        "RemoveRequestHeader"
    }

    fn schema(&self) -> &'static [FieldSpec] {
        const SCHEMA: &[FieldSpec] = &[FieldSpec::new("name", FieldKind::Str)];
        SCHEMA
    }

    fn shortcut_field_order(&self) -> &'static [&'static str] {
        &["name"]
    }
}

impl GatewayFilterFactory for RemoveRequestHeaderGatewayFilterFactory {
    fn apply(&self, config: NameConfig) -> BoxFilter {
        Arc::new(RemoveRequestHeaderFilter { name: config.name })
    }
}

struct RemoveRequestHeaderFilter {
    name: String,
}

#[async_trait]
impl GatewayFilter for RemoveRequestHeaderFilter {
    async fn filter(&self, exchange: &mut Exchange, chain: FilterChain<'_>) -> Result<(), GatewayError> {
        exchange.headers_mut().remove(self.name.as_str());
        chain.filter(exchange).await
    }

    fn name(&self) -> &str {
        "RemoveRequestHeader"
    }
}

// --- StripPrefix ---

/// Drops leading path segments, e.g. `StripPrefix=1` turns `/api/users` into `/users`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripPrefixGatewayFilterFactory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripPrefixConfig {
    pub parts: i64,
}

impl Default for StripPrefixConfig {
    fn default() -> Self {
        Self { parts: 1 }
    }
}

impl Validate for StripPrefixConfig {
    fn validate(&self) -> Result<(), String> {
        if self.parts < 0 {
            return Err("parts must not be negative".to_string());
        }
        Ok(())
    }
}

impl Factory for StripPrefixGatewayFilterFactory {
    type Config = StripPrefixConfig;

    fn name(&self) -> &str {
        "StripPrefix"
    }

    fn schema(&self) -> &'static [FieldSpec] {
        const SCHEMA: &[FieldSpec] = &[FieldSpec::new("parts", FieldKind::Int)];
        SCHEMA
    }

    fn shortcut_field_order(&self) -> &'static [&'static str] {
        &["parts"]
    }
}

impl GatewayFilterFactory for StripPrefixGatewayFilterFactory {
    fn apply(&self, config: StripPrefixConfig) -> BoxFilter {
        Arc::new(StripPrefixFilter {
            parts: usize::try_from(config.parts).unwrap_or(0),
        })
    }
}

struct StripPrefixFilter {
    parts: usize,
}

fn strip_segments(path: &str, parts: usize) -> String {
    let rest: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .skip(parts)
        .collect();
    let mut stripped = format!("/{}", rest.join("/"));
    if path.ends_with('/') && stripped.len() > 1 {
        stripped.push('/');
    }
    stripped
}

#[async_trait]
impl GatewayFilter for StripPrefixFilter {
    async fn filter(&self, exchange: &mut Exchange, chain: FilterChain<'_>) -> Result<(), GatewayError> {
        let path = strip_segments(exchange.path(), self.parts);
        let uri = with_path(exchange.uri(), &path).map_err(|e| GatewayError::filter(self.name(), e))?;
        exchange.request_mut().uri = uri;
        chain.filter(exchange).await
    }

    fn name(&self) -> &str {
        "StripPrefix"
    }
}

// --- PrefixPath ---

/// Prepends a fixed prefix to the request path, e.g. `PrefixPath=/v1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixPathGatewayFilterFactory;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrefixConfig {
    pub prefix: String,
}

impl Validate for PrefixConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.prefix.starts_with('/') {
            return Err(format!("prefix '{}' must start with '/'", self.prefix));
        }
        Ok(())
    }
}

impl Factory for PrefixPathGatewayFilterFactory {
    type Config = PrefixConfig;

    fn name(&self) -> &str {
        "PrefixPath"
    }

    fn schema(&self) -> &'static [FieldSpec] {
        const SCHEMA: &[FieldSpec] = &[FieldSpec::new("prefix", FieldKind::Str)];
        SCHEMA
    }

    fn shortcut_field_order(&self) -> &'static [&'static str] {
        &["prefix"]
    }
}

impl GatewayFilterFactory for PrefixPathGatewayFilterFactory {
    fn apply(&self, config: PrefixConfig) -> BoxFilter {
        Arc::new(PrefixPathFilter {
            prefix: config.prefix.trim_end_matches('/').to_string(),
        })
    }
}

struct PrefixPathFilter {
    prefix: String,
}

#[async_trait]
impl GatewayFilter for PrefixPathFilter {
    async fn filter(&self, exchange: &mut Exchange, chain: FilterChain<'_>) -> Result<(), GatewayError> {
        let path = format!("{}{}", self.prefix, exchange.path());
        let uri = with_path(exchange.uri(), &path).map_err(|e| GatewayError::filter(self.name(), e))?;
        exchange.request_mut().uri = uri;
        chain.filter(exchange).await
    }

    fn name(&self) -> &str {
        "PrefixPath"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Handler;
    use crate::routing::binder::{normalize, NoBeans};
    use crate::routing::definition::FilterDefinition;
    use crate::routing::factory::FilterFactoryEntry;
    use axum::body::Body;
    use axum::http::Request;

    struct Sink;

    #[async_trait]
    impl Handler for Sink {
        async fn handle(&self, _exchange: &mut Exchange) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    fn build(text: &str) -> BoxFilter {
        let mut registry = FactoryRegistry::new();
        register_filters(&mut registry);
        let def: FilterDefinition = text.parse().unwrap();
        let factory = registry.filter(&def.name).unwrap();
        let props = normalize(&def.args, &factory.shortcut(), &NoBeans).unwrap();
        factory.build(&props).unwrap()
    }

    async fn run(filter: BoxFilter, uri: &str) -> Exchange {
        let mut ex = Exchange::new(
            Request::builder()
                .uri(uri)
                .header("x-secret", "1")
                .body(Body::empty())
                .unwrap(),
        );
        let filters = [filter];
        FilterChain::new(&filters, &Sink).filter(&mut ex).await.unwrap();
        ex
    }

    #[tokio::test]
    async fn test_add_request_header() {
        let filter = build("AddRequestHeader=X-Gateway, edge, 5");
        assert_eq!(filter.order(), Some(5));
        let ex = run(filter, "/a").await;
        assert_eq!(ex.headers()["x-gateway"], "edge");

        assert_eq!(build("AddRequestHeader=X-Gateway, edge").order(), None);
    }

    #[tokio::test]
    async fn test_remove_request_header() {
        let ex = run(build("RemoveRequestHeader=X-Secret"), "/a").await;
        assert!(ex.headers().get("x-secret").is_none());
    }

    #[tokio::test]
    async fn test_strip_prefix_keeps_query() {
        let ex = run(build("StripPrefix=2"), "/api/v1/users?page=2").await;
        assert_eq!(ex.uri().path(), "/users");
        assert_eq!(ex.uri().query(), Some("page=2"));

        let ex = run(build("StripPrefix=3"), "/a/b").await;
        assert_eq!(ex.path(), "/");
    }

    #[tokio::test]
    async fn test_prefix_path() {
        let ex = run(build("PrefixPath=/v1/"), "/users").await;
        assert_eq!(ex.path(), "/v1/users");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut registry = FactoryRegistry::new();
        register_filters(&mut registry);
        let def: FilterDefinition = "PrefixPath=v1".parse().unwrap();
        let factory = registry.filter(&def.name).unwrap();
        let props = normalize(&def.args, &factory.shortcut(), &NoBeans).unwrap();
        assert!(factory.build(&props).is_err());
    }
}

//! Route compilation.
//!
//! # Data Flow
//! ```text
//! RouteDefinitionLocator (lazy stream of definitions)
//!     → compile(definition)
//!         → predicates: lookup + bind each, fold with short-circuit AND
//!         → filters: defaults ++ route filters, assign order, stable sort
//!     → Route (fully built before it is emitted)
//! ```
//!
//! # Design Decisions
//! - No caching: every call to `routes()` recompiles from the supplier
//! - A failing definition is logged and skipped; other routes still compile
//! - All declaration errors of a definition are reported together

use std::sync::Arc;

use futures_util::stream::{BoxStream, StreamExt};

use crate::config::schema::GatewayConfig;
use crate::filter::{sort_by_order, BoxFilter, OrderedFilter};
use crate::observability::metrics;
use crate::routing::binder::{normalize, BeanResolver, NoBeans};
use crate::routing::definition::{FilterDefinition, PredicateDefinition, RouteDefinition};
use crate::routing::error::{CompilationError, ConfigurationError, ConfigurationErrorKind};
use crate::routing::events::{ArgsAppliedEvent, EventPublisher};
use crate::routing::locator::RouteDefinitionLocator;
use crate::routing::predicate::{and, BoxPredicate};
use crate::routing::registry::{FactoryKind, FactoryRegistry};
use crate::routing::router::{Route, RouteTable};

/// Turns route definitions into executable routes.
pub struct RouteDefinitionRouteLocator {
    definitions: Arc<dyn RouteDefinitionLocator>,
    registry: Arc<FactoryRegistry>,
    default_filters: Vec<FilterDefinition>,
    beans: Arc<dyn BeanResolver>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl RouteDefinitionRouteLocator {
    pub fn new(
        definitions: Arc<dyn RouteDefinitionLocator>,
        registry: Arc<FactoryRegistry>,
        default_filters: Vec<FilterDefinition>,
    ) -> Self {
        Self {
            definitions,
            registry,
            default_filters,
            beans: Arc::new(NoBeans),
            publisher: None,
        }
    }

    /// Build a compiler using the config's default filters and beans.
    pub fn from_config(
        definitions: Arc<dyn RouteDefinitionLocator>,
        registry: Arc<FactoryRegistry>,
        config: &GatewayConfig,
    ) -> Self {
        Self::new(definitions, registry, config.default_filters.clone())
            .with_beans(Arc::new(config.beans.clone()))
    }

    pub fn with_beans(mut self, beans: Arc<dyn BeanResolver>) -> Self {
        self.beans = beans;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Compiled routes; failing definitions are logged and skipped.
    pub fn routes(&self) -> BoxStream<'_, Route> {
        self.try_routes()
            .filter_map(|result| async move {
                match result {
                    Ok(route) => Some(route),
                    Err(e) => {
                        tracing::error!(route_id = %e.route_id, error = %e, "Skipping route definition");
                        None
                    }
                }
            })
            .boxed()
    }

    /// One compilation result per supplied definition.
    pub fn try_routes(&self) -> BoxStream<'_, Result<Route, CompilationError>> {
        self.definitions
            .route_definitions()
            .map(move |definition| self.compile(&definition))
            .boxed()
    }

    /// Compile every definition into an immutable lookup table.
    pub async fn route_table(&self) -> RouteTable {
        RouteTable::new(self.routes().collect().await)
    }

    /// Compile a single definition.
    pub fn compile(&self, definition: &RouteDefinition) -> Result<Route, CompilationError> {
        let mut errors = Vec::new();
        let predicate = self.combine_predicates(definition, &mut errors);
        let filters = self.filters(definition, &mut errors);

        match predicate {
            Some(predicate) if errors.is_empty() => {
                tracing::debug!(route_id = %definition.id, filters = filters.len(), "RouteDefinition compiled");
                metrics::record_route_compiled(true);
                Ok(Route::builder(definition.id.clone(), definition.uri.clone(), predicate)
                    .order(definition.order)
                    .metadata(definition.metadata.clone())
                    .filters(filters)
                    .build())
            }
            _ => {
                metrics::record_route_compiled(false);
                Err(CompilationError {
                    route_id: definition.id.clone(),
                    errors,
                })
            }
        }
    }

    fn combine_predicates(
        &self,
        definition: &RouteDefinition,
        errors: &mut Vec<ConfigurationError>,
    ) -> Option<BoxPredicate> {
        if definition.predicates.is_empty() {
            errors.push(ConfigurationError::new(
                &definition.id,
                "predicates",
                ConfigurationErrorKind::NoPredicates,
            ));
            return None;
        }

        let mut combined: Option<BoxPredicate> = None;
        for declaration in &definition.predicates {
            match self.lookup_predicate(&definition.id, declaration) {
                Ok(found) => {
                    combined = Some(match combined {
                        Some(acc) => and(acc, found),
                        None => found,
                    });
                }
                Err(e) => errors.push(e),
            }
        }
        combined
    }

    fn lookup_predicate(
        &self,
        route_id: &str,
        declaration: &PredicateDefinition,
    ) -> Result<BoxPredicate, ConfigurationError> {
        let error = |kind: ConfigurationErrorKind| ConfigurationError::new(route_id, &declaration.name, kind);

        let factory = self.registry.predicate(&declaration.name).ok_or_else(|| {
            error(ConfigurationErrorKind::UnknownFactory(
                FactoryKind::Predicate,
                declaration.name.clone(),
            ))
        })?;

        tracing::debug!(
            route_id = %route_id,
            predicate = %declaration.name,
            args = %declaration.args,
            "RouteDefinition applying predicate"
        );

        let properties = normalize(&declaration.args, &factory.shortcut(), self.beans.as_ref())
            .map_err(|e| error(e.into()))?;
        let predicate = factory.build(&properties).map_err(|e| error(e.into()))?;

        self.publish(FactoryKind::Predicate, route_id, &declaration.name, properties);
        Ok(predicate)
    }

    /// Defaults first, then route filters; unordered filters get their 1-based position.
    fn filters(&self, definition: &RouteDefinition, errors: &mut Vec<ConfigurationError>) -> Vec<BoxFilter> {
        let mut loaded = Vec::new();
        if !self.default_filters.is_empty() {
            loaded.extend(self.load_filters(&definition.id, &self.default_filters, errors));
        }
        if !definition.filters.is_empty() {
            loaded.extend(self.load_filters(&definition.id, &definition.filters, errors));
        }

        let mut ordered: Vec<BoxFilter> = loaded
            .into_iter()
            .enumerate()
            .map(|(i, filter)| match filter.order() {
                Some(_) => filter,
                None => {
                    let position = i32::try_from(i + 1).unwrap_or(i32::MAX);
                    Arc::new(OrderedFilter::new(filter, position)) as BoxFilter
                }
            })
            .collect();
        sort_by_order(&mut ordered);
        ordered
    }

    fn load_filters(
        &self,
        route_id: &str,
        declarations: &[FilterDefinition],
        errors: &mut Vec<ConfigurationError>,
    ) -> Vec<BoxFilter> {
        let mut filters = Vec::with_capacity(declarations.len());
        for declaration in declarations {
            match self.lookup_filter(route_id, declaration) {
                Ok(filter) => filters.push(filter),
                Err(e) => errors.push(e),
            }
        }
        filters
    }

    fn lookup_filter(
        &self,
        route_id: &str,
        declaration: &FilterDefinition,
    ) -> Result<BoxFilter, ConfigurationError> {
        let error = |kind: ConfigurationErrorKind| ConfigurationError::new(route_id, &declaration.name, kind);

        let factory = self.registry.filter(&declaration.name).ok_or_else(|| {
            error(ConfigurationErrorKind::UnknownFactory(
                FactoryKind::Filter,
                declaration.name.clone(),
            ))
        })?;

        tracing::debug!(
            route_id = %route_id,
            filter = %declaration.name,
            args = %declaration.args,
            "RouteDefinition applying filter"
        );

        let properties = normalize(&declaration.args, &factory.shortcut(), self.beans.as_ref())
            .map_err(|e| error(e.into()))?;
        let filter = factory.build(&properties).map_err(|e| error(e.into()))?;

        self.publish(FactoryKind::Filter, route_id, &declaration.name, properties);
        Ok(filter)
    }

    fn publish(&self, kind: FactoryKind, route_id: &str, name: &str, properties: crate::routing::binder::Properties) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(ArgsAppliedEvent {
                kind,
                route_id: route_id.to_string(),
                name: name.to_string(),
                properties,
            });
        }
    }
}

//! Factory registry.
//!
//! # Responsibilities
//! - Map predicate names and filter names to their factories
//! - Warn when a registration supersedes an existing entry
//!
//! # Design Decisions
//! - Populated once at startup, read-only afterwards (shared via `Arc`)
//! - Last registration wins on a name collision; no merge, no removal

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::routing::factory::{
    FilterEntry, FilterFactoryRef, GatewayFilterFactory, PredicateEntry, PredicateFactoryRef,
    RoutePredicateFactory,
};

/// Which table a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryKind {
    Predicate,
    Filter,
}

impl fmt::Display for FactoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactoryKind::Predicate => write!(f, "RoutePredicateFactory"),
            FactoryKind::Filter => write!(f, "GatewayFilterFactory"),
        }
    }
}

/// Named predicate and filter factories.
#[derive(Default)]
pub struct FactoryRegistry {
    predicates: HashMap<String, PredicateFactoryRef>,
    filters: HashMap<String, FilterFactoryRef>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate factory under its declared name.
    pub fn register_predicate<F: RoutePredicateFactory>(&mut self, factory: F) -> &mut Self {
        let entry: PredicateFactoryRef = Arc::new(PredicateEntry(factory));
        let name = entry.name().to_string();
        insert(&mut self.predicates, name, entry, FactoryKind::Predicate, |e| e.type_name());
        self
    }

    /// Register a filter factory under its declared name.
    pub fn register_filter<F: GatewayFilterFactory>(&mut self, factory: F) -> &mut Self {
        let entry: FilterFactoryRef = Arc::new(FilterEntry(factory));
        let name = entry.name().to_string();
        insert(&mut self.filters, name, entry, FactoryKind::Filter, |e| e.type_name());
        self
    }

    pub fn predicate(&self, name: &str) -> Option<&PredicateFactoryRef> {
        self.predicates.get(name)
    }

    pub fn filter(&self, name: &str) -> Option<&FilterFactoryRef> {
        self.filters.get(name)
    }

    /// Returns true if a factory of `kind` is registered under `name`.
    pub fn contains(&self, kind: FactoryKind, name: &str) -> bool {
        match kind {
            FactoryKind::Predicate => self.predicates.contains_key(name),
            FactoryKind::Filter => self.filters.contains_key(name),
        }
    }

    /// Registered names of `kind`, sorted.
    pub fn names(&self, kind: FactoryKind) -> Vec<&str> {
        let mut names: Vec<&str> = match kind {
            FactoryKind::Predicate => self.predicates.keys().map(String::as_str).collect(),
            FactoryKind::Filter => self.filters.keys().map(String::as_str).collect(),
        };
        names.sort_unstable();
        names
    }
}

/// Store `entry`, returning the type of the entry it superseded.
fn insert<T>(
    table: &mut HashMap<String, T>,
    name: String,
    entry: T,
    kind: FactoryKind,
    type_name: fn(&T) -> &'static str,
) -> Option<&'static str> {
    let added = type_name(&entry);
    let replaced = table.insert(name.clone(), entry).map(|old| type_name(&old));
    if let Some(old) = replaced {
        tracing::warn!(
            name = %name,
            kind = %kind,
            replaced = old,
            replacement = added,
            "A factory with this name already exists, it has been overwritten"
        );
    }
    tracing::info!(name = %name, kind = %kind, factory = added, "Loaded factory");
    replaced
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("predicates", &self.names(FactoryKind::Predicate))
            .field("filters", &self.names(FactoryKind::Filter))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::builtin::{HostRoutePredicateFactory, PathRoutePredicateFactory};
    use crate::filter::builtin::StripPrefixGatewayFilterFactory;

    #[test]
    fn test_lookup_by_kind() {
        let mut registry = FactoryRegistry::new();
        registry
            .register_predicate(PathRoutePredicateFactory)
            .register_filter(StripPrefixGatewayFilterFactory);

        assert!(registry.predicate("Path").is_some());
        assert!(registry.filter("StripPrefix").is_some());
        assert!(registry.predicate("StripPrefix").is_none());
        assert!(registry.contains(FactoryKind::Filter, "StripPrefix"));
        assert!(!registry.contains(FactoryKind::Predicate, "Nope"));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = FactoryRegistry::new();
        registry
            .register_predicate(PathRoutePredicateFactory)
            .register_predicate(HostRoutePredicateFactory)
            .register_predicate(PathRoutePredicateFactory);

        assert_eq!(registry.names(FactoryKind::Predicate), vec!["Host", "Path"]);
    }

    #[test]
    fn test_overwrite_reports_superseded_type() {
        let mut table: HashMap<String, PredicateFactoryRef> = HashMap::new();
        let path: PredicateFactoryRef = Arc::new(PredicateEntry(PathRoutePredicateFactory));
        let host: PredicateFactoryRef = Arc::new(PredicateEntry(HostRoutePredicateFactory));

        let first = insert(&mut table, "Path".into(), path, FactoryKind::Predicate, |e| e.type_name());
        assert_eq!(first, None);

        let replaced = insert(&mut table, "Path".into(), host, FactoryKind::Predicate, |e| e.type_name())
            .unwrap();
        assert!(replaced.ends_with("PathRoutePredicateFactory"));
        assert!(table["Path"].type_name().ends_with("HostRoutePredicateFactory"));
    }
}

//! Route compilation errors.

use thiserror::Error;

use crate::routing::binder::BindError;
use crate::routing::registry::FactoryKind;

/// Why a single declaration could not be compiled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationErrorKind {
    #[error("unable to find {0} with name '{1}'")]
    UnknownFactory(FactoryKind, String),

    #[error("route has no predicates")]
    NoPredicates,

    #[error(transparent)]
    Bind(#[from] BindError),
}

/// A failure attributable to one declaration within one route definition.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("route '{route_id}', declaration '{declaration}': {kind}")]
pub struct ConfigurationError {
    pub route_id: String,
    pub declaration: String,
    pub kind: ConfigurationErrorKind,
}

impl ConfigurationError {
    pub fn new(
        route_id: impl Into<String>,
        declaration: impl Into<String>,
        kind: impl Into<ConfigurationErrorKind>,
    ) -> Self {
        Self {
            route_id: route_id.into(),
            declaration: declaration.into(),
            kind: kind.into(),
        }
    }

    /// Name of the missing factory, if that is the cause.
    pub fn missing_factory(&self) -> Option<&str> {
        match &self.kind {
            ConfigurationErrorKind::UnknownFactory(_, name) => Some(name),
            _ => None,
        }
    }
}

/// Aggregate failure compiling one route definition.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to compile route '{route_id}': {}", join(.errors))]
pub struct CompilationError {
    pub route_id: String,
    pub errors: Vec<ConfigurationError>,
}

fn join(errors: &[ConfigurationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

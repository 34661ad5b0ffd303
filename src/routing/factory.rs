//! Predicate and filter factory contracts.
//!
//! # Responsibilities
//! - Describe a factory's name, shortcut binding mode and config schema
//! - Build executable predicates/filters from a bound configuration
//! - Erase the config type so factories can live in one registry
//!
//! # Design Decisions
//! - Configs are plain serde records with a `Default` instance (`new_config`)
//! - Field types are declared explicitly so raw strings can be coerced
//!   without reflection
//! - Validation is a trait on the config type, run after binding

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::filter::BoxFilter;
use crate::routing::binder::{bind, BindError, Properties};
use crate::routing::predicate::BoxPredicate;

/// How positional (`_genkey_<n>`) arguments map onto config fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortcutType {
    /// The n-th positional argument binds the n-th shortcut field.
    #[default]
    Default,
    /// All values are gathered into the single shortcut field.
    GatherList,
    /// Like `GatherList`, but a trailing `true`/`false` binds the second field.
    GatherListTailFlag,
    /// Positional arguments are rejected.
    Disabled,
}

/// Declared type of a config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Float,
    Bool,
    List,
}

/// One declared config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Constraint check run on a freshly bound config.
pub trait Validate {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Common part of predicate and filter factories.
pub trait Factory: Send + Sync + 'static {
    type Config: Default + Serialize + DeserializeOwned + Validate + Send;

    /// Registry key, e.g. `Path` or `StripPrefix`.
    fn name(&self) -> &str;

    /// Declared config fields.
    fn schema(&self) -> &'static [FieldSpec];

    fn shortcut_type(&self) -> ShortcutType {
        ShortcutType::Default
    }

    /// Fields that positional arguments bind to, in order.
    fn shortcut_field_order(&self) -> &'static [&'static str] {
        &[]
    }

    /// Optional namespace stripped from property keys before binding.
    fn shortcut_field_prefix(&self) -> Option<&str> {
        None
    }

    /// Fresh configuration carrying the field defaults.
    fn new_config(&self) -> Self::Config {
        Self::Config::default()
    }
}

/// Factory producing asynchronous route predicates.
pub trait RoutePredicateFactory: Factory {
    fn apply_async(&self, config: Self::Config) -> BoxPredicate;
}

/// Factory producing gateway filters.
pub trait GatewayFilterFactory: Factory {
    fn apply(&self, config: Self::Config) -> BoxFilter;
}

/// Binding metadata shared by both factory kinds.
#[derive(Debug, Clone, Copy)]
pub struct ShortcutSpec<'a> {
    pub shortcut_type: ShortcutType,
    pub field_order: &'a [&'a str],
    pub prefix: Option<&'a str>,
    pub schema: &'a [FieldSpec],
}

/// Object-safe view of a [`RoutePredicateFactory`].
pub trait PredicateFactoryEntry: Send + Sync {
    fn name(&self) -> &str;
    /// Rust type of the wrapped factory.
    fn type_name(&self) -> &'static str;
    fn shortcut(&self) -> ShortcutSpec<'_>;
    fn build(&self, properties: &Properties) -> Result<BoxPredicate, BindError>;
}

/// Object-safe view of a [`GatewayFilterFactory`].
pub trait FilterFactoryEntry: Send + Sync {
    fn name(&self) -> &str;
    /// Rust type of the wrapped factory.
    fn type_name(&self) -> &'static str;
    fn shortcut(&self) -> ShortcutSpec<'_>;
    fn build(&self, properties: &Properties) -> Result<BoxFilter, BindError>;
}

fn shortcut_of<F: Factory>(factory: &F) -> ShortcutSpec<'_> {
    ShortcutSpec {
        shortcut_type: factory.shortcut_type(),
        field_order: factory.shortcut_field_order(),
        prefix: factory.shortcut_field_prefix(),
        schema: factory.schema(),
    }
}

/// Registry entry wrapping a typed predicate factory.
pub(crate) struct PredicateEntry<F>(pub F);

/// Registry entry wrapping a typed filter factory.
pub(crate) struct FilterEntry<F>(pub F);

impl<F: RoutePredicateFactory> PredicateFactoryEntry for PredicateEntry<F> {
    fn name(&self) -> &str {
        Factory::name(&self.0)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<F>()
    }

    fn shortcut(&self) -> ShortcutSpec<'_> {
        shortcut_of(&self.0)
    }

    fn build(&self, properties: &Properties) -> Result<BoxPredicate, BindError> {
        let config = bind(self.0.new_config(), properties, &shortcut_of(&self.0))?;
        Ok(self.0.apply_async(config))
    }
}

impl<F: GatewayFilterFactory> FilterFactoryEntry for FilterEntry<F> {
    fn name(&self) -> &str {
        Factory::name(&self.0)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<F>()
    }

    fn shortcut(&self) -> ShortcutSpec<'_> {
        shortcut_of(&self.0)
    }

    fn build(&self, properties: &Properties) -> Result<BoxFilter, BindError> {
        let config = bind(self.0.new_config(), properties, &shortcut_of(&self.0))?;
        Ok(self.0.apply(config))
    }
}

/// Shared predicate factory handle.
pub type PredicateFactoryRef = Arc<dyn PredicateFactoryEntry>;

/// Shared filter factory handle.
pub type FilterFactoryRef = Arc<dyn FilterFactoryEntry>;

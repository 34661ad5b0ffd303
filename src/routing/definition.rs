//! Declarative route definitions.
//!
//! # Responsibilities
//! - Model route, predicate and filter declarations as plain data
//! - Parse the `Name=value1,value2` shortcut text form
//! - Keep positional arguments in declaration order
//!
//! # Design Decisions
//! - Definitions are immutable once produced by a supplier
//! - Positional arguments are stored under generated `_genkey_<n>` keys
//! - Arguments are raw strings; typing happens in the binder

use std::fmt;
use std::str::FromStr;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use url::Url;

/// Prefix of generated keys for positional arguments.
pub const GENERATED_KEY_PREFIX: &str = "_genkey_";

/// Build the generated key for the positional argument at `index`.
pub fn generate_key(index: usize) -> String {
    format!("{}{}", GENERATED_KEY_PREFIX, index)
}

/// Returns true if `key` was produced by [`generate_key`].
pub fn is_generated_key(key: &str) -> bool {
    key.starts_with(GENERATED_KEY_PREFIX)
}

/// Error produced when a shortcut declaration cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionParseError {
    #[error("unable to parse declaration '{0}', expected Name=args")]
    MissingSeparator(String),

    #[error("declaration '{0}' has an empty name")]
    EmptyName(String),
}

/// Insertion-ordered string arguments of a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    entries: Vec<(String, String)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, keeping the original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Args {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Args::new();
        for (k, v) in iter {
            args.insert(k, v);
        }
        args
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        write!(f, "}}")
    }
}

impl Serialize for Args {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Args {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ArgsVisitor;

        impl<'de> Visitor<'de> for ArgsVisitor {
            type Value = Args;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of argument names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Args, A::Error> {
                let mut args = Args::new();
                while let Some((key, value)) = access.next_entry::<String, ArgValue>()? {
                    args.insert(key, value.0);
                }
                Ok(args)
            }
        }

        deserializer.deserialize_map(ArgsVisitor)
    }
}

/// Accepts scalar config values and keeps their textual form.
struct ArgValue(String);

impl<'de> Deserialize<'de> for ArgValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Scalar {
            Str(String),
            Int(i64),
            Float(f64),
            Bool(bool),
        }

        Ok(ArgValue(match Scalar::deserialize(deserializer)? {
            Scalar::Str(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }))
    }
}

/// Parse `Name=a,b,c` into a name and positional arguments.
fn parse_shortcut(text: &str) -> Result<(String, Args), DefinitionParseError> {
    let (name, rest) = text
        .split_once('=')
        .ok_or_else(|| DefinitionParseError::MissingSeparator(text.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(DefinitionParseError::EmptyName(text.to_string()));
    }

    let mut args = Args::new();
    let values = rest.split(',').map(str::trim).filter(|v| !v.is_empty());
    for (i, value) in values.enumerate() {
        args.insert(generate_key(i), value);
    }
    Ok((name.to_string(), args))
}

/// Serde representation accepting either the shortcut text or a table.
#[derive(Deserialize)]
#[serde(untagged)]
enum DeclarationRepr {
    Text(String),
    Full {
        name: String,
        #[serde(default)]
        args: Args,
    },
}

impl DeclarationRepr {
    fn into_parts(self) -> Result<(String, Args), DefinitionParseError> {
        match self {
            DeclarationRepr::Text(text) => parse_shortcut(&text),
            DeclarationRepr::Full { name, args } => Ok((name, args)),
        }
    }
}

/// A named, parameterized predicate declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DeclarationRepr")]
pub struct PredicateDefinition {
    pub name: String,
    pub args: Args,
}

impl PredicateDefinition {
    pub fn new(name: impl Into<String>, args: Args) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl FromStr for PredicateDefinition {
    type Err = DefinitionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, args) = parse_shortcut(s)?;
        Ok(Self { name, args })
    }
}

impl TryFrom<DeclarationRepr> for PredicateDefinition {
    type Error = DefinitionParseError;

    fn try_from(repr: DeclarationRepr) -> Result<Self, Self::Error> {
        let (name, args) = repr.into_parts()?;
        Ok(Self { name, args })
    }
}

/// A named, parameterized filter declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DeclarationRepr")]
pub struct FilterDefinition {
    pub name: String,
    pub args: Args,
}

impl FilterDefinition {
    pub fn new(name: impl Into<String>, args: Args) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl FromStr for FilterDefinition {
    type Err = DefinitionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, args) = parse_shortcut(s)?;
        Ok(Self { name, args })
    }
}

impl TryFrom<DeclarationRepr> for FilterDefinition {
    type Error = DefinitionParseError;

    fn try_from(repr: DeclarationRepr) -> Result<Self, Self::Error> {
        let (name, args) = repr.into_parts()?;
        Ok(Self { name, args })
    }
}

/// Declarative description of one routing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDefinition {
    /// Route identifier; generated when left empty.
    #[serde(default)]
    pub id: String,

    /// Predicates combined with AND semantics.
    #[serde(default)]
    pub predicates: Vec<PredicateDefinition>,

    /// Route-specific filters, applied after the default filters.
    #[serde(default)]
    pub filters: Vec<FilterDefinition>,

    /// Target URI (`http://` or `forward://`).
    pub uri: Url,

    /// Match order (lower is checked first).
    #[serde(default)]
    pub order: i32,

    /// Free-form metadata.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl RouteDefinition {
    pub fn new(id: impl Into<String>, uri: Url) -> Self {
        Self {
            id: id.into(),
            predicates: Vec::new(),
            filters: Vec::new(),
            uri,
            order: 0,
            metadata: serde_json::Map::new(),
        }
    }

    /// Append a predicate declaration.
    pub fn predicate(mut self, predicate: PredicateDefinition) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Append a filter declaration.
    pub fn filter(mut self, filter: FilterDefinition) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

//! Argument binding.
//!
//! # Data Flow
//! ```text
//! raw Args (string → string, positional _genkey_<n>)
//!     → normalize (shortcut mode, #{...} expressions, @bean refs)
//!     → Properties (field → JSON value)
//!     → bind onto new_config() by field name (prefix, relaxed names)
//!     → coerce by declared FieldKind, deserialize, validate
//!     → typed config
//! ```
//!
//! # Design Decisions
//! - Gather modes only consume positional arguments; named ones bind by name
//! - Unknown fields are errors, never ignored
//! - Field names are matched relaxed: `stripParts`, `strip-parts` and
//!   `strip_parts` all bind `strip_parts`

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::routing::definition::{is_generated_key, Args, GENERATED_KEY_PREFIX};
use crate::routing::factory::{FieldKind, ShortcutSpec, ShortcutType, Validate};

/// Normalized arguments keyed by config field name.
pub type Properties = serde_json::Map<String, Value>;

/// Errors raised while normalizing or binding arguments.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{field}' expects {expected:?}, got '{value}'")]
    TypeMismatch {
        field: String,
        expected: FieldKind,
        value: String,
    },

    #[error("shortcut binding failed: {0}")]
    Shortcut(String),

    #[error("unable to evaluate expression '{0}'")]
    Expression(String),

    #[error("no bean named '{0}'")]
    UnknownBean(String),

    #[error("config is not a record")]
    NotARecord,

    #[error("unable to bind config: {0}")]
    Deserialize(String),

    #[error("validation failed: {0}")]
    Invalid(String),
}

/// Resolves `@name` references inside `#{...}` expressions.
pub trait BeanResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Value>;
}

impl BeanResolver for HashMap<String, Value> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Resolver with no beans.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBeans;

impl BeanResolver for NoBeans {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// Evaluate a raw argument value, expanding `#{...}` expressions.
pub fn resolve_value(raw: &str, beans: &dyn BeanResolver) -> Result<Value, BindError> {
    let trimmed = raw.trim();
    let expr = match trimmed
        .strip_prefix("#{")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(expr) => expr.trim(),
        None => return Ok(Value::String(raw.to_string())),
    };

    if let Some(name) = expr.strip_prefix('@') {
        return beans
            .resolve(name.trim())
            .ok_or_else(|| BindError::UnknownBean(name.trim().to_string()));
    }
    if let Some(literal) = expr
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return Ok(Value::String(literal.to_string()));
    }
    match expr {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        _ => {}
    }
    if let Ok(i) = expr.parse::<i64>() {
        return Ok(Value::Number(i.into()));
    }
    if let Some(n) = expr.parse::<f64>().ok().and_then(Number::from_f64) {
        return Ok(Value::Number(n));
    }
    Err(BindError::Expression(trimmed.to_string()))
}

fn positional_index(key: &str) -> Result<usize, BindError> {
    key[GENERATED_KEY_PREFIX.len()..]
        .parse()
        .map_err(|_| BindError::Shortcut(format!("malformed positional key '{}'", key)))
}

fn is_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
}

/// Turn raw declaration arguments into properties keyed by field name.
pub fn normalize(
    args: &Args,
    spec: &ShortcutSpec<'_>,
    beans: &dyn BeanResolver,
) -> Result<Properties, BindError> {
    let mut properties = Properties::new();
    let mut positional = Vec::new();

    for (key, raw) in args.iter() {
        if is_generated_key(key) {
            positional.push((key, raw));
        } else {
            properties.insert(key.to_string(), resolve_value(raw, beans)?);
        }
    }

    if positional.is_empty() {
        return Ok(properties);
    }

    match spec.shortcut_type {
        ShortcutType::Disabled => {
            return Err(BindError::Shortcut(
                "positional arguments are not supported".to_string(),
            ));
        }
        ShortcutType::Default => {
            for (key, raw) in positional {
                let index = positional_index(key)?;
                let field = spec.field_order.get(index).ok_or_else(|| {
                    BindError::Shortcut(format!(
                        "positional argument {} has no field (expected at most {})",
                        index,
                        spec.field_order.len()
                    ))
                })?;
                properties.insert(field.to_string(), resolve_value(raw, beans)?);
            }
        }
        ShortcutType::GatherList => {
            let [field] = spec.field_order else {
                return Err(BindError::Shortcut(
                    "gather list requires exactly one shortcut field".to_string(),
                ));
            };
            let values = positional
                .into_iter()
                .map(|(_, raw)| resolve_value(raw, beans))
                .collect::<Result<Vec<_>, _>>()?;
            properties.insert(field.to_string(), Value::Array(values));
        }
        ShortcutType::GatherListTailFlag => {
            let [list_field, flag_field] = spec.field_order else {
                return Err(BindError::Shortcut(
                    "gather list with tail flag requires exactly two shortcut fields".to_string(),
                ));
            };
            let mut raws: Vec<&str> = positional.into_iter().map(|(_, raw)| raw).collect();
            if raws.last().is_some_and(|last| is_flag(last)) {
                if let Some(flag) = raws.pop() {
                    properties.insert(
                        flag_field.to_string(),
                        Value::Bool(flag.eq_ignore_ascii_case("true")),
                    );
                }
            }
            let values = raws
                .into_iter()
                .map(|raw| resolve_value(raw, beans))
                .collect::<Result<Vec<_>, _>>()?;
            properties.insert(list_field.to_string(), Value::Array(values));
        }
    }

    Ok(properties)
}

/// Convert `stripParts` / `strip-parts` to `strip_parts`.
fn relaxed_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        match c {
            '-' => out.push('_'),
            c if c.is_ascii_uppercase() => {
                if i > 0 && !out.ends_with('_') {
                    out.push('_');
                }
                out.push(c.to_ascii_lowercase());
            }
            c => out.push(c),
        }
    }
    out
}

fn mismatch(field: &str, expected: FieldKind, value: &Value) -> BindError {
    let value = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    BindError::TypeMismatch {
        field: field.to_string(),
        expected,
        value,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Coerce a property value into the declared field type.
fn coerce(field: &str, kind: FieldKind, value: Value) -> Result<Value, BindError> {
    match kind {
        FieldKind::Str => scalar_text(&value)
            .map(Value::String)
            .ok_or_else(|| mismatch(field, kind, &value)),
        FieldKind::Int => match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| Value::Number(i.into()))
                .map_err(|_| mismatch(field, kind, &value)),
            _ => Err(mismatch(field, kind, &value)),
        },
        FieldKind::Float => match &value {
            Value::Number(_) => Ok(value),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| mismatch(field, kind, &value)),
            _ => Err(mismatch(field, kind, &value)),
        },
        FieldKind::Bool => match &value {
            Value::Bool(_) => Ok(value),
            Value::String(s) if is_flag(s.trim()) => {
                Ok(Value::Bool(s.trim().eq_ignore_ascii_case("true")))
            }
            _ => Err(mismatch(field, kind, &value)),
        },
        FieldKind::List => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    scalar_text(item)
                        .map(Value::String)
                        .ok_or_else(|| mismatch(field, kind, item))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::String(s) => Ok(Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            )),
            other => Err(mismatch(field, kind, &other)),
        },
    }
}

/// Bind properties onto a fresh config and validate the result.
pub fn bind<C>(config: C, properties: &Properties, spec: &ShortcutSpec<'_>) -> Result<C, BindError>
where
    C: Serialize + DeserializeOwned + Validate,
{
    let mut record = match serde_json::to_value(config) {
        Ok(Value::Object(record)) => record,
        Ok(_) => return Err(BindError::NotARecord),
        Err(e) => return Err(BindError::Deserialize(e.to_string())),
    };

    for (key, value) in properties {
        let key = spec
            .prefix
            .and_then(|prefix| key.strip_prefix(prefix))
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(key.as_str());
        let name = relaxed_name(key);
        let field = spec
            .schema
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| BindError::UnknownField(key.to_string()))?;
        record.insert(name.clone(), coerce(&name, field.kind, value.clone())?);
    }

    let bound: C = serde_json::from_value(Value::Object(record))
        .map_err(|e| BindError::Deserialize(e.to_string()))?;
    bound.validate().map_err(BindError::Invalid)?;
    Ok(bound)
}

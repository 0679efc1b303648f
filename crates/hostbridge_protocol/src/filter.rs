//! Equality filters used by pull, delete and property updates.

use crate::error::{ProtocolError, ProtocolResult};
use crate::fields;
use hostbridge_codec::Value;
use std::collections::BTreeMap;

/// Something a [`FilterQuery`] can be evaluated against.
pub trait Filterable {
    /// Type name of the record.
    fn type_name(&self) -> &str;

    /// Resolves a field by name. `name`, `guid` and `tag` are built in;
    /// anything else is a property lookup.
    fn field(&self, name: &str) -> Option<Value>;
}

/// A conjunction of equality predicates, optionally restricted to one type.
///
/// An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterQuery {
    /// Restrict matches to this type.
    pub type_name: Option<String>,
    /// Field name to required value.
    pub equals: BTreeMap<String, Value>,
}

impl FilterQuery {
    /// Creates a filter matching everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a filter matching one type.
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            equals: BTreeMap::new(),
        }
    }

    /// Adds an equality predicate.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.insert(field.into(), value.into());
        self
    }

    /// Returns true if `record` satisfies every predicate.
    pub fn matches<F: Filterable + ?Sized>(&self, record: &F) -> bool {
        if let Some(type_name) = &self.type_name {
            if record.type_name() != type_name {
                return false;
            }
        }
        self.equals.iter().all(|(field, wanted)| {
            record
                .field(field)
                .is_some_and(|actual| value_matches(&actual, wanted))
        })
    }

    /// Encodes to a wire value.
    pub fn to_value(&self) -> Value {
        Value::text_map([
            ("type", Value::from(self.type_name.clone())),
            ("equals", fields::to_map_value(&self.equals)),
        ])
    }

    /// Decodes from a wire value.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        if value.as_map().is_none() {
            return Err(ProtocolError::invalid_field("filter", "a map", value));
        }
        let type_name = match value.get("type") {
            None | Some(Value::Null) => None,
            Some(Value::Text(t)) => Some(t.clone()),
            Some(other) => return Err(ProtocolError::invalid_field("type", "text", other)),
        };
        Ok(Self {
            type_name,
            equals: fields::string_map(value, "equals")?,
        })
    }
}

/// Numbers compare by value across int/float; arrays match when any item
/// matches (multi-valued fields such as tags).
fn value_matches(actual: &Value, wanted: &Value) -> bool {
    match (actual, wanted) {
        (Value::Array(items), w) if !matches!(w, Value::Array(_)) => {
            items.iter().any(|item| value_matches(item, w))
        }
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            actual.as_f64() == wanted.as_f64()
        }
        _ => actual == wanted,
    }
}

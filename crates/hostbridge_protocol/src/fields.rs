//! Field accessors for decoding map-shaped values.

use crate::error::{ProtocolError, ProtocolResult};
use hostbridge_codec::Value;
use std::collections::BTreeMap;

pub(crate) fn required<'a>(map: &'a Value, field: &'static str) -> ProtocolResult<&'a Value> {
    if map.as_map().is_none() {
        return Err(ProtocolError::invalid_field(field, "a map entry", map));
    }
    map.get(field).ok_or(ProtocolError::MissingField { field })
}

pub(crate) fn text(map: &Value, field: &'static str) -> ProtocolResult<String> {
    let value = required(map, field)?;
    value
        .as_text()
        .map(str::to_string)
        .ok_or_else(|| ProtocolError::invalid_field(field, "text", value))
}

pub(crate) fn integer(map: &Value, field: &'static str) -> ProtocolResult<i64> {
    let value = required(map, field)?;
    value
        .as_integer()
        .ok_or_else(|| ProtocolError::invalid_field(field, "an integer", value))
}

#[allow(clippy::cast_sign_loss)]
pub(crate) fn unsigned(map: &Value, field: &'static str) -> ProtocolResult<u64> {
    let value = required(map, field)?;
    match value.as_integer() {
        Some(n) if n >= 0 => Ok(n as u64),
        _ => Err(ProtocolError::invalid_field(field, "a non-negative integer", value)),
    }
}

pub(crate) fn array<'a>(map: &'a Value, field: &'static str) -> ProtocolResult<&'a [Value]> {
    let value = required(map, field)?;
    value
        .as_array()
        .ok_or_else(|| ProtocolError::invalid_field(field, "an array", value))
}

/// Optional text-keyed map; absent means empty.
pub(crate) fn string_map(
    map: &Value,
    field: &'static str,
) -> ProtocolResult<BTreeMap<String, Value>> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(value @ Value::Map(_)) => Ok(value
            .text_entries()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()),
        Some(other) => Err(ProtocolError::invalid_field(field, "a map", other)),
    }
}

pub(crate) fn to_map_value(map: &BTreeMap<String, Value>) -> Value {
    Value::text_map(map.iter().map(|(k, v)| (k.clone(), v.clone())))
}

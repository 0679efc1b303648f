//! JSON representation of objects and values at the command line.

use hostbridge_protocol::{DomainObject, NativeId, Value};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number};
use std::path::Path;
use uuid::Uuid;

/// An object as written in JSON input files and printed by `pull`.
///
/// ```json
/// {"type": "Wall", "name": "W1", "properties": {"height": 3.0}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSpec {
    /// Object type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Display name.
    pub name: String,
    /// Stable identity; a fresh one is assigned when missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<Uuid>,
    /// Host native id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<NativeId>,
    /// Tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Mapped properties.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, serde_json::Value>,
    /// Custom data.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, serde_json::Value>,
    /// Container flag; implied by a non-empty member list.
    #[serde(default, skip_serializing_if = "is_false")]
    pub container: bool,
    /// Container members.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<ObjectSpec>,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl ObjectSpec {
    /// Converts into a domain object.
    pub fn into_domain(self) -> DomainObject {
        let mut object = DomainObject::new(self.type_name, self.name);
        if let Some(guid) = self.guid {
            object.guid = guid;
        }
        object.host_id = self.host_id;
        object.tags = self.tags.into_iter().collect();
        object.properties = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), from_json(v)))
            .collect();
        object.custom_data = self
            .custom
            .iter()
            .map(|(k, v)| (k.clone(), from_json(v)))
            .collect();
        object.container = self.container || !self.members.is_empty();
        object.members = self.members.into_iter().map(Self::into_domain).collect();
        object
    }

    /// Converts from a domain object.
    pub fn from_domain(object: &DomainObject) -> Self {
        Self {
            type_name: object.type_name.clone(),
            name: object.name.clone(),
            guid: Some(object.guid),
            host_id: object.host_id,
            tags: object.tags.iter().cloned().collect(),
            properties: object
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
            custom: object
                .custom_data
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
            container: object.container,
            members: object.members.iter().map(Self::from_domain).collect(),
        }
    }
}

/// Reads an array of objects from a JSON file.
pub fn read_objects(path: &Path) -> Result<Vec<DomainObject>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let specs: Vec<ObjectSpec> = serde_json::from_str(&text)?;
    Ok(specs.into_iter().map(ObjectSpec::into_domain).collect())
}

/// Parses a command-line value as JSON, falling back to plain text.
pub fn parse_value(text: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(json) => from_json(&json),
        Err(_) => Value::Text(text.to_string()),
    }
}

/// Converts JSON into a wire value. Integral numbers become integers.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            Value::text_map(map.iter().map(|(k, v)| (k.clone(), from_json(v))))
        }
    }
}

/// Converts a wire value into JSON. Byte strings become arrays of numbers
/// and maps with non-text keys use the keys' JSON text.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Bytes(bytes) => {
            serde_json::Value::Array(bytes.iter().map(|b| (*b).into()).collect())
        }
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Map(pairs) => serde_json::Value::Object(
            pairs
                .iter()
                .map(|(k, v)| {
                    let key = match k {
                        Value::Text(s) => s.clone(),
                        other => to_json(other).to_string(),
                    };
                    (key, to_json(v))
                })
                .collect(),
        ),
    }
}

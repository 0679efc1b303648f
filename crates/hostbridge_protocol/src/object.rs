//! Domain objects and their external identity.

use crate::error::{ProtocolError, ProtocolResult};
use crate::fields;
use crate::filter::Filterable;
use hostbridge_codec::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// Identifier the host assigns to an entity when it is created.
///
/// Native ids are only stable while the host document stays open.
pub type NativeId = i64;

/// The identity of a domain object as seen by both sides of the bridge.
///
/// `guid` is assigned by the client and survives round-trips; `host_id` is
/// assigned by the host on creation and may change when the document is
/// reopened.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalId {
    /// Stable client-assigned identifier.
    pub guid: Uuid,
    /// Host native id, once the object has been created on the host.
    pub host_id: Option<NativeId>,
}

impl ExternalId {
    /// Creates an identity with no host id yet.
    pub fn new(guid: Uuid) -> Self {
        Self {
            guid,
            host_id: None,
        }
    }
}

impl fmt::Debug for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host_id {
            Some(id) => write!(f, "ExternalId({}, #{id})", self.guid),
            None => write!(f, "ExternalId({}, unplaced)", self.guid),
        }
    }
}

/// An object of the client's object model, pushed to or pulled from the host.
///
/// Containers group other objects as members (an assembly of beams, say);
/// the host must have committed every member before the container itself
/// can be created.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainObject {
    /// Stable external identity.
    pub guid: Uuid,
    /// Host native id, if known.
    pub host_id: Option<NativeId>,
    /// Object type, used to pick the element adapter on the host.
    pub type_name: String,
    /// Display name.
    pub name: String,
    /// Free-form tags; pushes add their tag here.
    pub tags: BTreeSet<String>,
    /// Mapped properties.
    pub properties: BTreeMap<String, Value>,
    /// Extra fields copied onto host entities when configured.
    pub custom_data: BTreeMap<String, Value>,
    /// Whether this object is a container.
    pub container: bool,
    /// Members of a container.
    pub members: Vec<DomainObject>,
}

impl DomainObject {
    /// Creates a plain object with a fresh identity.
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            guid: Uuid::new_v4(),
            host_id: None,
            type_name: type_name.into(),
            name: name.into(),
            tags: BTreeSet::new(),
            properties: BTreeMap::new(),
            custom_data: BTreeMap::new(),
            container: false,
            members: Vec::new(),
        }
    }

    /// Creates a container grouping `members`.
    pub fn container(
        type_name: impl Into<String>,
        name: impl Into<String>,
        members: Vec<DomainObject>,
    ) -> Self {
        Self {
            container: true,
            members,
            ..Self::new(type_name, name)
        }
    }

    /// Sets the stable identity.
    pub fn with_guid(mut self, guid: Uuid) -> Self {
        self.guid = guid;
        self
    }

    /// Sets a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Sets a custom data field.
    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_data.insert(key.into(), value.into());
        self
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Returns the external identity.
    pub fn identity(&self) -> ExternalId {
        ExternalId {
            guid: self.guid,
            host_id: self.host_id,
        }
    }

    /// Returns true if this object groups members.
    pub fn is_container(&self) -> bool {
        self.container
    }

    /// Encodes to a wire value.
    pub fn to_value(&self) -> Value {
        Value::text_map([
            ("guid", Value::Bytes(self.guid.as_bytes().to_vec())),
            ("host_id", Value::from(self.host_id)),
            ("type", Value::from(self.type_name.as_str())),
            ("name", Value::from(self.name.as_str())),
            ("tags", Value::array(self.tags.iter().map(String::as_str))),
            ("properties", fields::to_map_value(&self.properties)),
            ("custom", fields::to_map_value(&self.custom_data)),
            ("container", Value::Bool(self.container)),
            (
                "members",
                Value::Array(self.members.iter().map(Self::to_value).collect()),
            ),
        ])
    }

    /// Decodes from a wire value.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        let guid_value = fields::required(value, "guid")?;
        let guid = guid_value
            .as_bytes()
            .and_then(|b| Uuid::from_slice(b).ok())
            .ok_or_else(|| ProtocolError::invalid_field("guid", "16 bytes", guid_value))?;

        let host_id = match value.get("host_id") {
            None | Some(Value::Null) => None,
            Some(Value::Integer(n)) => Some(*n),
            Some(other) => return Err(ProtocolError::invalid_field("host_id", "an integer", other)),
        };

        let tags = match value.get("tags") {
            None => BTreeSet::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|t| {
                    t.as_text()
                        .map(str::to_string)
                        .ok_or_else(|| ProtocolError::invalid_field("tags", "text items", t))
                })
                .collect::<ProtocolResult<_>>()?,
            Some(other) => return Err(ProtocolError::invalid_field("tags", "an array", other)),
        };

        let members = match value.get("members") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(Self::from_value)
                .collect::<ProtocolResult<_>>()?,
            Some(other) => return Err(ProtocolError::invalid_field("members", "an array", other)),
        };

        Ok(Self {
            guid,
            host_id,
            type_name: fields::text(value, "type")?,
            name: fields::text(value, "name")?,
            tags,
            properties: fields::string_map(value, "properties")?,
            custom_data: fields::string_map(value, "custom")?,
            container: value
                .get("container")
                .and_then(Value::as_bool)
                .unwrap_or(!members.is_empty()),
            members,
        })
    }
}

impl Filterable for DomainObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(Value::from(self.name.as_str())),
            "guid" => Some(Value::from(self.guid.to_string())),
            "tag" => Some(Value::array(self.tags.iter().map(String::as_str))),
            other => self.properties.get(other).cloned(),
        }
    }
}

//! Host-native entities.

use hostbridge_protocol::{ExternalId, Filterable, NativeId, Value};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// An entity as stored in the host document.
#[derive(Debug, Clone, PartialEq)]
pub struct HostEntity {
    /// Id assigned by the host on insert; 0 until then.
    pub native_id: NativeId,
    /// Stable identity of the domain object this entity was created from.
    /// Entities created by other means have none.
    pub guid: Option<Uuid>,
    /// Type name.
    pub type_name: String,
    /// Display name.
    pub name: String,
    /// Tags.
    pub tags: BTreeSet<String>,
    /// Properties.
    pub properties: BTreeMap<String, Value>,
    /// Whether this entity groups members.
    pub container: bool,
    /// Native ids of the members of a container.
    pub members: Vec<NativeId>,
}

impl HostEntity {
    /// Creates an entity that has not been inserted yet.
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            native_id: 0,
            guid: None,
            type_name: type_name.into(),
            name: name.into(),
            tags: BTreeSet::new(),
            properties: BTreeMap::new(),
            container: false,
            members: Vec::new(),
        }
    }

    /// Sets the stable identity.
    pub fn with_guid(mut self, guid: Uuid) -> Self {
        self.guid = Some(guid);
        self
    }

    /// Sets a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// External identity of this entity, if it has a stable guid.
    pub fn identity(&self) -> Option<ExternalId> {
        self.guid.map(|guid| ExternalId {
            guid,
            host_id: Some(self.native_id),
        })
    }
}

impl Filterable for HostEntity {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(Value::from(self.name.as_str())),
            "guid" => self.guid.map(|g| Value::from(g.to_string())),
            "tag" => Some(Value::array(self.tags.iter().map(String::as_str))),
            "host_id" => Some(Value::Integer(self.native_id)),
            other => self.properties.get(other).cloned(),
        }
    }
}

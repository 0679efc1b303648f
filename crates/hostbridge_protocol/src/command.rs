//! Command envelopes and their per-kind arguments.

use crate::error::{ProtocolError, ProtocolResult};
use crate::fields;
use crate::filter::FilterQuery;
use crate::object::DomainObject;
use crate::push::{PushConfig, PushType};
use hostbridge_codec::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of command an envelope carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Liveness probe, no payload.
    ConnectionCheck,
    /// Push domain objects to the host.
    Push,
    /// Read domain objects from the host.
    Pull,
    /// Delete host entities.
    Delete,
    /// Set one property on host entities.
    UpdateProperty,
}

impl CommandKind {
    /// Wire code of this kind.
    pub fn code(self) -> i64 {
        match self {
            CommandKind::ConnectionCheck => 1,
            CommandKind::Push => 2,
            CommandKind::Pull => 3,
            CommandKind::Delete => 4,
            CommandKind::UpdateProperty => 5,
        }
    }

    /// Kind for a wire code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(CommandKind::ConnectionCheck),
            2 => Some(CommandKind::Push),
            3 => Some(CommandKind::Pull),
            4 => Some(CommandKind::Delete),
            5 => Some(CommandKind::UpdateProperty),
            _ => None,
        }
    }

    /// True for kinds that mutate the host document.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            CommandKind::Push | CommandKind::Delete | CommandKind::UpdateProperty
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommandKind::ConnectionCheck => "ConnectionCheck",
            CommandKind::Push => "Push",
            CommandKind::Pull => "Pull",
            CommandKind::Delete => "Delete",
            CommandKind::UpdateProperty => "UpdateProperty",
        })
    }
}

/// A command sent from the client to the host.
///
/// The kind is fixed at construction; the payload layout depends on it.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEnvelope {
    /// Id matching this command to its result package.
    pub correlation_id: u64,
    kind: CommandKind,
    /// Ordered payload values.
    pub payload: Vec<Value>,
    /// Free-form tag; pushes add it to every object.
    pub tag: String,
    /// Configuration options.
    pub config: BTreeMap<String, Value>,
}

impl CommandEnvelope {
    fn new(kind: CommandKind, payload: Vec<Value>) -> Self {
        Self {
            correlation_id: 0,
            kind,
            payload,
            tag: String::new(),
            config: BTreeMap::new(),
        }
    }

    /// Creates a liveness probe.
    pub fn connection_check() -> Self {
        Self::new(CommandKind::ConnectionCheck, Vec::new())
    }

    /// Creates a push of `objects`.
    pub fn push(
        objects: &[DomainObject],
        push_type: PushType,
        tag: impl Into<String>,
        config: Option<PushConfig>,
    ) -> Self {
        let objects = Value::Array(objects.iter().map(DomainObject::to_value).collect());
        let mut envelope = Self::new(
            CommandKind::Push,
            vec![objects, Value::from(push_type.as_str())],
        );
        envelope.tag = tag.into();
        if let Some(config) = config {
            envelope.config = config.to_config();
        }
        envelope
    }

    /// Creates a pull of everything matching `filter`.
    pub fn pull(filter: &FilterQuery) -> Self {
        Self::new(CommandKind::Pull, vec![filter.to_value()])
    }

    /// Creates a delete of everything matching `filter`.
    pub fn delete(filter: &FilterQuery) -> Self {
        Self::new(CommandKind::Delete, vec![filter.to_value()])
    }

    /// Creates a property update on everything matching `filter`.
    pub fn update_property(
        filter: &FilterQuery,
        property: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::new(
            CommandKind::UpdateProperty,
            vec![
                filter.to_value(),
                Value::Text(property.into()),
                value.into(),
            ],
        )
    }

    /// Sets the correlation id.
    pub fn with_correlation_id(mut self, id: u64) -> Self {
        self.correlation_id = id;
        self
    }

    /// Kind of this command.
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Parses the payload into typed arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not have the shape required by
    /// the kind.
    pub fn args(&self) -> ProtocolResult<CommandArgs> {
        CommandArgs::parse(self)
    }

    /// Encodes to a wire value.
    #[allow(clippy::cast_possible_wrap)]
    pub fn to_value(&self) -> Value {
        Value::text_map([
            ("id", Value::Integer(self.correlation_id as i64)),
            ("kind", Value::Integer(self.kind.code())),
            ("payload", Value::Array(self.payload.clone())),
            ("tag", Value::from(self.tag.as_str())),
            ("config", fields::to_map_value(&self.config)),
        ])
    }

    /// Decodes from a wire value.
    ///
    /// # Errors
    ///
    /// An unknown kind yields [`ProtocolError::UnknownKind`] carrying the
    /// correlation id, so the receiver can still answer.
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        let correlation_id = fields::unsigned(value, "id")?;
        let code = fields::integer(value, "kind")?;
        let kind = CommandKind::from_code(code).ok_or(ProtocolError::UnknownKind {
            code,
            correlation_id,
        })?;
        let tag = match value.get("tag") {
            None | Some(Value::Null) => String::new(),
            Some(_) => fields::text(value, "tag")?,
        };
        Ok(Self {
            correlation_id,
            kind,
            payload: fields::array(value, "payload")?.to_vec(),
            tag,
            config: fields::string_map(value, "config")?,
        })
    }
}

/// Typed arguments of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandArgs {
    /// Liveness probe.
    ConnectionCheck,
    /// Push arguments.
    Push {
        /// Objects to push.
        objects: Vec<DomainObject>,
        /// Requested push type.
        push_type: PushType,
    },
    /// Pull arguments.
    Pull {
        /// Which objects to read.
        filter: FilterQuery,
    },
    /// Delete arguments.
    Delete {
        /// Which objects to delete.
        filter: FilterQuery,
    },
    /// Property update arguments.
    UpdateProperty {
        /// Which objects to change.
        filter: FilterQuery,
        /// Property to set.
        property: String,
        /// New value.
        value: Value,
    },
}

impl CommandArgs {
    /// Parses the payload of `envelope` according to its kind.
    pub fn parse(envelope: &CommandEnvelope) -> ProtocolResult<Self> {
        let payload = &envelope.payload;
        match envelope.kind {
            CommandKind::ConnectionCheck => Ok(CommandArgs::ConnectionCheck),
            CommandKind::Push => {
                let objects = slot(payload, 0, "objects")?;
                let objects = objects
                    .as_array()
                    .ok_or_else(|| ProtocolError::invalid_field("objects", "an array", objects))?
                    .iter()
                    .map(DomainObject::from_value)
                    .collect::<ProtocolResult<_>>()?;
                let push_type = match payload.get(1) {
                    None | Some(Value::Null) => PushType::AdapterDefault,
                    Some(Value::Text(name)) => name.parse()?,
                    Some(other) => {
                        return Err(ProtocolError::invalid_field("push_type", "text", other))
                    }
                };
                Ok(CommandArgs::Push { objects, push_type })
            }
            CommandKind::Pull => Ok(CommandArgs::Pull {
                filter: FilterQuery::from_value(slot(payload, 0, "filter")?)?,
            }),
            CommandKind::Delete => Ok(CommandArgs::Delete {
                filter: FilterQuery::from_value(slot(payload, 0, "filter")?)?,
            }),
            CommandKind::UpdateProperty => {
                let property = slot(payload, 1, "property")?;
                Ok(CommandArgs::UpdateProperty {
                    filter: FilterQuery::from_value(slot(payload, 0, "filter")?)?,
                    property: property
                        .as_text()
                        .ok_or_else(|| ProtocolError::invalid_field("property", "text", property))?
                        .to_string(),
                    value: slot(payload, 2, "value")?.clone(),
                })
            }
        }
    }
}

fn slot<'a>(payload: &'a [Value], index: usize, field: &'static str) -> ProtocolResult<&'a Value> {
    payload.get(index).ok_or(ProtocolError::MissingField { field })
}

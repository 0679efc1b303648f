//! Top-level wire messages.

use crate::command::CommandEnvelope;
use crate::error::{ProtocolError, ProtocolResult};
use crate::fields;
use crate::result::ResultPackage;
use hostbridge_codec::{from_cbor, to_cbor, Value};

/// Anything travelling over a link.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// Client to host.
    Command(CommandEnvelope),
    /// Host to client.
    Result(ResultPackage),
}

impl WireMessage {
    /// Encodes to CBOR bytes, ready for framing.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        let (kind, body) = match self {
            WireMessage::Command(envelope) => ("command", envelope.to_value()),
            WireMessage::Result(package) => ("result", package.to_value()),
        };
        Ok(to_cbor(&Value::text_map([
            ("type", Value::from(kind)),
            ("body", body),
        ]))?)
    }

    /// Decodes from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let value = from_cbor(bytes)?;
        let body = fields::required(&value, "body")?;
        match fields::text(&value, "type")?.as_str() {
            "command" => Ok(WireMessage::Command(CommandEnvelope::from_value(body)?)),
            "result" => Ok(WireMessage::Result(ResultPackage::from_value(body)?)),
            _ => Err(ProtocolError::invalid_field(
                "type",
                "\"command\" or \"result\"",
                fields::required(&value, "type")?,
            )),
        }
    }

    /// Correlation id of the wrapped message.
    pub fn correlation_id(&self) -> u64 {
        match self {
            WireMessage::Command(envelope) => envelope.correlation_id,
            WireMessage::Result(package) => package.correlation_id,
        }
    }
}

impl From<CommandEnvelope> for WireMessage {
    fn from(envelope: CommandEnvelope) -> Self {
        WireMessage::Command(envelope)
    }
}

impl From<ResultPackage> for WireMessage {
    fn from(package: ResultPackage) -> Self {
        WireMessage::Result(package)
    }
}

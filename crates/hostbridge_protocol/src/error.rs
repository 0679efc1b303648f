//! Error types for the protocol crate.

use crate::push::PushType;
use hostbridge_codec::CodecError;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building, encoding or decoding protocol messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Underlying value codec failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A required field is absent.
    #[error("missing field `{field}`")]
    MissingField {
        /// Field name.
        field: &'static str,
    },

    /// A field is present but has the wrong shape.
    #[error("field `{field}` should be {expected}, got {actual}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Expected shape.
        expected: &'static str,
        /// Shape actually received.
        actual: String,
    },

    /// The envelope carries a command kind this protocol does not define.
    #[error("unknown command kind {code} (correlation id {correlation_id})")]
    UnknownKind {
        /// Raw kind code.
        code: i64,
        /// Correlation id of the rejected envelope.
        correlation_id: u64,
    },

    /// Unrecognised push type name.
    #[error("unknown push type `{0}`")]
    UnknownPushType(String),

    /// The push type is valid on the wire but not supported by the host.
    #[error("push type {0} is not supported")]
    UnsupportedIntent(PushType),

    /// Frame length field is smaller than the frame header.
    #[error("frame length {0} is smaller than the header")]
    FrameTooShort(u32),

    /// Body does not fit the 32-bit length field.
    #[error("frame body of {0} bytes exceeds the length field")]
    FrameTooLarge(usize),

    /// Frame carries an unknown framing version.
    #[error("unsupported frame version {0}")]
    UnsupportedVersion(u16),

    /// Stream ended in the middle of a frame.
    #[error("stream ended inside a frame ({buffered} bytes buffered)")]
    TruncatedFrame {
        /// Bytes of the partial frame.
        buffered: usize,
    },
}

impl ProtocolError {
    /// Create an invalid field error from the offending value.
    pub fn invalid_field(
        field: &'static str,
        expected: &'static str,
        actual: &hostbridge_codec::Value,
    ) -> Self {
        Self::InvalidField {
            field,
            expected,
            actual: actual.type_name().to_string(),
        }
    }
}

//! # Hostbridge Protocol
//!
//! Messages exchanged between an automation client and a host application.
//!
//! The client sends [`CommandEnvelope`]s; the host answers each with a
//! [`ResultPackage`] carrying the result data and the [`Event`]s captured
//! while the command ran. Both travel as [`WireMessage`]s inside
//! length-prefixed frames (see [`frame`]).
//!
//! ## Commands
//!
//! | Kind | Payload |
//! |------|---------|
//! | `ConnectionCheck` | empty |
//! | `Push` | objects, push type |
//! | `Pull` | filter |
//! | `Delete` | filter |
//! | `UpdateProperty` | filter, property, value |

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod error;
mod fields;
mod filter;
mod message;
mod object;
mod push;
mod result;

pub mod frame;

pub use command::{CommandArgs, CommandEnvelope, CommandKind};
pub use error::{ProtocolError, ProtocolResult};
pub use filter::{FilterQuery, Filterable};
pub use frame::{encode_frame, FrameDecoder, FRAME_VERSION};
pub use message::WireMessage;
pub use object::{DomainObject, ExternalId, NativeId};
pub use push::{PushConfig, PushIntent, PushType, COPY_CUSTOM_DATA, SUPPRESS_FAILURE_MESSAGES};
pub use result::{Event, ResultPackage, Severity};

pub use hostbridge_codec::{from_cbor, to_cbor, Value};

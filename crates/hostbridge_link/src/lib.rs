//! # Hostbridge Link
//!
//! The client half of the bridge.
//!
//! - [`Link`]: ordered, framed byte channel ([`MemoryLink`], [`TcpLink`])
//! - [`CallGate`]: sends one command and blocks for its correlated result,
//!   probing the host first
//! - [`HostAdapter`]: typed push/pull/delete/update calls, routed through a
//!   gate or straight into an in-process [`LocalHost`]
//! - [`EventSink`]: where host events are replayed once a call completes
//!
//! Two links make a connection: commands travel client to host on the push
//! channel, results travel back on the pull channel.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod config;
mod error;
mod gate;
mod link;
mod memory;
mod replay;
mod tcp;

pub use adapter::{HostAdapter, LocalHost};
pub use config::{ConnectionSettings, DEFAULT_PULL_PORT, DEFAULT_PUSH_PORT};
pub use error::{BridgeError, BridgeResult, LinkError, LinkResult};
pub use gate::CallGate;
pub use link::{FrameHandler, Link};
pub use memory::MemoryLink;
pub use replay::{replay, EventSink, MemorySink, TracingSink};
pub use tcp::TcpLink;

//! # Hostbridge Host
//!
//! The host half of the bridge: everything that runs inside the process
//! owning the live document.
//!
//! - [`Workspace`]: the document, its transactions and its failure prompts
//! - [`PushEngine`]: reconciles pushed objects against live entities
//! - [`ElementAdapter`]: per-type conversion, looked up in an [`AdapterRegistry`]
//! - [`RefCache`]: per-call dedup of converted objects
//! - [`Dispatcher`]: validates and routes commands, implements [`LocalHost`]
//! - [`HostServer`]: serves a dispatcher over a pair of links
//!
//! ## Example
//!
//! ```
//! use hostbridge_host::{Dispatcher, MemoryWorkspace};
//! use hostbridge_protocol::{CommandEnvelope, DomainObject, PushType};
//! use std::sync::Arc;
//!
//! let workspace = Arc::new(MemoryWorkspace::new());
//! let dispatcher = Dispatcher::new(workspace.clone());
//!
//! let wall = DomainObject::new("Wall", "W1");
//! let package = dispatcher.execute(CommandEnvelope::push(
//!     &[wall],
//!     PushType::CreateOnly,
//!     "",
//!     None,
//! ));
//! assert_eq!(package.data.len(), 1);
//! assert_eq!(workspace.len(), 1);
//! ```
//!
//! [`LocalHost`]: hostbridge_link::LocalHost

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod cache;
mod context;
mod dispatcher;
mod entity;
mod error;
mod events;
mod memory;
mod reconcile;
mod server;
mod workspace;

pub use adapter::{
    AdapterRegistry, ElementAdapter, GenericElementAdapter, CUSTOM_PREFIX, GROUP_NAME_PROPERTY,
};
pub use cache::{CacheKey, CacheValue, RefCache};
pub use context::CallContext;
pub use dispatcher::{Dispatcher, DEFAULT_CONFIG_NOTE};
pub use entity::HostEntity;
pub use error::{HostError, HostResult};
pub use events::EventLog;
pub use memory::{JournalEntry, MemoryWorkspace};
pub use reconcile::{Outcome, PushEngine, INVALID_INPUT};
pub use server::HostServer;
pub use workspace::{ensure_ready, FailureSuppression, TransactionScope, Workspace};

//! # Hostbridge Testkit
//!
//! Test utilities for hostbridge.
//!
//! This crate provides:
//! - Fixtures wiring a client to an in-memory host over memory links, TCP,
//!   or the in-process bypass
//! - Property-based test generators using proptest
//! - Journal helpers for checking transaction boundaries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hostbridge_testkit::prelude::*;
//!
//! #[test]
//! fn pushes_reach_the_host() {
//!     let bridge = TestBridge::memory();
//!     bridge.adapter.push(&[DomainObject::new("Wall", "W1")], PushType::CreateOnly, "", None);
//!     assert_eq!(bridge.workspace.len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use hostbridge_host::{HostEntity, JournalEntry, MemoryWorkspace, Workspace};
    pub use hostbridge_link::{ConnectionSettings, MemorySink};
    pub use hostbridge_protocol::{
        DomainObject, Event, FilterQuery, PushConfig, PushType, Severity, Value,
    };
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;

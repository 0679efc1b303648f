//! State owned by one top-level call.

use crate::cache::RefCache;
use crate::events::EventLog;
use hostbridge_protocol::PushConfig;

/// Everything a call accumulates while it runs: its dedup cache, its event
/// log and the push options it was issued with.
///
/// Built when a command arrives, passed by `&mut` through the handlers and
/// element adapters, and dropped when the result package is sent.
#[derive(Debug, Default)]
pub struct CallContext {
    /// Dedup cache for this call.
    pub cache: RefCache,
    /// Events raised by this call.
    pub events: EventLog,
    /// Push options.
    pub config: PushConfig,
    /// Push tag; empty when the command carries none.
    pub tag: String,
}

impl CallContext {
    /// Creates a context with default push options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context for a push.
    pub fn for_push(config: PushConfig, tag: impl Into<String>) -> Self {
        Self {
            config,
            tag: tag.into(),
            ..Self::default()
        }
    }
}

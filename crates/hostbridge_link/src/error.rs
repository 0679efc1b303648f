//! Error types for links and the call gate.

use hostbridge_protocol::{CommandKind, ProtocolError};
use std::time::Duration;
use thiserror::Error;

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Result type for bridge calls.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised by a [`Link`](crate::Link).
#[derive(Error, Debug)]
pub enum LinkError {
    /// The link was closed by either side.
    #[error("link closed")]
    Closed,

    /// A receive handler is already registered.
    #[error("a receive handler is already registered")]
    HandlerAlreadySet,

    /// A host link has no connected peer to send to.
    #[error("no peer connected")]
    NoPeer,

    /// Socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error.
    #[error("framing error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Errors raised by a bridge call.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host did not answer the connection probe.
    #[error("host did not answer the connection check within {waited:?}")]
    Connectivity {
        /// How long the probe waited.
        waited: Duration,
    },

    /// The host did not answer the command within its deadline.
    #[error("{kind} command timed out after {waited:?}")]
    Timeout {
        /// Command that timed out.
        kind: CommandKind,
        /// How long the call waited.
        waited: Duration,
    },

    /// The link failed.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// A message could not be built or read.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The response did not have the shape the command expects.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl BridgeError {
    /// Returns true for errors caused by the host not answering in time.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            BridgeError::Connectivity { .. } | BridgeError::Timeout { .. }
        )
    }

    /// Returns true if retrying the call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Connectivity { .. } | BridgeError::Timeout { .. } => true,
            BridgeError::Link(LinkError::Io(_) | LinkError::NoPeer) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_classification() {
        let probe = BridgeError::Connectivity {
            waited: Duration::from_secs(5),
        };
        let deadline = BridgeError::Timeout {
            kind: CommandKind::Push,
            waited: Duration::from_secs(600),
        };
        assert!(probe.is_timeout());
        assert!(deadline.is_timeout());
        assert!(deadline.is_retryable());
        assert!(!BridgeError::Link(LinkError::Closed).is_timeout());
        assert!(!BridgeError::Link(LinkError::Closed).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = BridgeError::Timeout {
            kind: CommandKind::Pull,
            waited: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "Pull command timed out after 250ms");
    }
}

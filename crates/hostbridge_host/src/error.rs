//! Error types for the host side.

use hostbridge_link::LinkError;
use hostbridge_protocol::{NativeId, ProtocolError};
use thiserror::Error;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors raised while executing commands on the host.
#[derive(Error, Debug)]
pub enum HostError {
    /// No document is open.
    #[error("no document is open")]
    NotOpen,

    /// The document cannot be modified.
    #[error("document is read-only")]
    ReadOnly,

    /// A transaction is already running.
    #[error("another transaction is in progress")]
    TransactionActive,

    /// A write was attempted outside a transaction.
    #[error("no transaction is active")]
    NoTransaction,

    /// The host refused to commit a transaction.
    #[error("commit of `{transaction}` failed: {reason}")]
    CommitFailed {
        /// Transaction name.
        transaction: String,
        /// Reason given by the host.
        reason: String,
    },

    /// The referenced entity does not exist.
    #[error("entity #{native_id} not found")]
    EntityNotFound {
        /// Native id that was looked up.
        native_id: NativeId,
    },

    /// No element adapter handles this type.
    #[error("no element adapter registered for type `{type_name}`")]
    NoAdapter {
        /// Requested type.
        type_name: String,
    },

    /// An element adapter could not convert an object.
    #[error("conversion failed: {message}")]
    Conversion {
        /// What went wrong.
        message: String,
    },

    /// A command could not be decoded or answered.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The response link failed.
    #[error("link error: {0}")]
    Link(#[from] LinkError),
}

impl HostError {
    /// Creates a conversion error.
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    /// Returns true if the document state prevents the command from running
    /// at all.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            HostError::NotOpen | HostError::ReadOnly | HostError::TransactionActive
        )
    }
}

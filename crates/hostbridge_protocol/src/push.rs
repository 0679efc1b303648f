//! Push intents and push configuration.

use crate::error::{ProtocolError, ProtocolResult};
use hostbridge_codec::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Config key for failure-message suppression.
pub const SUPPRESS_FAILURE_MESSAGES: &str = "SuppressFailureMessages";
/// Config key for custom data copying.
pub const COPY_CUSTOM_DATA: &str = "CopyCustomData";

/// Push type as exposed to callers and carried on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PushType {
    /// Let the host pick; resolves to [`PushIntent::UpdateOrCreateOnly`].
    #[default]
    AdapterDefault,
    /// Full synchronisation. Not supported.
    FullPush,
    /// Create objects that do not exist yet.
    CreateOnly,
    /// Create objects that do not exist yet; existing ones are left alone.
    CreateNonExisting,
    /// Update existing objects only.
    UpdateOnly,
    /// Delete existing objects and create them afresh.
    DeleteThenCreate,
    /// Update existing objects, create missing ones.
    UpdateOrCreateOnly,
}

impl PushType {
    /// All push types, in wire order.
    pub const ALL: [PushType; 7] = [
        PushType::AdapterDefault,
        PushType::FullPush,
        PushType::CreateOnly,
        PushType::CreateNonExisting,
        PushType::UpdateOnly,
        PushType::DeleteThenCreate,
        PushType::UpdateOrCreateOnly,
    ];

    /// Wire name of this push type.
    pub fn as_str(self) -> &'static str {
        match self {
            PushType::AdapterDefault => "AdapterDefault",
            PushType::FullPush => "FullPush",
            PushType::CreateOnly => "CreateOnly",
            PushType::CreateNonExisting => "CreateNonExisting",
            PushType::UpdateOnly => "UpdateOnly",
            PushType::DeleteThenCreate => "DeleteThenCreate",
            PushType::UpdateOrCreateOnly => "UpdateOrCreateOnly",
        }
    }

    /// Resolves to the intent the reconciliation engine executes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnsupportedIntent`] for `FullPush`.
    pub fn resolve(self) -> ProtocolResult<PushIntent> {
        match self {
            PushType::AdapterDefault | PushType::UpdateOrCreateOnly => {
                Ok(PushIntent::UpdateOrCreateOnly)
            }
            PushType::CreateOnly => Ok(PushIntent::CreateOnly),
            PushType::CreateNonExisting => Ok(PushIntent::CreateNonExisting),
            PushType::UpdateOnly => Ok(PushIntent::UpdateOnly),
            PushType::DeleteThenCreate => Ok(PushIntent::DeleteThenCreate),
            PushType::FullPush => Err(ProtocolError::UnsupportedIntent(self)),
        }
    }
}

impl fmt::Display for PushType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PushType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PushType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownPushType(s.to_string()))
    }
}

/// A push type the host can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushIntent {
    /// Create when absent, skip when present.
    CreateOnly,
    /// Create when absent, skip when present.
    CreateNonExisting,
    /// Update when present, skip when absent.
    UpdateOnly,
    /// Delete then create when present, create when absent.
    DeleteThenCreate,
    /// Update when present (falling back to delete-then-create), create when absent.
    UpdateOrCreateOnly,
}

impl fmt::Display for PushIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PushIntent::CreateOnly => "CreateOnly",
            PushIntent::CreateNonExisting => "CreateNonExisting",
            PushIntent::UpdateOnly => "UpdateOnly",
            PushIntent::DeleteThenCreate => "DeleteThenCreate",
            PushIntent::UpdateOrCreateOnly => "UpdateOrCreateOnly",
        };
        f.write_str(name)
    }
}

/// Options recognised by a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConfig {
    /// Auto-dismiss host validation prompts while the push runs.
    pub suppress_failure_messages: bool,
    /// Copy custom data fields onto host entities.
    pub copy_custom_data: bool,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            suppress_failure_messages: true,
            copy_custom_data: true,
        }
    }
}

impl PushConfig {
    /// Sets failure-message suppression.
    pub fn with_suppress_failure_messages(mut self, suppress: bool) -> Self {
        self.suppress_failure_messages = suppress;
        self
    }

    /// Sets custom data copying.
    pub fn with_copy_custom_data(mut self, copy: bool) -> Self {
        self.copy_custom_data = copy;
        self
    }

    /// Writes this configuration as an envelope config map.
    pub fn to_config(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([
            (
                SUPPRESS_FAILURE_MESSAGES.to_string(),
                Value::Bool(self.suppress_failure_messages),
            ),
            (COPY_CUSTOM_DATA.to_string(), Value::Bool(self.copy_custom_data)),
        ])
    }

    /// Reads a configuration from an envelope config map.
    ///
    /// Returns `None` when the map carries neither option, so the caller
    /// can report the fallback to defaults. A single missing option takes
    /// its default silently.
    ///
    /// # Errors
    ///
    /// Returns an error if an option is present but not a boolean.
    pub fn from_config(config: &BTreeMap<String, Value>) -> ProtocolResult<Option<Self>> {
        let suppress = flag(config, SUPPRESS_FAILURE_MESSAGES)?;
        let copy = flag(config, COPY_CUSTOM_DATA)?;
        if suppress.is_none() && copy.is_none() {
            return Ok(None);
        }
        let defaults = Self::default();
        Ok(Some(Self {
            suppress_failure_messages: suppress.unwrap_or(defaults.suppress_failure_messages),
            copy_custom_data: copy.unwrap_or(defaults.copy_custom_data),
        }))
    }
}

fn flag(config: &BTreeMap<String, Value>, key: &'static str) -> ProtocolResult<Option<bool>> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(ProtocolError::invalid_field(key, "a boolean", other)),
    }
}

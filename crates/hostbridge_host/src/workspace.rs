//! The host document capability.
//!
//! A [`Workspace`] is what the dispatcher and the push engine see of the
//! host: a document that may be open or closed, writable or read-only, and
//! that is only mutated inside a named transaction. At most one transaction
//! runs at a time.

use crate::entity::HostEntity;
use crate::error::{HostError, HostResult};
use hostbridge_protocol::{ExternalId, FilterQuery, NativeId};
use uuid::Uuid;

/// A live host document.
///
/// Methods take `&self`; implementations synchronize internally.
pub trait Workspace: Send + Sync {
    /// Returns true if a document is open.
    fn is_open(&self) -> bool;

    /// Returns true if the document refuses modification.
    fn is_read_only(&self) -> bool;

    /// Returns true while a transaction is running.
    fn in_transaction(&self) -> bool;

    /// Starts a named transaction.
    fn begin_transaction(&self, name: &str) -> HostResult<()>;

    /// Commits the running transaction. On failure the transaction is
    /// rolled back before the error is returned.
    fn commit(&self) -> HostResult<()>;

    /// Discards the running transaction.
    fn rollback(&self) -> HostResult<()>;

    /// Fetches an entity by native id. Writes staged in the running
    /// transaction are visible.
    fn get(&self, native_id: NativeId) -> Option<HostEntity>;

    /// Fetches the entity carrying `guid`.
    fn find_by_guid(&self, guid: Uuid) -> Option<HostEntity>;

    /// Resolves an external identity to a live entity.
    ///
    /// The native id is tried first but only trusted when the entity found
    /// carries the same guid; native ids are reassigned when a document is
    /// reopened. Otherwise the guid decides.
    fn lookup(&self, identity: &ExternalId) -> Option<HostEntity> {
        if let Some(entity) = identity.host_id.and_then(|id| self.get(id)) {
            if entity.guid == Some(identity.guid) {
                return Some(entity);
            }
        }
        self.find_by_guid(identity.guid)
    }

    /// Returns every entity matching `filter`, ordered by native id.
    fn select(&self, filter: &FilterQuery) -> Vec<HostEntity>;

    /// Inserts `entity` under a freshly assigned native id and returns it.
    fn insert(&self, entity: HostEntity) -> HostResult<NativeId>;

    /// Overwrites the entity with the same native id.
    fn replace(&self, entity: HostEntity) -> HostResult<()>;

    /// Removes an entity; returns how many entities were removed.
    fn remove(&self, native_id: NativeId) -> HostResult<usize>;

    /// Turns automatic dismissal of host failure prompts on or off and
    /// returns the previous setting.
    fn set_failure_suppression(&self, enabled: bool) -> bool;

    /// Returns true if host failure prompts are dismissed automatically.
    fn failure_suppression(&self) -> bool;

    /// Reports a host-native validation failure. Dismissed when suppression
    /// is on, surfaced as a prompt otherwise.
    fn raise_failure(&self, message: &str);
}

/// Checks that the document can run a command.
///
/// Every command needs an open document; mutating commands also need it
/// writable and idle.
pub fn ensure_ready(workspace: &dyn Workspace, mutating: bool) -> HostResult<()> {
    if !workspace.is_open() {
        return Err(HostError::NotOpen);
    }
    if mutating {
        if workspace.is_read_only() {
            return Err(HostError::ReadOnly);
        }
        if workspace.in_transaction() {
            return Err(HostError::TransactionActive);
        }
    }
    Ok(())
}

/// A running transaction, rolled back on drop unless committed.
pub struct TransactionScope<'a> {
    workspace: &'a dyn Workspace,
    name: String,
    done: bool,
}

impl<'a> TransactionScope<'a> {
    /// Begins a transaction named `name`.
    pub fn begin(workspace: &'a dyn Workspace, name: impl Into<String>) -> HostResult<Self> {
        let name = name.into();
        workspace.begin_transaction(&name)?;
        tracing::debug!(transaction = %name, "transaction started");
        Ok(Self {
            workspace,
            name,
            done: false,
        })
    }

    /// Commits the transaction.
    pub fn commit(mut self) -> HostResult<()> {
        self.done = true;
        self.workspace.commit()?;
        tracing::debug!(transaction = %self.name, "transaction committed");
        Ok(())
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.done || !self.workspace.in_transaction() {
            return;
        }
        tracing::debug!(transaction = %self.name, "rolling back");
        if let Err(e) = self.workspace.rollback() {
            tracing::error!(transaction = %self.name, error = %e, "rollback failed");
        }
    }
}

/// Keeps failure suppression at a given setting while alive, then restores
/// whatever was set before.
pub struct FailureSuppression<'a> {
    workspace: &'a dyn Workspace,
    previous: bool,
}

impl<'a> FailureSuppression<'a> {
    /// Sets suppression to `enabled` until the guard drops.
    pub fn set(workspace: &'a dyn Workspace, enabled: bool) -> Self {
        let previous = workspace.set_failure_suppression(enabled);
        Self {
            workspace,
            previous,
        }
    }

    /// Enables suppression until the guard drops.
    pub fn enable(workspace: &'a dyn Workspace) -> Self {
        Self::set(workspace, true)
    }
}

impl Drop for FailureSuppression<'_> {
    fn drop(&mut self) {
        self.workspace.set_failure_suppression(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{JournalEntry, MemoryWorkspace};

    #[test]
    fn readiness() {
        let ws = MemoryWorkspace::new();
        assert!(ensure_ready(&ws, true).is_ok());

        ws.set_read_only(true);
        assert!(ensure_ready(&ws, false).is_ok());
        assert!(matches!(ensure_ready(&ws, true), Err(HostError::ReadOnly)));

        ws.set_read_only(false);
        ws.begin_transaction("other").unwrap();
        assert!(matches!(
            ensure_ready(&ws, true),
            Err(HostError::TransactionActive)
        ));
        ws.rollback().unwrap();

        ws.set_open(false);
        assert!(matches!(ensure_ready(&ws, false), Err(HostError::NotOpen)));
    }

    #[test]
    fn scope_rolls_back_on_drop() {
        let ws = MemoryWorkspace::new();
        {
            let _scope = TransactionScope::begin(&ws, "abandoned").unwrap();
            ws.insert(HostEntity::new("Wall", "W1")).unwrap();
        }
        assert!(!ws.in_transaction());
        assert!(ws.is_empty());
        assert_eq!(
            ws.journal().last(),
            Some(&JournalEntry::Rollback("abandoned".into()))
        );
    }

    #[test]
    fn scope_commit() {
        let ws = MemoryWorkspace::new();
        let scope = TransactionScope::begin(&ws, "kept").unwrap();
        let id = ws.insert(HostEntity::new("Wall", "W1")).unwrap();
        scope.commit().unwrap();
        assert!(ws.get(id).is_some());
        assert_eq!(
            ws.journal().last(),
            Some(&JournalEntry::Commit("kept".into()))
        );
    }

    #[test]
    fn suppression_restores_previous_state() {
        let ws = MemoryWorkspace::new();
        assert!(!ws.failure_suppression());
        {
            let _outer = FailureSuppression::enable(&ws);
            assert!(ws.failure_suppression());
            {
                let _inner = FailureSuppression::set(&ws, false);
                assert!(!ws.failure_suppression());
            }
            assert!(ws.failure_suppression());
        }
        assert!(!ws.failure_suppression());
    }

    #[test]
    fn lookup_checks_guid_behind_native_id() {
        let ws = MemoryWorkspace::new();
        let guid = Uuid::new_v4();
        let stranger = ws.seed(HostEntity::new("Wall", "other").with_guid(Uuid::new_v4()));
        let mine = ws.seed(HostEntity::new("Wall", "mine").with_guid(guid));

        // A stale native id pointing at another entity falls back to the guid.
        let stale = ExternalId {
            guid,
            host_id: Some(stranger),
        };
        assert_eq!(ws.lookup(&stale).map(|e| e.native_id), Some(mine));

        let unknown = ExternalId::new(Uuid::new_v4());
        assert!(ws.lookup(&unknown).is_none());
    }
}

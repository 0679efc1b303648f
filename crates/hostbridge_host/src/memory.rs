//! In-memory host document.

use crate::entity::HostEntity;
use crate::error::{HostError, HostResult};
use crate::workspace::Workspace;
use hostbridge_protocol::{FilterQuery, NativeId};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One step recorded by [`MemoryWorkspace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    /// A transaction started.
    Begin(String),
    /// An entity was inserted.
    Insert(NativeId),
    /// An entity was overwritten.
    Replace(NativeId),
    /// An entity was removed.
    Remove(NativeId),
    /// A transaction committed.
    Commit(String),
    /// A transaction was discarded.
    Rollback(String),
}

struct Staged {
    name: String,
    /// `None` marks a removal.
    writes: BTreeMap<NativeId, Option<HostEntity>>,
}

struct State {
    open: bool,
    read_only: bool,
    committed: BTreeMap<NativeId, HostEntity>,
    staged: Option<Staged>,
    next_id: NativeId,
    journal: Vec<JournalEntry>,
    suppress_failures: bool,
    dismissed: usize,
    prompts: Vec<String>,
    reject_next_commit: Option<String>,
    close_after_commit: bool,
}

impl State {
    fn view(&self, id: NativeId) -> Option<&HostEntity> {
        if let Some(staged) = &self.staged {
            if let Some(write) = staged.writes.get(&id) {
                return write.as_ref();
            }
        }
        self.committed.get(&id)
    }

    /// Committed entities overlaid with staged writes, by native id.
    fn visible(&self) -> BTreeMap<NativeId, &HostEntity> {
        let mut all: BTreeMap<NativeId, &HostEntity> =
            self.committed.iter().map(|(k, v)| (*k, v)).collect();
        if let Some(staged) = &self.staged {
            for (id, write) in &staged.writes {
                match write {
                    Some(entity) => {
                        all.insert(*id, entity);
                    }
                    None => {
                        all.remove(id);
                    }
                }
            }
        }
        all
    }

    fn staged_mut(&mut self) -> HostResult<&mut Staged> {
        self.staged.as_mut().ok_or(HostError::NoTransaction)
    }

    fn writable(&self) -> HostResult<()> {
        if !self.open {
            return Err(HostError::NotOpen);
        }
        if self.read_only {
            return Err(HostError::ReadOnly);
        }
        Ok(())
    }

    /// Writes need a writable document and a running transaction.
    fn check_write(&self) -> HostResult<()> {
        self.writable()?;
        if self.staged.is_none() {
            return Err(HostError::NoTransaction);
        }
        Ok(())
    }
}

/// A host document held in memory.
///
/// Writes are staged per transaction and only reach the document on commit.
/// Native ids increase monotonically and are never handed out twice, even
/// when the transaction that allocated one rolls back.
pub struct MemoryWorkspace {
    state: Mutex<State>,
}

impl MemoryWorkspace {
    /// Creates an open, writable, empty document.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                open: true,
                read_only: false,
                committed: BTreeMap::new(),
                staged: None,
                next_id: 1,
                journal: Vec::new(),
                suppress_failures: false,
                dismissed: 0,
                prompts: Vec::new(),
                reject_next_commit: None,
                close_after_commit: false,
            }),
        }
    }

    /// Opens or closes the document.
    pub fn set_open(&self, open: bool) {
        self.state.lock().open = open;
    }

    /// Flags the document read-only.
    pub fn set_read_only(&self, read_only: bool) {
        self.state.lock().read_only = read_only;
    }

    /// Makes the next commit fail with `reason`.
    pub fn reject_next_commit(&self, reason: impl Into<String>) {
        self.state.lock().reject_next_commit = Some(reason.into());
    }

    /// Closes the document once the next commit lands.
    pub fn close_after_next_commit(&self) {
        self.state.lock().close_after_commit = true;
    }

    /// Adds an entity directly to the committed document, bypassing
    /// transactions and the journal. Returns its native id.
    pub fn seed(&self, mut entity: HostEntity) -> NativeId {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        entity.native_id = id;
        state.committed.insert(id, entity);
        id
    }

    /// Returns a copy of the journal.
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.state.lock().journal.clone()
    }

    /// Clears the journal.
    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Returns committed entities, by native id.
    pub fn entities(&self) -> Vec<HostEntity> {
        self.state.lock().committed.values().cloned().collect()
    }

    /// Number of committed entities.
    pub fn len(&self) -> usize {
        self.state.lock().committed.len()
    }

    /// Returns true if nothing is committed.
    pub fn is_empty(&self) -> bool {
        self.state.lock().committed.is_empty()
    }

    /// Number of failures dismissed while suppression was on.
    pub fn dismissed_failures(&self) -> usize {
        self.state.lock().dismissed
    }

    /// Failures that were surfaced as prompts.
    pub fn prompts(&self) -> Vec<String> {
        self.state.lock().prompts.clone()
    }
}

impl Default for MemoryWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace for MemoryWorkspace {
    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn is_read_only(&self) -> bool {
        self.state.lock().read_only
    }

    fn in_transaction(&self) -> bool {
        self.state.lock().staged.is_some()
    }

    fn begin_transaction(&self, name: &str) -> HostResult<()> {
        let mut state = self.state.lock();
        state.writable()?;
        if state.staged.is_some() {
            return Err(HostError::TransactionActive);
        }
        state.staged = Some(Staged {
            name: name.to_string(),
            writes: BTreeMap::new(),
        });
        state.journal.push(JournalEntry::Begin(name.to_string()));
        Ok(())
    }

    fn commit(&self) -> HostResult<()> {
        let mut state = self.state.lock();
        let staged = state.staged.take().ok_or(HostError::NoTransaction)?;

        if let Some(reason) = state.reject_next_commit.take() {
            state.journal.push(JournalEntry::Rollback(staged.name.clone()));
            return Err(HostError::CommitFailed {
                transaction: staged.name,
                reason,
            });
        }

        for (id, write) in staged.writes {
            match write {
                Some(entity) => {
                    state.committed.insert(id, entity);
                }
                None => {
                    state.committed.remove(&id);
                }
            }
        }
        state.journal.push(JournalEntry::Commit(staged.name));
        if std::mem::take(&mut state.close_after_commit) {
            state.open = false;
        }
        Ok(())
    }

    fn rollback(&self) -> HostResult<()> {
        let mut state = self.state.lock();
        let staged = state.staged.take().ok_or(HostError::NoTransaction)?;
        state.journal.push(JournalEntry::Rollback(staged.name));
        Ok(())
    }

    fn get(&self, native_id: NativeId) -> Option<HostEntity> {
        self.state.lock().view(native_id).cloned()
    }

    fn find_by_guid(&self, guid: Uuid) -> Option<HostEntity> {
        self.state
            .lock()
            .visible()
            .into_values()
            .find(|e| e.guid == Some(guid))
            .cloned()
    }

    fn select(&self, filter: &FilterQuery) -> Vec<HostEntity> {
        self.state
            .lock()
            .visible()
            .into_values()
            .filter(|e| filter.matches(*e))
            .cloned()
            .collect()
    }

    fn insert(&self, mut entity: HostEntity) -> HostResult<NativeId> {
        let mut state = self.state.lock();
        state.check_write()?;
        let id = state.next_id;
        state.next_id += 1;
        entity.native_id = id;
        state.staged_mut()?.writes.insert(id, Some(entity));
        state.journal.push(JournalEntry::Insert(id));
        Ok(id)
    }

    fn replace(&self, entity: HostEntity) -> HostResult<()> {
        let mut state = self.state.lock();
        state.check_write()?;
        let id = entity.native_id;
        if state.view(id).is_none() {
            return Err(HostError::EntityNotFound { native_id: id });
        }
        state.staged_mut()?.writes.insert(id, Some(entity));
        state.journal.push(JournalEntry::Replace(id));
        Ok(())
    }

    fn remove(&self, native_id: NativeId) -> HostResult<usize> {
        let mut state = self.state.lock();
        state.check_write()?;
        if state.view(native_id).is_none() {
            return Ok(0);
        }
        state.staged_mut()?.writes.insert(native_id, None);
        state.journal.push(JournalEntry::Remove(native_id));
        Ok(1)
    }

    fn set_failure_suppression(&self, enabled: bool) -> bool {
        std::mem::replace(&mut self.state.lock().suppress_failures, enabled)
    }

    fn failure_suppression(&self) -> bool {
        self.state.lock().suppress_failures
    }

    fn raise_failure(&self, message: &str) {
        let mut state = self.state.lock();
        if state.suppress_failures {
            state.dismissed += 1;
            tracing::debug!(message, "host failure dismissed");
        } else {
            state.prompts.push(message.to_string());
            tracing::warn!(message, "host failure surfaced");
        }
    }
}

//! Cross-crate integration test helpers.

use hostbridge_host::JournalEntry;
use hostbridge_protocol::DomainObject;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Stable identities of `objects`.
pub fn guids(objects: &[DomainObject]) -> BTreeSet<Uuid> {
    objects.iter().map(|o| o.guid).collect()
}

/// One transaction as recorded in a workspace journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransaction {
    /// Transaction name.
    pub name: String,
    /// Writes made inside it, in order.
    pub writes: Vec<JournalEntry>,
    /// Whether it committed.
    pub committed: bool,
}

impl RecordedTransaction {
    /// Number of inserts.
    pub fn inserts(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, JournalEntry::Insert(_)))
            .count()
    }

    /// Number of replacements.
    pub fn replaces(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, JournalEntry::Replace(_)))
            .count()
    }
}

/// Splits a journal into its transactions. Writes outside a transaction
/// are ignored; an unterminated transaction is reported as not committed.
pub fn transactions(journal: &[JournalEntry]) -> Vec<RecordedTransaction> {
    let mut out = Vec::new();
    let mut open: Option<RecordedTransaction> = None;
    for entry in journal {
        match entry {
            JournalEntry::Begin(name) => {
                if let Some(unfinished) = open.take() {
                    out.push(unfinished);
                }
                open = Some(RecordedTransaction {
                    name: name.clone(),
                    writes: Vec::new(),
                    committed: false,
                });
            }
            JournalEntry::Commit(_) | JournalEntry::Rollback(_) => {
                if let Some(mut finished) = open.take() {
                    finished.committed = matches!(entry, JournalEntry::Commit(_));
                    out.push(finished);
                }
            }
            write => {
                if let Some(current) = open.as_mut() {
                    current.writes.push(write.clone());
                }
            }
        }
    }
    out.extend(open);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_journal() {
        let journal = vec![
            JournalEntry::Insert(9),
            JournalEntry::Begin("a".into()),
            JournalEntry::Insert(1),
            JournalEntry::Replace(1),
            JournalEntry::Commit("a".into()),
            JournalEntry::Begin("b".into()),
            JournalEntry::Remove(1),
            JournalEntry::Rollback("b".into()),
            JournalEntry::Begin("c".into()),
        ];
        let txns = transactions(&journal);
        assert_eq!(txns.len(), 3);
        assert_eq!(txns[0].name, "a");
        assert!(txns[0].committed);
        assert_eq!((txns[0].inserts(), txns[0].replaces()), (1, 1));
        assert!(!txns[1].committed);
        assert_eq!(txns[1].writes, vec![JournalEntry::Remove(1)]);
        assert!(txns[2].writes.is_empty() && !txns[2].committed);
    }
}

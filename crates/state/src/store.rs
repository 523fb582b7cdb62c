use crate::StateError;
use alloy_primitives::{B256, Bytes};
use keyguard_macros::standard;
use std::collections::BTreeMap;

/// Handle to an open checkpoint, returned by [`DataStore::checkpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

impl Checkpoint {
    pub const fn depth(&self) -> usize {
        self.0
    }
}

/// ERC725Y `DataChanged` notification
#[standard]
pub struct DataChanged {
    pub key: B256,
    pub value: Bytes,
}

/// Generic key-value store of a controlled account
///
/// An empty value and an absent key are the same thing: writing an empty
/// value deletes the key. Writes are journaled so a failed batch can be
/// undone with [`DataStore::revert_to`].
pub trait DataStore {
    /// Read a value, `None` when nothing is stored
    fn get_data(&self, key: &B256) -> Option<Bytes>;

    /// Write a value, an empty value clears the key
    fn set_data(&mut self, key: B256, value: Bytes);

    /// Open a checkpoint; checkpoints nest
    fn checkpoint(&mut self) -> Checkpoint;

    /// Keep every write made since `checkpoint`
    fn commit(&mut self, checkpoint: Checkpoint) -> Result<(), StateError>;

    /// Undo every write made since `checkpoint`
    fn revert_to(&mut self, checkpoint: Checkpoint) -> Result<(), StateError>;
}

#[derive(Debug, Clone)]
struct JournalEntry {
    key: B256,
    previous: Option<Bytes>,
}

#[derive(Debug, Clone, Copy)]
struct OpenCheckpoint {
    journal_len: usize,
    events_len: usize,
}

/// In-memory journaled data store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<B256, Bytes>,
    journal: Vec<JournalEntry>,
    checkpoints: Vec<OpenCheckpoint>,
    events: Vec<DataChanged>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing entries, skipping empty values
    pub fn from_entries(entries: impl IntoIterator<Item = (B256, Bytes)>) -> Self {
        Self {
            entries: entries.into_iter().filter(|(_, value)| !value.is_empty()).collect(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&B256, &Bytes)> {
        self.entries.iter()
    }

    /// Drain the `DataChanged` notifications emitted so far
    pub fn take_events(&mut self) -> Vec<DataChanged> {
        std::mem::take(&mut self.events)
    }

    fn innermost(&self, checkpoint: Checkpoint) -> Result<OpenCheckpoint, StateError> {
        match self.checkpoints.last() {
            Some(open) if checkpoint.0 + 1 == self.checkpoints.len() => Ok(*open),
            _ => Err(StateError::InvalidCheckpoint(checkpoint.0)),
        }
    }
}

impl DataStore for MemoryStore {
    fn get_data(&self, key: &B256) -> Option<Bytes> {
        self.entries.get(key).cloned()
    }

    fn set_data(&mut self, key: B256, value: Bytes) {
        let previous = if value.is_empty() {
            self.entries.remove(&key)
        } else {
            self.entries.insert(key, value.clone())
        };

        if !self.checkpoints.is_empty() {
            self.journal.push(JournalEntry { key, previous });
        }

        log::debug!("DataChanged {} ({} bytes)", key, value.len());
        self.events.push(DataChanged { key, value });
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.checkpoints.push(OpenCheckpoint {
            journal_len: self.journal.len(),
            events_len: self.events.len(),
        });
        Checkpoint(self.checkpoints.len() - 1)
    }

    fn commit(&mut self, checkpoint: Checkpoint) -> Result<(), StateError> {
        self.innermost(checkpoint)?;
        self.checkpoints.pop();

        // Outermost commit: nothing left to undo
        if self.checkpoints.is_empty() {
            self.journal.clear();
        }
        Ok(())
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) -> Result<(), StateError> {
        let open = self.innermost(checkpoint)?;
        self.checkpoints.pop();

        let undone = self.journal.len() - open.journal_len;
        for entry in self.journal.drain(open.journal_len..).rev() {
            match entry.previous {
                Some(value) => self.entries.insert(entry.key, value),
                None => self.entries.remove(&entry.key),
            };
        }
        self.events.truncate(open.events_len);

        if undone > 0 {
            log::warn!("Reverted {} data store writes", undone);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> B256 {
        B256::repeat_byte(byte)
    }

    #[test]
    fn test_empty_value_deletes() {
        let mut store = MemoryStore::new();
        store.set_data(key(1), Bytes::from(vec![1, 2, 3]));
        assert_eq!(store.get_data(&key(1)), Some(Bytes::from(vec![1, 2, 3])));

        store.set_data(key(1), Bytes::new());
        assert_eq!(store.get_data(&key(1)), None);
        assert!(store.is_empty());
        assert_eq!(store.take_events().len(), 2);
    }

    #[test]
    fn test_revert_restores_previous_values() {
        let mut store = MemoryStore::from_entries([(key(1), Bytes::from(vec![1]))]);

        let cp = store.checkpoint();
        store.set_data(key(1), Bytes::from(vec![9]));
        store.set_data(key(2), Bytes::from(vec![2]));
        store.set_data(key(1), Bytes::new());
        store.revert_to(cp).unwrap();

        assert_eq!(store.get_data(&key(1)), Some(Bytes::from(vec![1])));
        assert_eq!(store.get_data(&key(2)), None);
        assert!(store.take_events().is_empty());
    }

    #[test]
    fn test_nested_checkpoints() {
        let mut store = MemoryStore::new();

        let outer = store.checkpoint();
        store.set_data(key(1), Bytes::from(vec![1]));

        let inner = store.checkpoint();
        store.set_data(key(2), Bytes::from(vec![2]));
        store.commit(inner).unwrap();

        // Committing the inner checkpoint still lets the outer one undo it
        store.revert_to(outer).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_out_of_order_checkpoint_rejected() {
        let mut store = MemoryStore::new();
        let outer = store.checkpoint();
        let _inner = store.checkpoint();

        assert_eq!(store.commit(outer), Err(StateError::InvalidCheckpoint(0)));
    }

    #[test]
    fn test_writes_outside_checkpoint_are_not_journaled() {
        let mut store = MemoryStore::new();
        store.set_data(key(1), Bytes::from(vec![1]));
        assert!(store.journal.is_empty());

        let cp = store.checkpoint();
        store.set_data(key(2), Bytes::from(vec![2]));
        store.commit(cp).unwrap();
        assert!(store.journal.is_empty());
        assert_eq!(store.len(), 2);
    }
}

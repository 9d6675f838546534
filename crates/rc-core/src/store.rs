//! Append-only snapshot store for one logical module.
//!
//! The store owns the ordinal numbering: the n-th appended snapshot gets
//! index n (1-based). Snapshots are never modified or removed, so anything
//! derived from a store is a pure function of its contents.

use rc_common::Snapshot;

#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    module: String,
    snapshots: Vec<Snapshot>,
}

impl SnapshotStore {
    pub fn new(module: impl Into<String>) -> Self {
        SnapshotStore {
            module: module.into(),
            snapshots: Vec::new(),
        }
    }

    /// Store a list of parsed snapshots in input order.
    pub fn from_snapshots(module: impl Into<String>, snapshots: Vec<Snapshot>) -> Self {
        let mut store = SnapshotStore::new(module);
        for snapshot in snapshots {
            store.append(snapshot);
        }
        store
    }

    /// Append a snapshot and return its assigned ordinal.
    pub fn append(&mut self, mut snapshot: Snapshot) -> usize {
        let index = self.snapshots.len() + 1;
        snapshot.index = index;
        self.snapshots.push(snapshot);
        index
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Snapshot by 1-based ordinal.
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        index.checked_sub(1).and_then(|i| self.snapshots.get(i))
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Values a field takes across the sequence, newest first, with the
    /// ordinal that set each one.
    pub fn newest_first<'a, T, F>(&'a self, field: F) -> Vec<(usize, T)>
    where
        F: Fn(&'a Snapshot) -> Option<T>,
    {
        self.snapshots
            .iter()
            .rev()
            .filter_map(|s| field(s).map(|v| (s.index, v)))
            .collect()
    }

    /// Latest value of a field, with the ordinal that set it.
    pub fn latest<'a, T, F>(&'a self, field: F) -> Option<(usize, T)>
    where
        F: Fn(&'a Snapshot) -> Option<T>,
    {
        self.snapshots
            .iter()
            .rev()
            .find_map(|s| field(s).map(|v| (s.index, v)))
    }

    /// Ordinals of the snapshots where `field` equals `value`.
    pub fn ordinals_with<'a, T, F>(&'a self, field: F, value: &T) -> Vec<usize>
    where
        T: PartialEq,
        F: Fn(&'a Snapshot) -> Option<T>,
    {
        self.snapshots
            .iter()
            .filter(|s| field(s).as_ref() == Some(value))
            .map(|s| s.index)
            .collect()
    }
}

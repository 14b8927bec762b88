//! The snapshot table: pid -> `ProcessRecord`.
//!
//! This is the only shared mutable state in memchart. The sampler is its sole
//! writer; HTTP handlers and the one-shot dump only take `snapshot_view()`
//! copies. Every operation holds the lock for its whole duration, and a full
//! sampling cycle is applied under a single write lock, so readers see either
//! the previous cycle or the next one.

use ahash::AHashMap as HashMap;
use serde::ser::{Serialize, Serializer};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use crate::process::ProcessRecord;

/// One reconciliation step produced by probing a pid.
#[derive(Debug, Clone)]
pub enum TableChange {
    Upsert(String, ProcessRecord),
    Remove(String),
}

/// Counts of what a reconciliation actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub upserted: usize,
    pub removed: usize,
}

#[derive(Default)]
struct TableInner {
    processes: HashMap<String, ProcessRecord>,
    cycles: u64,
    last_updated: Option<Instant>,
    last_cycle_duration: Duration,
}

/// Immutable, point-in-time copy of the table, sorted by numeric pid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotView {
    entries: Vec<(String, ProcessRecord)>,
}

impl SnapshotView {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, pid: &str) -> Option<&ProcessRecord> {
        self.entries
            .iter()
            .find(|(p, _)| p == pid)
            .map(|(_, record)| record)
    }

    pub fn contains(&self, pid: &str) -> bool {
        self.get(pid).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProcessRecord)> {
        self.entries.iter().map(|(pid, record)| (pid.as_str(), record))
    }
}

impl FromIterator<(String, ProcessRecord)> for SnapshotView {
    fn from_iter<I: IntoIterator<Item = (String, ProcessRecord)>>(iter: I) -> Self {
        let mut entries: Vec<_> = iter.into_iter().collect();
        entries.sort_by(|(a, _), (b, _)| pid_order(a).cmp(&pid_order(b)));
        Self { entries }
    }
}

impl Serialize for SnapshotView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(pid, record)| (pid, record)))
    }
}

/// Numeric pids first in numeric order, anything else after them.
fn pid_order(pid: &str) -> (u64, &str) {
    (pid.parse().unwrap_or(u64::MAX), pid)
}

/// Table metadata for health reporting.
#[derive(Debug, Clone, Copy)]
pub struct TableStatus {
    pub processes: usize,
    pub cycles: u64,
    pub last_updated: Option<Instant>,
    pub last_cycle_duration: Duration,
}

/// Lock-guarded map from pid to process record.
#[derive(Default)]
pub struct SnapshotTable {
    inner: RwLock<TableInner>,
}

impl SnapshotTable {
    /// Creates an empty table. The table lives for the whole process.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, TableInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TableInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn upsert(&self, pid: impl Into<String>, record: ProcessRecord) {
        self.write().processes.insert(pid.into(), record);
    }

    /// Returns whether the pid was present.
    pub fn remove(&self, pid: &str) -> bool {
        self.write().processes.remove(pid).is_some()
    }

    pub fn snapshot_view(&self) -> SnapshotView {
        self.read()
            .processes
            .iter()
            .map(|(pid, record)| (pid.clone(), record.clone()))
            .collect()
    }

    /// Applies one cycle's changes atomically with respect to readers.
    pub fn apply_cycle<I>(&self, changes: I, started: Instant) -> ApplyStats
    where
        I: IntoIterator<Item = TableChange>,
    {
        let mut stats = ApplyStats::default();
        let mut inner = self.write();

        for change in changes {
            match change {
                TableChange::Upsert(pid, record) => {
                    inner.processes.insert(pid, record);
                    stats.upserted += 1;
                }
                TableChange::Remove(pid) => {
                    if inner.processes.remove(&pid).is_some() {
                        stats.removed += 1;
                    }
                }
            }
        }

        inner.cycles += 1;
        inner.last_updated = Some(Instant::now());
        inner.last_cycle_duration = started.elapsed();
        stats
    }

    /// Pids currently held, in no particular order.
    pub fn pids(&self) -> Vec<String> {
        self.read().processes.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn status(&self) -> TableStatus {
        let inner = self.read();
        TableStatus {
            processes: inner.processes.len(),
            cycles: inner.cycles,
            last_updated: inner.last_updated,
            last_cycle_duration: inner.last_cycle_duration,
        }
    }
}

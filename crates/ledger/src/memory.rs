//! In-memory reference ledger with optimistic conflict detection.
//!
//! Committed state lives in a `BTreeMap`, so range scans come back in raw key
//! order for free. Every committed write stamps the key with the commit
//! sequence number; a snapshot remembers the version of each key it read and
//! of each key it saw inside a scanned range. On commit those versions are
//! re-checked and the commit is rejected if anything moved underneath it.
//!
//! The whole key space can be saved to and restored from a JSON file, which
//! is how the CLI keeps state between invocations.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::StorageError;
use crate::record::KeyValue;
use crate::traits::Ledger;

/// A committed value together with the commit sequence that wrote it.
#[derive(Debug, Clone)]
struct Versioned {
    value: Vec<u8>,
    version: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, Versioned>,
    /// Sequence number of the most recent commit.
    commit_seq: u64,
    next_tx_id: u64,
}

impl Inner {
    fn version_of(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|v| v.version)
    }

    fn committed_range(&self, start: &str, end: &str) -> Vec<(String, u64)> {
        self.entries
            .range::<str, _>((
                std::ops::Bound::Included(start),
                std::ops::Bound::Excluded(end),
            ))
            .map(|(k, v)| (k.clone(), v.version))
            .collect()
    }
}

/// A range read recorded for phantom detection.
#[derive(Debug, Clone)]
struct RangeRead {
    start: String,
    end: String,
    seen: Vec<(String, u64)>,
}

/// An open transaction against a [`MemoryLedger`].
#[derive(Debug)]
pub struct MemorySnapshot {
    tx_id: u64,
    timestamp: i64,
    writes: BTreeMap<String, Vec<u8>>,
    /// First observed committed version of each point-read key (`None` = absent).
    reads: BTreeMap<String, Option<u64>>,
    ranges: Vec<RangeRead>,
}

impl MemorySnapshot {
    /// Transaction ID assigned when the snapshot was opened.
    pub fn tx_id(&self) -> u64 {
        self.tx_id
    }

    /// Number of writes buffered so far.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }
}

/// In-memory [`Ledger`] implementation.
///
/// Cloning yields another handle onto the same key space.
#[derive(Clone)]
pub struct MemoryLedger {
    inner: Arc<Mutex<Inner>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.inner.lock().map(|i| i.entries.len()).unwrap_or(0);
        f.debug_struct("MemoryLedger").field("entries", &len).finish()
    }
}

/// On-disk representation written by [`MemoryLedger::save`].
#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u64,
    entries: BTreeMap<String, String>,
}

impl MemoryLedger {
    /// Create an empty ledger stamping transactions with wall-clock time.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the transaction time source.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Restore a ledger previously written with [`save`](Self::save).
    ///
    /// A missing file yields an empty ledger.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let ledger = Self::new();
        if !path.exists() {
            return Ok(ledger);
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Persistence(format!("could not read '{}': {}", path.display(), e))
        })?;
        let file: LedgerFile = serde_json::from_str(&content).map_err(|e| {
            StorageError::Persistence(format!("could not parse '{}': {}", path.display(), e))
        })?;

        {
            let mut inner = ledger.lock()?;
            for (key, encoded) in file.entries {
                let value = BASE64.decode(encoded.as_bytes()).map_err(|e| {
                    StorageError::Persistence(format!("invalid value for key '{}': {}", key, e))
                })?;
                inner.entries.insert(
                    key,
                    Versioned {
                        value,
                        version: file.version,
                    },
                );
            }
            inner.commit_seq = file.version;
        }
        tracing::debug!(path = %path.display(), "ledger restored");
        Ok(ledger)
    }

    /// Write every committed entry to `path` as JSON.
    ///
    /// The file is written next to the target and renamed into place.
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let file = {
            let inner = self.lock()?;
            LedgerFile {
                version: inner.commit_seq,
                entries: inner
                    .entries
                    .iter()
                    .map(|(k, v)| (k.clone(), BASE64.encode(&v.value)))
                    .collect(),
            }
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| StorageError::Persistence(format!("serialization error: {}", e)))?;

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| {
            StorageError::Persistence(format!("could not write '{}': {}", tmp.display(), e))
        })?;
        std::fs::rename(&tmp, path).map_err(|e| {
            StorageError::Persistence(format!("could not replace '{}': {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "ledger saved");
        Ok(())
    }

    /// Read a committed value without opening a snapshot.
    pub fn committed_value(&self, key: &str) -> Option<Vec<u8>> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.entries.get(key).map(|v| v.value.clone()))
    }

    /// Number of committed keys.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|i| i.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Backend("ledger mutex poisoned".to_string()))
    }
}

fn check_range(start: &str, end: &str) -> Result<(), StorageError> {
    if start > end {
        return Err(StorageError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl Ledger for MemoryLedger {
    type Snapshot = MemorySnapshot;

    async fn begin_snapshot(&self) -> Result<MemorySnapshot, StorageError> {
        let tx_id = {
            let mut inner = self.lock()?;
            inner.next_tx_id += 1;
            inner.next_tx_id
        };
        Ok(MemorySnapshot {
            tx_id,
            timestamp: self.clock.now(),
            writes: BTreeMap::new(),
            reads: BTreeMap::new(),
            ranges: Vec::new(),
        })
    }

    async fn commit_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        if snapshot.writes.is_empty() {
            return Ok(());
        }
        let mut inner = self.lock()?;

        for (key, seen) in &snapshot.reads {
            if inner.version_of(key) != *seen {
                tracing::warn!(
                    tx_id = snapshot.tx_id,
                    key = %key,
                    "read conflict, commit rejected"
                );
                return Err(StorageError::ConcurrentConflict { key: key.clone() });
            }
        }
        for range in &snapshot.ranges {
            let now = inner.committed_range(&range.start, &range.end);
            if now != range.seen {
                let key = first_difference(&range.seen, &now)
                    .unwrap_or_else(|| range.start.clone());
                tracing::warn!(tx_id = snapshot.tx_id, key = %key, "phantom read, commit rejected");
                return Err(StorageError::ConcurrentConflict { key });
            }
        }

        inner.commit_seq += 1;
        let version = inner.commit_seq;
        let count = snapshot.writes.len();
        for (key, value) in snapshot.writes {
            inner.entries.insert(key, Versioned { value, version });
        }
        tracing::debug!(tx_id = snapshot.tx_id, version, writes = count, "snapshot committed");
        Ok(())
    }

    async fn abort_snapshot(&self, snapshot: MemorySnapshot) -> Result<(), StorageError> {
        tracing::debug!(
            tx_id = snapshot.tx_id,
            discarded = snapshot.writes.len(),
            "snapshot aborted"
        );
        Ok(())
    }

    fn tx_timestamp(&self, snapshot: &MemorySnapshot) -> i64 {
        snapshot.timestamp
    }

    async fn get_state(
        &self,
        snapshot: &mut MemorySnapshot,
        key: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(value) = snapshot.writes.get(key) {
            return Ok(Some(value.clone()));
        }
        let inner = self.lock()?;
        let entry = inner.entries.get(key);
        snapshot
            .reads
            .entry(key.to_string())
            .or_insert_with(|| entry.map(|v| v.version));
        Ok(entry.map(|v| v.value.clone()))
    }

    async fn put_state(
        &self,
        snapshot: &mut MemorySnapshot,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StorageError> {
        snapshot.writes.insert(key.to_string(), value);
        Ok(())
    }

    async fn range_scan(
        &self,
        snapshot: &mut MemorySnapshot,
        start: &str,
        end: &str,
    ) -> Result<Vec<KeyValue>, StorageError> {
        check_range(start, end)?;

        let mut merged: BTreeMap<String, Vec<u8>> = {
            let inner = self.lock()?;
            let seen = inner.committed_range(start, end);
            let values: BTreeMap<String, Vec<u8>> = seen
                .iter()
                .filter_map(|(k, _)| inner.entries.get(k).map(|v| (k.clone(), v.value.clone())))
                .collect();
            snapshot.ranges.push(RangeRead {
                start: start.to_string(),
                end: end.to_string(),
                seen,
            });
            values
        };

        for (key, value) in snapshot.writes.range::<str, _>((
            std::ops::Bound::Included(start),
            std::ops::Bound::Excluded(end),
        )) {
            merged.insert(key.clone(), value.clone());
        }

        Ok(merged
            .into_iter()
            .map(|(key, value)| KeyValue { key, value })
            .collect())
    }
}

/// First key whose presence or version differs between two range reads.
fn first_difference(before: &[(String, u64)], after: &[(String, u64)]) -> Option<String> {
    let mut all: BTreeMap<&str, (Option<u64>, Option<u64>)> = BTreeMap::new();
    for (k, v) in before {
        all.entry(k.as_str()).or_default().0 = Some(*v);
    }
    for (k, v) in after {
        all.entry(k.as_str()).or_default().1 = Some(*v);
    }
    all.into_iter()
        .find(|(_, (b, a))| b != a)
        .map(|(k, _)| k.to_string())
}

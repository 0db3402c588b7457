use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::KeyValue;

/// The key-value ledger the chaincode runs against.
///
/// A `Ledger` exposes a flat key space with point reads, point writes and
/// ordered range scans. It provides no secondary indexes; callers that need
/// to filter by field scan a key range and filter in memory.
///
/// ## Snapshot Semantics
///
/// Every read and write goes through `&mut Self::Snapshot`, a type
/// representing one in-progress transaction. The lifecycle is:
///
/// 1. `begin_snapshot()` opens a transaction and fixes its timestamp
/// 2. Call `get_state` / `put_state` / `range_scan` with `&mut snapshot`
/// 3. `commit_snapshot(snapshot)` makes the writes durable and consumes the
///    transaction, OR `abort_snapshot(snapshot)` discards them
///
/// Writes are buffered in the snapshot and are visible to reads through the
/// same snapshot only. If a `Snapshot` is dropped without committing, its
/// writes MUST be discarded.
///
/// ## Conflict Detection
///
/// The ledger, not the caller, arbitrates concurrent writers. A commit must
/// fail with `StorageError::ConcurrentConflict` when any key the snapshot
/// read (including keys that appeared inside a scanned range) was changed
/// by another snapshot that committed in the meantime. A failed commit
/// applies nothing.
///
/// ## Ordering
///
/// `range_scan` returns entries ordered by raw key bytes, ascending.
/// Callers rely on this to scan fixed-width numeric keys in numeric order.
#[async_trait]
pub trait Ledger: Send + Sync + 'static {
    /// The snapshot (transaction) type used by this ledger.
    type Snapshot: Send;

    // ── Snapshot lifecycle ────────────────────────────────────────────────────

    /// Begin a new snapshot (transaction).
    async fn begin_snapshot(&self) -> Result<Self::Snapshot, StorageError>;

    /// Commit a snapshot, making all buffered writes durable at once.
    async fn commit_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    /// Abort a snapshot, discarding all buffered writes.
    async fn abort_snapshot(&self, snapshot: Self::Snapshot) -> Result<(), StorageError>;

    /// The transaction timestamp of the snapshot in epoch seconds.
    ///
    /// Constant for the lifetime of the snapshot.
    fn tx_timestamp(&self, snapshot: &Self::Snapshot) -> i64;

    // ── Key-value operations (within snapshot) ────────────────────────────────

    /// Read the value stored under `key`, or `None` if the key is absent.
    async fn get_state(
        &self,
        snapshot: &mut Self::Snapshot,
        key: &str,
    ) -> Result<Option<Vec<u8>>, StorageError>;

    /// Buffer a write of `value` under `key`.
    async fn put_state(
        &self,
        snapshot: &mut Self::Snapshot,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), StorageError>;

    /// Return every entry with `start <= key < end`, ordered by key.
    ///
    /// Returns `Err(StorageError::InvalidRange)` if `start > end`.
    async fn range_scan(
        &self,
        snapshot: &mut Self::Snapshot,
        start: &str,
        end: &str,
    ) -> Result<Vec<KeyValue>, StorageError>;
}

use crate::error::StateResult;
use crate::scan::{HistoryScan, StateScan};
use crate::types::{CommitReceipt, Hash32, VersionedValue, WriteBatch};

/// Versioned key-value world state with per-key revision history.
///
/// Keys at this level are raw storage keys; namespacing and key rules are
/// applied by [`Transaction`](crate::Transaction).
///
/// All implementations must satisfy these invariants:
/// - `commit` applies the whole write set or nothing, and appends exactly one
///   revision per written key, in commit order.
/// - `commit` fails with `MvccConflict` when any read version in the batch no
///   longer matches the live version.
/// - Scans see the snapshot taken when they were opened.
/// - All I/O errors are propagated, never silently ignored.
pub trait StateBackend: Send + Sync {
    /// Current live value of `key`, or `Ok(None)` when it has none.
    fn get_state(&self, key: &str) -> StateResult<Option<VersionedValue>>;

    /// Validate the read set and apply the write set as one block.
    fn commit(&self, batch: WriteBatch) -> StateResult<CommitReceipt>;

    /// Live values with keys in `[start, end)`; `""` leaves a side unbounded.
    fn scan(&self, start: &str, end: &str) -> StateResult<StateScan>;

    /// Revision log of `key`, earliest first. Empty for unknown keys.
    fn history(&self, key: &str) -> StateResult<HistoryScan>;

    /// Number of the last committed block (0 before the first commit).
    fn height(&self) -> StateResult<u64>;

    /// Hash of the last committed block (all zeroes before the first commit).
    fn last_block_hash(&self) -> StateResult<Hash32>;

    /// Number of scans currently holding a guard.
    fn open_scans(&self) -> usize;

    fn exists(&self, key: &str) -> StateResult<bool> {
        Ok(self.get_state(key)?.is_some())
    }
}

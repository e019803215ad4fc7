use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;
use wsr_types::TemporalAnchor;

use crate::error::{StateError, StateResult};
use crate::scan::{HistoryScan, ScanGuard, StateScan};
use crate::traits::StateBackend;
use crate::types::{Block, CommitReceipt, Hash32, Revision, VersionedValue, WriteBatch};

/// In-memory world state for tests, local demos, and embedding.
///
/// Live values sit in an `Arc<BTreeMap>` that commits update copy-on-write,
/// so an open scan keeps reading the snapshot it started on while commits
/// proceed.
pub struct InMemoryWorldState {
    node_id: u16,
    inner: RwLock<WorldState>,
    open_scans: Arc<AtomicUsize>,
}

#[derive(Default)]
struct WorldState {
    live: Arc<BTreeMap<String, VersionedValue>>,
    history: HashMap<String, Arc<Vec<Revision>>>,
    height: u64,
    last_hash: Hash32,
    last_timestamp: Option<TemporalAnchor>,
}

impl InMemoryWorldState {
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id,
            inner: RwLock::new(WorldState::default()),
            open_scans: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of keys with a live value.
    pub fn len(&self) -> StateResult<usize> {
        Ok(self.read_state()?.live.len())
    }

    pub fn is_empty(&self) -> StateResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Validate `batch`, seal it into a block, hand the block to `persist`,
    /// and only then make it visible. A failing `persist` leaves the state
    /// untouched.
    pub(crate) fn commit_with<F>(&self, batch: WriteBatch, persist: F) -> StateResult<CommitReceipt>
    where
        F: FnOnce(&Block) -> StateResult<()>,
    {
        let mut state = self.write_state()?;

        for (key, observed) in &batch.reads {
            let current = state.live.get(key).map(|v| v.version);
            if current != *observed {
                debug!(tx = %batch.tx_id, ?key, ?observed, ?current, "read set invalidated");
                return Err(StateError::MvccConflict { key: key.clone() });
            }
        }

        if batch.writes.is_empty() {
            return Ok(CommitReceipt::read_only(batch.tx_id));
        }

        let timestamp = TemporalAnchor::next_after(state.last_timestamp.as_ref(), self.node_id);
        let block = Block::seal(
            state.height + 1,
            batch.tx_id,
            timestamp,
            state.last_hash,
            batch.writes.into_iter().collect(),
        )?;

        persist(&block)?;
        apply_block(&mut state, &block);

        debug!(
            block = block.number,
            tx = %block.tx_id,
            keys = block.writes.len(),
            "block committed"
        );
        Ok(CommitReceipt::committed(&block))
    }

    /// Re-apply a journaled block, checking that it extends the chain.
    pub(crate) fn replay(&self, block: &Block) -> StateResult<()> {
        let mut state = self.write_state()?;

        let expected = state.height + 1;
        if block.number != expected {
            return Err(StateError::Corrupt {
                block: block.number,
                reason: format!("expected block {expected}"),
            });
        }
        if block.prev_hash != state.last_hash {
            return Err(StateError::Corrupt {
                block: block.number,
                reason: "previous hash link mismatch".into(),
            });
        }
        if block.compute_hash()? != block.hash {
            return Err(StateError::Corrupt {
                block: block.number,
                reason: "block hash mismatch".into(),
            });
        }

        apply_block(&mut state, block);
        Ok(())
    }

    fn read_state(&self) -> StateResult<RwLockReadGuard<'_, WorldState>> {
        self.inner
            .read()
            .map_err(|_| StateError::Poisoned("world state read lock"))
    }

    fn write_state(&self) -> StateResult<RwLockWriteGuard<'_, WorldState>> {
        self.inner
            .write()
            .map_err(|_| StateError::Poisoned("world state write lock"))
    }
}

fn apply_block(state: &mut WorldState, block: &Block) {
    let live = Arc::make_mut(&mut state.live);
    for (key, value) in &block.writes {
        match value {
            Some(bytes) => {
                live.insert(
                    key.clone(),
                    VersionedValue {
                        value: bytes.clone(),
                        version: block.number,
                        tx_id: block.tx_id,
                    },
                );
            }
            None => {
                live.remove(key);
            }
        }

        let revisions = state.history.entry(key.clone()).or_default();
        Arc::make_mut(revisions).push(Revision {
            tx_id: block.tx_id,
            block: block.number,
            timestamp: block.timestamp,
            value: value.clone(),
        });
    }

    state.height = block.number;
    state.last_hash = block.hash;
    state.last_timestamp = Some(block.timestamp);
}

impl Default for InMemoryWorldState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl StateBackend for InMemoryWorldState {
    fn get_state(&self, key: &str) -> StateResult<Option<VersionedValue>> {
        Ok(self.read_state()?.live.get(key).cloned())
    }

    fn commit(&self, batch: WriteBatch) -> StateResult<CommitReceipt> {
        self.commit_with(batch, |_| Ok(()))
    }

    fn scan(&self, start: &str, end: &str) -> StateResult<StateScan> {
        let snapshot = Arc::clone(&self.read_state()?.live);
        Ok(StateScan::new(
            snapshot,
            start,
            end,
            ScanGuard::acquire(&self.open_scans),
        ))
    }

    fn history(&self, key: &str) -> StateResult<HistoryScan> {
        let revisions = self
            .read_state()?
            .history
            .get(key)
            .cloned()
            .unwrap_or_default();
        Ok(HistoryScan::new(
            revisions,
            ScanGuard::acquire(&self.open_scans),
        ))
    }

    fn height(&self) -> StateResult<u64> {
        Ok(self.read_state()?.height)
    }

    fn last_block_hash(&self) -> StateResult<Hash32> {
        Ok(self.read_state()?.last_hash)
    }

    fn open_scans(&self) -> usize {
        self.open_scans.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl std::fmt::Debug for InMemoryWorldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (keys, height) = match self.inner.read() {
            Ok(state) => (state.live.len(), state.height),
            Err(_) => (0, 0),
        };
        f.debug_struct("InMemoryWorldState")
            .field("node_id", &self.node_id)
            .field("live_keys", &keys)
            .field("height", &height)
            .finish()
    }
}

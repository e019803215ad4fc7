use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::info;

use crate::error::{StateError, StateResult};
use crate::journal::{Journal, SyncMode};
use crate::memory::InMemoryWorldState;
use crate::scan::{HistoryScan, StateScan};
use crate::traits::StateBackend;
use crate::types::{CommitReceipt, Hash32, VersionedValue, WriteBatch};

/// Options for [`FileWorldState::open`].
#[derive(Clone, Debug, Default)]
pub struct FileStateConfig {
    pub node_id: u16,
    pub sync_mode: SyncMode,
}

/// Durable world state: an [`InMemoryWorldState`] rebuilt from, and kept in
/// step with, a block journal on disk.
///
/// Each block is journaled before it becomes visible, so a crash can lose at
/// most a commit that was never acknowledged.
///
/// The directory is owned exclusively: a second `open` on it, from this or
/// any other process, fails with `Locked` until the first handle is dropped.
pub struct FileWorldState {
    dir: PathBuf,
    state: InMemoryWorldState,
    journal: Journal,
    discarded_bytes: u64,
    _lock: File,
}

/// Read-only summary of a journal, produced without opening it for writing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JournalInspection {
    pub journal: PathBuf,
    pub height: u64,
    pub last_block_hash: Hash32,
    /// Bytes of torn tail a writable open would cut off.
    pub torn_bytes: u64,
}

impl FileWorldState {
    pub const JOURNAL_FILE: &'static str = "ledger.journal";
    pub const LOCK_FILE: &'static str = "LOCK";

    /// Open the state directory, replaying its journal.
    ///
    /// Fails with `Locked` if another handle owns the directory and with
    /// `Corrupt` if the journaled blocks do not form a chain.
    pub fn open(dir: impl AsRef<Path>, config: FileStateConfig) -> StateResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let lock = acquire_lock(&dir)?;

        let journal = Journal::open(&dir.join(Self::JOURNAL_FILE), config.sync_mode)?;
        let recovery = journal.recover()?;

        let state = InMemoryWorldState::new(config.node_id);
        for block in &recovery.blocks {
            state.replay(block)?;
        }

        info!(
            dir = %dir.display(),
            height = recovery.blocks.len(),
            discarded_bytes = recovery.discarded_bytes,
            "world state opened"
        );

        Ok(Self {
            dir,
            state,
            journal,
            discarded_bytes: recovery.discarded_bytes,
            _lock: lock,
        })
    }

    /// Replay the journal in `dir` and verify its hash chain without taking
    /// the directory lock or truncating a torn tail.
    pub fn inspect(dir: impl AsRef<Path>) -> StateResult<JournalInspection> {
        let path = dir.as_ref().join(Self::JOURNAL_FILE);
        let recovery = Journal::read_only(&path)?;

        let state = InMemoryWorldState::new(0);
        for block in &recovery.blocks {
            state.replay(block)?;
        }

        Ok(JournalInspection {
            journal: path,
            height: state.height()?,
            last_block_hash: state.last_block_hash()?,
            torn_bytes: recovery.discarded_bytes,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn journal_path(&self) -> &Path {
        self.journal.path()
    }

    /// Bytes of torn journal tail dropped when this state was opened.
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded_bytes
    }
}

fn acquire_lock(dir: &Path) -> StateResult<File> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(dir.join(FileWorldState::LOCK_FILE))?;
    file.try_lock_exclusive()
        .map_err(|_| StateError::Locked(dir.to_path_buf()))?;
    Ok(file)
}

impl StateBackend for FileWorldState {
    fn get_state(&self, key: &str) -> StateResult<Option<VersionedValue>> {
        self.state.get_state(key)
    }

    fn commit(&self, batch: WriteBatch) -> StateResult<CommitReceipt> {
        self.state
            .commit_with(batch, |block| self.journal.append(block).map(|_| ()))
    }

    fn scan(&self, start: &str, end: &str) -> StateResult<StateScan> {
        self.state.scan(start, end)
    }

    fn history(&self, key: &str) -> StateResult<HistoryScan> {
        self.state.history(key)
    }

    fn height(&self) -> StateResult<u64> {
        self.state.height()
    }

    fn last_block_hash(&self) -> StateResult<Hash32> {
        self.state.last_block_hash()
    }

    fn open_scans(&self) -> usize {
        self.state.open_scans()
    }
}

impl std::fmt::Debug for FileWorldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWorldState")
            .field("dir", &self.dir)
            .field("state", &self.state)
            .finish()
    }
}

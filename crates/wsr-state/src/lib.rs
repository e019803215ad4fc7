//! World-state engine for World State Records (WSR).
//!
//! The engine stands in for the state database a ledger peer provides to
//! its contracts: a map of keys to versioned values, plus an append-only
//! revision log per key.
//!
//! # Storage Backends
//!
//! All backends implement the [`StateBackend`] trait:
//!
//! - [`InMemoryWorldState`] -- copy-on-write `BTreeMap` snapshot for tests and embedding
//! - [`FileWorldState`] -- the in-memory engine plus a CRC-framed block journal
//!
//! # Design Rules
//!
//! 1. A commit applies its whole write set as one block, or nothing.
//! 2. Commits are serialized; a transaction whose reads went stale fails
//!    with [`StateError::MvccConflict`].
//! 3. Scans iterate an immutable snapshot and never observe a torn value.
//! 4. Every scan holds a guard that is released on exhaustion, drop, or `close()`.
//! 5. Journaled blocks are hash-chained; replay refuses a broken chain.
//! 6. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod journal;
pub mod memory;
pub mod scan;
pub mod traits;
pub mod transaction;
pub mod types;

pub use error::{StateError, StateResult};
pub use file::{FileStateConfig, FileWorldState, JournalInspection};
pub use journal::{Journal, Recovery, SyncMode};
pub use memory::InMemoryWorldState;
pub use scan::{HistoryScan, StateScan};
pub use traits::StateBackend;
pub use transaction::Transaction;
pub use types::{Block, BlockRef, CommitReceipt, Hash32, Revision, VersionedValue, WriteBatch};

//! Typed record store over a transaction context.
//!
//! [`RecordStore<R>`] carries no state of its own; every operation runs
//! against the [`TxContext`] it is given, so its writes commit or vanish
//! together with the rest of the invocation.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use wsr_state::{HistoryScan, StateError, StateScan};
use wsr_types::{TemporalAnchor, TxId};

use crate::context::TxContext;
use crate::error::{ContractError, ContractResult};
use crate::record::Record;

/// Existence-checked CRUD, range listing, and history for one record type.
pub struct RecordStore<R> {
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> RecordStore<R> {
    pub const fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }

    /// Whether `key` has a live value, counting this transaction's writes.
    pub fn exists(&self, ctx: &mut TxContext<'_>, key: &str) -> ContractResult<bool> {
        Ok(ctx.stub().get_state(key)?.is_some())
    }

    pub fn create(&self, ctx: &mut TxContext<'_>, record: &R) -> ContractResult<()> {
        let key = record.key();
        if self.exists(ctx, key)? {
            return Err(ContractError::AlreadyExists {
                kind: R::KIND,
                key: key.to_string(),
            });
        }
        let bytes = encode(record)?;
        ctx.stub().put_state(key, bytes)?;
        Ok(())
    }

    /// Write `record` whether or not its key is live. Used to seed fixed
    /// record sets.
    pub fn put(&self, ctx: &mut TxContext<'_>, record: &R) -> ContractResult<()> {
        let bytes = encode(record)?;
        ctx.stub().put_state(record.key(), bytes)?;
        Ok(())
    }

    pub fn read(&self, ctx: &mut TxContext<'_>, key: &str) -> ContractResult<R> {
        let bytes = ctx
            .stub()
            .get_state(key)?
            .ok_or_else(|| not_found::<R>(key))?;
        decode(key, &bytes)
    }

    /// Read, mutate, and overwrite an existing record. Not an upsert.
    ///
    /// The mutator may reject the change; it may not change the record's key.
    pub fn update<F>(&self, ctx: &mut TxContext<'_>, key: &str, mutate: F) -> ContractResult<R>
    where
        F: FnOnce(&mut R) -> ContractResult<()>,
    {
        let mut record = self.read(ctx, key)?;
        mutate(&mut record)?;
        if record.key() != key {
            return Err(ContractError::invalid_argument(format!(
                "update of {} {key} may not change its key to {}",
                R::KIND,
                record.key()
            )));
        }
        let bytes = encode(&record)?;
        ctx.stub().put_state(key, bytes)?;
        Ok(record)
    }

    /// Overwrite an existing record wholesale.
    pub fn replace(&self, ctx: &mut TxContext<'_>, record: R) -> ContractResult<R> {
        let key = record.key().to_string();
        self.update(ctx, &key, move |current| {
            *current = record;
            Ok(())
        })
    }

    pub fn delete(&self, ctx: &mut TxContext<'_>, key: &str) -> ContractResult<()> {
        if !self.exists(ctx, key)? {
            return Err(not_found::<R>(key));
        }
        ctx.stub().del_state(key)?;
        Ok(())
    }

    /// All committed records of the namespace, in key order.
    pub fn list_all(&self, ctx: &mut TxContext<'_>) -> ContractResult<Records<R>> {
        let scan = ctx.stub().state_by_range("", "")?;
        Ok(Records {
            scan,
            _record: PhantomData,
        })
    }

    /// Committed revisions of `key`, earliest first.
    pub fn history(&self, ctx: &mut TxContext<'_>, key: &str) -> ContractResult<RecordHistory<R>> {
        let scan = ctx.stub().history_for_key(key)?;
        Ok(RecordHistory {
            key: key.to_string(),
            scan,
            _record: PhantomData,
        })
    }
}

impl<R: Record> Default for RecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for RecordStore<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for RecordStore<R> {}

impl<R> fmt::Debug for RecordStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("record", &std::any::type_name::<R>())
            .finish()
    }
}

/// Lazy sequence of live records; see [`RecordStore::list_all`].
///
/// The underlying scan is released when the sequence is exhausted, dropped,
/// or [`close`](Self::close)d.
pub struct Records<R> {
    scan: StateScan,
    _record: PhantomData<fn() -> R>,
}

impl<R> Records<R> {
    pub fn is_open(&self) -> bool {
        self.scan.is_open()
    }

    pub fn close(self) {}
}

impl<R: Record> Iterator for Records<R> {
    type Item = ContractResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.scan.next()?;
        Some(decode(&key, &value.value))
    }
}

impl<R> fmt::Debug for Records<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Records").field("scan", &self.scan).finish()
    }
}

/// One revision of a record.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry<R> {
    pub tx_id: TxId,
    pub block: u64,
    pub timestamp: TemporalAnchor,
    pub is_delete: bool,
    /// Snapshot after the revision; `None` for a tombstone.
    pub value: Option<R>,
}

impl<R: Serialize> fmt::Display for HistoryEntry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => {
                let json = serde_json::to_string(value).map_err(|_| fmt::Error)?;
                write!(f, "TxID: {}, Data: {}", self.tx_id, json)
            }
            None => write!(f, "Deleted at TxID: {}", self.tx_id),
        }
    }
}

/// Lazy sequence of a key's revisions; see [`RecordStore::history`].
pub struct RecordHistory<R> {
    key: String,
    scan: HistoryScan,
    _record: PhantomData<fn() -> R>,
}

impl<R> RecordHistory<R> {
    pub fn is_open(&self) -> bool {
        self.scan.is_open()
    }

    pub fn close(self) {}
}

impl<R: Record> Iterator for RecordHistory<R> {
    type Item = ContractResult<HistoryEntry<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        let revision = self.scan.next()?;
        let value = match revision.value {
            Some(bytes) => match decode(&self.key, &bytes) {
                Ok(record) => Some(record),
                Err(e) => return Some(Err(e)),
            },
            None => None,
        };
        Some(Ok(HistoryEntry {
            tx_id: revision.tx_id,
            block: revision.block,
            timestamp: revision.timestamp,
            is_delete: value.is_none(),
            value,
        }))
    }
}

impl<R> fmt::Debug for RecordHistory<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordHistory")
            .field("key", &self.key)
            .field("scan", &self.scan)
            .finish()
    }
}

fn not_found<R: Record>(key: &str) -> ContractError {
    ContractError::NotFound {
        kind: R::KIND,
        key: key.to_string(),
    }
}

fn encode<R: Record>(record: &R) -> ContractResult<Vec<u8>> {
    serde_json::to_vec(record)
        .map_err(|e| ContractError::Infrastructure(StateError::Serialization(e.to_string())))
}

fn decode<R: Record>(key: &str, bytes: &[u8]) -> ContractResult<R> {
    serde_json::from_slice(bytes).map_err(|e| ContractError::Deserialization {
        kind: R::KIND,
        key: key.to_string(),
        reason: e.to_string(),
    })
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wsr_types::{TemporalAnchor, TxId};

use crate::error::{StateError, StateResult};

/// BLAKE3 digest used for block hashes.
pub type Hash32 = [u8; 32];

/// Live value of a key together with the block that wrote it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    /// Number of the block that committed this value.
    pub version: u64,
    pub tx_id: TxId,
}

/// One entry in a key's revision log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub tx_id: TxId,
    pub block: u64,
    pub timestamp: TemporalAnchor,
    /// `None` marks a deletion (tombstone).
    pub value: Option<Vec<u8>>,
}

impl Revision {
    pub fn is_delete(&self) -> bool {
        self.value.is_none()
    }
}

/// Read set and write set of one transaction, handed to
/// [`StateBackend::commit`](crate::StateBackend::commit).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteBatch {
    pub tx_id: TxId,
    /// Version observed for each key read (`None`: key had no live value).
    pub reads: BTreeMap<String, Option<u64>>,
    /// Value to store for each key (`None`: delete).
    pub writes: BTreeMap<String, Option<Vec<u8>>>,
}

impl WriteBatch {
    pub fn new(tx_id: TxId) -> Self {
        Self {
            tx_id,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    pub fn put(mut self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.writes.insert(key.into(), Some(value));
        self
    }

    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.writes.insert(key.into(), None);
        self
    }

    pub fn read(mut self, key: impl Into<String>, version: Option<u64>) -> Self {
        self.reads.insert(key.into(), version);
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

/// A committed transaction as it is journaled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// 1-based, dense block number.
    pub number: u64,
    pub tx_id: TxId,
    pub timestamp: TemporalAnchor,
    pub prev_hash: Hash32,
    pub hash: Hash32,
    pub writes: Vec<(String, Option<Vec<u8>>)>,
}

#[derive(Serialize)]
struct BlockPreimage<'a> {
    number: u64,
    tx_id: &'a TxId,
    timestamp: &'a TemporalAnchor,
    prev_hash: &'a Hash32,
    writes: &'a [(String, Option<Vec<u8>>)],
}

impl Block {
    /// Build a block and compute its hash.
    pub fn seal(
        number: u64,
        tx_id: TxId,
        timestamp: TemporalAnchor,
        prev_hash: Hash32,
        writes: Vec<(String, Option<Vec<u8>>)>,
    ) -> StateResult<Self> {
        let mut block = Self {
            number,
            tx_id,
            timestamp,
            prev_hash,
            hash: [0; 32],
            writes,
        };
        block.hash = block.compute_hash()?;
        Ok(block)
    }

    /// Recompute the hash over everything except the `hash` field.
    pub fn compute_hash(&self) -> StateResult<Hash32> {
        let preimage = BlockPreimage {
            number: self.number,
            tx_id: &self.tx_id,
            timestamp: &self.timestamp,
            prev_hash: &self.prev_hash,
            writes: &self.writes,
        };
        let encoded =
            bincode::serialize(&preimage).map_err(|e| StateError::Serialization(e.to_string()))?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"wsr-block-v1:");
        hasher.update(&encoded);
        Ok(*hasher.finalize().as_bytes())
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn block_ref(&self) -> BlockRef {
        BlockRef {
            number: self.number,
            hash: self.hash,
            timestamp: self.timestamp,
        }
    }
}

/// Position of a committed block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub number: u64,
    pub hash: Hash32,
    pub timestamp: TemporalAnchor,
}

/// Outcome of a successful commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub tx_id: TxId,
    /// `None` when the transaction wrote nothing and no block was cut.
    pub block: Option<BlockRef>,
    pub keys_written: usize,
}

impl CommitReceipt {
    pub fn read_only(tx_id: TxId) -> Self {
        Self {
            tx_id,
            block: None,
            keys_written: 0,
        }
    }

    pub fn committed(block: &Block) -> Self {
        Self {
            tx_id: block.tx_id,
            block: Some(block.block_ref()),
            keys_written: block.writes.len(),
        }
    }

    pub fn block_number(&self) -> Option<u64> {
        self.block.map(|b| b.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block(prev_hash: Hash32) -> Block {
        Block::seal(
            1,
            TxId::new(),
            TemporalAnchor::new(1000, 0, 0),
            prev_hash,
            vec![
                ("ns\0a".into(), Some(b"{\"v\":1}".to_vec())),
                ("ns\0b".into(), None),
            ],
        )
        .unwrap()
    }

    #[test]
    fn seal_computes_matching_hash() {
        let block = sample_block([0; 32]);
        assert_ne!(block.hash, [0; 32]);
        assert_eq!(block.compute_hash().unwrap(), block.hash);
        assert_eq!(block.hash_hex().len(), 64);
    }

    #[test]
    fn hash_covers_prev_hash() {
        let tx_id = TxId::new();
        let ts = TemporalAnchor::new(1000, 0, 0);
        let a = Block::seal(1, tx_id, ts, [0; 32], vec![]).unwrap();
        let b = Block::seal(1, tx_id, ts, [1; 32], vec![]).unwrap();
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn tampering_changes_hash() {
        let mut block = sample_block([0; 32]);
        block.writes[0].1 = Some(b"{\"v\":2}".to_vec());
        assert_ne!(block.compute_hash().unwrap(), block.hash);
    }

    #[test]
    fn write_batch_builders() {
        let batch = WriteBatch::new(TxId::new())
            .read("k1", Some(3))
            .put("k1", b"x".to_vec())
            .delete("k2");
        assert!(!batch.is_read_only());
        assert_eq!(batch.reads.get("k1"), Some(&Some(3)));
        assert_eq!(batch.writes.get("k2"), Some(&None));
    }

    #[test]
    fn receipt_from_block() {
        let block = sample_block([0; 32]);
        let receipt = CommitReceipt::committed(&block);
        assert_eq!(receipt.block_number(), Some(1));
        assert_eq!(receipt.keys_written, 2);
        assert_eq!(CommitReceipt::read_only(block.tx_id).block_number(), None);
    }
}

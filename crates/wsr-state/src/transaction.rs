use std::collections::BTreeMap;

use tracing::debug;
use wsr_types::{validate_key, validate_namespace, TxId};

use crate::error::StateResult;
use crate::scan::{HistoryScan, StateScan};
use crate::traits::StateBackend;
use crate::types::{CommitReceipt, WriteBatch};

/// Separator between namespace and key in a storage key.
const NS_SEPARATOR: char = '\0';
/// First character after the separator; upper bound of a namespace scan.
const NS_END: char = '\u{1}';

/// A unit of work against one namespace of the world state.
///
/// Point reads see the transaction's own staged writes. Range scans and
/// history see committed state only. Nothing is visible to other readers
/// until [`commit`](Self::commit); dropping the transaction discards it.
pub struct Transaction<'a> {
    backend: &'a dyn StateBackend,
    namespace: String,
    tx_id: TxId,
    reads: BTreeMap<String, Option<u64>>,
    writes: BTreeMap<String, Option<Vec<u8>>>,
}

impl<'a> Transaction<'a> {
    pub fn begin(backend: &'a dyn StateBackend, namespace: &str) -> StateResult<Self> {
        validate_namespace(namespace)?;
        Ok(Self {
            backend,
            namespace: namespace.to_string(),
            tx_id: TxId::new(),
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        })
    }

    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether nothing has been staged for writing.
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// Current value of `key`, including this transaction's staged writes.
    pub fn get_state(&mut self, key: &str) -> StateResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let storage_key = self.storage_key(key);

        if let Some(staged) = self.writes.get(&storage_key) {
            return Ok(staged.clone());
        }

        let live = self.backend.get_state(&storage_key)?;
        // The first observed version is the one validated at commit.
        self.reads
            .entry(storage_key)
            .or_insert(live.as_ref().map(|v| v.version));
        Ok(live.map(|v| v.value))
    }

    pub fn put_state(&mut self, key: &str, value: Vec<u8>) -> StateResult<()> {
        validate_key(key)?;
        let storage_key = self.storage_key(key);
        self.writes.insert(storage_key, Some(value));
        Ok(())
    }

    pub fn del_state(&mut self, key: &str) -> StateResult<()> {
        validate_key(key)?;
        let storage_key = self.storage_key(key);
        self.writes.insert(storage_key, None);
        Ok(())
    }

    /// Committed values in `[start, end)` within this namespace, with the
    /// namespace prefix removed. An empty bound is open on that side.
    pub fn state_by_range(&self, start: &str, end: &str) -> StateResult<StateScan> {
        let prefix_len = self.namespace.len() + NS_SEPARATOR.len_utf8();
        let lower = self.storage_key(start);
        let upper = if end.is_empty() {
            format!("{}{}", self.namespace, NS_END)
        } else {
            self.storage_key(end)
        };
        Ok(self.backend.scan(&lower, &upper)?.strip_prefix(prefix_len))
    }

    /// Committed revision log of `key`, earliest first.
    pub fn history_for_key(&self, key: &str) -> StateResult<HistoryScan> {
        validate_key(key)?;
        self.backend.history(&self.storage_key(key))
    }

    /// Validate the read set and apply the write set as one block.
    pub fn commit(self) -> StateResult<CommitReceipt> {
        let batch = WriteBatch {
            tx_id: self.tx_id,
            reads: self.reads,
            writes: self.writes,
        };
        let receipt = self.backend.commit(batch)?;
        debug!(
            tx = %receipt.tx_id,
            namespace = %self.namespace,
            block = ?receipt.block_number(),
            "transaction committed"
        );
        Ok(receipt)
    }

    /// Drop every staged write.
    pub fn discard(self) {
        debug!(tx = %self.tx_id, namespace = %self.namespace, "transaction discarded");
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}{}", self.namespace, NS_SEPARATOR, key)
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("tx_id", &self.tx_id)
            .field("namespace", &self.namespace)
            .field("reads", &self.reads.len())
            .field("writes", &self.writes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateError;
    use crate::memory::InMemoryWorldState;

    fn put(state: &InMemoryWorldState, ns: &str, key: &str, value: &[u8]) {
        let mut tx = Transaction::begin(state, ns).unwrap();
        tx.put_state(key, value.to_vec()).unwrap();
        tx.commit().unwrap();
    }

    #[test]
    fn read_your_writes() {
        let state = InMemoryWorldState::default();
        let mut tx = Transaction::begin(&state, "loan").unwrap();
        assert!(tx.get_state("k").unwrap().is_none());

        tx.put_state("k", b"v".to_vec()).unwrap();
        assert_eq!(tx.get_state("k").unwrap().unwrap(), b"v");

        tx.del_state("k").unwrap();
        assert!(tx.get_state("k").unwrap().is_none());
    }

    #[test]
    fn staged_writes_invisible_until_commit() {
        let state = InMemoryWorldState::default();
        let mut tx = Transaction::begin(&state, "loan").unwrap();
        tx.put_state("k", b"v".to_vec()).unwrap();
        assert!(!state.exists("loan\0k").unwrap());

        tx.commit().unwrap();
        assert!(state.exists("loan\0k").unwrap());
    }

    #[test]
    fn discard_and_drop_leave_no_trace() {
        let state = InMemoryWorldState::default();
        let mut tx = Transaction::begin(&state, "loan").unwrap();
        tx.put_state("a", b"1".to_vec()).unwrap();
        tx.discard();
        {
            let mut tx = Transaction::begin(&state, "loan").unwrap();
            tx.put_state("b", b"1".to_vec()).unwrap();
        }
        assert_eq!(state.height().unwrap(), 0);
        assert!(state.is_empty().unwrap());
    }

    #[test]
    fn multi_key_commit_is_one_block() {
        let state = InMemoryWorldState::default();
        let mut tx = Transaction::begin(&state, "loan").unwrap();
        tx.put_state("a", b"1".to_vec()).unwrap();
        tx.put_state("b", b"2".to_vec()).unwrap();
        let receipt = tx.commit().unwrap();

        assert_eq!(receipt.block_number(), Some(1));
        assert_eq!(receipt.keys_written, 2);
        assert_eq!(state.height().unwrap(), 1);
    }

    #[test]
    fn read_only_transaction_cuts_no_block() {
        let state = InMemoryWorldState::default();
        let mut tx = Transaction::begin(&state, "loan").unwrap();
        tx.get_state("missing").unwrap();
        assert!(tx.is_read_only());
        let receipt = tx.commit().unwrap();
        assert!(receipt.block.is_none());
        assert_eq!(state.height().unwrap(), 0);
    }

    #[test]
    fn concurrent_creates_conflict() {
        let state = InMemoryWorldState::default();

        let mut first = Transaction::begin(&state, "loan").unwrap();
        let mut second = Transaction::begin(&state, "loan").unwrap();
        assert!(first.get_state("k").unwrap().is_none());
        assert!(second.get_state("k").unwrap().is_none());
        first.put_state("k", b"first".to_vec()).unwrap();
        second.put_state("k", b"second".to_vec()).unwrap();

        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert!(matches!(err, StateError::MvccConflict { ref key } if key == "loan\0k"));

        let live = state.get_state("loan\0k").unwrap().unwrap();
        assert_eq!(live.value, b"first");
    }

    #[test]
    fn blind_writes_do_not_conflict() {
        let state = InMemoryWorldState::default();
        let mut first = Transaction::begin(&state, "loan").unwrap();
        let mut second = Transaction::begin(&state, "loan").unwrap();
        first.put_state("k", b"1".to_vec()).unwrap();
        second.put_state("k", b"2".to_vec()).unwrap();
        first.commit().unwrap();
        second.commit().unwrap();
        assert_eq!(state.get_state("loan\0k").unwrap().unwrap().value, b"2");
    }

    #[test]
    fn range_scan_stays_in_namespace() {
        let state = InMemoryWorldState::default();
        put(&state, "loan", "loan1", b"1");
        put(&state, "loan", "loan2", b"2");
        put(&state, "pokemon", "poke1", b"3");
        put(&state, "loans", "x", b"4");

        let tx = Transaction::begin(&state, "loan").unwrap();
        let keys: Vec<String> = tx.state_by_range("", "").unwrap().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["loan1", "loan2"]);

        let keys: Vec<String> = tx
            .state_by_range("loan2", "")
            .unwrap()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["loan2"]);

        let keys: Vec<String> = tx
            .state_by_range("", "loan2")
            .unwrap()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["loan1"]);
    }

    #[test]
    fn history_is_namespaced() {
        let state = InMemoryWorldState::default();
        put(&state, "loan", "k", b"1");
        put(&state, "pokemon", "k", b"2");

        let tx = Transaction::begin(&state, "loan").unwrap();
        let values: Vec<Option<Vec<u8>>> = tx.history_for_key("k").unwrap().map(|r| r.value).collect();
        assert_eq!(values, vec![Some(b"1".to_vec())]);
    }

    #[test]
    fn invalid_keys_and_namespaces_rejected() {
        let state = InMemoryWorldState::default();
        assert!(matches!(
            Transaction::begin(&state, "bad ns"),
            Err(StateError::InvalidInput(_))
        ));

        let mut tx = Transaction::begin(&state, "loan").unwrap();
        assert!(tx.put_state("", b"v".to_vec()).is_err());
        assert!(tx.put_state("a\0b", b"v".to_vec()).is_err());
        assert!(tx.get_state("").is_err());
        assert!(tx.del_state("").is_err());
        assert!(tx.is_read_only());
    }
}

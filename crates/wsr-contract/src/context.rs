use wsr_state::Transaction;
use wsr_types::TxId;

/// Per-invocation context handed to contract functions.
///
/// Wraps the transaction every read and write of one invocation goes
/// through. The ledger decides whether it is committed or discarded.
#[derive(Debug)]
pub struct TxContext<'a> {
    stub: Transaction<'a>,
}

impl<'a> TxContext<'a> {
    pub fn new(stub: Transaction<'a>) -> Self {
        Self { stub }
    }

    pub fn tx_id(&self) -> TxId {
        self.stub.tx_id()
    }

    pub fn namespace(&self) -> &str {
        self.stub.namespace()
    }

    /// Raw world-state access for this invocation.
    pub fn stub(&mut self) -> &mut Transaction<'a> {
        &mut self.stub
    }

    pub fn into_transaction(self) -> Transaction<'a> {
        self.stub
    }
}

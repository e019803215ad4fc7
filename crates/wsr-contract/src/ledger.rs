use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use wsr_state::{CommitReceipt, InMemoryWorldState, StateBackend, Transaction};

use crate::context::TxContext;
use crate::contracts::{default_contracts, Contract};
use crate::error::{ContractError, ContractResult};

/// Result of a committed submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Committed<T> {
    pub value: T,
    pub receipt: CommitReceipt,
}

/// Handle to a world state and the contracts hosted on it.
///
/// Opened once per process and shared by reference. Every submission runs
/// in a fresh transaction that commits if the contract function succeeds
/// and is discarded if it fails.
pub struct Ledger {
    backend: Arc<dyn StateBackend>,
    contracts: BTreeMap<&'static str, Box<dyn Contract>>,
}

impl Ledger {
    /// A ledger with no contracts registered.
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        Self {
            backend,
            contracts: BTreeMap::new(),
        }
    }

    pub fn with_default_contracts(backend: Arc<dyn StateBackend>) -> Self {
        let mut ledger = Self::new(backend);
        for contract in default_contracts() {
            ledger.register(contract);
        }
        ledger
    }

    /// Volatile ledger with the default contracts.
    pub fn in_memory() -> Self {
        Self::with_default_contracts(Arc::new(InMemoryWorldState::default()))
    }

    /// Register a contract, replacing any contract of the same name.
    pub fn register(&mut self, contract: Box<dyn Contract>) -> Option<Box<dyn Contract>> {
        self.contracts.insert(contract.name(), contract)
    }

    pub fn contract(&self, name: &str) -> ContractResult<&dyn Contract> {
        self.contracts
            .get(name)
            .map(|c| &**c)
            .ok_or_else(|| ContractError::UnknownContract(name.to_string()))
    }

    /// Registered contracts in name order.
    pub fn contracts(&self) -> impl Iterator<Item = &dyn Contract> + '_ {
        self.contracts.values().map(|c| &**c)
    }

    pub fn backend(&self) -> &Arc<dyn StateBackend> {
        &self.backend
    }

    pub fn height(&self) -> ContractResult<u64> {
        Ok(self.backend.height()?)
    }

    /// Run `f` in a new transaction on `namespace` and commit its writes.
    pub fn submit<T, F>(&self, namespace: &str, f: F) -> ContractResult<Committed<T>>
    where
        F: FnOnce(&mut TxContext<'_>) -> ContractResult<T>,
    {
        let mut ctx = TxContext::new(Transaction::begin(&*self.backend, namespace)?);
        let tx_id = ctx.tx_id();

        let value = match f(&mut ctx) {
            Ok(value) => value,
            Err(e) => {
                debug!(tx = %tx_id, namespace, error = %e, "submission rejected");
                ctx.into_transaction().discard();
                return Err(e);
            }
        };

        let receipt = ctx.into_transaction().commit().map_err(|e| {
            let err = ContractError::from(e);
            if err.is_conflict() {
                warn!(tx = %tx_id, namespace, error = %err, "submission lost a commit race");
            }
            err
        })?;
        Ok(Committed { value, receipt })
    }

    /// Run `f` against current state. Writes it stages are discarded.
    pub fn evaluate<T, F>(&self, namespace: &str, f: F) -> ContractResult<T>
    where
        F: FnOnce(&mut TxContext<'_>) -> ContractResult<T>,
    {
        let mut ctx = TxContext::new(Transaction::begin(&*self.backend, namespace)?);
        let result = f(&mut ctx);
        ctx.into_transaction().discard();
        result
    }

    /// Submit `function` of `contract` with string arguments.
    pub fn invoke(
        &self,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> ContractResult<Committed<Value>> {
        let contract = self.resolve(contract, function)?;
        self.submit(contract.name(), |ctx| contract.invoke(ctx, function, args))
    }

    /// Evaluate `function` of `contract` with string arguments.
    pub fn query(&self, contract: &str, function: &str, args: &[String]) -> ContractResult<Value> {
        let contract = self.resolve(contract, function)?;
        self.evaluate(contract.name(), |ctx| contract.invoke(ctx, function, args))
    }

    /// Seed every contract, each in its own transaction.
    pub fn init_ledger(&self) -> ContractResult<Vec<(&'static str, CommitReceipt)>> {
        let mut receipts = Vec::with_capacity(self.contracts.len());
        for contract in self.contracts() {
            let committed = self.submit(contract.name(), |ctx| contract.init_ledger(ctx))?;
            receipts.push((contract.name(), committed.receipt));
        }
        info!(contracts = receipts.len(), height = self.height()?, "ledger initialized");
        Ok(receipts)
    }

    fn resolve(&self, contract: &str, function: &str) -> ContractResult<&dyn Contract> {
        let resolved = self.contract(contract)?;
        if !resolved.has_function(function) {
            return Err(ContractError::UnknownFunction {
                contract: contract.to_string(),
                function: function.to_string(),
            });
        }
        Ok(resolved)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("contracts", &self.contracts.keys().collect::<Vec<_>>())
            .finish()
    }
}

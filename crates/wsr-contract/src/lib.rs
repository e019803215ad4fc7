//! Contracts for World State Records (WSR).
//!
//! A contract is a set of named transaction functions over one namespace of
//! the world state. Contracts never touch the world state directly: they go
//! through a [`RecordStore`] bound to the [`TxContext`] of the invocation,
//! and the [`Ledger`] commits or discards the whole invocation.
//!
//! # Example
//!
//! ```
//! use wsr_contract::{Ledger, LoanContract};
//!
//! let ledger = Ledger::in_memory();
//! ledger.init_ledger().unwrap();
//! let loan = ledger
//!     .evaluate(LoanContract::NAME, |ctx| LoanContract.read_loan_application(ctx, "loan1"))
//!     .unwrap();
//! assert_eq!(loan.applicant, "Afraz");
//! ```

pub mod context;
pub mod contracts;
pub mod error;
pub mod ledger;
pub mod record;
pub mod store;

pub use context::TxContext;
pub use contracts::{
    default_contracts, BankContract, Contract, Identity, IdentityContract, LoanApplication,
    LoanContract, NewIdentity, Pokemon, PokemonContract,
};
pub use error::{ContractError, ContractResult};
pub use ledger::{Committed, Ledger};
pub use record::Record;
pub use store::{HistoryEntry, RecordHistory, RecordStore, Records};

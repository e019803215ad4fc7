//! The contracts a ledger hosts by default.
//!
//! Each contract owns the world-state namespace named after it and exposes
//! its functions both as typed methods and through string dispatch.

pub mod bank;
pub mod identity;
pub mod loan;
pub mod pokemon;

use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::context::TxContext;
use crate::error::{ContractError, ContractResult};

pub use bank::BankContract;
pub use identity::{Identity, IdentityContract, NewIdentity};
pub use loan::{LoanApplication, LoanContract};
pub use pokemon::{Pokemon, PokemonContract};

/// A named set of transaction functions over one namespace.
pub trait Contract: Send + Sync {
    /// Contract name, also its world-state namespace.
    fn name(&self) -> &'static str;

    /// Function names accepted by [`invoke`](Self::invoke).
    fn functions(&self) -> &'static [&'static str];

    /// Seed the namespace with the contract's fixed record set.
    fn init_ledger(&self, ctx: &mut TxContext<'_>) -> ContractResult<()>;

    /// Run `function` with string arguments and return its result as JSON.
    fn invoke(&self, ctx: &mut TxContext<'_>, function: &str, args: &[String])
        -> ContractResult<Value>;

    fn has_function(&self, function: &str) -> bool {
        self.functions().contains(&function)
    }
}

/// Positional string arguments of one call.
pub(crate) struct Args<'a> {
    function: &'a str,
    values: &'a [String],
}

impl<'a> Args<'a> {
    /// Check the arity of `function`.
    pub(crate) fn expect(function: &'a str, values: &'a [String], arity: usize) -> ContractResult<Self> {
        if values.len() != arity {
            return Err(ContractError::invalid_argument(format!(
                "{function} expects {arity} argument(s), got {}",
                values.len()
            )));
        }
        Ok(Self { function, values })
    }

    pub(crate) fn str(&self, index: usize) -> &'a str {
        self.values.get(index).map(String::as_str).unwrap_or_default()
    }

    pub(crate) fn parse<T>(&self, index: usize, name: &str) -> ContractResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.str(index);
        raw.trim().parse().map_err(|e| {
            ContractError::invalid_argument(format!(
                "{}: cannot parse {name} from {raw:?}: {e}",
                self.function
            ))
        })
    }
}

pub(crate) fn to_json<T: Serialize>(value: T) -> ContractResult<Value> {
    serde_json::to_value(value).map_err(|e| {
        ContractError::Infrastructure(wsr_state::StateError::Serialization(e.to_string()))
    })
}

pub(crate) fn unknown_function(contract: &str, function: &str) -> ContractError {
    ContractError::UnknownFunction {
        contract: contract.to_string(),
        function: function.to_string(),
    }
}

/// Every built-in contract.
pub fn default_contracts() -> Vec<Box<dyn Contract>> {
    vec![
        Box::new(LoanContract),
        Box::new(PokemonContract),
        Box::new(IdentityContract),
        Box::new(BankContract),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn arity_is_checked() {
        let values = strings(&["a"]);
        assert!(Args::expect("F", &values, 1).is_ok());
        let err = Args::expect("F", &values, 2).err().unwrap();
        assert!(matches!(err, ContractError::InvalidArgument(_)));
    }

    #[test]
    fn parse_reports_argument_name() {
        let values = strings(&["12", "x"]);
        let args = Args::expect("F", &values, 2).unwrap();
        assert_eq!(args.parse::<i64>(0, "amount").unwrap(), 12);
        let err = args.parse::<i64>(1, "term").unwrap_err();
        assert!(err.to_string().contains("term"));
    }

    #[test]
    fn default_contract_names_are_unique() {
        let mut names: Vec<&str> = default_contracts().iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names, vec!["bank", "identity", "loan", "pokemon"]);
    }
}

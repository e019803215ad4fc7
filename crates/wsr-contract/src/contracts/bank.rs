use serde_json::Value;

use super::{to_json, unknown_function, Args, Contract};
use crate::context::TxContext;
use crate::error::ContractResult;

/// Liveness contract. Stores nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct BankContract;

impl BankContract {
    pub const NAME: &'static str = "bank";

    pub fn ping(&self) -> &'static str {
        "Pong"
    }
}

impl Contract for BankContract {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn functions(&self) -> &'static [&'static str] {
        &["InitLedger", "Ping"]
    }

    fn init_ledger(&self, _ctx: &mut TxContext<'_>) -> ContractResult<()> {
        Ok(())
    }

    fn invoke(
        &self,
        ctx: &mut TxContext<'_>,
        function: &str,
        args: &[String],
    ) -> ContractResult<Value> {
        match function {
            "InitLedger" => {
                Args::expect(function, args, 0)?;
                self.init_ledger(ctx)?;
                Ok(Value::Null)
            }
            "Ping" => {
                Args::expect(function, args, 0)?;
                to_json(self.ping())
            }
            other => Err(unknown_function(Self::NAME, other)),
        }
    }
}

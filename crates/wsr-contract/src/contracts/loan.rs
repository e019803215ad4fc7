use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{to_json, unknown_function, Args, Contract};
use crate::context::TxContext;
use crate::error::{ContractError, ContractResult};
use crate::record::Record;
use crate::store::{HistoryEntry, RecordStore};

pub const STATUS_PENDING: &str = "Pending";
pub const STATUS_APPROVED: &str = "Approved";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplication {
    pub id: String,
    pub applicant: String,
    pub amount: i64,
    /// Term in months.
    pub term: i64,
    pub interest_rate: f64,
    pub status: String,
}

impl Record for LoanApplication {
    const KIND: &'static str = "loan application";

    fn key(&self) -> &str {
        &self.id
    }
}

const LOANS: RecordStore<LoanApplication> = RecordStore::new();

/// Loan application lifecycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoanContract;

impl LoanContract {
    pub const NAME: &'static str = "loan";

    pub fn create_loan_application(
        &self,
        ctx: &mut TxContext<'_>,
        id: &str,
        applicant: &str,
        amount: i64,
        term: i64,
        interest_rate: f64,
    ) -> ContractResult<LoanApplication> {
        if !interest_rate.is_finite() {
            return Err(ContractError::invalid_argument(format!(
                "interest rate must be a finite number, got {interest_rate}"
            )));
        }
        let loan = LoanApplication {
            id: id.to_string(),
            applicant: applicant.to_string(),
            amount,
            term,
            interest_rate,
            status: STATUS_PENDING.to_string(),
        };
        LOANS.create(ctx, &loan)?;
        Ok(loan)
    }

    pub fn read_loan_application(
        &self,
        ctx: &mut TxContext<'_>,
        id: &str,
    ) -> ContractResult<LoanApplication> {
        LOANS.read(ctx, id)
    }

    /// Move a loan to `status`. Setting the status it already has is refused.
    pub fn update_loan_status(
        &self,
        ctx: &mut TxContext<'_>,
        id: &str,
        status: &str,
    ) -> ContractResult<LoanApplication> {
        if status.trim().is_empty() {
            return Err(ContractError::invalid_argument("status must not be empty"));
        }
        LOANS.update(ctx, id, |loan| {
            if loan.status == status {
                return Err(ContractError::AlreadyInTargetState {
                    kind: LoanApplication::KIND,
                    key: loan.id.clone(),
                    state: status.to_string(),
                });
            }
            loan.status = status.to_string();
            Ok(())
        })
    }

    pub fn delete_loan_application(&self, ctx: &mut TxContext<'_>, id: &str) -> ContractResult<()> {
        LOANS.delete(ctx, id)
    }

    pub fn get_all_loan_applications(
        &self,
        ctx: &mut TxContext<'_>,
    ) -> ContractResult<Vec<LoanApplication>> {
        LOANS.list_all(ctx)?.collect()
    }

    pub fn loan_exists(&self, ctx: &mut TxContext<'_>, id: &str) -> ContractResult<bool> {
        LOANS.exists(ctx, id)
    }

    pub fn get_loan_history(
        &self,
        ctx: &mut TxContext<'_>,
        id: &str,
    ) -> ContractResult<Vec<HistoryEntry<LoanApplication>>> {
        LOANS.history(ctx, id)?.collect()
    }
}

impl Contract for LoanContract {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn functions(&self) -> &'static [&'static str] {
        &[
            "InitLedger",
            "CreateLoanApplication",
            "ReadLoanApplication",
            "UpdateLoanStatus",
            "DeleteLoanApplication",
            "GetAllLoanApplications",
            "LoanExists",
            "GetLoanHistory",
        ]
    }

    fn init_ledger(&self, ctx: &mut TxContext<'_>) -> ContractResult<()> {
        let seed = [
            LoanApplication {
                id: "loan1".into(),
                applicant: "Afraz".into(),
                amount: 10_000,
                term: 12,
                interest_rate: 5.5,
                status: STATUS_PENDING.into(),
            },
            LoanApplication {
                id: "loan2".into(),
                applicant: "Alam".into(),
                amount: 5_000,
                term: 6,
                interest_rate: 4.2,
                status: STATUS_APPROVED.into(),
            },
        ];
        for loan in &seed {
            LOANS.put(ctx, loan)?;
        }
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
            "CreateLoanApplication" => {
                let a = Args::expect(function, args, 5)?;
                let loan = self.create_loan_application(
                    ctx,
                    a.str(0),
                    a.str(1),
                    a.parse(2, "amount")?,
                    a.parse(3, "term")?,
                    a.parse(4, "interestRate")?,
                )?;
                to_json(loan)
            }
            "ReadLoanApplication" => {
                let a = Args::expect(function, args, 1)?;
                to_json(self.read_loan_application(ctx, a.str(0))?)
            }
            "UpdateLoanStatus" => {
                let a = Args::expect(function, args, 2)?;
                to_json(self.update_loan_status(ctx, a.str(0), a.str(1))?)
            }
            "DeleteLoanApplication" => {
                let a = Args::expect(function, args, 1)?;
                self.delete_loan_application(ctx, a.str(0))?;
                Ok(Value::Null)
            }
            "GetAllLoanApplications" => {
                Args::expect(function, args, 0)?;
                to_json(self.get_all_loan_applications(ctx)?)
            }
            "LoanExists" => {
                let a = Args::expect(function, args, 1)?;
                to_json(self.loan_exists(ctx, a.str(0))?)
            }
            "GetLoanHistory" => {
                let a = Args::expect(function, args, 1)?;
                let lines: Vec<String> = self
                    .get_loan_history(ctx, a.str(0))?
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                to_json(lines)
            }
            other => Err(unknown_function(Self::NAME, other)),
        }
    }
}

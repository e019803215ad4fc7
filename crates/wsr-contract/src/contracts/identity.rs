use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{to_json, unknown_function, Args, Contract};
use crate::context::TxContext;
use crate::error::ContractResult;
use crate::record::Record;
use crate::store::{HistoryEntry, RecordStore};

/// Personal identity details. Every field is free text; unset fields are
/// empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    pub id: String,
    pub title: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub name_on_card: String,
    pub eleven_char_name: String,
    pub cnic: String,
    pub cnic_issue_date: String,
    pub cnic_expiry_date: String,
    #[serde(rename = "oldNIC")]
    pub old_nic: String,
    pub passport_number: String,
    pub nationality: String,
    pub passport_issue_date: String,
    pub passport_expiry_date: String,
    pub date_of_birth: String,
    pub place_of_birth: String,
    pub gender: String,
    pub father_or_husband_name: String,
    pub mother_maiden_name: String,
    pub marital_status: String,
    pub education: String,
    pub political_affiliation: String,
    pub tax_payer: String,
    pub address: String,
    pub landline: String,
    pub postal_code: String,
    pub no_of_dependents: String,
    pub ntn: String,
    pub residence_type: String,
    pub apartment_or_house: String,
    pub residence_nature: String,
    pub mobile_number: String,
}

impl Record for Identity {
    const KIND: &'static str = "identity";

    fn key(&self) -> &str {
        &self.id
    }
}

const IDENTITIES: RecordStore<Identity> = RecordStore::new();

/// Fields accepted when an identity is first issued.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIdentity {
    pub id: String,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub cnic: String,
    pub date_of_birth: String,
    pub gender: String,
    pub mobile_number: String,
}

impl From<NewIdentity> for Identity {
    fn from(new: NewIdentity) -> Self {
        Self {
            id: new.id,
            title: new.title,
            first_name: new.first_name,
            last_name: new.last_name,
            cnic: new.cnic,
            date_of_birth: new.date_of_birth,
            gender: new.gender,
            mobile_number: new.mobile_number,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityContract;

impl IdentityContract {
    pub const NAME: &'static str = "identity";

    pub fn create_identity(
        &self,
        ctx: &mut TxContext<'_>,
        new: NewIdentity,
    ) -> ContractResult<Identity> {
        let identity = Identity::from(new);
        IDENTITIES.create(ctx, &identity)?;
        Ok(identity)
    }

    pub fn read_identity(&self, ctx: &mut TxContext<'_>, id: &str) -> ContractResult<Identity> {
        IDENTITIES.read(ctx, id)
    }

    /// Replace the contact details of an existing identity.
    pub fn update_identity(
        &self,
        ctx: &mut TxContext<'_>,
        id: &str,
        mobile: &str,
        address: &str,
    ) -> ContractResult<Identity> {
        IDENTITIES.update(ctx, id, |identity| {
            identity.mobile_number = mobile.to_string();
            identity.address = address.to_string();
            Ok(())
        })
    }

    pub fn delete_identity(&self, ctx: &mut TxContext<'_>, id: &str) -> ContractResult<()> {
        IDENTITIES.delete(ctx, id)
    }

    pub fn identity_exists(&self, ctx: &mut TxContext<'_>, id: &str) -> ContractResult<bool> {
        IDENTITIES.exists(ctx, id)
    }

    pub fn get_all_identities(&self, ctx: &mut TxContext<'_>) -> ContractResult<Vec<Identity>> {
        IDENTITIES.list_all(ctx)?.collect()
    }

    pub fn get_identity_history(
        &self,
        ctx: &mut TxContext<'_>,
        id: &str,
    ) -> ContractResult<Vec<HistoryEntry<Identity>>> {
        IDENTITIES.history(ctx, id)?.collect()
    }
}

impl Contract for IdentityContract {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn functions(&self) -> &'static [&'static str] {
        &[
            "InitLedger",
            "CreateIdentity",
            "ReadIdentity",
            "UpdateIdentity",
            "DeleteIdentity",
            "IdentityExists",
            "GetAllIdentities",
            "GetIdentityHistory",
        ]
    }

    fn init_ledger(&self, ctx: &mut TxContext<'_>) -> ContractResult<()> {
        let john = Identity::from(NewIdentity {
            id: "identity1".into(),
            title: "Mr.".into(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            cnic: "12345-6789012-3".into(),
            date_of_birth: "01-01-1980".into(),
            gender: "Male".into(),
            mobile_number: "03001234567".into(),
        });
        IDENTITIES.put(ctx, &john)
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
            "CreateIdentity" => {
                let a = Args::expect(function, args, 8)?;
                let new = NewIdentity {
                    id: a.str(0).into(),
                    title: a.str(1).into(),
                    first_name: a.str(2).into(),
                    last_name: a.str(3).into(),
                    cnic: a.str(4).into(),
                    date_of_birth: a.str(5).into(),
                    gender: a.str(6).into(),
                    mobile_number: a.str(7).into(),
                };
                to_json(self.create_identity(ctx, new)?)
            }
            "ReadIdentity" => {
                let a = Args::expect(function, args, 1)?;
                to_json(self.read_identity(ctx, a.str(0))?)
            }
            "UpdateIdentity" => {
                let a = Args::expect(function, args, 3)?;
                to_json(self.update_identity(ctx, a.str(0), a.str(1), a.str(2))?)
            }
            "DeleteIdentity" => {
                let a = Args::expect(function, args, 1)?;
                self.delete_identity(ctx, a.str(0))?;
                Ok(Value::Null)
            }
            "IdentityExists" => {
                let a = Args::expect(function, args, 1)?;
                to_json(self.identity_exists(ctx, a.str(0))?)
            }
            "GetAllIdentities" => {
                Args::expect(function, args, 0)?;
                to_json(self.get_all_identities(ctx)?)
            }
            "GetIdentityHistory" => {
                let a = Args::expect(function, args, 1)?;
                let lines: Vec<String> = self
                    .get_identity_history(ctx, a.str(0))?
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                to_json(lines)
            }
            other => Err(unknown_function(Self::NAME, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContractError;
    use crate::ledger::Ledger;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn json_uses_camel_case_and_old_nic() {
        let identity = Identity {
            id: "x".into(),
            old_nic: "123".into(),
            first_name: "Jane".into(),
            ..Identity::default()
        };
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["oldNIC"], "123");
        assert_eq!(json["firstName"], "Jane");
        assert_eq!(json.as_object().unwrap().len(), 33);
    }

    #[test]
    fn seeded_identity() {
        let ledger = Ledger::in_memory();
        ledger.init_ledger().unwrap();
        let john = ledger
            .evaluate(IdentityContract::NAME, |ctx| {
                IdentityContract.read_identity(ctx, "identity1")
            })
            .unwrap();
        assert_eq!(john.first_name, "John");
        assert_eq!(john.cnic, "12345-6789012-3");
        assert!(john.address.is_empty());
    }

    #[test]
    fn update_keeps_other_fields() {
        let ledger = Ledger::in_memory();
        ledger.init_ledger().unwrap();
        ledger
            .invoke(
                "identity",
                "UpdateIdentity",
                &args(&["identity1", "03110000000", "House 1, Lahore"]),
            )
            .unwrap();
        let read = ledger.query("identity", "ReadIdentity", &args(&["identity1"])).unwrap();
        assert_eq!(read["mobileNumber"], "03110000000");
        assert_eq!(read["address"], "House 1, Lahore");
        assert_eq!(read["lastName"], "Doe");
    }

    #[test]
    fn create_read_delete() {
        let ledger = Ledger::in_memory();
        ledger
            .invoke(
                "identity",
                "CreateIdentity",
                &args(&[
                    "identity2", "Ms.", "Ayesha", "Khan", "11111-2222222-3", "02-02-1990",
                    "Female", "03211234567",
                ]),
            )
            .unwrap();
        let all = ledger.query("identity", "GetAllIdentities", &args(&[])).unwrap();
        assert_eq!(all.as_array().unwrap().len(), 1);

        ledger
            .invoke("identity", "DeleteIdentity", &args(&["identity2"]))
            .unwrap();
        let err = ledger
            .query("identity", "ReadIdentity", &args(&["identity2"]))
            .unwrap_err();
        assert!(matches!(err, ContractError::NotFound { .. }));

        let lines = ledger
            .query("identity", "GetIdentityHistory", &args(&["identity2"]))
            .unwrap();
        assert_eq!(lines.as_array().unwrap().len(), 2);
    }

    #[test]
    fn update_missing_identity() {
        let ledger = Ledger::in_memory();
        let err = ledger
            .invoke("identity", "UpdateIdentity", &args(&["nobody", "1", "2"]))
            .unwrap_err();
        assert!(matches!(err, ContractError::NotFound { .. }));
    }
}

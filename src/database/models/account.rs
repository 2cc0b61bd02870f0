use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{RecordMeta, UnknownVariant};
use crate::database::field_set::FieldSet;
use crate::database::resource::{Resource, ResourceSchema};

pub const ACCOUNT_SCHEMA: ResourceSchema = ResourceSchema {
    name: "account",
    table: "accounts.account_list",
    owner_column: "agent_id",
    columns: "id, agent_id, client_id, account_type, opening_date, initial_deposit, currency, branch_id, \
              status, created_at, updated_at, deleted_at, deleted_by, delete_reason",
    writable: &[
        "agent_id",
        "client_id",
        "account_type",
        "opening_date",
        "initial_deposit",
        "currency",
        "branch_id",
    ],
    order_by: "opening_date DESC, created_at DESC",
    search_columns: &["account_type", "currency", "status", "client_id", "branch_id"],
    filter_columns: &["client_id", "branch_id"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Savings,
    Checking,
    Business,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "Savings",
            AccountType::Checking => "Checking",
            AccountType::Business => "Business",
        }
    }
}

impl TryFrom<String> for AccountType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Savings" => Ok(AccountType::Savings),
            "Checking" => Ok(AccountType::Checking),
            "Business" => Ok(AccountType::Business),
            _ => Err(UnknownVariant(value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub client_id: Uuid,
    #[sqlx(try_from = "String")]
    pub account_type: AccountType,
    pub opening_date: NaiveDate,
    pub initial_deposit: Decimal,
    pub currency: String,
    pub branch_id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl Resource for Account {
    const SCHEMA: &'static ResourceSchema = &ACCOUNT_SCHEMA;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Uuid {
        self.agent_id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewAccount {
    pub client_id: Uuid,
    pub account_type: AccountType,
    /// Defaults to today when omitted
    #[serde(default)]
    pub opening_date: Option<NaiveDate>,
    pub initial_deposit: Decimal,
    pub currency: String,
    pub branch_id: Uuid,
}

impl NewAccount {
    pub fn field_set(&self) -> FieldSet {
        let mut fields = FieldSet::new();
        fields
            .set("client_id", self.client_id)
            .set("account_type", self.account_type.as_str())
            .set_if("opening_date", self.opening_date)
            .set("initial_deposit", self.initial_deposit)
            .set("currency", self.currency.trim().to_ascii_uppercase())
            .set("branch_id", self.branch_id);
        fields
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountPatch {
    pub client_id: Option<Uuid>,
    pub account_type: Option<AccountType>,
    pub opening_date: Option<NaiveDate>,
    pub initial_deposit: Option<Decimal>,
    pub currency: Option<String>,
    pub branch_id: Option<Uuid>,
    /// Transfers the account to another agent
    pub new_agent_id: Option<Uuid>,
}

impl AccountPatch {
    pub fn field_set(&self) -> FieldSet {
        let mut fields = FieldSet::new();
        fields
            .set_if("client_id", self.client_id)
            .set_if("account_type", self.account_type.map(|t| t.as_str()))
            .set_if("opening_date", self.opening_date)
            .set_if("initial_deposit", self.initial_deposit)
            .set_if("currency", self.currency.as_deref().map(|c| c.trim().to_ascii_uppercase()))
            .set_if("branch_id", self.branch_id)
            .set_if("agent_id", self.new_agent_id);
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::field_set::FieldValue;

    #[test]
    fn new_account_normalizes_currency_and_skips_missing_date() {
        let input: NewAccount = serde_json::from_value(serde_json::json!({
            "client_id": Uuid::nil(),
            "account_type": "Savings",
            "initial_deposit": "100.00",
            "currency": " usd ",
            "branch_id": Uuid::nil(),
        }))
        .unwrap();

        let fields = input.field_set();
        assert!(!fields.contains("opening_date"));
        assert_eq!(fields.get("currency"), Some(&FieldValue::from("USD")));
        assert_eq!(fields.get("account_type"), Some(&FieldValue::from("Savings")));
    }

    #[test]
    fn patch_maps_transfer_to_owner_column() {
        let owner = Uuid::new_v4();
        let patch = AccountPatch { new_agent_id: Some(owner), ..Default::default() };

        let fields = patch.field_set();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("agent_id"), Some(&FieldValue::from(owner)));
    }

    #[test]
    fn empty_patch_has_no_fields() {
        assert!(AccountPatch::default().field_set().is_empty());
    }
}

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Postgres;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgTypeInfo, PgValueRef};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::validate::{Validate, validate_one_of, validate_optional, validate_required};
use crate::errors::AppError;
use crate::models::contact::Contact;
use crate::models::double_option;
use crate::models::ledger::LedgerRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalStatus {
    Draft,
    Approved,
}

impl JournalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalStatus::Draft => "draft",
            JournalStatus::Approved => "approved",
        }
    }
}

impl FromStr for JournalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(JournalStatus::Draft),
            "approved" => Ok(JournalStatus::Approved),
            other => Err(format!("unknown journal status: {other}")),
        }
    }
}

impl fmt::Display for JournalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl sqlx::Type<Postgres> for JournalStatus {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, Postgres> for JournalStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let raw = <&str as sqlx::Decode<Postgres>>::decode(value)?;
        Ok(raw.parse()?)
    }
}

const STATUS_NAMES: [&str; 2] = ["draft", "approved"];

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Journal {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub election_id: Option<Uuid>,
    pub journal_date: Option<NaiveDate>,
    pub description: String,
    pub contact_id: Option<Uuid>,
    pub classification: Option<String>,
    pub non_monetary_basis: Option<String>,
    pub notes: Option<String>,
    pub amount_political_grant: i64,
    pub amount_political_fund: i64,
    pub amount_public_subsidy: i64,
    pub is_receipt_hard_to_collect: bool,
    pub receipt_hard_to_collect_reason: Option<String>,
    pub status: JournalStatus,
    pub is_asset_acquisition: bool,
    pub asset_type: Option<String>,
    pub submitted_by_user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Journal {
    pub fn ledger(&self) -> Result<LedgerRef, AppError> {
        LedgerRef::from_ids(self.organization_id, self.election_id)
            .map_err(|e| AppError::Internal(format!("journal {} has no single ledger: {e}", self.id)))
    }

    pub fn fiscal_year(&self) -> Option<i32> {
        self.journal_date.map(|d| d.year())
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JournalEntry {
    pub id: Uuid,
    pub journal_id: Uuid,
    pub account_code: String,
    pub sub_account_id: Option<Uuid>,
    pub debit_amount: i64,
    pub credit_amount: i64,
}

/// A journal with its entries and counterparty, as returned by detail,
/// export and sync reads.
#[derive(Debug, Clone, Serialize)]
pub struct JournalDetail {
    #[serde(flatten)]
    pub journal: Journal,
    pub entries: Vec<JournalEntry>,
    pub contact: Option<Contact>,
}

/// One debit/credit line of a journal being written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEntry {
    pub account_code: Option<String>,
    pub sub_account_id: Option<Uuid>,
    #[serde(default)]
    pub debit_amount: i64,
    #[serde(default)]
    pub credit_amount: i64,
}

/// Header fields of a journal, independent of which ledger it belongs to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalHeader {
    pub journal_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub contact_id: Option<Uuid>,
    pub classification: Option<String>,
    pub non_monetary_basis: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub amount_political_grant: i64,
    #[serde(default)]
    pub amount_political_fund: i64,
    #[serde(default)]
    pub amount_public_subsidy: i64,
    #[serde(default)]
    pub is_receipt_hard_to_collect: bool,
    pub receipt_hard_to_collect_reason: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub is_asset_acquisition: bool,
    pub asset_type: Option<String>,
}

impl JournalHeader {
    /// Requested status; journals are approved unless saved as a draft.
    pub fn status(&self) -> JournalStatus {
        self.status
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(JournalStatus::Approved)
    }

    pub fn fiscal_year(&self) -> Option<i32> {
        self.journal_date.map(|d| d.year())
    }

    fn is_blank(value: &Option<String>) -> bool {
        value.as_deref().map(str::trim).unwrap_or_default().is_empty()
    }
}

impl Validate for JournalHeader {
    fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.status.is_some() {
            errors.extend(validate_one_of(self.status.as_deref(), "status", &STATUS_NAMES));
        }
        if self.status() == JournalStatus::Approved && self.journal_date.is_none() {
            errors.push("Journal date is required for approved journals".to_string());
        }
        errors.extend(validate_required(
            self.description.as_deref().unwrap_or_default(),
            "Description",
            500,
        ));
        errors.extend(validate_optional(self.notes.as_deref(), "Notes", 2000));
        for (value, name) in [
            (self.amount_political_grant, "amount_political_grant"),
            (self.amount_political_fund, "amount_political_fund"),
            (self.amount_public_subsidy, "amount_public_subsidy"),
        ] {
            if value < 0 {
                errors.push(format!("{name} must not be negative"));
            }
        }
        if self.is_receipt_hard_to_collect && Self::is_blank(&self.receipt_hard_to_collect_reason) {
            errors.push("A reason is required when the receipt is hard to collect".to_string());
        }
        if self.is_asset_acquisition && Self::is_blank(&self.asset_type) {
            errors.push("Asset type is required for asset acquisitions".to_string());
        }
        errors
    }
}

/// Debit and credit totals of a set of entries.
pub fn entry_totals(entries: &[NewEntry]) -> (i128, i128) {
    entries.iter().fold((0i128, 0i128), |(debit, credit), e| {
        (debit + i128::from(e.debit_amount), credit + i128::from(e.credit_amount))
    })
}

pub fn validate_entries(entries: &[NewEntry]) -> Vec<String> {
    let mut errors = Vec::new();
    if entries.is_empty() {
        errors.push("At least one journal entry is required".to_string());
        return errors;
    }
    for (i, entry) in entries.iter().enumerate() {
        let line = i + 1;
        if JournalHeader::is_blank(&entry.account_code) {
            errors.push(format!("Entry {line}: account_code is required"));
        }
        if entry.debit_amount < 0 || entry.credit_amount < 0 {
            errors.push(format!("Entry {line}: amounts must not be negative"));
        }
    }
    let (debit, credit) = entry_totals(entries);
    if debit != credit {
        errors.push(format!("Debit total {debit} does not equal credit total {credit}"));
    }
    errors
}

/// JSON input for creating a journal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewJournal {
    pub organization_id: Option<Uuid>,
    pub election_id: Option<Uuid>,
    #[serde(flatten)]
    pub header: JournalHeader,
    #[serde(default)]
    pub entries: Vec<NewEntry>,
}

impl Validate for NewJournal {
    fn validation_errors(&self) -> Vec<String> {
        let mut errors = self.header.validation_errors();
        errors.extend(validate_entries(&self.entries));
        if let Err(AppError::Validation(msg)) = LedgerRef::from_ids(self.organization_id, self.election_id) {
            errors.push(msg);
        }
        errors
    }
}

/// Partial journal update. The ledger and status cannot be changed here;
/// `entries`, when present, replaces every existing entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalUpdate {
    #[serde(default, deserialize_with = "double_option")]
    pub journal_date: Option<Option<NaiveDate>>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub classification: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub non_monetary_basis: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub amount_political_grant: Option<i64>,
    pub amount_political_fund: Option<i64>,
    pub amount_public_subsidy: Option<i64>,
    pub is_receipt_hard_to_collect: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub receipt_hard_to_collect_reason: Option<Option<String>>,
    pub is_asset_acquisition: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub asset_type: Option<Option<String>>,
    pub entries: Option<Vec<NewEntry>>,
}

impl JournalUpdate {
    /// Overlay the update on the stored journal, yielding the header to write.
    pub fn apply(&self, current: &Journal) -> JournalHeader {
        fn pick<T: Clone>(update: &Option<T>, current: &T) -> T {
            update.clone().unwrap_or_else(|| current.clone())
        }
        JournalHeader {
            journal_date: pick(&self.journal_date, &current.journal_date),
            description: Some(pick(&self.description, &current.description)),
            contact_id: pick(&self.contact_id, &current.contact_id),
            classification: pick(&self.classification, &current.classification),
            non_monetary_basis: pick(&self.non_monetary_basis, &current.non_monetary_basis),
            notes: pick(&self.notes, &current.notes),
            amount_political_grant: pick(&self.amount_political_grant, &current.amount_political_grant),
            amount_political_fund: pick(&self.amount_political_fund, &current.amount_political_fund),
            amount_public_subsidy: pick(&self.amount_public_subsidy, &current.amount_public_subsidy),
            is_receipt_hard_to_collect: pick(
                &self.is_receipt_hard_to_collect,
                &current.is_receipt_hard_to_collect,
            ),
            receipt_hard_to_collect_reason: pick(
                &self.receipt_hard_to_collect_reason,
                &current.receipt_hard_to_collect_reason,
            ),
            status: Some(current.status.as_str().to_string()),
            is_asset_acquisition: pick(&self.is_asset_acquisition, &current.is_asset_acquisition),
            asset_type: pick(&self.asset_type, &current.asset_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str, debit: i64, credit: i64) -> NewEntry {
        NewEntry {
            account_code: Some(code.to_string()),
            sub_account_id: None,
            debit_amount: debit,
            credit_amount: credit,
        }
    }

    fn valid_journal() -> NewJournal {
        NewJournal {
            organization_id: Some(Uuid::new_v4()),
            election_id: None,
            header: JournalHeader {
                journal_date: NaiveDate::from_ymd_opt(2024, 5, 1),
                description: Some("Office rent".into()),
                ..Default::default()
            },
            entries: vec![entry("EXP_OFFICE", 50_000, 0), entry("ASSET_CASH", 0, 50_000)],
        }
    }

    #[test]
    fn balanced_journal_is_valid() {
        assert!(valid_journal().validation_errors().is_empty());
    }

    #[test]
    fn unbalanced_entries_are_rejected() {
        let mut journal = valid_journal();
        journal.entries[1].credit_amount = 49_999;
        let errors = journal.validation_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("does not equal"));
    }

    #[test]
    fn entries_are_required() {
        let mut journal = valid_journal();
        journal.entries.clear();
        assert!(journal.validation_errors().iter().any(|e| e.contains("At least one")));
    }

    #[test]
    fn approved_needs_date_but_draft_does_not() {
        let mut journal = valid_journal();
        journal.header.journal_date = None;
        assert_eq!(journal.validation_errors().len(), 1);
        journal.header.status = Some("draft".into());
        assert!(journal.validation_errors().is_empty());
        assert_eq!(journal.header.status(), JournalStatus::Draft);
    }

    #[test]
    fn conditional_reasons_are_enforced() {
        let mut journal = valid_journal();
        journal.header.is_receipt_hard_to_collect = true;
        journal.header.is_asset_acquisition = true;
        assert_eq!(journal.validation_errors().len(), 2);
        journal.header.receipt_hard_to_collect_reason = Some("Vending machine".into());
        journal.header.asset_type = Some("vehicle".into());
        assert!(journal.validation_errors().is_empty());
    }

    #[test]
    fn ledger_must_be_exactly_one() {
        let mut journal = valid_journal();
        journal.election_id = Some(Uuid::new_v4());
        assert_eq!(journal.validation_errors().len(), 1);
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let mut journal = valid_journal();
        journal.entries = vec![entry("EXP_OFFICE", -5, -5)];
        assert!(journal.validation_errors().iter().any(|e| e.contains("negative")));
    }

    #[test]
    fn totals_do_not_overflow() {
        let entries = vec![entry("A", i64::MAX, 0), entry("B", i64::MAX, 0)];
        let (debit, credit) = entry_totals(&entries);
        assert_eq!(debit, 2 * i128::from(i64::MAX));
        assert_eq!(credit, 0);
    }

    #[test]
    fn new_journal_flattens_header_fields() {
        let json = serde_json::json!({
            "organization_id": Uuid::nil(),
            "journal_date": "2024-03-31",
            "description": "Donation",
            "amount_political_fund": 1000,
            "entries": [{"account_code": "ASSET_CASH", "debit_amount": 1000}]
        });
        let journal: NewJournal = serde_json::from_value(json).unwrap();
        assert_eq!(journal.header.description.as_deref(), Some("Donation"));
        assert_eq!(journal.header.amount_political_fund, 1000);
        assert_eq!(journal.header.fiscal_year(), Some(2024));
        assert_eq!(journal.entries[0].credit_amount, 0);
    }

    #[test]
    fn update_overlays_stored_values() {
        let now = Utc::now();
        let stored = Journal {
            id: Uuid::new_v4(),
            organization_id: Some(Uuid::new_v4()),
            election_id: None,
            journal_date: NaiveDate::from_ymd_opt(2024, 1, 10),
            description: "Printing".into(),
            contact_id: None,
            classification: None,
            non_monetary_basis: None,
            notes: Some("old".into()),
            amount_political_grant: 0,
            amount_political_fund: 0,
            amount_public_subsidy: 0,
            is_receipt_hard_to_collect: false,
            receipt_hard_to_collect_reason: None,
            status: JournalStatus::Draft,
            is_asset_acquisition: false,
            asset_type: None,
            submitted_by_user_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        let update: JournalUpdate =
            serde_json::from_str(r#"{"description": "Leaflets", "notes": null}"#).unwrap();
        let header = update.apply(&stored);
        assert_eq!(header.description.as_deref(), Some("Leaflets"));
        assert_eq!(header.notes, None);
        assert_eq!(header.journal_date, stored.journal_date);
        assert_eq!(header.status(), JournalStatus::Draft);
    }
}
